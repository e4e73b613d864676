// file: src/config/loader.rs
// version: 1.0.0
// guid: 6654a0fd-6dff-44ea-801d-7754047c138f

//! Configuration file loading, environment overrides and path expansion

use super::{Config, APP_DIR};
use crate::error::{CoreUpdateError, Result};
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

/// Configuration loader reading overrides from a captured environment
pub struct ConfigLoader {
    env_vars: HashMap<String, String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a loader over the process environment
    pub fn new() -> Self {
        Self {
            env_vars: std::env::vars().collect(),
        }
    }

    /// Create a loader over an explicit environment
    pub fn with_env(env_vars: HashMap<String, String>) -> Self {
        Self { env_vars }
    }

    /// Load configuration
    ///
    /// An explicit `path` must exist. Without one, the user config file is read if
    /// present and defaults are used otherwise.
    pub fn load(&self, path: Option<&Path>) -> Result<Config> {
        let mut config = match path {
            Some(path) => self.load_from_file(path)?,
            None => match Config::user_config_path() {
                Some(user) if user.is_file() => {
                    info!("Loading user configuration from: {}", user.display());
                    self.load_from_file(&user)?
                }
                _ => Config::default(),
            },
        };

        self.apply_env_overrides(&mut config)?;
        self.expand_tool_paths(&mut config);
        if config.general.data_dir.is_none() {
            config.general.data_dir = Some(self.default_data_dir());
        }
        validate(&config)?;

        debug!("Final configuration: {:?}", config);
        Ok(config)
    }

    /// Load configuration from a TOML file
    fn load_from_file(&self, path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| {
            CoreUpdateError::config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        toml::from_str(&content).map_err(|e| {
            CoreUpdateError::config(format!(
                "Failed to parse config file {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&self, config: &mut Config) -> Result<()> {
        if let Some(level) = self.env_vars.get("COREUPDATE_LOG_LEVEL") {
            config.logging.level = level.trim().to_ascii_lowercase();
        }

        if let Some(dry_run) = self.env_vars.get("COREUPDATE_DRY_RUN") {
            config.safety.dry_run = parse_flag(dry_run).ok_or_else(|| {
                CoreUpdateError::config(format!("COREUPDATE_DRY_RUN: '{}' is not a boolean", dry_run))
            })?;
        }

        if let Some(dir) = self.env_vars.get("COREUPDATE_DATA_DIR") {
            if !dir.trim().is_empty() {
                config.general.data_dir = Some(PathBuf::from(self.expand(dir)));
            }
        }

        Ok(())
    }

    fn expand_tool_paths(&self, config: &mut Config) {
        let tools = &mut config.tools;
        for value in [
            &mut tools.winget,
            &mut tools.powershell,
            &mut tools.pnputil,
            &mut tools.wusa,
            &mut tools.whoami,
        ] {
            *value = self.expand(value);
        }
        if let Some(dir) = &config.general.data_dir {
            let expanded = self.expand(&dir.to_string_lossy());
            config.general.data_dir = Some(PathBuf::from(expanded));
        }
    }

    /// Expand `%VAR%`, `$VAR`, `${VAR}` and a leading `~`
    ///
    /// Unknown variables are left as written.
    pub fn expand(&self, value: &str) -> String {
        let windows_style = match Regex::new(r"%([A-Za-z_][A-Za-z0-9_()]*)%") {
            Ok(re) => re
                .replace_all(value, |caps: &regex::Captures| {
                    self.lookup(&caps[1])
                        .cloned()
                        .unwrap_or_else(|| caps[0].to_string())
                })
                .into_owned(),
            Err(_) => value.to_string(),
        };

        let home = || dirs::home_dir().map(|path| path.to_string_lossy().into_owned());
        shellexpand::full_with_context_no_errors(&windows_style, home, |name| self.lookup(name))
            .into_owned()
    }

    // Windows environment names are case-insensitive
    fn lookup(&self, name: &str) -> Option<&String> {
        self.env_vars.get(name).or_else(|| {
            self.env_vars
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value)
        })
    }

    fn default_data_dir(&self) -> PathBuf {
        match self.lookup("ProgramData") {
            Some(root) if !root.trim().is_empty() => PathBuf::from(root).join(APP_DIR),
            _ => dirs::data_local_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join(APP_DIR),
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

fn validate(config: &Config) -> Result<()> {
    if !LEVELS.contains(&config.logging.level.as_str()) {
        return Err(CoreUpdateError::config(format!(
            "logging.level must be one of {}, got '{}'",
            LEVELS.join(", "),
            config.logging.level
        )));
    }

    let tools = &config.tools;
    for (name, value) in [
        ("winget", &tools.winget),
        ("powershell", &tools.powershell),
        ("pnputil", &tools.pnputil),
        ("wusa", &tools.wusa),
        ("whoami", &tools.whoami),
    ] {
        if value.trim().is_empty() {
            return Err(CoreUpdateError::config(format!("tools.{} must not be empty", name)));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_explicit_file() {
        // Arrange
        let file = write_config("[logging]\nlevel = \"debug\"\njournal = false\n");
        let loader = ConfigLoader::with_env(env(&[("COREUPDATE_DATA_DIR", "/tmp/cu")]));

        // Act
        let config = loader.load(Some(file.path())).unwrap();

        // Assert
        assert_eq!(config.logging.level, "debug");
        assert!(!config.logging.journal);
        assert_eq!(config.data_dir(), PathBuf::from("/tmp/cu"));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let loader = ConfigLoader::with_env(HashMap::new());
        let err = loader
            .load(Some(Path::new("/definitely/not/here/config.toml")))
            .unwrap_err();
        assert!(matches!(err, CoreUpdateError::Config(_)));
    }

    #[test]
    fn test_env_overrides() {
        let file = write_config("");
        let loader = ConfigLoader::with_env(env(&[
            ("COREUPDATE_LOG_LEVEL", "WARN"),
            ("COREUPDATE_DRY_RUN", "yes"),
        ]));
        let config = loader.load(Some(file.path())).unwrap();
        assert_eq!(config.logging.level, "warn");
        assert!(config.safety.dry_run);
    }

    #[test]
    fn test_bad_dry_run_flag() {
        let file = write_config("");
        let loader = ConfigLoader::with_env(env(&[("COREUPDATE_DRY_RUN", "maybe")]));
        assert!(loader.load(Some(file.path())).is_err());
    }

    #[test]
    fn test_bad_level_rejected() {
        let file = write_config("[logging]\nlevel = \"chatty\"\n");
        let loader = ConfigLoader::with_env(HashMap::new());
        assert!(matches!(
            loader.load(Some(file.path())),
            Err(CoreUpdateError::Config(_))
        ));
    }

    #[test]
    fn test_expand_windows_and_unix_variables() {
        let loader = ConfigLoader::with_env(env(&[
            ("LOCALAPPDATA", "C:\\Users\\me\\AppData\\Local"),
            ("TOOLS", "/opt/tools"),
        ]));
        assert_eq!(
            loader.expand("%localappdata%\\Microsoft\\WindowsApps\\winget.exe"),
            "C:\\Users\\me\\AppData\\Local\\Microsoft\\WindowsApps\\winget.exe"
        );
        assert_eq!(loader.expand("${TOOLS}/pnputil"), "/opt/tools/pnputil");
        assert_eq!(loader.expand("%NOPE%\\x"), "%NOPE%\\x");
    }

    #[test]
    fn test_expand_leading_tilde() {
        let loader = ConfigLoader::with_env(HashMap::new());
        match dirs::home_dir() {
            Some(home) => assert_eq!(
                loader.expand("~/bin/winget.exe"),
                format!("{}/bin/winget.exe", home.to_string_lossy())
            ),
            None => assert_eq!(loader.expand("~/bin/winget.exe"), "~/bin/winget.exe"),
        }
    }

    #[test]
    fn test_default_data_dir_prefers_program_data() {
        let file = write_config("");
        let loader = ConfigLoader::with_env(env(&[("ProgramData", "/srv/programdata")]));
        let config = loader.load(Some(file.path())).unwrap();
        assert_eq!(
            config.data_dir(),
            PathBuf::from("/srv/programdata").join(APP_DIR)
        );
    }
}
