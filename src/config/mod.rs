// file: src/config/mod.rs
// version: 1.0.0
// guid: 6bee2924-0441-49c1-95ff-e20fc065fdf7

//! Configuration module for Core Update CLI
//!
//! Every section has defaults, so an empty or missing file is a valid configuration.

pub mod loader;

pub use loader::ConfigLoader;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Directory name used under the config and data roots
pub const APP_DIR: &str = "CoreUpdateCLI";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub general: GeneralConfig,
    pub logging: LoggingConfig,
    pub safety: SafetyConfig,
    pub tools: ToolPaths,
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneralConfig {
    /// Where the log file and journal live
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Level for the log file
    pub level: String,
    /// Write `coreupdate.log` in the data directory
    pub file: bool,
    /// Record every invocation in `journal.jsonl`
    pub journal: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: true,
            journal: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SafetyConfig {
    /// Print action invocations instead of running them
    pub dry_run: bool,
}

/// Program names or paths of the wrapped tools
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolPaths {
    pub winget: String,
    pub powershell: String,
    pub pnputil: String,
    pub wusa: String,
    pub whoami: String,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            winget: "winget".to_string(),
            powershell: "powershell".to_string(),
            pnputil: "pnputil".to_string(),
            wusa: "wusa".to_string(),
            whoami: "whoami".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DisplayConfig {
    /// Show a spinner while a tool runs
    pub progress: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { progress: true }
    }
}

impl Config {
    /// Default location of the user configuration file
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"))
    }

    /// Data directory; resolved by the loader, with a platform fallback
    pub fn data_dir(&self) -> PathBuf {
        self.general.data_dir.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join(APP_DIR)
        })
    }

    /// Log file path, if file logging is enabled
    pub fn log_file(&self) -> Option<PathBuf> {
        self.logging
            .file
            .then(|| self.data_dir().join(crate::logging::logger::LOG_FILE))
    }

    /// Journal path; the journal is read by `diagnostics` even when writing is off
    pub fn journal_file(&self) -> PathBuf {
        self.data_dir().join(crate::logging::journal::JOURNAL_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_default() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.tools.winget, "winget");
        assert!(config.display.progress);
        assert!(!config.safety.dry_run);
    }

    #[test]
    fn test_partial_sections() {
        let config: Config = toml::from_str(
            r#"
            [safety]
            dry_run = true

            [tools]
            winget = "D:\\bin\\winget.exe"
            "#,
        )
        .unwrap();
        assert!(config.safety.dry_run);
        assert_eq!(config.tools.winget, "D:\\bin\\winget.exe");
        assert_eq!(config.tools.pnputil, "pnputil");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let result: std::result::Result<Config, _> = toml::from_str("[safety]\ndryrun = true\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_paths_follow_data_dir() {
        let mut config = Config::default();
        config.general.data_dir = Some(PathBuf::from("/var/lib/coreupdate"));
        assert_eq!(
            config.journal_file(),
            PathBuf::from("/var/lib/coreupdate/journal.jsonl")
        );
        config.logging.file = false;
        assert!(config.log_file().is_none());
    }
}
