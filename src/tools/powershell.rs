// file: src/tools/powershell.rs
// version: 1.0.0
// guid: 8a87ffb1-5113-4bba-9322-029706f727f2

//! Fixed PowerShell scripts and their JSON output
//!
//! Script bodies are compiled into the binary and written to a private temporary
//! directory. They run with `-File`, and every value is passed as a separate
//! parameter argument, so no PowerShell source is ever assembled at runtime.

use crate::error::{CoreUpdateError, Result};
use crate::runner::Invocation;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

/// Exit code used by the update scripts when PSWindowsUpdate is missing
pub const EXIT_MODULE_MISSING: i32 = 3;

/// Name of the module the update scripts depend on
pub const MODULE: &str = "PSWindowsUpdate";

/// Bundled scripts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    ListUpdates,
    InstallUpdate,
    ListHotfixes,
    ModuleStatus,
    InstallModule,
    RestorePoint,
}

impl Script {
    pub const ALL: [Script; 6] = [
        Script::ListUpdates,
        Script::InstallUpdate,
        Script::ListHotfixes,
        Script::ModuleStatus,
        Script::InstallModule,
        Script::RestorePoint,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            Script::ListUpdates => "List-Updates.ps1",
            Script::InstallUpdate => "Install-Update.ps1",
            Script::ListHotfixes => "List-Hotfixes.ps1",
            Script::ModuleStatus => "Get-ModuleStatus.ps1",
            Script::InstallModule => "Install-PSWindowsUpdate.ps1",
            Script::RestorePoint => "New-RestorePoint.ps1",
        }
    }

    fn source(&self) -> &'static str {
        match self {
            Script::ListUpdates => include_str!("scripts/List-Updates.ps1"),
            Script::InstallUpdate => include_str!("scripts/Install-Update.ps1"),
            Script::ListHotfixes => include_str!("scripts/List-Hotfixes.ps1"),
            Script::ModuleStatus => include_str!("scripts/Get-ModuleStatus.ps1"),
            Script::InstallModule => include_str!("scripts/Install-PSWindowsUpdate.ps1"),
            Script::RestorePoint => include_str!("scripts/New-RestorePoint.ps1"),
        }
    }

    /// Whether the script fails with [`EXIT_MODULE_MISSING`] when the module is absent
    pub fn needs_module(&self) -> bool {
        matches!(self, Script::ListUpdates | Script::InstallUpdate)
    }
}

/// Directory of materialized scripts plus the PowerShell executable that runs them
#[derive(Debug)]
pub struct ScriptHost {
    exe: String,
    dir: PathBuf,
    _guard: Option<TempDir>,
}

impl ScriptHost {
    /// Write all scripts into a fresh temporary directory, removed on drop
    pub fn materialize(exe: impl Into<String>) -> Result<Self> {
        let guard = tempfile::Builder::new().prefix("coreupdate-").tempdir()?;
        let mut host = Self::in_dir(exe, guard.path())?;
        host._guard = Some(guard);
        Ok(host)
    }

    /// Write all scripts into `dir`, which is left in place
    pub fn in_dir(exe: impl Into<String>, dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        for script in Script::ALL {
            let path = dir.join(script.file_name());
            // BOM so Windows PowerShell 5.1 reads the file as UTF-8
            fs::write(&path, format!("\u{feff}{}", script.source()))?;
        }
        debug!("Materialized {} scripts in {}", Script::ALL.len(), dir.display());
        Ok(Self {
            exe: exe.into(),
            dir: dir.to_path_buf(),
            _guard: None,
        })
    }

    pub fn exe(&self) -> &str {
        &self.exe
    }

    pub fn script_path(&self, script: Script) -> PathBuf {
        self.dir.join(script.file_name())
    }

    /// Read-only invocation of `script`
    pub fn query(&self, script: Script) -> Invocation {
        self.prefix(Invocation::query(self.exe.as_str()), script)
    }

    /// Mutating invocation of `script`
    pub fn action(&self, script: Script) -> Invocation {
        self.prefix(Invocation::action(self.exe.as_str()), script)
    }

    fn prefix(&self, invocation: Invocation, script: Script) -> Invocation {
        invocation
            .args([
                "-NoProfile",
                "-NonInteractive",
                "-ExecutionPolicy",
                "Bypass",
                "-File",
            ])
            .arg(self.script_path(script).to_string_lossy())
    }
}

/// Output of `Get-ModuleStatus.ps1`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct ModuleStatus {
    pub power_shell: String,
    pub installed: bool,
    pub version: Option<String>,
}

impl ModuleStatus {
    pub fn parse(raw: &str) -> Result<Self> {
        let value = json_value("Get-ModuleStatus", raw)?;
        serde_json::from_value(value)
            .map_err(|e| CoreUpdateError::parse("Get-ModuleStatus", e.to_string(), raw))
    }
}

/// Parse script output holding one object or an array of objects
///
/// `ConvertTo-Json` unwraps single-element arrays on some PowerShell versions, so both
/// shapes are accepted. Every element must match `T` exactly.
pub fn parse_json_rows<T: DeserializeOwned>(tool: &str, raw: &str) -> Result<Vec<T>> {
    let items = match json_value(tool, raw)? {
        Value::Array(items) => items,
        object @ Value::Object(_) => vec![object],
        other => {
            return Err(CoreUpdateError::parse(
                tool,
                format!("expected a JSON array or object, got {}", json_type(&other)),
                raw,
            ))
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value(item).map_err(|e| {
                CoreUpdateError::parse(tool, format!("entry {}: {}", index + 1, e), raw)
            })
        })
        .collect()
}

fn json_value(tool: &str, raw: &str) -> Result<Value> {
    let body = raw.trim_start_matches('\u{feff}').trim();
    if body.is_empty() {
        return Err(CoreUpdateError::parse(tool, "no output", raw));
    }
    serde_json::from_str(body).map_err(|e| CoreUpdateError::parse(tool, e.to_string(), raw))
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "PascalCase", deny_unknown_fields)]
    struct Row {
        name: String,
    }

    #[test]
    fn test_materialize_writes_every_script() {
        let host = ScriptHost::materialize("powershell").unwrap();
        for script in Script::ALL {
            let content = fs::read_to_string(host.script_path(script)).unwrap();
            assert!(content.starts_with('\u{feff}'));
            assert!(content.len() > 20);
        }
    }

    #[test]
    fn test_scripts_removed_on_drop() {
        let host = ScriptHost::materialize("powershell").unwrap();
        let path = host.script_path(Script::ListUpdates);
        drop(host);
        assert!(!path.exists());
    }

    #[test]
    fn test_invocation_uses_file_mode() {
        let dir = tempfile::TempDir::new().unwrap();
        let host = ScriptHost::in_dir("pwsh", dir.path()).unwrap();
        let inv = host.action(Script::InstallUpdate).arg("-KBArticleID").arg("KB5001");

        assert_eq!(inv.program(), "pwsh");
        assert!(inv.is_action());
        assert!(inv.has_arg("-File"));
        assert!(inv.has_arg_ending_with("Install-Update.ps1"));
        assert!(!inv.has_arg("-Command"));
        assert_eq!(inv.argv()[inv.argv().len() - 1], "KB5001");
    }

    #[test]
    fn test_parse_json_rows_accepts_single_object() {
        let rows: Vec<Row> = parse_json_rows("test", "{\"Name\":\"one\"}").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "one");
    }

    #[test]
    fn test_parse_json_rows_accepts_bom_and_empty_array() {
        let rows: Vec<Row> = parse_json_rows("test", "\u{feff}[]\r\n").unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_parse_json_rows_failures() {
        assert!(parse_json_rows::<Row>("test", "").is_err());
        assert!(parse_json_rows::<Row>("test", "[{\"Name\":\"a\"},{\"Nam").is_err());
        assert!(parse_json_rows::<Row>("test", "[{\"Name\":\"a\",\"Extra\":1}]").is_err());
        assert!(parse_json_rows::<Row>("test", "null").is_err());
    }

    #[test]
    fn test_module_status() {
        let status =
            ModuleStatus::parse("{\"PowerShell\":\"5.1.22621.2506\",\"Installed\":true,\"Version\":\"2.2.1.5\"}")
                .unwrap();
        assert!(status.installed);
        assert_eq!(status.version.as_deref(), Some("2.2.1.5"));
        assert!(ModuleStatus::parse("{\"Installed\":true}").is_err());
    }
}
