// file: src/tools/mod.rs
// version: 1.0.0
// guid: 791fc7b1-4844-4bc7-83fd-9883ed51bf4f

//! Wrapped Windows tools
//!
//! Each submodule knows how to build the argument vectors for one tool and how to
//! parse what it prints. [`Toolbox`] routes a [`Category`] to the right one.

pub mod hotfix;
pub mod pnputil;
pub mod powershell;
pub mod text;
pub mod windows_update;
pub mod winget;

use crate::config::ToolPaths;
use crate::error::{CoreUpdateError, Result};
use crate::model::{Action, CandidateRecord, Category, RecordKind};
use crate::runner::{Invocation, ProcessOutput};
use powershell::{Script, ScriptHost, EXIT_MODULE_MISSING};
use std::path::Path;
use tracing::debug;

/// Exit code Windows installers use for "succeeded, restart required"
pub const ERROR_SUCCESS_REBOOT_REQUIRED: i32 = 3010;

/// How an action invocation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Done,
    RestartRequired,
    Failed,
}

/// Records parsed from one query, plus entries the tool listed that cannot be acted on
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parsed {
    pub records: Vec<CandidateRecord>,
    pub skipped: Vec<String>,
}

impl From<Vec<CandidateRecord>> for Parsed {
    fn from(records: Vec<CandidateRecord>) -> Self {
        Self {
            records,
            skipped: Vec::new(),
        }
    }
}

/// Builds invocations and interprets output for every category
#[derive(Debug)]
pub struct Toolbox {
    paths: ToolPaths,
    scripts: ScriptHost,
}

impl Toolbox {
    /// Create a toolbox; the PowerShell scripts are written to a temporary directory
    pub fn new(paths: ToolPaths) -> Result<Self> {
        let scripts = ScriptHost::materialize(paths.powershell.clone())?;
        Ok(Self { paths, scripts })
    }

    /// Create a toolbox whose scripts live in `dir`
    pub fn with_script_dir(paths: ToolPaths, dir: &Path) -> Result<Self> {
        let scripts = ScriptHost::in_dir(paths.powershell.clone(), dir)?;
        Ok(Self { paths, scripts })
    }

    pub fn paths(&self) -> &ToolPaths {
        &self.paths
    }

    pub fn scripts(&self) -> &ScriptHost {
        &self.scripts
    }

    /// The read-only invocation that lists `category`
    pub fn query(&self, category: Category) -> Invocation {
        match category {
            Category::Apps => winget::upgrades_query(&self.paths.winget),
            Category::InstalledApps => winget::installed_query(&self.paths.winget),
            Category::Updates => windows_update::list_query(&self.scripts, false),
            Category::DriverUpdates => windows_update::list_query(&self.scripts, true),
            Category::DriverPackages => pnputil::enum_query(&self.paths.pnputil),
            Category::Rollback => hotfix::list_query(&self.scripts),
        }
    }

    /// Turn a finished query into records, or the error that explains its exit code
    pub fn interpret(
        &self,
        category: Category,
        invocation: &Invocation,
        output: &ProcessOutput,
    ) -> Result<Parsed> {
        if !output.success() {
            return Err(self.query_failure(category, invocation, output));
        }

        match category {
            Category::Apps | Category::InstalledApps => winget::parse_table(&output.stdout),
            Category::Updates => {
                windows_update::parse(&output.stdout, RecordKind::Update).map(Parsed::from)
            }
            Category::DriverUpdates => {
                windows_update::parse(&output.stdout, RecordKind::Driver).map(Parsed::from)
            }
            Category::DriverPackages => pnputil::parse(&output.stdout).map(Parsed::from),
            Category::Rollback => hotfix::parse(&output.stdout),
        }
    }

    fn query_failure(
        &self,
        category: Category,
        invocation: &Invocation,
        output: &ProcessOutput,
    ) -> CoreUpdateError {
        let module_missing = matches!(category, Category::Updates | Category::DriverUpdates)
            && output.code == Some(EXIT_MODULE_MISSING);
        if module_missing {
            return module_unavailable();
        }
        CoreUpdateError::ToolExecution {
            tool: category.tool().to_string(),
            invocation: invocation.display(),
            code: output.code,
            stderr: output.diagnostic(),
        }
    }

    /// Whether a failed query exit code really means "nothing to list"
    pub fn is_empty_result(&self, category: Category, output: &ProcessOutput) -> bool {
        matches!(category, Category::Apps | Category::InstalledApps)
            && winget::is_empty_result(output.code)
    }

    /// The mutating invocation applying `action` to `record`
    pub fn action(
        &self,
        category: Category,
        record: &CandidateRecord,
        action: Action,
    ) -> Result<Invocation> {
        if !category.supports(action) {
            return Err(CoreUpdateError::unsupported(format!(
                "cannot {} {} records",
                action.verb(),
                category
            )));
        }
        if record.kind() != category.kind() {
            return Err(CoreUpdateError::validation(format!(
                "{} record {} does not belong to {}",
                record.kind().as_str(),
                record.id(),
                category
            )));
        }

        let id = record.id();
        debug!("Building {} invocation for {}", action.verb(), id);
        match category {
            Category::Apps => winget::upgrade_action(&self.paths.winget, id),
            Category::InstalledApps => winget::uninstall_action(&self.paths.winget, id),
            Category::Updates | Category::DriverUpdates => {
                windows_update::install_action(&self.scripts, id)
            }
            Category::DriverPackages => pnputil::delete_action(&self.paths.pnputil, id),
            Category::Rollback => hotfix::uninstall_action(&self.paths.wusa, id),
        }
    }

    /// Classify the exit code of an action invocation
    pub fn completion(&self, category: Category, code: Option<i32>) -> Completion {
        match (category, code) {
            (_, Some(0)) => Completion::Done,
            (Category::Apps | Category::InstalledApps, Some(winget::REBOOT_REQUIRED_TO_FINISH)) => {
                Completion::RestartRequired
            }
            (
                Category::Updates
                | Category::DriverUpdates
                | Category::DriverPackages
                | Category::Rollback,
                Some(ERROR_SUCCESS_REBOOT_REQUIRED),
            ) => Completion::RestartRequired,
            _ => Completion::Failed,
        }
    }

    /// Export all third-party drivers into `dir`
    pub fn export_drivers(&self, dir: &Path) -> Invocation {
        pnputil::export_action(&self.paths.pnputil, dir)
    }

    /// Create a system restore point
    pub fn restore_point(&self, description: &str) -> Result<Invocation> {
        let description = description.trim();
        if description.is_empty() {
            return Err(CoreUpdateError::validation("restore point description is empty"));
        }
        // PowerShell would bind a leading dash as a parameter name
        if description.starts_with('-') {
            return Err(CoreUpdateError::validation(
                "restore point description must not start with '-'",
            ));
        }
        Ok(self
            .scripts
            .action(Script::RestorePoint)
            .arg("-Description")
            .arg(description)
            .labelled("Creating restore point"))
    }

    /// Report the PowerShell version and PSWindowsUpdate state
    pub fn module_status(&self) -> Invocation {
        self.scripts
            .query(Script::ModuleStatus)
            .labelled("Checking PSWindowsUpdate")
    }

    /// Install PSWindowsUpdate for the current user
    pub fn install_module(&self) -> Invocation {
        self.scripts
            .action(Script::InstallModule)
            .labelled("Installing PSWindowsUpdate")
    }

    /// `winget --version`
    pub fn winget_version(&self) -> Invocation {
        winget::version_query(&self.paths.winget)
    }
}

/// PSWindowsUpdate missing, with the command that fixes it
pub fn module_unavailable() -> CoreUpdateError {
    CoreUpdateError::tool_unavailable(
        powershell::MODULE,
        "run `coreupdate setup` to install the PowerShell module",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn toolbox(dir: &TempDir) -> Toolbox {
        Toolbox::with_script_dir(ToolPaths::default(), dir.path()).unwrap()
    }

    #[test]
    fn test_queries_are_read_only() {
        let dir = TempDir::new().unwrap();
        let tools = toolbox(&dir);
        for category in Category::ALL {
            assert!(!tools.query(category).is_action(), "{}", category);
        }
        assert_eq!(tools.query(Category::Apps).program(), "winget");
        assert!(tools.query(Category::Rollback).has_arg_ending_with("List-Hotfixes.ps1"));
    }

    #[test]
    fn test_module_missing_exit_code() {
        let dir = TempDir::new().unwrap();
        let tools = toolbox(&dir);
        let inv = tools.query(Category::Updates);
        let err = tools
            .interpret(Category::Updates, &inv, &ProcessOutput::failed(3, "missing"))
            .unwrap_err();
        assert!(matches!(err, CoreUpdateError::ToolUnavailable { ref tool, .. } if tool == "PSWindowsUpdate"));

        // the same code from pnputil is an ordinary failure
        let inv = tools.query(Category::DriverPackages);
        let err = tools
            .interpret(Category::DriverPackages, &inv, &ProcessOutput::failed(3, "x"))
            .unwrap_err();
        assert!(matches!(err, CoreUpdateError::ToolExecution { code: Some(3), .. }));
    }

    #[test]
    fn test_action_rejects_mismatched_pairs() {
        let dir = TempDir::new().unwrap();
        let tools = toolbox(&dir);
        let app = CandidateRecord::new(RecordKind::App, "Git.Git", "Git");
        assert!(matches!(
            tools.action(Category::Apps, &app, Action::Rollback),
            Err(CoreUpdateError::Unsupported(_))
        ));
        assert!(matches!(
            tools.action(Category::Rollback, &app, Action::Rollback),
            Err(CoreUpdateError::Validation(_))
        ));
    }

    #[test]
    fn test_completion_codes() {
        let dir = TempDir::new().unwrap();
        let tools = toolbox(&dir);
        assert_eq!(tools.completion(Category::Apps, Some(0)), Completion::Done);
        assert_eq!(
            tools.completion(Category::Rollback, Some(3010)),
            Completion::RestartRequired
        );
        assert_eq!(tools.completion(Category::Apps, Some(3010)), Completion::Failed);
        assert_eq!(tools.completion(Category::DriverPackages, None), Completion::Failed);
    }

    #[test]
    fn test_restore_point_description() {
        let dir = TempDir::new().unwrap();
        let tools = toolbox(&dir);
        let inv = tools.restore_point("Before \"driver\" cleanup; $x").unwrap();
        assert!(inv.has_arg("Before \"driver\" cleanup; $x"));
        assert!(tools.restore_point("  ").is_err());
        assert!(tools.restore_point("-Confirm").is_err());
    }
}
