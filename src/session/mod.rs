// file: src/session/mod.rs
// version: 1.0.0
// guid: f99509da-9710-40c3-961c-d6c3cf33a41b

//! Interactive maintenance session
//!
//! A [`Session`] owns the runner, the prompter and the toolbox for one run of the
//! program. Listings are returned to the caller and passed back in explicitly; the
//! session keeps no record state between categories. Processes run one at a time.

pub mod report;

pub use report::{BatchReport, ItemOutcome, ItemStatus};

use crate::error::{CoreUpdateError, Result};
use crate::model::{Action, CandidateRecord, Category, Listing};
use crate::present::{self, Prompter};
use crate::privilege::{self, ElevationPolicy, Privilege};
use crate::runner::{CommandRunner, Invocation, ProcessOutput};
use crate::tools::powershell::ModuleStatus;
use crate::tools::{Completion, Toolbox};
use std::path::Path;
use tracing::{debug, info, warn};

/// Behaviour switches for a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Print action invocations instead of running them
    pub dry_run: bool,
    pub elevation: ElevationPolicy,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            elevation: ElevationPolicy::Detect,
        }
    }
}

/// Result of one action invocation that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Applied { restart_required: bool },
    DryRun { command: String },
}

impl From<ActionOutcome> for ItemStatus {
    fn from(outcome: ActionOutcome) -> Self {
        match outcome {
            ActionOutcome::Applied { restart_required } => ItemStatus::Succeeded { restart_required },
            ActionOutcome::DryRun { command } => ItemStatus::DryRun { command },
        }
    }
}

/// Outcome of `setup`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupOutcome {
    AlreadyInstalled { version: Option<String> },
    Installed,
    Declined,
    DryRun { command: String },
}

/// Listing result for one category of the health summary
#[derive(Debug)]
pub struct CategoryHealth {
    pub category: Category,
    pub result: Result<usize>,
}

pub struct Session<R, P> {
    runner: R,
    prompter: P,
    tools: Toolbox,
    options: SessionOptions,
    privilege: Option<Privilege>,
}

impl<R: CommandRunner, P: Prompter> Session<R, P> {
    pub fn new(runner: R, prompter: P, tools: Toolbox, options: SessionOptions) -> Self {
        let privilege = match options.elevation {
            ElevationPolicy::Assume(privilege) => Some(privilege),
            ElevationPolicy::Detect => None,
        };
        Self {
            runner,
            prompter,
            tools,
            options,
            privilege,
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn prompter(&self) -> &P {
        &self.prompter
    }

    pub fn prompter_mut(&mut self) -> &mut P {
        &mut self.prompter
    }

    pub fn tools(&self) -> &Toolbox {
        &self.tools
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Privilege level of this process, detected once
    pub async fn privilege(&mut self) -> Result<Privilege> {
        if let Some(privilege) = self.privilege {
            return Ok(privilege);
        }
        let privilege = privilege::detect(&self.runner, &self.tools.paths().whoami).await?;
        debug!("Detected privilege: {:?}", privilege);
        self.privilege = Some(privilege);
        Ok(privilege)
    }

    /// Fail with `NotElevated` unless the process is elevated
    ///
    /// In dry-run mode a missing elevation is only reported, since nothing will run.
    pub async fn require_elevation(&mut self, what: &str) -> Result<()> {
        let cause = match self.privilege().await {
            Ok(privilege) if privilege.is_elevated() => return Ok(()),
            Ok(_) => None,
            Err(e) => Some(e),
        };
        let err = not_elevated(what, cause.as_ref());
        if self.options.dry_run {
            warn!("{}", err);
            self.prompter
                .show(&format!("Note: {} (ignored for dry run)", err));
            return Ok(());
        }
        Err(err)
    }

    /// Run the read-only query for `category` and parse its output
    pub async fn list_candidates(&self, category: Category) -> Result<Listing> {
        let invocation = self.tools.query(category);
        let output = self.runner.run(&invocation).await?;

        if !output.success() && self.tools.is_empty_result(category, &output) {
            info!("{}: tool reported nothing to list (exit {:?})", category, output.code);
            return Listing::new(category, Vec::new());
        }

        let parsed = self.tools.interpret(category, &invocation, &output)?;
        for entry in &parsed.skipped {
            warn!("{}: not selectable: {}", category, entry);
        }
        let listing = Listing::new(category, parsed.records)?.with_skipped(parsed.skipped);
        info!(
            "{}: {} candidates, {} not selectable",
            category,
            listing.len(),
            listing.skipped().len()
        );
        Ok(listing)
    }

    /// Show `listing` and collect the records the user picks
    pub async fn select_subset(&mut self, listing: &Listing) -> Result<Vec<CandidateRecord>> {
        let verb = listing.category().action().verb();
        present::select_subset(&mut self.prompter, listing, verb).await
    }

    /// Apply `action` to one record
    ///
    /// The record's identifier is passed to the tool as one argument. A tool that runs
    /// and reports failure yields `ActionFailed`.
    pub async fn apply_action(
        &self,
        category: Category,
        record: &CandidateRecord,
        action: Action,
    ) -> Result<ActionOutcome> {
        let invocation = self.tools.action(category, record, action)?;
        self.run_action(&invocation, record.id(), |code| {
            self.tools.completion(category, code)
        })
        .await
    }

    async fn run_action<F>(
        &self,
        invocation: &Invocation,
        identifier: &str,
        classify: F,
    ) -> Result<ActionOutcome>
    where
        F: Fn(Option<i32>) -> Completion,
    {
        if self.options.dry_run {
            return Ok(ActionOutcome::DryRun {
                command: invocation.display(),
            });
        }

        let output = self.runner.run(invocation).await?;
        match classify(output.code) {
            Completion::Done => Ok(ActionOutcome::Applied {
                restart_required: false,
            }),
            Completion::RestartRequired => Ok(ActionOutcome::Applied {
                restart_required: true,
            }),
            Completion::Failed => Err(CoreUpdateError::ActionFailed {
                identifier: identifier.to_string(),
                exit_code: output.code,
                message: output.diagnostic(),
            }),
        }
    }

    /// Apply the category's action to each selected record in order
    ///
    /// An empty selection runs nothing. Elevation is checked once before the first
    /// action. A failing record is reported and the rest are still attempted.
    pub async fn apply_batch(
        &mut self,
        category: Category,
        selected: &[CandidateRecord],
    ) -> Result<BatchReport> {
        let mut report = BatchReport::new(category);
        if selected.is_empty() {
            return Ok(report);
        }

        let action = category.action();
        self.require_elevation(&format!("{} {}", action.progressive(), category.title().to_lowercase()))
            .await?;

        for (index, record) in selected.iter().enumerate() {
            self.prompter.show(&format!(
                "[{}/{}] {} {} ({})",
                index + 1,
                selected.len(),
                action.progressive(),
                record.name(),
                record.id()
            ));

            let status = match self.apply_action(category, record, action).await {
                Ok(outcome) => outcome.into(),
                Err(CoreUpdateError::ActionFailed {
                    exit_code, message, ..
                }) => ItemStatus::Failed { exit_code, message },
                Err(e) => ItemStatus::Failed {
                    exit_code: None,
                    message: e.to_string(),
                },
            };
            if let ItemStatus::Failed { message, .. } = &status {
                warn!("{} {} failed: {}", action.verb(), record.id(), message);
            }
            report.push(record.id(), record.name(), status);
        }

        Ok(report)
    }

    /// List, select, confirm, act
    pub async fn run_category(&mut self, category: Category) -> Result<BatchReport> {
        let listing = self.list_candidates(category).await?;
        let selected = self.select_subset(&listing).await?;
        if selected.is_empty() {
            if !listing.is_empty() {
                self.prompter.show("Nothing selected.");
            }
            return Ok(BatchReport::new(category));
        }

        let action = category.action();
        let question = format!(
            "{} {} item{}?",
            capitalize(action.verb()),
            selected.len(),
            if selected.len() == 1 { "" } else { "s" }
        );
        if !present::confirm(&mut self.prompter, &question).await? {
            self.prompter.show("Cancelled.");
            return Ok(BatchReport::cancelled(category));
        }

        self.apply_batch(category, &selected).await
    }

    /// List several categories, keeping going when one fails
    pub async fn health(&self, categories: &[Category]) -> Vec<CategoryHealth> {
        let mut summary = Vec::with_capacity(categories.len());
        for &category in categories {
            let result = self.list_candidates(category).await.map(|listing| listing.len());
            if let Err(e) = &result {
                warn!("{} check failed: {}", category, e);
            }
            summary.push(CategoryHealth { category, result });
        }
        summary
    }

    /// Export every third-party driver package into `dir`
    pub async fn export_drivers(&mut self, dir: &Path) -> Result<ActionOutcome> {
        self.require_elevation("Exporting drivers").await?;
        if !self.options.dry_run {
            std::fs::create_dir_all(dir)?;
        }
        let invocation = self.tools.export_drivers(dir);
        let identifier = dir.display().to_string();
        self.run_action(&invocation, &identifier, |code| {
            self.tools.completion(Category::DriverPackages, code)
        })
        .await
    }

    /// Create a restore point after confirmation; `None` when declined
    pub async fn restore_point(&mut self, description: &str) -> Result<Option<ActionOutcome>> {
        let invocation = self.tools.restore_point(description)?;
        self.require_elevation("Creating a restore point").await?;
        let question = format!("Create restore point '{}'?", description.trim());
        if !present::confirm(&mut self.prompter, &question).await? {
            return Ok(None);
        }
        let outcome = self
            .run_action(&invocation, "restore point", |code| match code {
                Some(0) => Completion::Done,
                _ => Completion::Failed,
            })
            .await?;
        Ok(Some(outcome))
    }

    /// Report the PowerShell host and PSWindowsUpdate module state
    pub async fn module_status(&self) -> Result<ModuleStatus> {
        let invocation = self.tools.module_status();
        let output = self.runner.run(&invocation).await?;
        if !output.success() {
            return Err(query_failed("Get-ModuleStatus", &invocation, &output));
        }
        ModuleStatus::parse(&output.stdout)
    }

    /// Install PSWindowsUpdate for the current user if it is missing
    pub async fn setup(&mut self) -> Result<SetupOutcome> {
        let status = self.module_status().await?;
        if status.installed {
            return Ok(SetupOutcome::AlreadyInstalled {
                version: status.version,
            });
        }

        self.prompter.show(&format!(
            "PSWindowsUpdate is not installed (PowerShell {}).",
            status.power_shell
        ));
        if !present::confirm(&mut self.prompter, "Install it from the PowerShell Gallery for the current user?")
            .await?
        {
            return Ok(SetupOutcome::Declined);
        }

        let invocation = self.tools.install_module();
        match self
            .run_action(&invocation, "PSWindowsUpdate", |code| match code {
                Some(0) => Completion::Done,
                _ => Completion::Failed,
            })
            .await?
        {
            ActionOutcome::Applied { .. } => Ok(SetupOutcome::Installed),
            ActionOutcome::DryRun { command } => Ok(SetupOutcome::DryRun { command }),
        }
    }
}

/// `NotElevated` for `what`, naming the failed privilege check when there was one
fn not_elevated(what: &str, cause: Option<&CoreUpdateError>) -> CoreUpdateError {
    match cause {
        None => CoreUpdateError::not_elevated(format!(
            "{} needs an elevated prompt; re-run from an Administrator terminal",
            what
        )),
        Some(cause) => CoreUpdateError::not_elevated(format!(
            "{} needs an elevated prompt and elevation could not be confirmed ({}); \
             re-run from an Administrator terminal",
            what, cause
        )),
    }
}

fn query_failed(tool: &str, invocation: &Invocation, output: &ProcessOutput) -> CoreUpdateError {
    CoreUpdateError::ToolExecution {
        tool: tool.to_string(),
        invocation: invocation.display(),
        code: output.code,
        stderr: output.diagnostic(),
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("roll back"), "Roll back");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_not_elevated_names_failed_check() {
        let plain = not_elevated("Installing updates", None);
        assert!(matches!(plain, CoreUpdateError::NotElevated(_)));
        assert!(!plain.to_string().contains("could not be confirmed"));

        let cause = CoreUpdateError::ToolExecution {
            tool: "whoami".to_string(),
            invocation: "whoami /groups /fo csv /nh".to_string(),
            code: Some(1),
            stderr: "ERROR: Access is denied.".to_string(),
        };
        let err = not_elevated("Installing updates", Some(&cause));
        assert_eq!(err.exit_code(), 4);
        let message = err.to_string();
        assert!(message.contains("could not be confirmed"));
        assert!(message.contains("ERROR: Access is denied."));
    }

    #[test]
    fn test_outcome_to_status() {
        let status: ItemStatus = ActionOutcome::Applied {
            restart_required: true,
        }
        .into();
        assert_eq!(status, ItemStatus::Succeeded { restart_required: true });
    }
}
