// file: src/cli/commands.rs
// version: 1.0.0
// guid: fb37564d-4039-4336-bb9d-747a8dd49491

//! Command implementations for the CLI

use super::args::{app_category, driver_category, Commands, ListArgs};
use crate::{
    config::Config,
    logging::{journal, logger::with_async_operation_span, Journal},
    model::Category,
    present::{render_listing, Prompter, TerminalPrompter},
    privilege::ElevationPolicy,
    runner::{CommandRunner, SystemRunner},
    session::{ActionOutcome, BatchReport, ItemStatus, Session, SessionOptions, SetupOutcome},
    tools::Toolbox,
    Result,
};
use colored::Colorize;
use serde_json::json;
use std::path::Path;
use sysinfo::System;
use tracing::{info, warn};

/// Categories counted by `status`
pub const STATUS_CATEGORIES: [Category; 3] =
    [Category::Apps, Category::Updates, Category::DriverUpdates];

/// Build the session used by every command
pub fn build_session(
    config: &Config,
    dry_run: bool,
) -> Result<Session<SystemRunner, TerminalPrompter>> {
    let mut runner = SystemRunner::new(config.display.progress);
    if config.logging.journal {
        match Journal::open(&config.data_dir()) {
            Ok(journal) => {
                info!("Journal session {}", journal.session());
                runner = runner.with_journal(journal);
            }
            Err(e) => warn!("Invocation journal disabled: {}", e),
        }
    }

    let tools = Toolbox::new(config.tools.clone())?;
    let options = SessionOptions {
        dry_run,
        elevation: ElevationPolicy::Detect,
    };
    Ok(Session::new(runner, TerminalPrompter::new(), tools, options))
}

/// Run the parsed command; the returned value is the process exit code
pub async fn dispatch(command: Commands, config: Config, dry_run: bool) -> Result<u8> {
    let mut session = build_session(&config, dry_run)?;
    if dry_run {
        println!("{}", "Dry run: actions will be printed, not executed.".yellow());
    }

    let name = command.name();
    with_async_operation_span(name, || async move {
        match command {
            Commands::Apps { installed, list } => {
                category_command(&mut session, app_category(installed), list).await
            }
            Commands::Updates { list } => {
                category_command(&mut session, Category::Updates, list).await
            }
            Commands::Drivers { packages, list } => {
                category_command(&mut session, driver_category(packages), list).await
            }
            Commands::Rollback { list } => {
                category_command(&mut session, Category::Rollback, list).await
            }
            Commands::Status { json } => status_command(&session, json).await,
            Commands::ExportDrivers { dir } => export_drivers_command(&mut session, &dir).await,
            Commands::RestorePoint { description } => {
                restore_point_command(&mut session, &description).await
            }
            Commands::Setup => setup_command(&mut session).await,
            Commands::Diagnostics { lines } => {
                diagnostics_command(&mut session, &config, lines).await
            }
        }
    })
    .await
}

/// List one category, then select, confirm and apply
pub async fn category_command<R: CommandRunner, P: Prompter>(
    session: &mut Session<R, P>,
    category: Category,
    list: ListArgs,
) -> Result<u8> {
    if list.list_only {
        let listing = session.list_candidates(category).await?;
        if list.json {
            println!("{}", serde_json::to_string_pretty(&listing)?);
        } else {
            for line in render_listing(&listing) {
                println!("{}", line);
            }
        }
        return Ok(0);
    }

    let report = session.run_category(category).await?;
    print_report(&report);
    Ok(report.exit_code())
}

/// Print per-item results; failures go to stderr
pub fn print_report(report: &BatchReport) {
    if report.cancelled || report.is_empty() {
        return;
    }

    for item in &report.items {
        match &item.status {
            ItemStatus::Succeeded { restart_required } => {
                let note = if *restart_required {
                    " (restart required)".yellow().to_string()
                } else {
                    String::new()
                };
                println!(
                    "{} {} {} ({}){}",
                    "✓".green(),
                    capitalize_first(report.action.past_tense()),
                    item.name,
                    item.identifier,
                    note
                );
            }
            ItemStatus::DryRun { command } => {
                println!("{} would run: {}", "•".yellow(), command);
            }
            ItemStatus::Failed { exit_code, message } => {
                let code = exit_code
                    .map(|c| format!("exit code {}", c))
                    .unwrap_or_else(|| "not run".to_string());
                eprintln!(
                    "{} {} ({}) failed, {}: {}",
                    "✗".red(),
                    item.name,
                    item.identifier,
                    code,
                    message
                );
            }
        }
    }

    let summary = format!(
        "{}: {} succeeded, {} failed",
        report.category.title(),
        report.succeeded(),
        report.failed()
    );
    if report.failed() > 0 {
        eprintln!("{}", summary.red().bold());
    } else {
        println!("{}", summary.bold());
    }
    if report.restart_required() {
        println!("{}", "Restart Windows to finish applying the changes.".yellow());
    }
}

fn capitalize_first(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Health summary across the update categories
pub async fn status_command<R: CommandRunner, P: Prompter>(
    session: &Session<R, P>,
    as_json: bool,
) -> Result<u8> {
    let health = session.health(&STATUS_CATEGORIES).await;
    let exit = health
        .iter()
        .find_map(|h| h.result.as_ref().err().map(|e| e.exit_code()))
        .unwrap_or(0);

    if as_json {
        let rows: Vec<_> = health
            .iter()
            .map(|h| match &h.result {
                Ok(count) => json!({ "category": h.category, "pending": count }),
                Err(e) => json!({ "category": h.category, "error": e.to_string() }),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(exit);
    }

    let width = health
        .iter()
        .map(|h| h.category.title().len())
        .max()
        .unwrap_or(0);
    for h in &health {
        let title = format!("{:<width$}", h.category.title(), width = width);
        match &h.result {
            Ok(0) => println!("{} {}  up to date", "✓".green(), title),
            Ok(count) => println!("{} {}  {} pending", "•".yellow(), title, count),
            Err(e) => eprintln!("{} {}  {}", "✗".red(), title, e),
        }
    }
    Ok(exit)
}

pub async fn export_drivers_command<R: CommandRunner, P: Prompter>(
    session: &mut Session<R, P>,
    dir: &Path,
) -> Result<u8> {
    match session.export_drivers(dir).await? {
        ActionOutcome::Applied { .. } => {
            println!("{} Drivers exported to {}", "✓".green(), dir.display())
        }
        ActionOutcome::DryRun { command } => println!("{} would run: {}", "•".yellow(), command),
    }
    Ok(0)
}

pub async fn restore_point_command<R: CommandRunner, P: Prompter>(
    session: &mut Session<R, P>,
    description: &str,
) -> Result<u8> {
    match session.restore_point(description).await? {
        Some(ActionOutcome::Applied { .. }) => {
            println!("{} Restore point '{}' created", "✓".green(), description.trim())
        }
        Some(ActionOutcome::DryRun { command }) => {
            println!("{} would run: {}", "•".yellow(), command)
        }
        None => println!("Cancelled."),
    }
    Ok(0)
}

pub async fn setup_command<R: CommandRunner, P: Prompter>(
    session: &mut Session<R, P>,
) -> Result<u8> {
    match session.setup().await? {
        SetupOutcome::AlreadyInstalled { version } => println!(
            "{} PSWindowsUpdate {} is already installed",
            "✓".green(),
            version.as_deref().unwrap_or("(unknown version)")
        ),
        SetupOutcome::Installed => println!("{} PSWindowsUpdate installed", "✓".green()),
        SetupOutcome::Declined => println!("Cancelled."),
        SetupOutcome::DryRun { command } => println!("{} would run: {}", "•".yellow(), command),
    }
    Ok(0)
}

/// System, tool and journal report
pub async fn diagnostics_command<R: CommandRunner, P: Prompter>(
    session: &mut Session<R, P>,
    config: &Config,
    lines: usize,
) -> Result<u8> {
    let mut sys = System::new_all();
    sys.refresh_all();

    println!("{}", "System".bold());
    println!(
        "  OS:        {} {}",
        System::name().unwrap_or_else(|| "unknown".to_string()),
        System::os_version().unwrap_or_default()
    );
    println!(
        "  Kernel:    {}",
        System::kernel_version().unwrap_or_else(|| "unknown".to_string())
    );
    println!(
        "  Host:      {}",
        System::host_name().unwrap_or_else(|| "unknown".to_string())
    );
    println!(
        "  CPU:       {} ({} logical)",
        sys.cpus()
            .first()
            .map(|cpu| cpu.brand().trim().to_string())
            .unwrap_or_else(|| "unknown".to_string()),
        sys.cpus().len()
    );
    println!(
        "  Memory:    {:.1} GiB",
        sys.total_memory() as f64 / (1024.0 * 1024.0 * 1024.0)
    );
    match session.privilege().await {
        Ok(privilege) => println!(
            "  Elevated:  {}",
            if privilege.is_elevated() { "yes" } else { "no" }
        ),
        Err(e) => println!("  Elevated:  unknown ({})", e),
    }

    println!("{}", "Tools".bold());
    let paths = session.tools().paths().clone();
    for (name, program) in [
        ("winget", &paths.winget),
        ("powershell", &paths.powershell),
        ("pnputil", &paths.pnputil),
        ("wusa", &paths.wusa),
        ("whoami", &paths.whoami),
    ] {
        match SystemRunner::resolve(program) {
            Ok(path) => println!("  {:<11}{} {}", name, "✓".green(), path.display()),
            Err(_) => println!("  {:<11}{} not found", name, "✗".red()),
        }
    }

    let winget_version = session.tools().winget_version();
    match session.runner().run(&winget_version).await {
        Ok(output) if output.success() => {
            println!("  winget version: {}", output.stdout.trim())
        }
        Ok(output) => println!("  winget version: failed ({})", output.diagnostic()),
        Err(e) => println!("  winget version: {}", e),
    }
    match session.module_status().await {
        Ok(status) => println!(
            "  PowerShell {}; PSWindowsUpdate {}",
            status.power_shell,
            if status.installed {
                status.version.unwrap_or_else(|| "installed".to_string())
            } else {
                "not installed (run `coreupdate setup`)".to_string()
            }
        ),
        Err(e) => println!("  PSWindowsUpdate: {}", e),
    }

    println!("{}", "Paths".bold());
    println!(
        "  Config:    {}",
        Config::user_config_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "-".to_string())
    );
    println!("  Data:      {}", config.data_dir().display());
    if let Some(log) = config.log_file() {
        println!("  Log:       {}", log.display());
    }
    let journal_path = config.journal_file();
    println!("  Journal:   {}", journal_path.display());

    let entries = journal::tail(&journal_path, lines)?;
    println!("{}", format!("Recent invocations ({})", entries.len()).bold());
    for entry in entries {
        println!(
            "  {} {:<6} {} {} -> {} ({} ms)",
            entry.timestamp.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S"),
            entry.kind,
            entry.program,
            entry.arguments.join(" "),
            entry
                .exit_code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "-".to_string()),
            entry.duration_ms
        );
    }

    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capitalize_first() {
        assert_eq!(capitalize_first("rolled back"), "Rolled back");
    }

}
