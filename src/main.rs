// file: src/main.rs
// version: 1.0.0
// guid: e2a4be85-877b-4829-b6b3-c01f40887e6e

//! Core Update CLI - Main entry point

use clap::Parser;
use colored::Colorize;
use core_update_cli::{
    cli::{args::Cli, commands::dispatch},
    config::ConfigLoader,
    logging::logger,
    CoreUpdateError,
};
use std::process::ExitCode;
use tokio::signal;
use tracing::{error, warn};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match ConfigLoader::new().load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => return fail(&e),
    };

    // Initialize logging; a log file that cannot be opened only loses the file layer
    let log_file = config.log_file();
    match logger::init_logger_with_fallback(
        cli.verbose,
        cli.quiet,
        log_file.as_deref(),
        &config.logging.level,
    ) {
        Ok(None) => {}
        Ok(Some(e)) => warn!("File logging disabled: {}", e),
        Err(e) => eprintln!("{} logging disabled: {}", "warning:".yellow().bold(), e),
    }

    let dry_run = cli.dry_run || config.safety.dry_run;

    // Set up signal handling; a runtime without Ctrl+C support simply never fires
    let shutdown_signal = async {
        if signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        result = dispatch(cli.command, config, dry_run) => match result {
            Ok(code) => ExitCode::from(code),
            Err(e) => fail(&e),
        },
        _ = shutdown_signal => {
            warn!("Interrupted by user");
            eprintln!("{}", "Interrupted.".yellow());
            ExitCode::from(130)
        }
    }
}

fn fail(e: &CoreUpdateError) -> ExitCode {
    error!("{}", e);
    eprintln!("{} {}", "error:".red().bold(), e);
    ExitCode::from(e.exit_code())
}
