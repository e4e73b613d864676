// file: src/logging/logger.rs
// version: 1.1.0
// guid: c6e0930d-71fa-4139-bb54-97fee57e45b5

//! Logger initialization and configuration

use crate::error::{CoreUpdateError, Result};
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing::Instrument;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Name of the log file inside the data directory
pub const LOG_FILE: &str = "coreupdate.log";

/// Console filter directive for the given flags
pub fn console_directive(verbose: bool, quiet: bool) -> &'static str {
    if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    }
}

/// Initialize the logging system
///
/// The console layer writes to stderr so listings and JSON on stdout stay clean.
/// `RUST_LOG` overrides the console level when set. When `log_file` is given, a
/// second layer appends plain-text records at `file_level`.
pub fn init_logger(
    verbose: bool,
    quiet: bool,
    log_file: Option<&Path>,
    file_level: &str,
) -> Result<()> {
    let console_filter = if std::env::var_os("RUST_LOG").is_some() && !quiet {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(console_directive(verbose, quiet)))
    } else {
        EnvFilter::new(console_directive(verbose, quiet))
    };

    let console_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .with_filter(console_filter);

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let filter = EnvFilter::try_new(file_level).map_err(|e| {
                CoreUpdateError::config(format!("Invalid log level '{}': {}", file_level, e))
            })?;
            Some(
                fmt::layer()
                    .with_target(true)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .with_filter(filter),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| CoreUpdateError::config(format!("Failed to initialize logger: {}", e)))?;

    if let Some(path) = log_file {
        tracing::debug!("Logging to {}", path.display());
    }
    Ok(())
}

/// Initialize logging, falling back to the console layer alone
///
/// Returns the file layer's error when only the console layer could be installed. An
/// error means no logger is installed at all.
pub fn init_logger_with_fallback(
    verbose: bool,
    quiet: bool,
    log_file: Option<&Path>,
    file_level: &str,
) -> Result<Option<CoreUpdateError>> {
    let file_error = match init_logger(verbose, quiet, log_file, file_level) {
        Ok(()) => return Ok(None),
        Err(e) if log_file.is_some() => e,
        Err(e) => return Err(e),
    };

    match init_logger(verbose, quiet, None, file_level) {
        Ok(()) => Ok(Some(file_error)),
        Err(console) => Err(CoreUpdateError::config(format!(
            "{}; console logging also failed: {}",
            file_error, console
        ))),
    }
}

/// Create a scoped logger for operations
pub fn with_operation_span<F, R>(operation: &str, f: F) -> R
where
    F: FnOnce() -> R,
{
    let span = tracing::info_span!("operation", name = operation);
    let _enter = span.enter();
    f()
}

/// Create an async scoped logger for operations
pub async fn with_async_operation_span<F, Fut, R>(operation: &str, f: F) -> R
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = R>,
{
    let span = tracing::info_span!("operation", name = operation);
    async move { f().await }.instrument(span).await
}
