// file: src/runner/system.rs
// version: 1.0.0
// guid: 9991d8ae-de78-4e75-ac25-53f25d333eb6

//! Runs invocations as real child processes

use super::{CommandRunner, Invocation, OutputMode, ProcessOutput};
use crate::error::{CoreUpdateError, Result};
use crate::logging::journal::Journal;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Child-process runner with program resolution, spinner and journal
pub struct SystemRunner {
    progress: bool,
    journal: Option<Journal>,
}

impl SystemRunner {
    /// Create a runner; `progress` enables the terminal spinner
    pub fn new(progress: bool) -> Self {
        Self {
            progress,
            journal: None,
        }
    }

    /// Record every invocation in `journal`
    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Resolve a program name to an executable path
    pub fn resolve(program: &str) -> Result<PathBuf> {
        let direct = Path::new(program);
        if direct.components().count() > 1 && direct.is_file() {
            return Ok(direct.to_path_buf());
        }

        if let Ok(path) = which::which(program) {
            return Ok(path);
        }

        if let Some(path) = known_locations(program).into_iter().find(|p| p.is_file()) {
            debug!("Resolved {} outside PATH: {}", program, path.display());
            return Ok(path);
        }

        Err(CoreUpdateError::tool_unavailable(
            display_name(program),
            install_hint(program),
        ))
    }

    fn spinner(&self, label: &str) -> ProgressBar {
        if !self.progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(style);
        bar.set_message(label.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar
    }
}

impl CommandRunner for SystemRunner {
    async fn run(&self, invocation: &Invocation) -> Result<ProcessOutput> {
        let program = Self::resolve(invocation.program())?;
        info!("Running: {}", invocation.display());

        let mut cmd = Command::new(&program);
        cmd.args(invocation.argv())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let started = Instant::now();
        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CoreUpdateError::tool_unavailable(
                    display_name(invocation.program()),
                    install_hint(invocation.program()),
                )
            } else {
                CoreUpdateError::Io(e)
            }
        })?;

        let bar = self.spinner(invocation.label());
        let echo = invocation.mode() == OutputMode::Stream;
        let (stdout, stderr) = tokio::join!(
            drain(child.stdout.take(), echo.then_some(&bar)),
            drain(child.stderr.take(), None),
        );
        let status = child.wait().await;
        bar.finish_and_clear();

        let status = status?;
        let output = ProcessOutput {
            code: status.code(),
            stdout: stdout?,
            stderr: stderr?,
        };
        let elapsed = started.elapsed();
        debug!(
            "{} exited with {:?} after {} ms",
            invocation.program(),
            output.code,
            elapsed.as_millis()
        );

        if let Some(journal) = &self.journal {
            journal.record_invocation(invocation, output.code, elapsed);
        }

        Ok(output)
    }
}

/// Read a child stream to the end, echoing lines when asked
async fn drain<R>(stream: Option<R>, echo: Option<&ProgressBar>) -> std::io::Result<String>
where
    R: AsyncRead + Unpin,
{
    let Some(stream) = stream else {
        return Ok(String::new());
    };

    let mut reader = BufReader::new(stream);
    let mut collected = String::new();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        collected.push_str(&line);

        if let Some(bar) = echo {
            // progress redraws arrive as \r-separated frames; show only the last
            let visible = line
                .trim_end_matches(&['\r', '\n'][..])
                .rsplit('\r')
                .next()
                .unwrap_or_default()
                .trim_end();
            if visible.trim().is_empty() {
                continue;
            }
            let rendered = format!("  {}", visible.dimmed());
            if bar.is_hidden() {
                println!("{}", rendered);
            } else {
                bar.println(rendered);
            }
        }
    }

    Ok(collected)
}

/// Fallback install locations for tools that are not always on PATH
fn known_locations(program: &str) -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if program.eq_ignore_ascii_case("winget") {
        if let Ok(local) = std::env::var("LOCALAPPDATA") {
            let base = PathBuf::from(local).join("Microsoft");
            candidates.push(base.join("WindowsApps").join("winget.exe"));
            candidates.push(base.join("Windows").join("Apps").join("winget.exe"));
        }
    }
    if let Ok(root) = std::env::var("SystemRoot") {
        let system32 = PathBuf::from(root).join("System32");
        let exe = if program.ends_with(".exe") {
            program.to_string()
        } else {
            format!("{}.exe", program)
        };
        candidates.push(system32.join(&exe));
        candidates.push(system32.join("WindowsPowerShell").join("v1.0").join(exe));
    }
    candidates
}

fn display_name(program: &str) -> String {
    Path::new(program)
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| program.to_string())
}

fn install_hint(program: &str) -> &'static str {
    match display_name(program).to_ascii_lowercase().as_str() {
        "winget" => "install 'App Installer' from the Microsoft Store (ms-windows-store://pdp/?ProductId=9NBLGGH4NNS1)",
        "powershell" | "pwsh" => "Windows PowerShell 5.1 is required and ships with Windows 10 and later",
        "pnputil" | "wusa" | "whoami" => "this tool ships with Windows; run Core Update CLI on Windows 10 or later",
        _ => {
            warn!("No install hint for {}", program);
            "make sure it is installed and on PATH"
        }
    }
}
