// file: src/runner/mod.rs
// version: 1.0.0
// guid: d98693b3-2d32-454a-b290-b9c604771096

//! Argument-vector invocations and the process runner seam
//!
//! An [`Invocation`] is a program plus a list of arguments. It is never rendered into a
//! command string for execution; [`Invocation::display`] exists for logs and dry runs only.

pub mod recording;
pub mod system;

pub use recording::RecordingRunner;
pub use system::SystemRunner;

use crate::error::Result;
use serde::Serialize;
use std::future::Future;

/// Whether an invocation only reads state or changes it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InvocationKind {
    Query,
    Action,
}

/// How the child's stdout is handled while it runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Collect silently
    Capture,
    /// Collect and echo each line to the terminal
    Stream,
}

/// One external process call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: String,
    args: Vec<String>,
    label: String,
    kind: InvocationKind,
    mode: OutputMode,
}

impl Invocation {
    /// Start a read-only invocation of `program`
    pub fn query(program: impl Into<String>) -> Self {
        let program = program.into();
        Self {
            label: program.clone(),
            program,
            args: Vec::new(),
            kind: InvocationKind::Query,
            mode: OutputMode::Capture,
        }
    }

    /// Start a mutating invocation of `program`; output is streamed
    pub fn action(program: impl Into<String>) -> Self {
        Self {
            kind: InvocationKind::Action,
            mode: OutputMode::Stream,
            ..Self::query(program)
        }
    }

    /// Append one argument, kept verbatim
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments, each kept verbatim
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the human-readable label shown while the process runs
    pub fn labelled(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Override the output mode
    pub fn with_mode(mut self, mode: OutputMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn argv(&self) -> &[String] {
        &self.args
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> InvocationKind {
        self.kind
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    pub fn is_action(&self) -> bool {
        self.kind == InvocationKind::Action
    }

    /// Whether any argument equals `value` exactly
    pub fn has_arg(&self, value: &str) -> bool {
        self.args.iter().any(|arg| arg == value)
    }

    /// Whether any argument ends with `suffix` (script paths)
    pub fn has_arg_ending_with(&self, suffix: &str) -> bool {
        self.args.iter().any(|arg| arg.ends_with(suffix))
    }

    /// Render for humans; arguments needing it are double-quoted
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(quote_for_display)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn quote_for_display(part: &str) -> String {
    let plain = !part.is_empty()
        && part
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:\\*=@+,".contains(c));
    if plain {
        part.to_string()
    } else {
        format!("\"{}\"", part.replace('"', "\\\""))
    }
}

/// Result of a finished child process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    /// Exit code 0 with the given stdout
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Non-zero exit with the given stderr
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Best text to show when the process failed: stderr, else the tail of stdout
    pub fn diagnostic(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let lines: Vec<&str> = self
            .stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        if lines.is_empty() {
            return "no output".to_string();
        }
        let start = lines.len().saturating_sub(5);
        lines[start..].join(" | ")
    }
}

/// Executes invocations one at a time
///
/// Implementations return `Ok` for any process that ran, whatever its exit code, and
/// `ToolUnavailable` when the program cannot be found.
pub trait CommandRunner: Send + Sync {
    fn run(&self, invocation: &Invocation) -> impl Future<Output = Result<ProcessOutput>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_are_kept_verbatim() {
        let id = "Vendor App \"beta\"; rm -rf / && echo $HOME";
        let inv = Invocation::action("winget").args(["upgrade", "--id"]).arg(id);
        assert_eq!(inv.argv().len(), 3);
        assert_eq!(inv.argv()[2], id);
        assert!(inv.is_action());
        assert_eq!(inv.mode(), OutputMode::Stream);
    }

    #[test]
    fn test_display_quotes_only_when_needed() {
        let inv = Invocation::query("pnputil").arg("/enum-drivers").arg("two words");
        assert_eq!(inv.display(), "pnputil /enum-drivers \"two words\"");
    }

    #[test]
    fn test_query_defaults() {
        let inv = Invocation::query("winget").labelled("Checking apps");
        assert_eq!(inv.kind(), InvocationKind::Query);
        assert_eq!(inv.mode(), OutputMode::Capture);
        assert_eq!(inv.label(), "Checking apps");
    }

    #[test]
    fn test_diagnostic_prefers_stderr() {
        let out = ProcessOutput {
            code: Some(1),
            stdout: "progress\nmore".to_string(),
            stderr: "access denied\n".to_string(),
        };
        assert_eq!(out.diagnostic(), "access denied");
    }

    #[test]
    fn test_diagnostic_falls_back_to_stdout_tail() {
        let out = ProcessOutput {
            code: Some(1),
            stdout: "a\n\nb\nc\nd\ne\nf\n".to_string(),
            stderr: String::new(),
        };
        assert_eq!(out.diagnostic(), "b | c | d | e | f");
        assert_eq!(ProcessOutput::failed(1, "").diagnostic(), "no output");
    }
}
