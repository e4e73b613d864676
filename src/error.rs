// file: src/error.rs
// version: 1.0.0
// guid: 423232f4-2da7-4ee9-a156-5fcb1a83dbd4

use thiserror::Error;

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, CoreUpdateError>;

/// Longest slice of raw tool output carried inside a parse error
const SNIPPET_LIMIT: usize = 600;

/// Error types for Core Update CLI
#[derive(Error, Debug)]
pub enum CoreUpdateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{tool} is not available: {hint}")]
    ToolUnavailable { tool: String, hint: String },

    #[error("{tool} failed ({}) running `{invocation}`: {stderr}", describe_exit(.code))]
    ToolExecution {
        tool: String,
        invocation: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Unexpected output from {tool}: {reason}\n--- output ---\n{snippet}")]
    Parse {
        tool: String,
        reason: String,
        snippet: String,
    },

    #[error("{identifier}: action failed ({}): {message}", describe_exit(.exit_code))]
    ActionFailed {
        identifier: String,
        exit_code: Option<i32>,
        message: String,
    },

    #[error("Administrator rights required: {0}")]
    NotElevated(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "terminated without exit code".to_string(),
    }
}

impl CoreUpdateError {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new tool-unavailable error
    pub fn tool_unavailable(tool: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::ToolUnavailable {
            tool: tool.into(),
            hint: hint.into(),
        }
    }

    /// Create a new parse error, keeping a bounded snippet of the raw output
    pub fn parse(tool: impl Into<String>, reason: impl Into<String>, raw: &str) -> Self {
        Self::Parse {
            tool: tool.into(),
            reason: reason.into(),
            snippet: snippet(raw),
        }
    }

    /// Create a new validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a new unsupported-operation error
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    /// Create a new not-elevated error
    pub fn not_elevated(msg: impl Into<String>) -> Self {
        Self::NotElevated(msg.into())
    }

    /// Process exit code used when this error ends the program
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::ActionFailed { .. } => 1,
            Self::ToolUnavailable { .. } => 3,
            Self::NotElevated(_) => 4,
            Self::Config(_) => 78,
            _ => 2,
        }
    }
}

/// Trim raw output to something printable in an error message
pub fn snippet(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }
    if trimmed.chars().count() <= SNIPPET_LIMIT {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(SNIPPET_LIMIT).collect();
    format!("{}…", cut)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_failed_names_identifier_and_code() {
        let err = CoreUpdateError::ActionFailed {
            identifier: "KB5001".to_string(),
            exit_code: Some(1),
            message: "installation failed".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("KB5001"));
        assert!(text.contains("exit code 1"));
        assert!(text.contains("installation failed"));
    }

    #[test]
    fn test_tool_execution_without_exit_code() {
        let err = CoreUpdateError::ToolExecution {
            tool: "winget".to_string(),
            invocation: "winget upgrade".to_string(),
            code: None,
            stderr: "killed".to_string(),
        };
        assert!(err.to_string().contains("terminated without exit code"));
    }

    #[test]
    fn test_parse_error_keeps_bounded_snippet() {
        let raw = "x".repeat(SNIPPET_LIMIT * 2);
        match CoreUpdateError::parse("pnputil", "truncated block", &raw) {
            CoreUpdateError::Parse { snippet, .. } => {
                assert_eq!(snippet.chars().count(), SNIPPET_LIMIT + 1);
                assert!(snippet.ends_with('…'));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_empty_output_snippet() {
        assert_eq!(snippet("  \n "), "<empty>");
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(CoreUpdateError::tool_unavailable("winget", "x").exit_code(), 3);
        assert_eq!(CoreUpdateError::not_elevated("x").exit_code(), 4);
        assert_eq!(CoreUpdateError::validation("x").exit_code(), 2);
    }
}
