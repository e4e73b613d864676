// file: src/privilege.rs
// version: 1.0.0
// guid: c7cdf1bc-723e-4358-8a0f-918763f4b843

//! Elevation detection
//!
//! On Windows the token's mandatory integrity level is read from `whoami /groups`.
//! High (S-1-16-12288) and System (S-1-16-16384) mean the process is elevated.

use crate::error::{CoreUpdateError, Result};
use crate::runner::{CommandRunner, Invocation, ProcessOutput};
use serde::Serialize;
use tracing::debug;

const HIGH_INTEGRITY: &str = "S-1-16-12288";
const SYSTEM_INTEGRITY: &str = "S-1-16-16384";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Privilege {
    Elevated,
    Standard,
}

impl Privilege {
    pub fn is_elevated(&self) -> bool {
        *self == Privilege::Elevated
    }
}

/// How a session learns its privilege level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElevationPolicy {
    /// Ask the operating system
    Detect,
    /// Use a fixed answer
    Assume(Privilege),
}

/// `whoami /groups /fo csv /nh`
pub fn whoami_query(whoami: &str) -> Invocation {
    Invocation::query(whoami)
        .args(["/groups", "/fo", "csv", "/nh"])
        .labelled("Checking privileges")
}

/// Whether `whoami /groups` output lists a high or system integrity label
pub fn groups_indicate_elevation(output: &str) -> bool {
    output
        .lines()
        .any(|line| line.contains(HIGH_INTEGRITY) || line.contains(SYSTEM_INTEGRITY))
}

/// Read the privilege level from a finished `whoami /groups` call
///
/// A failed call is an error carrying its exit code and stderr; it never reads as a
/// standard user.
pub fn interpret_whoami(invocation: &Invocation, output: &ProcessOutput) -> Result<Privilege> {
    if !output.success() {
        return Err(CoreUpdateError::ToolExecution {
            tool: "whoami".to_string(),
            invocation: invocation.display(),
            code: output.code,
            stderr: output.diagnostic(),
        });
    }
    Ok(if groups_indicate_elevation(&output.stdout) {
        Privilege::Elevated
    } else {
        Privilege::Standard
    })
}

/// Determine the privilege level of the current process
#[cfg(windows)]
pub async fn detect<R: CommandRunner>(runner: &R, whoami: &str) -> Result<Privilege> {
    let invocation = whoami_query(whoami);
    let output = runner.run(&invocation).await?;
    let privilege = interpret_whoami(&invocation, &output)?;
    debug!("whoami reports {:?}", privilege);
    Ok(privilege)
}

/// Determine the privilege level of the current process
#[cfg(not(windows))]
pub async fn detect<R: CommandRunner>(_runner: &R, _whoami: &str) -> Result<Privilege> {
    // SAFETY: geteuid has no preconditions and cannot fail
    let euid = unsafe { libc::geteuid() };
    debug!("Effective uid {}", euid);
    Ok(if euid == 0 {
        Privilege::Elevated
    } else {
        Privilege::Standard
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_high_integrity_group() {
        let output = "\"Everyone\",\"Well-known group\",\"S-1-1-0\",\"Mandatory group, Enabled by default, Enabled group\"\r\n\
\"Mandatory Label\\High Mandatory Level\",\"Label\",\"S-1-16-12288\",\"\"\r\n";
        assert!(groups_indicate_elevation(output));
    }

    #[test]
    fn test_medium_integrity_group() {
        let output = "\"Mandatory Label\\Medium Mandatory Level\",\"Label\",\"S-1-16-8192\",\"\"\r\n";
        assert!(!groups_indicate_elevation(output));
    }

    #[test]
    fn test_failed_whoami_is_an_error() {
        let inv = whoami_query("whoami");
        let err = interpret_whoami(&inv, &ProcessOutput::failed(1, "ERROR: Access is denied."))
            .unwrap_err();
        assert!(matches!(err, CoreUpdateError::ToolExecution { code: Some(1), .. }));
        assert!(err.to_string().contains("Access is denied."));

        let elevated = ProcessOutput::ok("\"Mandatory Label\\System Mandatory Level\",\"Label\",\"S-1-16-16384\",\"\"");
        assert_eq!(interpret_whoami(&inv, &elevated).unwrap(), Privilege::Elevated);
    }

    #[test]
    fn test_whoami_arguments() {
        let inv = whoami_query("whoami");
        assert_eq!(inv.argv(), &["/groups", "/fo", "csv", "/nh"]);
        assert!(!inv.is_action());
    }
}
