// file: src/lib.rs
// version: 1.0.0
// guid: d748114f-fc2f-4b50-aec1-794b0f50d9d5

//! # Core Update CLI
//!
//! An interactive front-end for Windows maintenance tools. It lists what `winget`,
//! PSWindowsUpdate, `pnputil` and `Get-HotFix` report, lets the user pick items, and
//! applies one action per picked item through the same tools.
//!
//! Every external call is an argument vector run as a child process, one at a time.
//! Tool output is parsed against a fixed schema and rejected when it does not match.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod present;
pub mod privilege;
pub mod runner;
pub mod session;
pub mod tools;

pub use error::{CoreUpdateError, Result};

/// Version information for the utility
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
