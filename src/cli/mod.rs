// file: src/cli/mod.rs
// version: 1.0.0
// guid: 1fbecfe1-a53f-448d-8096-11e8668b0ff0

//! Command line interface for Core Update CLI

pub mod args;
pub mod commands;

pub use args::Cli;
pub use commands::dispatch;
