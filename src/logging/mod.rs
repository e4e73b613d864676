// file: src/logging/mod.rs
// version: 1.0.0
// guid: a1ee984f-87bb-4db7-a737-1250415d36e4

//! Logging system and invocation journal for Core Update CLI

pub mod journal;
pub mod logger;

pub use journal::Journal;
pub use logger::init_logger;
