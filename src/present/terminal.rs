// file: src/present/terminal.rs
// version: 1.0.0
// guid: 73d4b467-f3ef-47ae-b862-47fd82b1c00c

//! Prompter backed by the process's stdin and stdout

use super::Prompter;
use crate::error::Result;
use colored::Colorize;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

/// Reads answers from stdin without blocking the runtime, so Ctrl+C stays responsive
pub struct TerminalPrompter {
    lines: Lines<BufReader<Stdin>>,
}

impl Default for TerminalPrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalPrompter {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
}

impl Prompter for TerminalPrompter {
    fn show(&mut self, line: &str) {
        println!("{}", line);
    }

    async fn ask(&mut self, question: &str) -> Result<Option<String>> {
        print!("{}", question.bold());
        std::io::stdout().flush()?;
        let answer = self.lines.next_line().await?;
        if answer.is_none() {
            // keep the next output off the prompt line
            println!();
        }
        Ok(answer)
    }
}
