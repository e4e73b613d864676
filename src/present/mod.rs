// file: src/present/mod.rs
// version: 1.0.0
// guid: 93ef7101-5c85-4313-bf20-528e89e75ab4

//! Listing display, subset selection and confirmation
//!
//! All user interaction goes through a [`Prompter`], so a session can run against the
//! terminal or against scripted answers.

pub mod scripted;
pub mod terminal;

pub use scripted::ScriptedPrompter;
pub use terminal::TerminalPrompter;

use crate::error::{CoreUpdateError, Result};
use crate::model::{CandidateRecord, Listing};
use std::future::Future;
use thiserror::Error;

/// How many malformed selections are tolerated before giving up
pub const MAX_SELECTION_ATTEMPTS: usize = 3;

const NAME_WIDTH: usize = 40;

/// Line-oriented user interaction
pub trait Prompter: Send {
    /// Print one line
    fn show(&mut self, line: &str);

    /// Ask a question; `None` means input was closed
    fn ask(&mut self, question: &str) -> impl Future<Output = Result<Option<String>>> + Send;
}

/// Why a selection string was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("'{0}' is not a number or range")]
    NotANumber(String),

    #[error("{0} is out of range (1-{1})")]
    OutOfRange(usize, usize),

    #[error("range {0}-{1} runs backwards")]
    Reversed(usize, usize),
}

/// Parse `1,3-5 7` style input into zero-based indices
///
/// Blank input and `none` select nothing. Duplicates are dropped and the order of first
/// appearance is kept.
pub fn parse_selection(input: &str, count: usize) -> std::result::Result<Vec<usize>, SelectionError> {
    let input = input.trim();
    if input.is_empty() || input.eq_ignore_ascii_case("none") || input.eq_ignore_ascii_case("n") {
        return Ok(Vec::new());
    }

    let number = |token: &str| -> std::result::Result<usize, SelectionError> {
        let value: usize = token
            .trim()
            .parse()
            .map_err(|_| SelectionError::NotANumber(token.trim().to_string()))?;
        if value == 0 || value > count {
            return Err(SelectionError::OutOfRange(value, count));
        }
        Ok(value)
    };

    let mut picked = Vec::new();
    for token in input.split(|c: char| c == ',' || c.is_whitespace()) {
        if token.is_empty() {
            continue;
        }
        let (first, last) = match token.split_once('-') {
            Some((a, b)) => (number(a)?, number(b)?),
            None => {
                let n = number(token)?;
                (n, n)
            }
        };
        if first > last {
            return Err(SelectionError::Reversed(first, last));
        }
        for n in first..=last {
            if !picked.contains(&(n - 1)) {
                picked.push(n - 1);
            }
        }
    }
    Ok(picked)
}

/// Render a listing as a numbered table
pub fn render_listing(listing: &Listing) -> Vec<String> {
    let category = listing.category();
    let records = listing.records();
    let mut lines = vec![format!(
        "{} ({}) as of {}",
        category.title(),
        records.len(),
        listing.queried_at().format("%Y-%m-%d %H:%M")
    )];
    if records.is_empty() {
        lines.push("  nothing to show".to_string());
        push_skipped(&mut lines, listing);
        return lines;
    }

    let with_available = records.iter().any(|r| r.available().is_some());
    let with_detail = records.iter().any(|r| r.detail().is_some());

    let mut rows: Vec<Vec<String>> = vec![{
        let mut header = vec!["#".to_string(), "Name".into(), "Id".into(), "Version".into()];
        if with_available {
            header.push("Available".into());
        }
        if with_detail {
            header.push("Details".into());
        }
        header
    }];
    for (index, record) in records.iter().enumerate() {
        let mut row = vec![
            (index + 1).to_string(),
            truncate(record.name(), NAME_WIDTH),
            record.id().to_string(),
            record.version().unwrap_or("-").to_string(),
        ];
        if with_available {
            row.push(record.available().unwrap_or("-").to_string());
        }
        if with_detail {
            row.push(record.detail().unwrap_or("").to_string());
        }
        rows.push(row);
    }

    let columns = rows[0].len();
    let widths: Vec<usize> = (0..columns)
        .map(|col| rows.iter().map(|row| row[col].chars().count()).max().unwrap_or(0))
        .collect();

    for row in rows {
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(col, cell)| {
                if col == 0 {
                    format!("{:>width$}", cell, width = widths[col])
                } else if col + 1 == columns {
                    cell.clone()
                } else {
                    format!("{:<width$}", cell, width = widths[col])
                }
            })
            .collect();
        lines.push(format!("  {}", cells.join("  ").trim_end()));
    }
    push_skipped(&mut lines, listing);
    lines
}

fn push_skipped(lines: &mut Vec<String>, listing: &Listing) {
    let skipped = listing.skipped();
    if skipped.is_empty() {
        return;
    }
    lines.push(format!("  Warning: {} more not selectable:", skipped.len()));
    lines.extend(skipped.iter().map(|entry| format!("    ! {}", entry)));
}

fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    let cut: String = value.chars().take(width - 1).collect();
    format!("{}…", cut)
}

/// Show `listing` and let the user pick records to `verb`
///
/// An empty listing returns immediately without asking. Closed input selects nothing.
pub async fn select_subset<P: Prompter>(
    prompter: &mut P,
    listing: &Listing,
    verb: &str,
) -> Result<Vec<CandidateRecord>> {
    for line in render_listing(listing) {
        prompter.show(&line);
    }
    if listing.is_empty() {
        return Ok(Vec::new());
    }

    let question = format!(
        "Select items to {} (e.g. 1,3-5; blank for none): ",
        verb
    );
    for _ in 0..MAX_SELECTION_ATTEMPTS {
        let Some(answer) = prompter.ask(&question).await? else {
            return Ok(Vec::new());
        };
        match parse_selection(&answer, listing.len()) {
            Ok(indices) => {
                return Ok(indices
                    .into_iter()
                    .map(|i| listing.records()[i].clone())
                    .collect())
            }
            Err(e) => prompter.show(&format!("Invalid selection: {}", e)),
        }
    }

    Err(CoreUpdateError::validation(format!(
        "no valid selection after {} attempts",
        MAX_SELECTION_ATTEMPTS
    )))
}

/// Ask a yes/no question; only an explicit yes counts
pub async fn confirm<P: Prompter>(prompter: &mut P, question: &str) -> Result<bool> {
    let answer = prompter.ask(&format!("{} [y/N]: ", question)).await?;
    Ok(matches!(
        answer.as_deref().map(|a| a.trim().to_ascii_lowercase()).as_deref(),
        Some("y") | Some("yes")
    ))
}
