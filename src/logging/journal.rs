// file: src/logging/journal.rs
// version: 1.0.0
// guid: 2b158594-cfe4-4886-b992-b94f0968f674

//! Invocation journal
//!
//! Every external process call is appended to `journal.jsonl` as one JSON object per
//! line. The file is rotated to `journal.jsonl.1` once it grows past the size limit.

use crate::error::Result;
use crate::runner::{Invocation, InvocationKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error};
use uuid::Uuid;

/// File name of the journal inside the data directory
pub const JOURNAL_FILE: &str = "journal.jsonl";

const DEFAULT_MAX_BYTES: u64 = 5 * 1024 * 1024;

/// One journal line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub timestamp: DateTime<Utc>,
    pub session: Uuid,
    pub kind: String,
    pub program: String,
    pub arguments: Vec<String>,
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
}

/// Append-only record of invocations made by one session
#[derive(Debug, Clone)]
pub struct Journal {
    path: PathBuf,
    session: Uuid,
    max_bytes: u64,
}

impl Journal {
    /// Open (or create) the journal in `dir`
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            path: dir.join(JOURNAL_FILE),
            session: Uuid::new_v4(),
            max_bytes: DEFAULT_MAX_BYTES,
        })
    }

    /// Rotate once the file exceeds `max_bytes`
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn session(&self) -> Uuid {
        self.session
    }

    /// Append one invocation; failures are logged, never propagated
    pub fn record_invocation(&self, invocation: &Invocation, exit_code: Option<i32>, elapsed: Duration) {
        let entry = JournalEntry {
            timestamp: Utc::now(),
            session: self.session,
            kind: match invocation.kind() {
                InvocationKind::Query => "query".to_string(),
                InvocationKind::Action => "action".to_string(),
            },
            program: invocation.program().to_string(),
            arguments: invocation.argv().to_vec(),
            exit_code,
            duration_ms: elapsed.as_millis().min(u128::from(u64::MAX)) as u64,
        };

        if let Err(e) = self.append(&entry) {
            error!("Failed to write journal entry to {}: {}", self.path.display(), e);
        }
    }

    fn append(&self, entry: &JournalEntry) -> Result<()> {
        self.rotate_if_needed()?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let line = serde_json::to_string(entry)?;
        writeln!(file, "{}", line)?;
        file.flush()?;
        Ok(())
    }

    fn rotate_if_needed(&self) -> Result<()> {
        let size = match fs::metadata(&self.path) {
            Ok(meta) => meta.len(),
            Err(_) => return Ok(()),
        };
        if size < self.max_bytes {
            return Ok(());
        }

        let rotated = rotated_path(&self.path);
        debug!("Rotating journal ({} bytes) to {}", size, rotated.display());
        if rotated.exists() {
            fs::remove_file(&rotated)?;
        }
        fs::rename(&self.path, rotated)?;
        Ok(())
    }
}

fn rotated_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".1");
    PathBuf::from(name)
}

/// Read the last `count` entries of the journal at `path`
///
/// Lines that do not parse are skipped. A missing file yields an empty list.
pub fn tail(path: &Path, count: usize) -> Result<Vec<JournalEntry>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let entries: Vec<JournalEntry> = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str(line) {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!("Skipping unreadable journal line: {}", e);
                None
            }
        })
        .collect();

    let start = entries.len().saturating_sub(count);
    Ok(entries[start..].to_vec())
}
