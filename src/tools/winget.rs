// file: src/tools/winget.rs
// version: 1.0.0
// guid: 72adedbe-1148-4ed8-be63-dde7f201bfba

//! winget invocations and table parsing
//!
//! winget has no machine-readable output for `upgrade` and `list`, so the fixed-width
//! table is parsed. Column boundaries come from the header line, which must be followed
//! by a dashed separator. Anything that does not fit that shape is a parse error.

use super::text::clean_terminal_output;
use super::Parsed;
use crate::error::{CoreUpdateError, Result};
use crate::model::{CandidateRecord, RecordKind};
use crate::runner::Invocation;
use regex::Regex;
use std::collections::HashSet;
use tracing::{debug, warn};

const TOOL: &str = "winget";

/// `APPINSTALLER_CLI_ERROR_NO_APPLICATIONS_FOUND`
pub const NO_APPLICATIONS_FOUND: i32 = 0x8A15_0014_u32 as i32;
/// `APPINSTALLER_CLI_ERROR_UPDATE_NOT_APPLICABLE`
pub const UPDATE_NOT_APPLICABLE: i32 = 0x8A15_002B_u32 as i32;
/// `APPINSTALLER_CLI_ERROR_INSTALL_REBOOT_REQUIRED_TO_FINISH`
pub const REBOOT_REQUIRED_TO_FINISH: i32 = 0x8A15_0109_u32 as i32;

const EMPTY_MESSAGES: [&str; 3] = [
    "no installed package found",
    "no applicable upgrade found",
    "no available upgrade found",
];

/// Query for packages with a pending upgrade
pub fn upgrades_query(exe: &str) -> Invocation {
    Invocation::query(exe)
        .args([
            "upgrade",
            "--include-unknown",
            "--accept-source-agreements",
            "--disable-interactivity",
        ])
        .labelled("Checking for app upgrades")
}

/// Query for installed packages
pub fn installed_query(exe: &str) -> Invocation {
    Invocation::query(exe)
        .args(["list", "--accept-source-agreements", "--disable-interactivity"])
        .labelled("Listing installed apps")
}

/// Upgrade one package by exact id
pub fn upgrade_action(exe: &str, id: &str) -> Result<Invocation> {
    check_id(id)?;
    Ok(Invocation::action(exe)
        .args(["upgrade", "--id"])
        .arg(id)
        .args([
            "--exact",
            "--silent",
            "--disable-interactivity",
            "--accept-package-agreements",
            "--accept-source-agreements",
        ])
        .labelled(format!("Upgrading {}", id)))
}

/// Uninstall one package by exact id
pub fn uninstall_action(exe: &str, id: &str) -> Result<Invocation> {
    check_id(id)?;
    Ok(Invocation::action(exe)
        .args(["uninstall", "--id"])
        .arg(id)
        .args(["--exact", "--silent", "--disable-interactivity", "--accept-source-agreements"])
        .labelled(format!("Uninstalling {}", id)))
}

/// `winget --version`
pub fn version_query(exe: &str) -> Invocation {
    Invocation::query(exe).arg("--version").labelled("winget version")
}

/// Exit codes meaning "nothing to list" rather than failure
pub fn is_empty_result(code: Option<i32>) -> bool {
    matches!(code, Some(NO_APPLICATIONS_FOUND) | Some(UPDATE_NOT_APPLICABLE))
}

fn check_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(CoreUpdateError::validation("winget package id is empty"));
    }
    // a leading dash would be read as an option
    if id.starts_with('-') {
        return Err(CoreUpdateError::validation(format!(
            "winget package id '{}' starts with '-'",
            id
        )));
    }
    Ok(())
}

/// One parsed table row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WingetRow {
    pub name: String,
    pub id: String,
    pub version: String,
    pub available: Option<String>,
    pub source: Option<String>,
}

impl WingetRow {
    pub fn into_record(self) -> CandidateRecord {
        let mut record = CandidateRecord::new(RecordKind::App, self.id, self.name)
            .with_version(self.version);
        if let Some(available) = self.available {
            record = record.with_available(available);
        }
        if let Some(source) = self.source {
            record = record.with_detail(source);
        }
        record
    }
}

/// Table rows that can be acted on, and descriptions of the rows that cannot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WingetTable {
    pub rows: Vec<WingetRow>,
    pub skipped: Vec<String>,
}

#[derive(Debug)]
struct Columns {
    id: usize,
    version: usize,
    available: Option<usize>,
    source: Option<usize>,
}

/// Parse a `winget upgrade` or `winget list` table into records
pub fn parse_table(raw: &str) -> Result<Parsed> {
    let table = parse_rows(raw)?;
    Ok(Parsed {
        records: table.rows.into_iter().map(WingetRow::into_record).collect(),
        skipped: table.skipped,
    })
}

/// Parse table rows
///
/// winget shortens long ids with `…`, and `winget list` can show one id once per install
/// scope. Such rows cannot be targeted with `--id --exact`; they are reported in
/// `skipped` instead of failing the whole table.
pub fn parse_rows(raw: &str) -> Result<WingetTable> {
    let cleaned = clean_terminal_output(raw);
    let lines: Vec<&str> = cleaned.lines().collect();

    let Some(header_at) = lines.iter().position(|line| is_header(line)) else {
        let lowered = cleaned.to_lowercase();
        if EMPTY_MESSAGES.iter().any(|msg| lowered.contains(msg)) {
            debug!("winget reported no packages");
            return Ok(WingetTable::default());
        }
        return Err(CoreUpdateError::parse(TOOL, "no table header found", raw));
    };

    let columns = columns(lines[header_at])
        .ok_or_else(|| CoreUpdateError::parse(TOOL, "header is missing a column", raw))?;

    let separator = lines.get(header_at + 1).map(|line| line.trim()).unwrap_or("");
    if separator.is_empty() || !separator.chars().all(|c| c == '-') {
        return Err(CoreUpdateError::parse(
            TOOL,
            "table header is not followed by a separator line",
            raw,
        ));
    }

    let footer = Regex::new(r"^\d+ (upgrades?|packages?) (available|have)")
        .map_err(|e| CoreUpdateError::parse(TOOL, e.to_string(), raw))?;

    let mut table = WingetTable::default();
    let mut seen = HashSet::new();
    for line in &lines[header_at + 2..] {
        if line.trim().is_empty() || footer.is_match(line.trim()) {
            break;
        }
        let row = parse_row(line, &columns).map_err(|reason| {
            CoreUpdateError::parse(TOOL, format!("{}: '{}'", reason, line.trim()), raw)
        })?;

        if row.id.ends_with('…') {
            warn!("winget truncated the id of {}: {}", row.name, row.id);
            table.skipped.push(format!(
                "{} ({}): id shortened by winget, cannot be targeted exactly",
                row.name, row.id
            ));
            continue;
        }
        if !seen.insert(row.id.to_lowercase()) {
            warn!("winget listed {} more than once", row.id);
            table.skipped.push(format!(
                "{} ({}): listed again, only the first entry is selectable",
                row.name, row.id
            ));
            continue;
        }
        table.rows.push(row);
    }

    debug!(
        "Parsed {} winget rows, {} skipped",
        table.rows.len(),
        table.skipped.len()
    );
    Ok(table)
}

fn is_header(line: &str) -> bool {
    let mut tokens = line.split_whitespace();
    tokens.next() == Some("Name") && tokens.next() == Some("Id") && tokens.next() == Some("Version")
}

fn columns(header: &str) -> Option<Columns> {
    let chars: Vec<char> = header.chars().collect();
    let find = |word: &str| -> Option<usize> {
        let needle: Vec<char> = word.chars().collect();
        (0..chars.len()).find(|&i| {
            chars[i..].starts_with(&needle)
                && (i == 0 || chars[i - 1] == ' ')
                && chars.get(i + needle.len()).map_or(true, |c| *c == ' ')
        })
    };

    let columns = Columns {
        id: find("Id")?,
        version: find("Version")?,
        available: find("Available"),
        source: find("Source"),
    };
    (columns.id < columns.version).then_some(columns)
}

fn parse_row(line: &str, columns: &Columns) -> std::result::Result<WingetRow, &'static str> {
    let chars: Vec<char> = line.chars().collect();
    if chars.len() <= columns.version {
        return Err("row ends before the Version column");
    }

    let slice = |start: usize, end: Option<usize>| -> String {
        let end = end.unwrap_or(chars.len()).min(chars.len());
        if start >= end {
            return String::new();
        }
        chars[start..end].iter().collect::<String>().trim().to_string()
    };

    let version_end = columns.available.or(columns.source);
    let available_end = columns.source;

    let name = slice(0, Some(columns.id));
    let id = slice(columns.id, Some(columns.version));
    let version = slice(columns.version, version_end);
    let available = columns.available.map(|start| slice(start, available_end));
    let source = columns.source.map(|start| slice(start, None));

    if id.is_empty() {
        return Err("empty package id");
    }
    if id.chars().any(char::is_whitespace) {
        return Err("package id contains whitespace; columns are misaligned");
    }
    Ok(WingetRow {
        name,
        id,
        version,
        available: available.filter(|v| !v.is_empty()),
        source: source.filter(|v| !v.is_empty()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const UPGRADES: &str = "\
Name                     Id                       Version       Available     Source
-----------------------------------------------------------------------------------
Git                      Git.Git                  2.40.0        2.44.0        winget
Microsoft Edge           Microsoft.Edge           122.0.2365.66 123.0.2420.53 winget
PowerToys (Preview) x64  Microsoft.PowerToys      0.78.0        0.79.0        winget
3 upgrades available.
";

    #[test]
    fn test_parse_upgrade_table() {
        let parsed = parse_table(UPGRADES).unwrap();
        assert!(parsed.skipped.is_empty());
        let records = parsed.records;
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].id(), "Git.Git");
        assert_eq!(records[0].available(), Some("2.44.0"));
        assert_eq!(records[1].name(), "Microsoft Edge");
        assert_eq!(records[1].version(), Some("122.0.2365.66"));
        assert_eq!(records[2].name(), "PowerToys (Preview) x64");
        assert_eq!(records[2].detail(), Some("winget"));
    }

    #[test]
    fn test_parse_with_spinner_prefix() {
        let raw = format!("   - \r   \\ \r{}", UPGRADES.replace('\n', "\r\n"));
        assert_eq!(parse_table(&raw).unwrap().records.len(), 3);
    }

    #[test]
    fn test_list_table_without_available_column() {
        let raw = "\
Name         Id              Version   Source
----------------------------------------------
7-Zip 23.01  7zip.7zip       23.01     winget
Contoso App  Contoso.App     1.0
";
        let rows = parse_rows(raw).unwrap().rows;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].source.as_deref(), Some("winget"));
        assert_eq!(rows[1].source, None);
        assert_eq!(rows[1].version, "1.0");
    }

    #[test]
    fn test_stops_at_second_table() {
        let raw = "\
Name  Id        Version  Available  Source
-------------------------------------------
Git   Git.Git   2.40.0   2.44.0     winget

The following packages have an upgrade available, but require explicit targeting for upgrade:
Name  Id        Version  Available  Source
-------------------------------------------
Pin   Pin.Pin   1.0      2.0        winget
";
        assert_eq!(parse_table(raw).unwrap().records.len(), 1);
    }

    #[test]
    fn test_no_upgrades_message_is_empty_listing() {
        let raw = "No installed package found matching input criteria.\n";
        assert_eq!(parse_table(raw).unwrap(), Parsed::default());
    }

    #[test]
    fn test_missing_header_is_parse_error() {
        let err = parse_table("Failed in attempting to update the source: winget\n").unwrap_err();
        assert!(matches!(err, CoreUpdateError::Parse { .. }));
    }

    #[test]
    fn test_missing_separator_is_parse_error() {
        let raw = "Name  Id  Version\nGit   Git.Git 2.40\n";
        assert!(matches!(parse_table(raw), Err(CoreUpdateError::Parse { .. })));
    }

    #[test]
    fn test_truncated_row_is_parse_error() {
        let raw = "\
Name   Id        Version  Available
------------------------------------
Git    Git.Git   2.40.0   2.44.0
Edge   Micro
";
        assert!(matches!(parse_table(raw), Err(CoreUpdateError::Parse { .. })));
    }

    #[test]
    fn test_truncated_id_is_reported_not_selectable() {
        let raw = "\
Name          Id                Version  Source
------------------------------------------------
Git           Git.Git           2.40.0   winget
Contoso Suite Contoso.Suite.D…  1.2.3
7-Zip         7zip.7zip         23.01    winget
";
        let parsed = parse_table(raw).unwrap();
        let ids: Vec<&str> = parsed.records.iter().map(|r| r.id()).collect();
        assert_eq!(ids, ["Git.Git", "7zip.7zip"]);
        assert_eq!(parsed.skipped.len(), 1);
        assert!(parsed.skipped[0].contains("Contoso Suite (Contoso.Suite.D…)"));
    }

    #[test]
    fn test_repeated_id_keeps_first_row() {
        let raw = "\
Name   Id        Version
-------------------------
Git    Git.Git   2.40.0
Git    Git.Git   2.39.1
";
        let parsed = parse_table(raw).unwrap();
        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].version(), Some("2.40.0"));
        assert!(parsed.skipped[0].contains("listed again"));
    }

    #[test]
    fn test_action_arguments() {
        let id = "Vendor.App \"beta\" & calc";
        let inv = upgrade_action("winget", id).unwrap();
        assert_eq!(&inv.argv()[..3], &["upgrade", "--id", id]);
        assert!(inv.has_arg("--exact"));
        assert!(inv.is_action());

        let inv = uninstall_action("winget", "Git.Git").unwrap();
        assert_eq!(inv.argv()[0], "uninstall");
        assert_eq!(inv.argv()[2], "Git.Git");
    }

    #[test]
    fn test_option_like_id_rejected() {
        assert!(upgrade_action("winget", "--all").is_err());
        assert!(uninstall_action("winget", " ").is_err());
    }

    #[test]
    fn test_empty_result_codes() {
        assert_eq!(NO_APPLICATIONS_FOUND, -1978335212);
        assert_eq!(UPDATE_NOT_APPLICABLE, -1978335189);
        assert!(is_empty_result(Some(NO_APPLICATIONS_FOUND)));
        assert!(!is_empty_result(Some(1)));
        assert!(!is_empty_result(None));
    }
}
