// file: src/tools/hotfix.rs
// version: 1.0.0
// guid: b237605a-2e0b-496c-a47d-1ef891d93f60

//! Installed KB updates (Get-HotFix) and their removal with wusa

use super::powershell::{parse_json_rows, Script, ScriptHost};
use super::windows_update::normalize_kb;
use super::Parsed;
use crate::error::{CoreUpdateError, Result};
use crate::model::{CandidateRecord, RecordKind};
use crate::runner::Invocation;
use serde::Deserialize;
use std::collections::HashSet;
use tracing::debug;

const TOOL: &str = "Get-HotFix";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct Hotfix {
    pub hot_fix_id: String,
    pub description: String,
    #[serde(default)]
    pub installed_on: Option<String>,
}

pub fn list_query(host: &ScriptHost) -> Invocation {
    host.query(Script::ListHotfixes)
        .labelled("Listing installed updates")
}

/// Uninstall one KB with wusa, without restarting
pub fn uninstall_action(wusa: &str, kb: &str) -> Result<Invocation> {
    let kb = normalize_kb(kb).ok_or_else(|| {
        CoreUpdateError::validation(format!("'{}' is not a KB article number", kb))
    })?;
    let digits = kb.trim_start_matches("KB");
    Ok(Invocation::action(wusa)
        .arg("/uninstall")
        .arg(format!("/kb:{}", digits))
        .args(["/quiet", "/norestart"])
        .labelled(format!("Removing {}", kb)))
}

/// Parse `List-Hotfixes.ps1` output
///
/// Entries whose id is not a KB article cannot be removed with wusa; they are reported
/// in `skipped`. Repeated KBs collapse to the first entry.
pub fn parse(raw: &str) -> Result<Parsed> {
    let hotfixes: Vec<Hotfix> = parse_json_rows(TOOL, raw)?;
    let mut seen = HashSet::new();
    let mut parsed = Parsed::default();

    for hotfix in hotfixes {
        let Some(kb) = normalize_kb(&hotfix.hot_fix_id) else {
            debug!("Hotfix without a KB number: {}", hotfix.hot_fix_id);
            parsed.skipped.push(format!(
                "{} ({}): not a KB article, wusa cannot remove it",
                hotfix.hot_fix_id, hotfix.description
            ));
            continue;
        };
        if !seen.insert(kb.clone()) {
            debug!("Hotfix {} listed more than once", kb);
            continue;
        }

        let mut record = CandidateRecord::new(RecordKind::Kb, kb, hotfix.description);
        if let Some(date) = hotfix.installed_on {
            record = record.with_detail(format!("installed {}", date));
        }
        parsed.records.push(record);
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hotfixes() {
        let raw = r#"[
            {"HotFixId":"KB5034441","Description":"Security Update","InstalledOn":"2024-02-14"},
            {"HotFixId":"KB5011048","Description":"Update","InstalledOn":null},
            {"HotFixId":"File 1","Description":"Update","InstalledOn":null},
            {"HotFixId":"KB5034441","Description":"Security Update","InstalledOn":"2024-02-14"}
        ]"#;
        let parsed = parse(raw).unwrap();
        let records = parsed.records;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id(), "KB5034441");
        assert_eq!(records[0].detail(), Some("installed 2024-02-14"));
        assert_eq!(records[1].detail(), None);
        assert_eq!(parsed.skipped.len(), 1);
        assert!(parsed.skipped[0].starts_with("File 1"));
    }

    #[test]
    fn test_short_kb_numbers_are_listed_and_removable() {
        let raw = r#"[
            {"HotFixId":"KB5001","Description":"Update","InstalledOn":null},
            {"HotFixId":"KB5034441","Description":"Security Update","InstalledOn":null}
        ]"#;
        let parsed = parse(raw).unwrap();
        let ids: Vec<&str> = parsed.records.iter().map(|r| r.id()).collect();
        assert_eq!(ids, ["KB5001", "KB5034441"]);
        assert!(parsed.skipped.is_empty());

        let inv = uninstall_action("wusa", "KB5001").unwrap();
        assert_eq!(inv.argv(), &["/uninstall", "/kb:5001", "/quiet", "/norestart"]);
    }

    #[test]
    fn test_single_object_output() {
        let raw = r#"{"HotFixId":"KB5034441","Description":"Security Update","InstalledOn":"2024-02-14"}"#;
        assert_eq!(parse(raw).unwrap().records.len(), 1);
    }

    #[test]
    fn test_missing_field_is_parse_error() {
        let raw = r#"[{"HotFixId":"KB5034441"}]"#;
        assert!(matches!(parse(raw), Err(CoreUpdateError::Parse { .. })));
    }

    #[test]
    fn test_wusa_arguments() {
        let inv = uninstall_action("wusa", "KB5034441").unwrap();
        assert_eq!(inv.argv(), &["/uninstall", "/kb:5034441", "/quiet", "/norestart"]);
        assert!(uninstall_action("wusa", "KB5034441 /forcerestart").is_err());
    }
}
