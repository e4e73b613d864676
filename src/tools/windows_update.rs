// file: src/tools/windows_update.rs
// version: 1.0.0
// guid: 0c1246f6-1404-40b0-99c2-008830c724ea

//! Pending Windows updates via PSWindowsUpdate

use super::powershell::{parse_json_rows, Script, ScriptHost};
use crate::error::{CoreUpdateError, Result};
use crate::model::{CandidateRecord, RecordKind};
use crate::runner::Invocation;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;

const TOOL: &str = "PSWindowsUpdate";

/// One entry of `List-Updates.ps1` output
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct UpdateEntry {
    pub title: String,
    #[serde(rename = "KB", default)]
    pub kb: Option<String>,
    pub update_id: String,
    #[serde(default)]
    pub size_bytes: Option<u64>,
    #[serde(default)]
    pub categories: Vec<String>,
}

/// Query for pending software updates, or driver updates when `drivers` is set
pub fn list_query(host: &ScriptHost, drivers: bool) -> Invocation {
    let invocation = host.query(Script::ListUpdates);
    if drivers {
        invocation.arg("-Drivers").labelled("Searching for driver updates")
    } else {
        invocation.labelled("Searching for Windows updates")
    }
}

/// Install one update; `id` is a KB article or an update GUID
pub fn install_action(host: &ScriptHost, id: &str) -> Result<Invocation> {
    let invocation = host.action(Script::InstallUpdate);
    let invocation = if let Some(kb) = normalize_kb(id) {
        invocation.arg("-KBArticleID").arg(kb)
    } else if is_guid(id) {
        invocation.arg("-UpdateID").arg(id)
    } else {
        return Err(CoreUpdateError::validation(format!(
            "'{}' is neither a KB article nor an update id",
            id
        )));
    };
    Ok(invocation.labelled(format!("Installing {}", id)))
}

/// Parse `List-Updates.ps1` output into records of `kind`
///
/// A record is keyed by its KB article when that KB is unique in the listing, and by
/// its update GUID otherwise. Driver updates usually carry no KB.
pub fn parse(raw: &str, kind: RecordKind) -> Result<Vec<CandidateRecord>> {
    let entries: Vec<UpdateEntry> = parse_json_rows(TOOL, raw)?;

    let mut kb_counts: HashMap<String, usize> = HashMap::new();
    for entry in &entries {
        if !is_guid(&entry.update_id) {
            return Err(CoreUpdateError::parse(
                TOOL,
                format!("'{}' has an invalid update id '{}'", entry.title, entry.update_id),
                raw,
            ));
        }
        if let Some(kb) = entry.kb.as_deref().filter(|kb| !kb.trim().is_empty()) {
            let kb = normalize_kb(kb).ok_or_else(|| {
                CoreUpdateError::parse(TOOL, format!("'{}' is not a KB article", kb), raw)
            })?;
            *kb_counts.entry(kb).or_default() += 1;
        }
    }

    Ok(entries
        .into_iter()
        .map(|entry| {
            let kb = entry.kb.as_deref().and_then(normalize_kb);
            let id = match kb {
                Some(kb) if kb_counts.get(&kb) == Some(&1) => kb,
                _ => entry.update_id.clone(),
            };
            let mut record = CandidateRecord::new(kind, id, entry.title.trim());
            let mut detail = Vec::new();
            if let Some(size) = entry.size_bytes {
                detail.push(format_size(size));
            }
            if !entry.categories.is_empty() {
                detail.push(entry.categories.join(", "));
            }
            if !detail.is_empty() {
                record = record.with_detail(detail.join(" · "));
            }
            record
        })
        .collect())
}

/// Longest KB article number accepted
const MAX_KB_DIGITS: usize = 8;

/// `kb5001`, `KB5001` and `5001` style values to `KB5001`
pub fn normalize_kb(value: &str) -> Option<String> {
    let value = value.trim();
    let digits = match value.get(..2) {
        Some(prefix) if prefix.eq_ignore_ascii_case("kb") => &value[2..],
        _ => value,
    };
    let valid = (1..=MAX_KB_DIGITS).contains(&digits.len())
        && digits.chars().all(|c| c.is_ascii_digit());
    valid.then(|| format!("KB{}", digits))
}

pub fn is_guid(value: &str) -> bool {
    Regex::new(r"^[0-9A-Fa-f]{8}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{12}$")
        .map(|re| re.is_match(value))
        .unwrap_or(false)
}

fn format_size(bytes: u64) -> String {
    const MB: f64 = 1024.0 * 1024.0;
    let mb = bytes as f64 / MB;
    if mb >= 1024.0 {
        format!("{:.1} GB", mb / 1024.0)
    } else if mb >= 1.0 {
        format!("{:.1} MB", mb)
    } else {
        format!("{} KB", bytes / 1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"[
        {"Title":"2024-03 Cumulative Update for Windows 11 (KB5035853)","KB":"KB5035853","UpdateId":"0a3b7e2c-1f4d-4c8e-9b6a-2d5e8f1a3c7b","SizeBytes":734003200,"Categories":["Security Updates"]},
        {"Title":"Security Intelligence Update for Microsoft Defender (KB2267602)","KB":"KB2267602","UpdateId":"5b1f2c3d-4e5f-4a6b-8c7d-9e0f1a2b3c4d","SizeBytes":null,"Categories":["Definition Updates"]},
        {"Title":"Intel - System - 10.1.19.2","KB":"","UpdateId":"c8d9e0f1-a2b3-4c4d-9e5f-6a7b8c9d0e1f","SizeBytes":512000,"Categories":["Drivers"]}
    ]"#;

    #[test]
    fn test_parse_fixture() {
        let records = parse(FIXTURE, RecordKind::Update).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].id(), "KB5035853");
        assert_eq!(records[1].id(), "KB2267602");
        assert_eq!(records[2].id(), "c8d9e0f1-a2b3-4c4d-9e5f-6a7b8c9d0e1f");
        assert_eq!(records[0].detail(), Some("700.0 MB · Security Updates"));
        assert_eq!(records[2].detail(), Some("500 KB · Drivers"));
    }

    #[test]
    fn test_short_kb_numbers_are_kept() {
        let raw = r#"[
            {"Title":"First","KB":"KB5001","UpdateId":"11111111-1111-1111-1111-111111111111"},
            {"Title":"Second","KB":"KB5002","UpdateId":"22222222-2222-2222-2222-222222222222"}
        ]"#;
        let records = parse(raw, RecordKind::Update).unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.id()).collect();
        assert_eq!(ids, ["KB5001", "KB5002"]);
    }

    #[test]
    fn test_duplicate_kb_falls_back_to_update_id() {
        let raw = r#"[
            {"Title":"A","KB":"KB5001000","UpdateId":"11111111-1111-1111-1111-111111111111"},
            {"Title":"B","KB":"KB5001000","UpdateId":"22222222-2222-2222-2222-222222222222"}
        ]"#;
        let records = parse(raw, RecordKind::Update).unwrap();
        assert_eq!(records[0].id(), "11111111-1111-1111-1111-111111111111");
        assert_eq!(records[1].id(), "22222222-2222-2222-2222-222222222222");
    }

    #[test]
    fn test_schema_drift_is_parse_error() {
        let renamed = r#"[{"Title":"A","KBArticle":"KB5001000","UpdateId":"11111111-1111-1111-1111-111111111111"}]"#;
        assert!(matches!(
            parse(renamed, RecordKind::Update),
            Err(CoreUpdateError::Parse { .. })
        ));

        let bad_id = r#"[{"Title":"A","KB":"KB5001000","UpdateId":"not-a-guid"}]"#;
        assert!(parse(bad_id, RecordKind::Update).is_err());

        let truncated = &FIXTURE[..FIXTURE.len() / 2];
        assert!(parse(truncated, RecordKind::Update).is_err());
    }

    #[test]
    fn test_normalize_kb() {
        assert_eq!(normalize_kb("kb5001234").as_deref(), Some("KB5001234"));
        assert_eq!(normalize_kb("5001234").as_deref(), Some("KB5001234"));
        assert_eq!(normalize_kb("KB5001").as_deref(), Some("KB5001"));
        assert_eq!(normalize_kb("kb12").as_deref(), Some("KB12"));
        assert_eq!(normalize_kb("KB"), None);
        assert_eq!(normalize_kb("KB123456789"), None);
        assert_eq!(normalize_kb("KB50x1234"), None);
    }

    #[test]
    fn test_install_action_arguments() {
        let dir = tempfile::TempDir::new().unwrap();
        let host = ScriptHost::in_dir("powershell", dir.path()).unwrap();

        let by_kb = install_action(&host, "KB5035853").unwrap();
        let argv = by_kb.argv();
        assert_eq!(&argv[argv.len() - 2..], &["-KBArticleID", "KB5035853"]);

        let guid = "c8d9e0f1-a2b3-4c4d-9e5f-6a7b8c9d0e1f";
        let by_guid = install_action(&host, guid).unwrap();
        assert!(by_guid.has_arg("-UpdateID"));
        assert!(by_guid.has_arg(guid));

        assert!(install_action(&host, "KB1; Restart-Computer").is_err());
    }

    #[test]
    fn test_driver_query_flag() {
        let dir = tempfile::TempDir::new().unwrap();
        let host = ScriptHost::in_dir("powershell", dir.path()).unwrap();
        assert!(list_query(&host, true).has_arg("-Drivers"));
        assert!(!list_query(&host, false).has_arg("-Drivers"));
    }
}
