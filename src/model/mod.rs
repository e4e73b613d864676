// file: src/model/mod.rs
// version: 1.0.0
// guid: aa15e0d9-fcab-4757-a6e4-622a7ef1c7fd

//! Candidate records, listing categories and actions
//!
//! A [`CandidateRecord`] is an immutable snapshot of one item reported by an external
//! tool. A [`Listing`] holds the records of one query for the duration of a session.

use crate::error::{CoreUpdateError, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Kind of item a record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    App,
    Update,
    Driver,
    Kb,
}

impl RecordKind {
    /// Get the kind as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::App => "app",
            RecordKind::Update => "update",
            RecordKind::Driver => "driver",
            RecordKind::Kb => "kb",
        }
    }
}

/// Mutating operation applied to a single record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Upgrade,
    Uninstall,
    Install,
    Rollback,
}

impl Action {
    /// Imperative verb, e.g. "upgrade"
    pub fn verb(&self) -> &'static str {
        match self {
            Action::Upgrade => "upgrade",
            Action::Uninstall => "uninstall",
            Action::Install => "install",
            Action::Rollback => "roll back",
        }
    }

    /// Past tense used in reports, e.g. "upgraded"
    pub fn past_tense(&self) -> &'static str {
        match self {
            Action::Upgrade => "upgraded",
            Action::Uninstall => "uninstalled",
            Action::Install => "installed",
            Action::Rollback => "rolled back",
        }
    }

    /// Progressive form used as a spinner label, e.g. "Upgrading"
    pub fn progressive(&self) -> &'static str {
        match self {
            Action::Upgrade => "Upgrading",
            Action::Uninstall => "Uninstalling",
            Action::Install => "Installing",
            Action::Rollback => "Rolling back",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

/// A listing category: one read-only query paired with the action it feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    /// Applications with a pending upgrade (winget)
    Apps,
    /// Installed applications (winget)
    InstalledApps,
    /// Pending Windows updates (PSWindowsUpdate)
    Updates,
    /// Pending driver updates (PSWindowsUpdate, Drivers category)
    DriverUpdates,
    /// Installed third-party driver packages (pnputil)
    DriverPackages,
    /// Installed KB updates that can be uninstalled (wusa)
    Rollback,
}

impl Category {
    /// Every category, in menu order
    pub const ALL: [Category; 6] = [
        Category::Apps,
        Category::InstalledApps,
        Category::Updates,
        Category::DriverUpdates,
        Category::DriverPackages,
        Category::Rollback,
    ];

    /// Kind of records this category produces
    pub fn kind(&self) -> RecordKind {
        match self {
            Category::Apps | Category::InstalledApps => RecordKind::App,
            Category::Updates => RecordKind::Update,
            Category::DriverUpdates | Category::DriverPackages => RecordKind::Driver,
            Category::Rollback => RecordKind::Kb,
        }
    }

    /// The action applied to records selected from this category
    pub fn action(&self) -> Action {
        match self {
            Category::Apps => Action::Upgrade,
            Category::InstalledApps => Action::Uninstall,
            Category::Updates | Category::DriverUpdates => Action::Install,
            Category::DriverPackages | Category::Rollback => Action::Rollback,
        }
    }

    /// Whether `action` can be applied to records of this category
    pub fn supports(&self, action: Action) -> bool {
        self.action() == action
    }

    /// Human-readable title
    pub fn title(&self) -> &'static str {
        match self {
            Category::Apps => "App upgrades",
            Category::InstalledApps => "Installed apps",
            Category::Updates => "Windows updates",
            Category::DriverUpdates => "Driver updates",
            Category::DriverPackages => "Driver packages",
            Category::Rollback => "Installed updates",
        }
    }

    /// Name of the external tool that answers the query
    pub fn tool(&self) -> &'static str {
        match self {
            Category::Apps | Category::InstalledApps => "winget",
            Category::Updates | Category::DriverUpdates => "PSWindowsUpdate",
            Category::DriverPackages => "pnputil",
            Category::Rollback => "Get-HotFix",
        }
    }

    /// Stable command-line name
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Apps => "apps",
            Category::InstalledApps => "installed-apps",
            Category::Updates => "updates",
            Category::DriverUpdates => "driver-updates",
            Category::DriverPackages => "driver-packages",
            Category::Rollback => "rollback",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One actionable item reported by a query
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateRecord {
    kind: RecordKind,
    id: String,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    available: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

impl CandidateRecord {
    /// Create a record with the mandatory fields
    pub fn new(kind: RecordKind, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            name: name.into(),
            version: None,
            available: None,
            detail: None,
        }
    }

    /// Attach the installed or current version
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = non_empty(version.into());
        self
    }

    /// Attach the version an upgrade would move to
    pub fn with_available(mut self, available: impl Into<String>) -> Self {
        self.available = non_empty(available.into());
        self
    }

    /// Attach free-form tool metadata (source, size, provider, date)
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = non_empty(detail.into());
        self
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    /// Tool-specific identifier, passed verbatim as one argument
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn available(&self) -> Option<&str> {
        self.available.as_deref()
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Records returned by one query, kept for one session
#[derive(Debug, Clone, Serialize)]
pub struct Listing {
    category: Category,
    queried_at: DateTime<Local>,
    records: Vec<CandidateRecord>,
    /// Entries the tool reported that cannot be acted on, one line each
    #[serde(skip_serializing_if = "Vec::is_empty")]
    skipped: Vec<String>,
}

impl Listing {
    /// Build a listing, rejecting duplicate identifiers and foreign record kinds
    pub fn new(category: Category, records: Vec<CandidateRecord>) -> Result<Self> {
        let mut seen = HashSet::new();
        for record in &records {
            if record.kind() != category.kind() {
                return Err(CoreUpdateError::validation(format!(
                    "{} record {} listed under {}",
                    record.kind().as_str(),
                    record.id(),
                    category
                )));
            }
            if !seen.insert(record.id().to_ascii_lowercase()) {
                return Err(CoreUpdateError::parse(
                    category.tool(),
                    format!("identifier {} reported more than once", record.id()),
                    record.id(),
                ));
            }
        }

        Ok(Self {
            category,
            queried_at: Local::now(),
            records,
            skipped: Vec::new(),
        })
    }

    /// Attach the entries that were listed by the tool but left out of `records`
    pub fn with_skipped(mut self, skipped: Vec<String>) -> Self {
        self.skipped = skipped;
        self
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn queried_at(&self) -> DateTime<Local> {
        self.queried_at
    }

    pub fn records(&self) -> &[CandidateRecord] {
        &self.records
    }

    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Look up a record by identifier (case-insensitive)
    pub fn get(&self, id: &str) -> Option<&CandidateRecord> {
        self.records
            .iter()
            .find(|record| record.id().eq_ignore_ascii_case(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_action_pairs() {
        assert_eq!(Category::Apps.action(), Action::Upgrade);
        assert_eq!(Category::InstalledApps.action(), Action::Uninstall);
        assert_eq!(Category::Updates.action(), Action::Install);
        assert_eq!(Category::DriverPackages.action(), Action::Rollback);
        assert!(Category::Rollback.supports(Action::Rollback));
        assert!(!Category::Rollback.supports(Action::Install));
    }

    #[test]
    fn test_record_blank_optionals_are_dropped() {
        let record = CandidateRecord::new(RecordKind::App, "Git.Git", "Git")
            .with_version("2.40.0")
            .with_available("  ")
            .with_detail("winget");
        assert_eq!(record.version(), Some("2.40.0"));
        assert_eq!(record.available(), None);
        assert_eq!(record.detail(), Some("winget"));
    }

    #[test]
    fn test_listing_rejects_duplicate_ids() {
        let records = vec![
            CandidateRecord::new(RecordKind::Kb, "KB5001", "a"),
            CandidateRecord::new(RecordKind::Kb, "kb5001", "b"),
        ];
        let err = Listing::new(Category::Rollback, records).unwrap_err();
        assert!(matches!(err, CoreUpdateError::Parse { .. }));
    }

    #[test]
    fn test_listing_rejects_foreign_kind() {
        let records = vec![CandidateRecord::new(RecordKind::App, "Git.Git", "Git")];
        assert!(Listing::new(Category::Updates, records).is_err());
    }

    #[test]
    fn test_listing_lookup() {
        let records = vec![
            CandidateRecord::new(RecordKind::Update, "KB5001", "Cumulative Update"),
            CandidateRecord::new(RecordKind::Update, "KB5002", "Defender"),
        ];
        let listing = Listing::new(Category::Updates, records).unwrap();
        assert_eq!(listing.len(), 2);
        assert_eq!(listing.get("kb5002").map(|r| r.name()), Some("Defender"));
        assert!(listing.get("KB9999").is_none());
    }

    #[test]
    fn test_skipped_entries_serialize_only_when_present() {
        let listing = Listing::new(Category::InstalledApps, Vec::new()).unwrap();
        let json = serde_json::to_value(&listing).unwrap();
        assert!(json.get("skipped").is_none());

        let listing = listing.with_skipped(vec!["Contoso (Contoso.Su…)".to_string()]);
        let json = serde_json::to_value(&listing).unwrap();
        assert_eq!(json["skipped"][0], "Contoso (Contoso.Su…)");
    }

    #[test]
    fn test_category_serializes_kebab_case() {
        let json = serde_json::to_string(&Category::DriverPackages).unwrap();
        assert_eq!(json, "\"driver-packages\"");
    }
}
