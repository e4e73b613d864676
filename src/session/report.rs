// file: src/session/report.rs
// version: 1.0.0
// guid: 61b7bf5a-a623-4cb5-a98c-d7043fb3f26b

//! Per-item outcomes of one action batch

use crate::model::{Action, Category};
use serde::Serialize;

/// What happened to one selected record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemStatus {
    Succeeded { restart_required: bool },
    DryRun { command: String },
    Failed { exit_code: Option<i32>, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemOutcome {
    pub identifier: String,
    pub name: String,
    #[serde(flatten)]
    pub status: ItemStatus,
}

impl ItemOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self.status, ItemStatus::Failed { .. })
    }
}

/// Result of applying one action to a user-selected set of records
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub category: Category,
    pub action: Action,
    pub items: Vec<ItemOutcome>,
    /// The user declined the confirmation prompt
    pub cancelled: bool,
}

impl BatchReport {
    pub fn new(category: Category) -> Self {
        Self {
            category,
            action: category.action(),
            items: Vec::new(),
            cancelled: false,
        }
    }

    pub fn cancelled(category: Category) -> Self {
        Self {
            cancelled: true,
            ..Self::new(category)
        }
    }

    pub fn push(&mut self, identifier: &str, name: &str, status: ItemStatus) {
        self.items.push(ItemOutcome {
            identifier: identifier.to_string(),
            name: name.to_string(),
            status,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.items
            .iter()
            .filter(|item| matches!(item.status, ItemStatus::Succeeded { .. }))
            .count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ItemOutcome> {
        self.items.iter().filter(|item| item.is_failure())
    }

    pub fn failed(&self) -> usize {
        self.failures().count()
    }

    pub fn restart_required(&self) -> bool {
        self.items.iter().any(|item| {
            matches!(
                item.status,
                ItemStatus::Succeeded {
                    restart_required: true
                }
            )
        })
    }

    /// 0 when every attempted action succeeded, 1 when any failed
    pub fn exit_code(&self) -> u8 {
        if self.failed() > 0 {
            1
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_and_exit_code() {
        let mut report = BatchReport::new(Category::Rollback);
        report.push("KB5001", "a", ItemStatus::Succeeded { restart_required: true });
        report.push(
            "KB5002",
            "b",
            ItemStatus::Failed {
                exit_code: Some(2359303),
                message: "not installed".to_string(),
            },
        );

        assert_eq!(report.action, Action::Rollback);
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 1);
        assert!(report.restart_required());
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn test_empty_and_cancelled_reports_succeed() {
        assert_eq!(BatchReport::new(Category::Apps).exit_code(), 0);
        let cancelled = BatchReport::cancelled(Category::Apps);
        assert!(cancelled.cancelled);
        assert_eq!(cancelled.exit_code(), 0);
    }

    #[test]
    fn test_serializes_flat_status() {
        let mut report = BatchReport::new(Category::Updates);
        report.push("KB5001", "a", ItemStatus::DryRun { command: "powershell -File x".into() });
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["category"], "updates");
        assert_eq!(json["action"], "install");
        assert_eq!(json["items"][0]["status"], "dry_run");
        assert_eq!(json["items"][0]["identifier"], "KB5001");
    }
}
