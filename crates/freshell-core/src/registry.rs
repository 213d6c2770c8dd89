use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

// ── Registry record types ───────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryTabStatus {
    Open,
    Closed,
}

/// Wire-safe view of one pane.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryPaneSnapshot {
    pub pane_id: String,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Pane content with device-local runtime handles removed.
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Wire/storage projection of a tab and its pane tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryTabRecord {
    pub tab_key: String,
    pub tab_id: String,
    pub device_id: String,
    #[serde(default)]
    pub device_label: String,
    #[serde(default)]
    pub server_instance_id: String,
    pub tab_name: String,
    pub status: RegistryTabStatus,
    #[serde(default)]
    pub revision: u64,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<i64>,
    #[serde(default)]
    pub pane_count: usize,
    #[serde(default)]
    pub title_set_by_user: bool,
    #[serde(default)]
    pub panes: Vec<RegistryPaneSnapshot>,
}

impl RegistryTabRecord {
    pub fn is_open(&self) -> bool {
        self.status == RegistryTabStatus::Open
    }

    /// Timestamp used to order closed records (newest first).
    pub fn closed_sort_key(&self) -> i64 {
        self.closed_at.unwrap_or(self.updated_at)
    }

    /// Freshness comparison for two records with the same tab key:
    /// higher revision wins, then later `updated_at`.
    pub fn freshness_cmp(&self, other: &RegistryTabRecord) -> Ordering {
        self.revision
            .cmp(&other.revision)
            .then(self.updated_at.cmp(&other.updated_at))
    }
}

/// The three disjoint registry groups shown to the user.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryGroups {
    #[serde(default)]
    pub local_open: Vec<RegistryTabRecord>,
    #[serde(default)]
    pub remote_open: Vec<RegistryTabRecord>,
    #[serde(default)]
    pub closed: Vec<RegistryTabRecord>,
}

impl RegistryGroups {
    pub fn is_empty(&self) -> bool {
        self.local_open.is_empty() && self.remote_open.is_empty() && self.closed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.local_open.len() + self.remote_open.len() + self.closed.len()
    }

    /// All records across the three groups.
    pub fn iter(&self) -> impl Iterator<Item = &RegistryTabRecord> {
        self.local_open
            .iter()
            .chain(self.remote_open.iter())
            .chain(self.closed.iter())
    }

    pub fn find(&self, tab_key: &str) -> Option<&RegistryTabRecord> {
        self.iter().find(|r| r.tab_key == tab_key)
    }
}
