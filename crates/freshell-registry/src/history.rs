//! Bounded local history of closed tabs.

use freshell_core::registry::RegistryTabRecord;
use freshell_core::time::DAY_MS;
use freshell_state::ClosedTab;
use serde::{Deserialize, Serialize};

use crate::retention::{should_keep_closed_tab, ClosedTabFacts};
use crate::snapshot::{build_closed_record, count_pane_leaves, SnapshotContext};

/// Most closed records kept locally.
pub const MAX_CLOSED_RECORDS: usize = 200;
/// Closed records older than this are pruned. Matches the widest query range.
pub const MAX_CLOSED_AGE_DAYS: i64 = 365;

/// Closed records, newest first, one per tab key.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ClosedHistory {
    #[serde(default)]
    records: Vec<RegistryTabRecord>,
}

impl ClosedHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[RegistryTabRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Decide whether a just-closed tab is worth remembering and, if so,
    /// record it. Returns the stored record.
    pub fn record_close(
        &mut self,
        closed: &ClosedTab,
        revision: u64,
        ctx: &SnapshotContext<'_>,
    ) -> Option<&RegistryTabRecord> {
        let facts = ClosedTabFacts {
            open_duration_ms: closed.closed_at.saturating_sub(closed.tab.created_at),
            pane_count: closed.layout.as_ref().map(count_pane_leaves).unwrap_or(1),
            title_set_by_user: closed.tab.title_set_by_user,
        };
        if !should_keep_closed_tab(&facts) {
            log::debug!("Discarding scratch tab {} ({:?})", closed.tab.id, facts);
            return None;
        }
        let record = build_closed_record(
            &closed.tab,
            closed.layout.as_ref(),
            Some(&closed.pane_titles),
            revision,
            ctx,
            closed.closed_at,
        );
        let tab_key = record.tab_key.clone();
        self.insert(record, closed.closed_at);
        self.records.iter().find(|r| r.tab_key == tab_key)
    }

    /// Insert a record, replacing an older one with the same tab key.
    pub fn insert(&mut self, record: RegistryTabRecord, now: i64) {
        match self.records.iter_mut().find(|r| r.tab_key == record.tab_key) {
            Some(existing) => {
                if record.freshness_cmp(existing).is_ge() {
                    *existing = record;
                }
            }
            None => self.records.push(record),
        }
        self.prune(now);
    }

    /// Sort newest first and enforce the age and size ceilings.
    pub fn prune(&mut self, now: i64) {
        let cutoff = now - MAX_CLOSED_AGE_DAYS * DAY_MS;
        let before = self.records.len();
        self.records.retain(|r| r.closed_sort_key() >= cutoff);
        self.records
            .sort_by(|a, b| b.closed_sort_key().cmp(&a.closed_sort_key()));
        self.records.truncate(MAX_CLOSED_RECORDS);
        if self.records.len() != before {
            log::debug!("Pruned closed history from {} to {}", before, self.records.len());
        }
    }

    /// Lift a record's revision to at least `revision`, so it outranks a
    /// copy the server already holds. Returns true if it moved.
    pub fn raise_revision(&mut self, tab_key: &str, revision: u64) -> bool {
        match self.records.iter_mut().find(|r| r.tab_key == tab_key) {
            Some(record) if record.revision < revision => {
                record.revision = revision;
                true
            }
            _ => false,
        }
    }

    pub fn remove(&mut self, tab_key: &str) -> Option<RegistryTabRecord> {
        let index = self.records.iter().position(|r| r.tab_key == tab_key)?;
        Some(self.records.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use freshell_core::content::PaneContent;
    use freshell_core::registry::RegistryTabStatus;
    use freshell_core::tab::Tab;
    use freshell_core::time::MINUTE_MS;
    use freshell_core::types::SplitDirection;
    use freshell_layout::PaneNode;
    use std::collections::HashMap;

    const CTX: SnapshotContext<'static> = SnapshotContext {
        device_id: "laptop",
        device_label: "Laptop",
        server_instance_id: "srv-a",
    };

    fn closed_record(key: &str, closed_at: i64, revision: u64) -> RegistryTabRecord {
        RegistryTabRecord {
            tab_key: key.to_string(),
            tab_id: key.to_string(),
            device_id: "laptop".into(),
            device_label: "Laptop".into(),
            server_instance_id: "srv-a".into(),
            tab_name: key.to_string(),
            status: RegistryTabStatus::Closed,
            revision,
            created_at: 0,
            updated_at: closed_at,
            closed_at: Some(closed_at),
            pane_count: 1,
            title_set_by_user: false,
            panes: Vec::new(),
        }
    }

    #[test]
    fn two_pane_tab_closed_after_ten_minutes_is_retained() {
        let created = 1_000_000;
        let tab = Tab::new("local-tab", "Work", created);
        let layout = PaneNode::split(
            SplitDirection::Horizontal,
            PaneNode::leaf(PaneContent::terminal(Default::default(), Default::default())),
            PaneNode::leaf(PaneContent::browser("http://x")),
        );
        let closed = ClosedTab {
            tab,
            layout: Some(layout),
            pane_titles: HashMap::new(),
            closed_at: created + 10 * MINUTE_MS,
        };

        let mut history = ClosedHistory::new();
        let record = history.record_close(&closed, 0, &CTX).unwrap();
        assert_eq!(record.pane_count, 2);
        assert_eq!(record.status, RegistryTabStatus::Closed);
        assert_eq!(record.closed_at, Some(created + 10 * MINUTE_MS));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn scratch_tab_is_not_recorded() {
        let tab = Tab::new("scratch", "Shell", 0);
        let closed = ClosedTab {
            layout: Some(PaneNode::leaf(tab.default_content())),
            tab,
            pane_titles: HashMap::new(),
            closed_at: MINUTE_MS,
        };
        let mut history = ClosedHistory::new();
        assert!(history.record_close(&closed, 0, &CTX).is_none());
        assert!(history.is_empty());
    }

    #[test]
    fn newest_first_and_deduplicated() {
        let mut history = ClosedHistory::new();
        history.insert(closed_record("d:a", 100, 0), 1_000);
        history.insert(closed_record("d:b", 300, 0), 1_000);
        history.insert(closed_record("d:a", 200, 1), 1_000);

        let keys: Vec<&str> = history.records().iter().map(|r| r.tab_key.as_str()).collect();
        assert_eq!(keys, vec!["d:b", "d:a"]);
        assert_eq!(history.records()[1].revision, 1);

        // Older duplicate doesn't replace
        history.insert(closed_record("d:a", 50, 0), 1_000);
        assert_eq!(history.records()[1].revision, 1);
    }

    #[test]
    fn prunes_by_age_and_count() {
        let now = 400 * DAY_MS;
        let mut history = ClosedHistory::new();
        history.insert(closed_record("d:ancient", now - 366 * DAY_MS, 0), now);
        assert!(history.is_empty());

        for i in 0..(MAX_CLOSED_RECORDS as i64 + 5) {
            history.insert(closed_record(&format!("d:{}", i), now - i, 0), now);
        }
        assert_eq!(history.len(), MAX_CLOSED_RECORDS);
        assert_eq!(history.records()[0].tab_key, "d:0");
    }

    #[test]
    fn remove_by_key() {
        let mut history = ClosedHistory::new();
        history.insert(closed_record("d:a", 100, 0), 100);
        assert!(history.remove("d:a").is_some());
        assert!(history.remove("d:a").is_none());
    }

    #[test]
    fn raise_revision_only_moves_up() {
        let mut history = ClosedHistory::new();
        history.insert(closed_record("d:a", 100, 2), 100);
        assert!(history.raise_revision("d:a", 4));
        assert_eq!(history.records()[0].revision, 4);
        assert!(!history.raise_revision("d:a", 3));
        assert_eq!(history.records()[0].revision, 4);
        assert!(!history.raise_revision("d:missing", 9));
    }
}
