use freshell_core::tab::Tab;
use serde::{Deserialize, Serialize};

/// Ordered tab list plus the active tab.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabsState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_tab_id: Option<String>,
    #[serde(default)]
    pub tabs: Vec<Tab>,
}

impl TabsState {
    pub fn tab(&self, id: &str) -> Option<&Tab> {
        self.tabs.iter().find(|t| t.id == id)
    }

    pub(crate) fn tab_mut(&mut self, id: &str) -> Option<&mut Tab> {
        self.tabs.iter_mut().find(|t| t.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tab(id).is_some()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.tabs.iter().map(|t| t.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    /// Append a tab and make it active. Duplicate ids are rejected.
    pub(crate) fn push(&mut self, tab: Tab) -> bool {
        if self.contains(&tab.id) {
            log::warn!("Tab {} already exists", tab.id);
            return false;
        }
        self.active_tab_id = Some(tab.id.clone());
        self.tabs.push(tab);
        true
    }

    /// Remove a tab. If it was active, the tab that took its place (or the
    /// new last tab) becomes active.
    pub(crate) fn remove(&mut self, id: &str) -> Option<Tab> {
        let index = self.tabs.iter().position(|t| t.id == id)?;
        let tab = self.tabs.remove(index);
        if self.active_tab_id.as_deref() == Some(id) {
            self.active_tab_id = self
                .tabs
                .get(index)
                .or_else(|| self.tabs.last())
                .map(|t| t.id.clone());
        }
        Some(tab)
    }

    pub(crate) fn set_active(&mut self, id: &str) -> bool {
        if !self.contains(id) {
            return false;
        }
        self.active_tab_id = Some(id.to_string());
        true
    }

    /// Drop duplicate ids (first wins) and repoint a dangling active id.
    pub(crate) fn validate(&mut self) {
        let mut seen = std::collections::HashSet::new();
        self.tabs.retain(|t| {
            let fresh = seen.insert(t.id.clone());
            if !fresh {
                log::warn!("Dropping duplicate tab {}", t.id);
            }
            fresh
        });
        let active_valid = self
            .active_tab_id
            .as_deref()
            .is_some_and(|id| self.contains(id));
        if !active_valid {
            self.active_tab_id = self.tabs.first().map(|t| t.id.clone());
        }
    }
}
