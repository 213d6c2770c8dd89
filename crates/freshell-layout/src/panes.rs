//! Per-tab pane store.
//!
//! Every operation takes a tab id and is a silent no-op when the tab has no
//! layout or the pane id isn't in it: UI events routinely race state updates.

use std::collections::HashMap;

use freshell_core::content::PaneContent;
use freshell_core::types::{ContainerSize, SplitDirection};
use serde::{Deserialize, Serialize};

use crate::node::{normalize_sizes, PaneNode};

/// Result of [`PanesState::close_pane`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClosePaneOutcome {
    /// Pane removed. `active` is the tab's active pane afterwards.
    Closed { active: String },
    /// The pane is the tab's only pane. The tree is untouched and the caller
    /// must close the tab instead.
    TabCloseRequired,
    /// Unknown tab or pane.
    Ignored,
}

/// Pane trees and their side tables, keyed by tab id.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanesState {
    #[serde(default)]
    pub layouts: HashMap<String, PaneNode>,
    #[serde(default)]
    pub active_pane: HashMap<String, String>,
    /// tab id → pane id → title
    #[serde(default)]
    pub pane_titles: HashMap<String, HashMap<String, String>>,
    #[serde(default)]
    pub pane_title_set_by_user: HashMap<String, HashMap<String, bool>>,
    /// Zoom is presentation only and not persisted.
    #[serde(skip)]
    pub zoomed: HashMap<String, String>,
}

/// Orientation for a new split. The first split of a tab is always side by
/// side; deeper splits follow the container's aspect ratio.
fn split_direction(leaves_before: usize, container: Option<ContainerSize>) -> SplitDirection {
    if leaves_before <= 1 {
        return SplitDirection::Horizontal;
    }
    container
        .map(|c| SplitDirection::for_container(c.width, c.height))
        .unwrap_or_default()
}

impl PanesState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layout(&self, tab_id: &str) -> Option<&PaneNode> {
        self.layouts.get(tab_id)
    }

    pub fn has_layout(&self, tab_id: &str) -> bool {
        self.layouts.contains_key(tab_id)
    }

    /// Create a single-leaf layout for `tab_id` unless one already exists.
    /// Returns true if a layout was created.
    pub fn init_layout(&mut self, tab_id: &str, content: PaneContent) -> bool {
        if self.layouts.contains_key(tab_id) {
            return false;
        }
        let leaf = PaneNode::leaf(content);
        self.active_pane
            .insert(tab_id.to_string(), leaf.id().to_string());
        self.layouts.insert(tab_id.to_string(), leaf);
        true
    }

    /// Split `target_pane_id`, placing a new leaf with `content` second.
    /// The new pane becomes active. Returns its id.
    pub fn split_leaf(
        &mut self,
        tab_id: &str,
        target_pane_id: &str,
        content: PaneContent,
        container: Option<ContainerSize>,
    ) -> Option<String> {
        let layout = self.layouts.get_mut(tab_id)?;
        if layout.find_pane_content(target_pane_id).is_none() {
            log::debug!("split_leaf: pane {} not in tab {}", target_pane_id, tab_id);
            return None;
        }
        let direction = split_direction(layout.count_leaves(), container);
        let new_leaf = PaneNode::leaf(content);
        let new_id = new_leaf.id().to_string();
        if !layout.split_leaf(target_pane_id, direction, new_leaf) {
            return None;
        }
        self.active_pane.insert(tab_id.to_string(), new_id.clone());
        Some(new_id)
    }

    /// Split the last leaf in traversal order, so the new pane is last.
    pub fn append_pane(&mut self, tab_id: &str, content: PaneContent) -> Option<String> {
        let last = self.layouts.get(tab_id)?.last_leaf_id().to_string();
        self.split_leaf(tab_id, &last, content, None)
    }

    pub fn close_pane(&mut self, tab_id: &str, pane_id: &str) -> ClosePaneOutcome {
        let Some(layout) = self.layouts.get_mut(tab_id) else {
            return ClosePaneOutcome::Ignored;
        };
        if layout.find_pane_content(pane_id).is_none() {
            return ClosePaneOutcome::Ignored;
        }
        if layout.is_leaf() {
            return ClosePaneOutcome::TabCloseRequired;
        }
        let Some(promoted_first) = layout.remove_leaf(pane_id) else {
            return ClosePaneOutcome::Ignored;
        };
        let fallback = layout.first_leaf_id().to_string();

        let was_active = self
            .active_pane
            .get(tab_id)
            .is_none_or(|active| active == pane_id);
        let active = if was_active {
            self.active_pane
                .insert(tab_id.to_string(), promoted_first.clone());
            promoted_first
        } else {
            self.active_pane
                .get(tab_id)
                .cloned()
                .unwrap_or(fallback)
        };

        if self.zoomed.get(tab_id).is_some_and(|z| z == pane_id) {
            self.zoomed.remove(tab_id);
        }
        self.forget_pane_title(tab_id, pane_id);

        ClosePaneOutcome::Closed { active }
    }

    /// Reset a leaf to `picker` in place and drop its title.
    pub fn replace_pane(&mut self, tab_id: &str, pane_id: &str) -> bool {
        let Some(content) = self
            .layouts
            .get_mut(tab_id)
            .and_then(|l| l.find_pane_content_mut(pane_id))
        else {
            return false;
        };
        *content = PaneContent::Picker;
        self.forget_pane_title(tab_id, pane_id);
        true
    }

    pub fn update_pane_content(&mut self, tab_id: &str, pane_id: &str, content: PaneContent) -> bool {
        match self
            .layouts
            .get_mut(tab_id)
            .and_then(|l| l.find_pane_content_mut(pane_id))
        {
            Some(slot) => {
                *slot = content;
                true
            }
            None => false,
        }
    }

    pub fn rename_pane(&mut self, tab_id: &str, pane_id: &str, title: &str, set_by_user: bool) -> bool {
        if self
            .layouts
            .get(tab_id)
            .and_then(|l| l.find_pane_content(pane_id))
            .is_none()
        {
            return false;
        }
        self.pane_titles
            .entry(tab_id.to_string())
            .or_default()
            .insert(pane_id.to_string(), title.to_string());
        self.pane_title_set_by_user
            .entry(tab_id.to_string())
            .or_default()
            .insert(pane_id.to_string(), set_by_user);
        true
    }

    pub fn pane_title(&self, tab_id: &str, pane_id: &str) -> Option<&str> {
        self.pane_titles
            .get(tab_id)
            .and_then(|titles| titles.get(pane_id))
            .map(String::as_str)
    }

    pub fn is_pane_title_set_by_user(&self, tab_id: &str, pane_id: &str) -> bool {
        self.pane_title_set_by_user
            .get(tab_id)
            .and_then(|flags| flags.get(pane_id))
            .copied()
            .unwrap_or(false)
    }

    fn forget_pane_title(&mut self, tab_id: &str, pane_id: &str) {
        if let Some(titles) = self.pane_titles.get_mut(tab_id) {
            titles.remove(pane_id);
        }
        if let Some(flags) = self.pane_title_set_by_user.get_mut(tab_id) {
            flags.remove(pane_id);
        }
    }

    /// Resize a split. Sizes are clamped and rescaled to sum to 100.
    pub fn resize_split(&mut self, tab_id: &str, split_id: &str, sizes: [f32; 2]) -> bool {
        let Some(sizes) = normalize_sizes(sizes) else {
            log::warn!("Ignoring invalid split sizes {:?}", sizes);
            return false;
        };
        self.layouts
            .get_mut(tab_id)
            .is_some_and(|l| l.set_split_sizes(split_id, sizes))
    }

    pub fn set_active_pane(&mut self, tab_id: &str, pane_id: &str) -> bool {
        let exists = self
            .layouts
            .get(tab_id)
            .is_some_and(|l| l.find_pane_content(pane_id).is_some());
        if exists {
            self.active_pane
                .insert(tab_id.to_string(), pane_id.to_string());
        }
        exists
    }

    /// Active pane, falling back to the first leaf.
    pub fn active_pane(&self, tab_id: &str) -> Option<&str> {
        let layout = self.layouts.get(tab_id)?;
        match self.active_pane.get(tab_id) {
            Some(id) if layout.find_pane_content(id).is_some() => Some(id),
            _ => Some(layout.first_leaf_id()),
        }
    }

    /// Zoom `pane_id`, or unzoom if it is already zoomed.
    /// Returns whether the pane is zoomed afterwards.
    pub fn toggle_zoom(&mut self, tab_id: &str, pane_id: &str) -> bool {
        if self.zoomed.get(tab_id).is_some_and(|z| z == pane_id) {
            self.zoomed.remove(tab_id);
            return false;
        }
        let exists = self
            .layouts
            .get(tab_id)
            .is_some_and(|l| l.find_pane_content(pane_id).is_some());
        if exists {
            self.zoomed.insert(tab_id.to_string(), pane_id.to_string());
        }
        exists
    }

    pub fn zoomed_pane(&self, tab_id: &str) -> Option<&str> {
        self.zoomed.get(tab_id).map(String::as_str)
    }

    /// Drop a tab's layout together with every side table entry.
    pub fn remove_layout(&mut self, tab_id: &str) -> Option<PaneNode> {
        self.active_pane.remove(tab_id);
        self.pane_titles.remove(tab_id);
        self.pane_title_set_by_user.remove(tab_id);
        self.zoomed.remove(tab_id);
        self.layouts.remove(tab_id)
    }

    /// Drop layouts (and side tables) for tabs not in `tab_ids`.
    pub fn retain_tabs(&mut self, tab_ids: &[&str]) {
        let orphaned: Vec<String> = self
            .layouts
            .keys()
            .filter(|id| !tab_ids.contains(&id.as_str()))
            .cloned()
            .collect();
        for tab_id in orphaned {
            log::info!("Dropping orphaned layout for tab {}", tab_id);
            self.remove_layout(&tab_id);
        }
        self.active_pane.retain(|id, _| tab_ids.contains(&id.as_str()));
        self.pane_titles.retain(|id, _| tab_ids.contains(&id.as_str()));
        self.pane_title_set_by_user
            .retain(|id, _| tab_ids.contains(&id.as_str()));
    }
}
