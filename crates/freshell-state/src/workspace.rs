use std::collections::HashMap;

use freshell_core::content::PaneContent;
use freshell_core::tab::{Tab, TabStatus};
use freshell_core::time::now_ms;
use freshell_core::types::ContainerSize;
use freshell_layout::{ClosePaneOutcome, PaneNode, PanesState};

use crate::tabs::TabsState;

/// A tab removed from the workspace, with the layout it had when closed.
#[derive(Clone, Debug, PartialEq)]
pub struct ClosedTab {
    pub tab: Tab,
    pub layout: Option<PaneNode>,
    /// pane id → title at close time
    pub pane_titles: HashMap<String, String>,
    pub closed_at: i64,
}

/// Tabs and their pane trees.
///
/// Every mutation that changes persisted state bumps `data_version`;
/// observers (auto-save, registry sync) compare it to skip no-op work.
#[derive(Debug, Default)]
pub struct Workspace {
    tabs: TabsState,
    panes: PanesState,
    data_version: u64,
    /// Tabs closed since the last `take_closed_tabs`.
    closed: Vec<ClosedTab>,
}

impl Workspace {
    /// Build a workspace from loaded state. Every tab gets a layout and
    /// layouts without a tab are dropped.
    pub fn new(tabs: TabsState, panes: PanesState) -> Self {
        let mut workspace = Self {
            tabs,
            panes,
            data_version: 0,
            closed: Vec::new(),
        };
        workspace.validate();
        workspace
    }

    fn validate(&mut self) {
        self.tabs.validate();
        let ids: Vec<String> = self.tabs.tabs.iter().map(|t| t.id.clone()).collect();
        let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        self.panes.retain_tabs(&id_refs);
        for id in &ids {
            self.ensure_layout(id);
        }
    }

    /// Current data version (incremented on persistent data mutations)
    pub fn data_version(&self) -> u64 {
        self.data_version
    }

    fn notify_data(&mut self) {
        self.data_version += 1;
    }

    pub fn tabs(&self) -> &TabsState {
        &self.tabs
    }

    pub fn panes(&self) -> &PanesState {
        &self.panes
    }

    pub fn tab(&self, tab_id: &str) -> Option<&Tab> {
        self.tabs.tab(tab_id)
    }

    pub fn layout(&self, tab_id: &str) -> Option<&PaneNode> {
        self.panes.layout(tab_id)
    }

    pub fn active_tab_id(&self) -> Option<&str> {
        self.tabs.active_tab_id.as_deref()
    }

    /// Replace all state wholesale (e.g. from disk reload).
    /// Does NOT bump data_version: the data came from disk, not a user edit.
    /// Tabs already queued as closed stay queued.
    pub fn replace_data(&mut self, tabs: TabsState, panes: PanesState) {
        self.tabs = tabs;
        self.panes = panes;
        self.validate();
    }

    /// Create the tab's layout from its default content if it has none.
    pub fn ensure_layout(&mut self, tab_id: &str) -> bool {
        let Some(content) = self.tabs.tab(tab_id).map(Tab::default_content) else {
            return false;
        };
        self.panes.init_layout(tab_id, content)
    }

    /// Add a tab whose first pane is built from the tab's own settings.
    pub fn open_tab(&mut self, tab: Tab) -> bool {
        let content = tab.default_content();
        self.add_tab(tab, content)
    }

    /// Add a tab whose first pane hosts `content`, and activate it.
    pub fn add_tab(&mut self, tab: Tab, content: PaneContent) -> bool {
        let tab_id = tab.id.clone();
        if !self.tabs.push(tab) {
            return false;
        }
        // A stale layout under a reused id would otherwise survive init
        self.panes.remove_layout(&tab_id);
        self.panes.init_layout(&tab_id, content);
        log::info!("Opened tab {}", tab_id);
        self.notify_data();
        true
    }

    /// New tab with a generated id and the given first pane. Returns the id.
    pub fn new_tab(&mut self, title: &str, content: PaneContent) -> String {
        let tab = Tab::new(uuid::Uuid::new_v4().to_string(), title, now_ms());
        let tab_id = tab.id.clone();
        self.add_tab(tab, content);
        tab_id
    }

    /// Remove a tab and its layout atomically. The tab is queued for
    /// [`take_closed_tabs`](Self::take_closed_tabs).
    pub fn close_tab(&mut self, tab_id: &str) -> bool {
        let Some(tab) = self.tabs.remove(tab_id) else {
            return false;
        };
        let pane_titles = self
            .panes
            .pane_titles
            .get(tab_id)
            .cloned()
            .unwrap_or_default();
        let layout = self.panes.remove_layout(tab_id);
        log::info!("Closed tab {}", tab_id);
        self.closed.push(ClosedTab {
            tab,
            layout,
            pane_titles,
            closed_at: now_ms(),
        });
        self.notify_data();
        true
    }

    /// Drain tabs closed since the last call, oldest first.
    pub fn take_closed_tabs(&mut self) -> Vec<ClosedTab> {
        std::mem::take(&mut self.closed)
    }

    pub fn activate_tab(&mut self, tab_id: &str) -> bool {
        if self.tabs.active_tab_id.as_deref() == Some(tab_id) {
            return self.tabs.contains(tab_id);
        }
        let changed = self.tabs.set_active(tab_id);
        if changed {
            self.notify_data();
        }
        changed
    }

    pub fn rename_tab(&mut self, tab_id: &str, title: &str, set_by_user: bool) -> bool {
        self.with_tab(tab_id, |tab| {
            if tab.title == title && tab.title_set_by_user == set_by_user {
                return false;
            }
            tab.title = title.to_string();
            tab.title_set_by_user = set_by_user;
            true
        })
    }

    pub fn set_tab_status(&mut self, tab_id: &str, status: TabStatus) -> bool {
        self.with_tab(tab_id, |tab| {
            if tab.status == status {
                return false;
            }
            tab.status = status;
            true
        })
    }

    /// Helper to mutate a tab, with automatic data version bump.
    /// Returns true if the mutation was applied.
    pub fn with_tab<F>(&mut self, tab_id: &str, f: F) -> bool
    where
        F: FnOnce(&mut Tab) -> bool,
    {
        if let Some(tab) = self.tabs.tab_mut(tab_id) {
            if f(tab) {
                self.notify_data();
                return true;
            }
        }
        false
    }

    /// Helper to mutate the pane store, with automatic data version bump.
    fn with_panes<F, R>(&mut self, f: F) -> R
    where
        F: FnOnce(&mut PanesState) -> R,
        R: Applied,
    {
        let result = f(&mut self.panes);
        if result.applied() {
            self.notify_data();
        }
        result
    }

    pub fn split_pane(
        &mut self,
        tab_id: &str,
        pane_id: &str,
        content: PaneContent,
        container: Option<ContainerSize>,
    ) -> Option<String> {
        self.with_panes(|panes| panes.split_leaf(tab_id, pane_id, content, container))
    }

    pub fn append_pane(&mut self, tab_id: &str, content: PaneContent) -> Option<String> {
        self.with_panes(|panes| panes.append_pane(tab_id, content))
    }

    /// Close a pane. Closing a tab's only pane closes the tab.
    pub fn close_pane(&mut self, tab_id: &str, pane_id: &str) -> ClosePaneOutcome {
        let outcome = self.with_panes(|panes| panes.close_pane(tab_id, pane_id));
        if outcome == ClosePaneOutcome::TabCloseRequired {
            self.close_tab(tab_id);
        }
        outcome
    }

    pub fn replace_pane(&mut self, tab_id: &str, pane_id: &str) -> bool {
        self.with_panes(|panes| panes.replace_pane(tab_id, pane_id))
    }

    pub fn update_pane_content(&mut self, tab_id: &str, pane_id: &str, content: PaneContent) -> bool {
        self.with_panes(|panes| panes.update_pane_content(tab_id, pane_id, content))
    }

    pub fn rename_pane(&mut self, tab_id: &str, pane_id: &str, title: &str, set_by_user: bool) -> bool {
        self.with_panes(|panes| panes.rename_pane(tab_id, pane_id, title, set_by_user))
    }

    pub fn resize_split(&mut self, tab_id: &str, split_id: &str, sizes: [f32; 2]) -> bool {
        self.with_panes(|panes| panes.resize_split(tab_id, split_id, sizes))
    }

    pub fn set_active_pane(&mut self, tab_id: &str, pane_id: &str) -> bool {
        self.with_panes(|panes| panes.set_active_pane(tab_id, pane_id))
    }

    /// Zoom is presentation only; it doesn't bump the data version.
    pub fn toggle_zoom(&mut self, tab_id: &str, pane_id: &str) -> bool {
        self.panes.toggle_zoom(tab_id, pane_id)
    }
}

/// Whether a pane store operation changed anything.
trait Applied {
    fn applied(&self) -> bool;
}

impl Applied for bool {
    fn applied(&self) -> bool {
        *self
    }
}

impl Applied for Option<String> {
    fn applied(&self) -> bool {
        self.is_some()
    }
}

impl Applied for ClosePaneOutcome {
    fn applied(&self) -> bool {
        matches!(self, ClosePaneOutcome::Closed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use freshell_core::content::{ShellType, TerminalMode};

    fn tab(id: &str) -> Tab {
        Tab::new(id, id, 1_000)
    }

    #[test]
    fn new_creates_missing_layouts_and_drops_orphans() {
        let tabs = TabsState {
            active_tab_id: None,
            tabs: vec![tab("a")],
        };
        let mut panes = PanesState::default();
        panes.init_layout("ghost", PaneContent::Picker);

        let ws = Workspace::new(tabs, panes);
        assert!(ws.layout("a").is_some());
        assert!(ws.layout("ghost").is_none());
        assert_eq!(ws.active_tab_id(), Some("a"));
        assert_eq!(ws.data_version(), 0);
    }

    #[test]
    fn open_tab_builds_layout_from_tab() {
        let mut ws = Workspace::default();
        let mut t = tab("a");
        t.mode = TerminalMode::Claude;
        assert!(ws.open_tab(t));
        assert!(!ws.open_tab(tab("a")));

        let contents = ws.layout("a").unwrap().collect_pane_contents();
        assert_eq!(contents.len(), 1);
        assert_eq!(contents[0].kind(), "terminal");
        assert_eq!(ws.data_version(), 1);
    }

    #[test]
    fn ensure_layout_is_idempotent() {
        let mut ws = Workspace::default();
        ws.open_tab(tab("a"));
        let before = ws.layout("a").cloned();
        assert!(!ws.ensure_layout("a"));
        assert_eq!(ws.layout("a").cloned(), before);
        assert!(!ws.ensure_layout("missing"));
    }

    #[test]
    fn close_tab_queues_closed_tab_with_layout() {
        let mut ws = Workspace::default();
        ws.open_tab(tab("a"));
        let first = ws.layout("a").unwrap().first_leaf_id().to_string();
        ws.split_pane("a", &first, PaneContent::browser("http://x"), None);
        ws.rename_pane("a", &first, "main", true);

        assert!(ws.close_tab("a"));
        assert!(ws.tab("a").is_none());
        assert!(ws.layout("a").is_none());

        let closed = ws.take_closed_tabs();
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].tab.id, "a");
        assert_eq!(closed[0].layout.as_ref().unwrap().count_leaves(), 2);
        assert_eq!(closed[0].pane_titles.get(&first).map(String::as_str), Some("main"));
        assert!(ws.take_closed_tabs().is_empty());
    }

    #[test]
    fn closing_last_pane_closes_tab() {
        let mut ws = Workspace::default();
        ws.open_tab(tab("a"));
        let only = ws.layout("a").unwrap().first_leaf_id().to_string();

        assert_eq!(ws.close_pane("a", &only), ClosePaneOutcome::TabCloseRequired);
        assert!(ws.tab("a").is_none());
        assert_eq!(ws.take_closed_tabs().len(), 1);
    }

    #[test]
    fn noop_mutations_do_not_bump_version() {
        let mut ws = Workspace::default();
        ws.open_tab(tab("a"));
        let version = ws.data_version();

        assert!(!ws.rename_tab("a", "a", false));
        assert!(!ws.set_tab_status("missing", TabStatus::Running));
        assert!(ws.split_pane("a", "missing", PaneContent::Picker, None).is_none());
        assert!(!ws.activate_tab("missing"));
        let only = ws.layout("a").unwrap().first_leaf_id().to_string();
        ws.toggle_zoom("a", &only);
        assert_eq!(ws.data_version(), version);

        assert!(ws.set_tab_status("a", TabStatus::Running));
        assert_eq!(ws.data_version(), version + 1);
    }

    #[test]
    fn new_tab_uses_given_content() {
        let mut ws = Workspace::default();
        let id = ws.new_tab("Docs", PaneContent::browser("http://docs"));
        assert_eq!(ws.active_tab_id(), Some(id.as_str()));
        let layout = ws.layout(&id).unwrap();
        assert_eq!(layout.collect_pane_contents(), vec![&PaneContent::browser("http://docs")]);
        let t = ws.tab(&id).unwrap();
        assert_eq!(t.title, "Docs");
        assert_eq!(t.shell, ShellType::System);
    }
}
