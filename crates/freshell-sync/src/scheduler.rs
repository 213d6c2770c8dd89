//! When to push local state and when to pull remote state.
//!
//! The scheduler is synchronous and transport-agnostic: it is driven by
//! the runner (or tests) and writes outbound messages to a [`SyncChannel`].

use std::collections::HashMap;

use freshell_core::channel::SyncChannel;
use freshell_core::id::make_tab_key;
use freshell_core::registry::{RegistryGroups, RegistryTabRecord};
use freshell_core::ws::{ClientMessage, ServerMessage, DEFAULT_RANGE_DAYS};
use freshell_registry::{build_open_record, reconcile, ClosedHistory, ReconcileInput, SnapshotContext};
use freshell_state::Workspace;

use crate::fingerprint::{combine, workspace_fingerprints};

/// Per-tab bookkeeping for outbound records.
#[derive(Clone, Debug)]
struct TabSyncState {
    fingerprint: String,
    revision: u64,
    updated_at: i64,
}

pub struct SyncScheduler {
    device_id: String,
    device_label: String,
    /// Backend instance of the current connection; kept after disconnect so
    /// snapshots and re-opens still know their origin.
    server_instance_id: String,
    connected: bool,

    tabs: HashMap<String, TabSyncState>,
    /// Highest revision the server has reported per own tab key, including
    /// tabs that have since closed here.
    server_seen: HashMap<String, u64>,
    /// Records for the live local tabs as of the last state change.
    local_open: Vec<RegistryTabRecord>,
    /// Workspace fingerprint as of the last state change.
    current_fingerprint: Option<String>,
    /// Workspace fingerprint as of the last push on this connection.
    last_pushed: Option<String>,
    history: ClosedHistory,

    selected_range_days: u32,
    /// Widest range queried on this connection.
    max_requested_range: Option<u32>,
    pending_request_id: Option<String>,
    remote: Option<RegistryGroups>,
    groups: RegistryGroups,
}

impl SyncScheduler {
    pub fn new(device_id: impl Into<String>, device_label: impl Into<String>, history: ClosedHistory) -> Self {
        Self {
            device_id: device_id.into(),
            device_label: device_label.into(),
            server_instance_id: String::new(),
            connected: false,
            tabs: HashMap::new(),
            server_seen: HashMap::new(),
            local_open: Vec::new(),
            current_fingerprint: None,
            last_pushed: None,
            history,
            selected_range_days: DEFAULT_RANGE_DAYS,
            max_requested_range: None,
            pending_request_id: None,
            remote: None,
            groups: RegistryGroups::default(),
        }
    }

    /// Start with a closed-history window other than the default.
    pub fn with_range_days(mut self, days: u32) -> Self {
        self.selected_range_days = days;
        self
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn server_instance_id(&self) -> &str {
        &self.server_instance_id
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn groups(&self) -> &RegistryGroups {
        &self.groups
    }

    pub fn history(&self) -> &ClosedHistory {
        &self.history
    }

    pub fn selected_range_days(&self) -> u32 {
        self.selected_range_days
    }

    /// Current revision of a local open tab.
    pub fn local_revision(&self, tab_id: &str) -> Option<u64> {
        self.tabs.get(tab_id).map(|t| t.revision)
    }

    pub fn pending_request_id(&self) -> Option<&str> {
        self.pending_request_id.as_deref()
    }

    fn snapshot_context(&self) -> SnapshotContext<'_> {
        SnapshotContext {
            device_id: &self.device_id,
            device_label: &self.device_label,
            server_instance_id: &self.server_instance_id,
        }
    }

    /// Transport finished its handshake: push everything and pull the
    /// selected range.
    pub fn on_connected(
        &mut self,
        server_instance_id: &str,
        workspace: &mut Workspace,
        channel: &mut impl SyncChannel,
        now: i64,
    ) {
        log::info!("Registry sync connected (server instance {})", server_instance_id);
        let previous = std::mem::replace(&mut self.server_instance_id, server_instance_id.to_string());
        self.connected = true;
        self.last_pushed = None;
        self.max_requested_range = None;
        self.pending_request_id = None;
        if previous != server_instance_id {
            // Records carry the origin, so every open record is rebuilt
            self.current_fingerprint = None;
            if !previous.is_empty() {
                // and must outrank the copies published under the old instance
                for state in self.tabs.values_mut() {
                    state.revision += 1;
                    state.updated_at = now;
                }
            }
        }

        self.refresh(workspace, now);
        self.push(channel);
        self.send_query(self.selected_range_days, channel);
    }

    pub fn on_disconnected(&mut self) {
        if self.connected {
            log::info!("Registry sync disconnected");
        }
        self.connected = false;
        self.pending_request_id = None;
    }

    /// Local state may have changed. Pushes only if the structural
    /// fingerprint differs from the last push. Returns true if the
    /// display groups changed.
    pub fn on_state_changed(&mut self, workspace: &mut Workspace, channel: &mut impl SyncChannel, now: i64) -> bool {
        let before = self.groups.clone();
        self.refresh(workspace, now);
        if self.connected && self.last_pushed != self.current_fingerprint {
            self.push(channel);
        }
        self.groups != before
    }

    /// Periodic housekeeping. Same as a state change: nothing is pushed
    /// unless something structural changed.
    pub fn tick(&mut self, workspace: &mut Workspace, channel: &mut impl SyncChannel, now: i64) -> bool {
        self.on_state_changed(workspace, channel, now)
    }

    /// Select the closed-history window. A query is sent only if `days`
    /// exceeds every range already requested on this connection.
    /// Returns true if a query was sent.
    pub fn request_range(&mut self, days: u32, channel: &mut impl SyncChannel, now: i64) -> bool {
        self.selected_range_days = days;
        self.regroup(now);
        if !self.connected {
            return false;
        }
        if self.max_requested_range.is_some_and(|max| days <= max) {
            log::debug!("Range {}d already covered", days);
            return false;
        }
        self.send_query(days, channel)
    }

    /// Apply an inbound message. Returns true if the display groups changed.
    pub fn handle_message(&mut self, message: ServerMessage, channel: &mut impl SyncChannel, now: i64) -> bool {
        match message {
            ServerMessage::TabsSyncSnapshot { request_id, data } => {
                if self.pending_request_id.as_deref() != Some(request_id.as_str()) {
                    log::debug!("Dropping stale snapshot for request {}", request_id);
                    return false;
                }
                self.pending_request_id = None;
                if self.seed_revisions(&data) && self.connected {
                    self.push(channel);
                }
                self.remote = Some(data);
                let before = self.groups.clone();
                self.regroup(now);
                self.groups != before
            }
            ServerMessage::Error { code, message } => {
                log::warn!("Registry sync error {}: {}", code, message);
                false
            }
            ServerMessage::Ready { .. } | ServerMessage::Unknown => false,
        }
    }

    /// Rebuild local records from the workspace and record closed tabs.
    fn refresh(&mut self, workspace: &mut Workspace, now: i64) {
        for closed in workspace.take_closed_tabs() {
            let tab_key = make_tab_key(&self.device_id, &closed.tab.id);
            let local = self.tabs.remove(&closed.tab.id).map(|t| t.revision);
            let seen = self.server_seen.get(&tab_key).copied();
            let revision = local.max(seen).map_or(0, |r| r + 1);
            let ctx = SnapshotContext {
                device_id: &self.device_id,
                device_label: &self.device_label,
                server_instance_id: &self.server_instance_id,
            };
            self.history.record_close(&closed, revision, &ctx);
        }
        self.history.prune(now);

        let per_tab = workspace_fingerprints(workspace);
        let mut live = HashMap::with_capacity(per_tab.len());
        for (tab_id, fingerprint) in &per_tab {
            let state = match self.tabs.remove(tab_id) {
                Some(mut state) => {
                    if state.fingerprint != *fingerprint {
                        state.fingerprint = fingerprint.clone();
                        state.revision += 1;
                        state.updated_at = now;
                    }
                    state
                }
                None => TabSyncState {
                    fingerprint: fingerprint.clone(),
                    revision: 0,
                    updated_at: now,
                },
            };
            live.insert(tab_id.clone(), state);
        }
        self.tabs = live;

        let closed_keys: Vec<&str> = self.history.records().iter().map(|r| r.tab_key.as_str()).collect();
        let fingerprint = combine(&per_tab, &closed_keys);

        if self.current_fingerprint.as_ref() != Some(&fingerprint) {
            let ctx = self.snapshot_context();
            let local_open = workspace
                .tabs()
                .tabs
                .iter()
                .filter_map(|tab| {
                    let state = self.tabs.get(&tab.id)?;
                    Some(build_open_record(
                        tab,
                        workspace.layout(&tab.id),
                        workspace.panes().pane_titles.get(&tab.id),
                        state.revision,
                        &ctx,
                        state.updated_at,
                    ))
                })
                .collect();
            self.local_open = local_open;
            self.current_fingerprint = Some(fingerprint);
        }
        self.regroup(now);
    }

    fn regroup(&mut self, now: i64) {
        self.groups = reconcile(&ReconcileInput {
            device_id: &self.device_id,
            local_open: &self.local_open,
            local_closed: self.history.records(),
            remote: self.remote.as_ref(),
            range_days: self.selected_range_days,
            now,
        });
    }

    /// Raise local revisions that the server has already seen beyond.
    /// Closed history outranks an open copy the server still holds.
    /// Returns true if any revision moved.
    fn seed_revisions(&mut self, data: &RegistryGroups) -> bool {
        let mut bumped = false;
        for record in data.iter().filter(|r| r.device_id == self.device_id) {
            let seen = self.server_seen.entry(record.tab_key.clone()).or_insert(0);
            *seen = (*seen).max(record.revision);

            match self.tabs.get_mut(&record.tab_id) {
                Some(state) => {
                    if record.revision >= state.revision {
                        state.revision = record.revision + 1;
                        bumped = true;
                    }
                }
                None if record.is_open() => {
                    if self.history.raise_revision(&record.tab_key, record.revision + 1) {
                        log::debug!("Closed {} outranks server open copy", record.tab_key);
                        bumped = true;
                    }
                }
                None => {}
            }
        }
        if bumped {
            for record in &mut self.local_open {
                if let Some(state) = self.tabs.get(&record.tab_id) {
                    record.revision = state.revision;
                }
            }
            self.last_pushed = None;
        }
        bumped
    }

    fn push(&mut self, channel: &mut impl SyncChannel) {
        let mut snapshot = self.local_open.clone();
        snapshot.extend(self.history.records().iter().cloned());
        log::debug!(
            "Pushing {} open and {} closed records",
            self.local_open.len(),
            self.history.len()
        );
        if channel.send(ClientMessage::TabsSyncPush { snapshot }) {
            self.last_pushed = self.current_fingerprint.clone();
        }
    }

    fn send_query(&mut self, days: u32, channel: &mut impl SyncChannel) -> bool {
        let request_id = uuid::Uuid::new_v4().to_string();
        let message = ClientMessage::TabsSyncQuery {
            request_id: request_id.clone(),
            device_id: self.device_id.clone(),
            range_days: (days != DEFAULT_RANGE_DAYS).then_some(days),
        };
        if !channel.send(message) {
            return false;
        }
        self.pending_request_id = Some(request_id);
        self.max_requested_range = Some(self.max_requested_range.map_or(days, |max| max.max(days)));
        true
    }
}
