//! Async loop that drives a [`SyncScheduler`] from transport events,
//! local state notifications and a housekeeping tick.

use std::sync::Arc;
use std::time::Duration;

use freshell_core::client::{ConnectionEvent, ConnectionStatus};
use freshell_core::registry::RegistryGroups;
use freshell_core::time::now_ms;
use freshell_core::ws::ClientMessage;
use freshell_state::Workspace;
use parking_lot::Mutex;
use tokio::time::{Instant, MissedTickBehavior};

use crate::scheduler::SyncScheduler;

/// Quiet period after a state change before fingerprints are recomputed.
pub const STATE_DEBOUNCE_MS: u64 = 250;
/// Housekeeping interval (history pruning, catch-up of missed changes).
pub const TICK_INTERVAL_SECS: u64 = 5;

/// Requests from the UI side.
#[derive(Clone, Debug, PartialEq)]
pub enum SyncCommand {
    /// The workspace was mutated.
    StateChanged,
    /// The user picked a closed-history window.
    RequestRange(u32),
    Shutdown,
}

/// Notifications back to the UI side.
#[derive(Clone, Debug, PartialEq)]
pub enum SyncEvent {
    GroupsUpdated(RegistryGroups),
    StatusChanged(ConnectionStatus),
}

pub struct SyncRunner {
    scheduler: SyncScheduler,
    workspace: Arc<Mutex<Workspace>>,
    outbound: async_channel::Sender<ClientMessage>,
    transport: async_channel::Receiver<ConnectionEvent>,
    commands: async_channel::Receiver<SyncCommand>,
    events: async_channel::Sender<SyncEvent>,
}

impl SyncRunner {
    pub fn new(
        scheduler: SyncScheduler,
        workspace: Arc<Mutex<Workspace>>,
        outbound: async_channel::Sender<ClientMessage>,
        transport: async_channel::Receiver<ConnectionEvent>,
        commands: async_channel::Receiver<SyncCommand>,
        events: async_channel::Sender<SyncEvent>,
    ) -> Self {
        Self {
            scheduler,
            workspace,
            outbound,
            transport,
            commands,
            events,
        }
    }

    /// Run until [`SyncCommand::Shutdown`] or until the command channel
    /// closes. Returns the scheduler so its closed history can be saved.
    pub async fn run(mut self) -> SyncScheduler {
        let mut tick = tokio::time::interval(Duration::from_secs(TICK_INTERVAL_SECS));
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut debounce: Option<Instant> = None;
        let mut transport_open = true;

        loop {
            tokio::select! {
                event = self.transport.recv(), if transport_open => match event {
                    Ok(event) => self.handle_transport(event),
                    Err(_) => {
                        log::debug!("Transport event channel closed");
                        transport_open = false;
                    }
                },
                command = self.commands.recv() => match command {
                    Ok(SyncCommand::StateChanged) => {
                        debounce = Some(Instant::now() + Duration::from_millis(STATE_DEBOUNCE_MS));
                    }
                    Ok(SyncCommand::RequestRange(days)) => self.request_range(days),
                    Ok(SyncCommand::Shutdown) | Err(_) => break,
                },
                _ = tokio::time::sleep_until(debounce.unwrap_or_else(Instant::now)), if debounce.is_some() => {
                    debounce = None;
                    self.state_changed();
                }
                _ = tick.tick() => self.housekeeping(),
            }
        }

        // Flush a pending change so a final close still reaches history
        if debounce.is_some() {
            self.state_changed();
        }
        log::info!("Sync runner stopped");
        self.scheduler
    }

    fn state_changed(&mut self) {
        let mut workspace = self.workspace.lock();
        let changed = self
            .scheduler
            .on_state_changed(&mut workspace, &mut self.outbound, now_ms());
        drop(workspace);
        if changed {
            self.publish_groups();
        }
    }

    fn request_range(&mut self, days: u32) {
        let before = self.scheduler.groups().clone();
        self.scheduler.request_range(days, &mut self.outbound, now_ms());
        if *self.scheduler.groups() != before {
            self.publish_groups();
        }
    }

    fn housekeeping(&mut self) {
        let mut workspace = self.workspace.lock();
        let changed = self.scheduler.tick(&mut workspace, &mut self.outbound, now_ms());
        drop(workspace);
        if changed {
            self.publish_groups();
        }
    }

    fn handle_transport(&mut self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Connected { server_instance_id } => {
                let mut workspace = self.workspace.lock();
                self.scheduler
                    .on_connected(&server_instance_id, &mut workspace, &mut self.outbound, now_ms());
                drop(workspace);
                self.publish_groups();
            }
            ConnectionEvent::StatusChanged(status) => {
                if !matches!(status, ConnectionStatus::Connected | ConnectionStatus::Connecting) {
                    self.scheduler.on_disconnected();
                }
                self.publish(SyncEvent::StatusChanged(status));
            }
            ConnectionEvent::Message(message) => {
                if self.scheduler.handle_message(message, &mut self.outbound, now_ms()) {
                    self.publish_groups();
                }
            }
        }
    }

    fn publish_groups(&self) {
        self.publish(SyncEvent::GroupsUpdated(self.scheduler.groups().clone()));
    }

    fn publish(&self, event: SyncEvent) {
        if let Err(e) = self.events.try_send(event) {
            log::debug!("Dropping sync event: {}", e);
        }
    }
}
