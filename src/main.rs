mod settings;
mod watcher;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use freshell_core::client::{ConnectionStatus, SyncConnection, SyncConnectionConfig};
use freshell_registry::ClosedHistory;
use freshell_state::persistence::{get_config_dir, load_json, load_workspace, save_json};
use freshell_state::Workspace;
use freshell_sync::{SyncCommand, SyncEvent, SyncRunner, SyncScheduler};
use parking_lot::Mutex;

use crate::settings::SyncSettings;
use crate::watcher::WorkspaceWatcher;

const CLOSED_HISTORY_FILE: &str = "closed.json";

fn main() -> Result<()> {
    env_logger::init();

    let config_dir = get_config_dir();
    let settings = settings::load_settings(&settings::get_settings_path())?;

    let workspace = load_workspace(&config_dir).unwrap_or_else(|e| {
        log::warn!("Failed to load workspace: {:#}, using empty state", e);
        Workspace::default()
    });

    let history_path = config_dir.join(CLOSED_HISTORY_FILE);
    let history = match load_json::<ClosedHistory>(&history_path) {
        Ok(history) => history.unwrap_or_default(),
        Err(e) => {
            log::warn!("Failed to load closed history: {:#}, starting empty", e);
            ClosedHistory::new()
        }
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;

    let scheduler = runtime.block_on(run(settings, workspace, history, &config_dir))?;

    save_json(&history_path, scheduler.history()).context("failed to save closed history")?;
    log::info!("Saved {} closed tabs", scheduler.history().len());
    Ok(())
}

async fn run(
    settings: SyncSettings,
    workspace: Workspace,
    history: ClosedHistory,
    config_dir: &Path,
) -> Result<SyncScheduler> {
    log::info!(
        "Syncing {} tabs as {} ({}) with {}",
        workspace.tabs().len(),
        settings.device_label,
        settings.device_id,
        settings.server_url
    );
    let workspace = Arc::new(Mutex::new(workspace));

    let (transport_tx, transport_rx) = async_channel::bounded(256);
    let mut connection = SyncConnection::new(
        SyncConnectionConfig {
            url: settings.server_url.clone(),
            device_id: settings.device_id.clone(),
            token: settings.token.clone(),
        },
        tokio::runtime::Handle::current(),
        transport_tx,
    );
    let outbound = connection.connect();

    let (command_tx, command_rx) = async_channel::bounded(64);
    let (event_tx, event_rx) = async_channel::bounded(256);

    let scheduler = SyncScheduler::new(&settings.device_id, &settings.device_label, history)
        .with_range_days(settings.range_days);
    let runner = SyncRunner::new(
        scheduler,
        workspace.clone(),
        outbound,
        transport_rx,
        command_rx,
        event_tx,
    );
    let runner = tokio::spawn(runner.run());

    let watcher = WorkspaceWatcher::new(config_dir.to_path_buf(), workspace, command_tx.clone());
    tokio::spawn(watcher.run());
    tokio::spawn(log_events(event_rx));

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    log::info!("Shutting down");

    let _ = command_tx.send(SyncCommand::Shutdown).await;
    command_tx.close();
    let scheduler = runner.await.context("sync runner panicked")?;
    connection.disconnect();
    Ok(scheduler)
}

async fn log_events(events: async_channel::Receiver<SyncEvent>) {
    while let Ok(event) = events.recv().await {
        match event {
            SyncEvent::GroupsUpdated(groups) => log::info!(
                "Registry: {} open here, {} open elsewhere, {} closed",
                groups.local_open.len(),
                groups.remote_open.len(),
                groups.closed.len()
            ),
            SyncEvent::StatusChanged(ConnectionStatus::Error(e)) => {
                log::error!("Sync connection failed: {}", e)
            }
            SyncEvent::StatusChanged(status) => log::debug!("Sync connection: {:?}", status),
        }
    }
}
