//! Picks up workspace changes written to disk by the terminal app.
//!
//! Polls the state directory and, when the persisted blobs differ from what
//! the agent holds, swaps the new state in and notifies the sync runner.
//! Files are only read again once their modification time or size moves.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use freshell_state::persistence::{load_workspace, serialize_panes, serialize_tabs, PANES_FILE, TABS_FILE};
use freshell_state::Workspace;
use freshell_sync::SyncCommand;
use parking_lot::Mutex;

pub const POLL_INTERVAL_SECS: u64 = 2;

/// Modification time and size of `tabs.json` and `panes.json`.
/// `None` for a file that is missing or unreadable.
pub type DiskStamp = [Option<(SystemTime, u64)>; 2];

pub fn disk_stamp(dir: &Path) -> DiskStamp {
    [TABS_FILE, PANES_FILE].map(|name| {
        let metadata = std::fs::metadata(dir.join(name)).ok()?;
        Some((metadata.modified().ok()?, metadata.len()))
    })
}

pub struct WorkspaceWatcher {
    dir: PathBuf,
    workspace: Arc<Mutex<Workspace>>,
    commands: async_channel::Sender<SyncCommand>,
}

impl WorkspaceWatcher {
    pub fn new(dir: PathBuf, workspace: Arc<Mutex<Workspace>>, commands: async_channel::Sender<SyncCommand>) -> Self {
        Self {
            dir,
            workspace,
            commands,
        }
    }

    /// Poll until the command channel closes.
    pub async fn run(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(POLL_INTERVAL_SECS));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut last_stamp: Option<DiskStamp> = None;
        loop {
            interval.tick().await;
            if self.commands.is_closed() {
                break;
            }
            let stamp = disk_stamp(&self.dir);
            if last_stamp == Some(stamp) {
                continue;
            }
            last_stamp = Some(stamp);
            let fresh = match load_workspace(&self.dir) {
                Ok(fresh) => fresh,
                Err(e) => {
                    log::warn!("Failed to reload workspace: {:#}", e);
                    continue;
                }
            };
            let changed = apply_reload(&mut self.workspace.lock(), fresh);
            if changed && self.commands.send(SyncCommand::StateChanged).await.is_err() {
                break;
            }
        }
        log::debug!("Workspace watcher stopped");
    }
}

fn persisted_form(workspace: &Workspace) -> Option<(String, String)> {
    Some((
        serialize_tabs(workspace.tabs()).ok()?,
        serialize_panes(workspace.panes()).ok()?,
    ))
}

/// Replace `current` with `fresh` if their persisted forms differ. Tabs
/// missing from `fresh` are closed first so they reach the closed history.
/// Returns true if anything changed.
pub fn apply_reload(current: &mut Workspace, fresh: Workspace) -> bool {
    if persisted_form(current) == persisted_form(&fresh) {
        return false;
    }

    let vanished: Vec<String> = current
        .tabs()
        .ids()
        .into_iter()
        .filter(|id| !fresh.tabs().contains(id))
        .map(str::to_string)
        .collect();
    for tab_id in &vanished {
        current.close_tab(tab_id);
    }

    current.replace_data(fresh.tabs().clone(), fresh.panes().clone());
    log::debug!("Reloaded workspace ({} tabs closed on disk)", vanished.len());
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use freshell_core::tab::Tab;
    use freshell_state::persistence::save_workspace;

    #[test]
    fn stamp_moves_only_when_files_change() {
        let mut ws = Workspace::default();
        ws.open_tab(Tab::new("t1", "Shell", 0));
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(disk_stamp(dir.path()), [None, None]);

        save_workspace(dir.path(), &ws).unwrap();
        let saved = disk_stamp(dir.path());
        assert!(saved.iter().all(Option::is_some));
        assert_eq!(disk_stamp(dir.path()), saved);

        ws.rename_tab("t1", "A much longer title than before", true);
        save_workspace(dir.path(), &ws).unwrap();
        let renamed = disk_stamp(dir.path());
        assert_ne!(renamed[0], saved[0]);
    }

    #[test]
    fn identical_state_is_not_a_change() {
        let mut ws = Workspace::default();
        ws.open_tab(Tab::new("t1", "Shell", 0));
        let dir = tempfile::tempdir().unwrap();
        save_workspace(dir.path(), &ws).unwrap();

        let fresh = load_workspace(dir.path()).unwrap();
        assert!(!apply_reload(&mut ws, fresh));
    }

    #[test]
    fn tabs_removed_on_disk_are_closed() {
        let mut current = Workspace::default();
        current.open_tab(Tab::new("t1", "Shell", 0));
        current.open_tab(Tab::new("t2", "Build", 0));

        let mut fresh = Workspace::default();
        fresh.open_tab(Tab::new("t2", "Build", 0));

        assert!(apply_reload(&mut current, fresh));
        assert_eq!(current.tabs().len(), 1);
        assert!(current.tab("t2").is_some());

        let closed = current.take_closed_tabs();
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].tab.id, "t1");
        assert!(closed[0].layout.is_some());
    }

    #[test]
    fn renamed_tab_is_picked_up() {
        let mut current = Workspace::default();
        current.open_tab(Tab::new("t1", "Shell", 0));
        let mut fresh = Workspace::default();
        fresh.open_tab(Tab::new("t1", "Logs", 0));

        assert!(apply_reload(&mut current, fresh));
        assert_eq!(current.tab("t1").unwrap().title, "Logs");
        assert!(current.take_closed_tabs().is_empty());
    }
}
