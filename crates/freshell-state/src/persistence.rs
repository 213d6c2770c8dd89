//! Versioned tabs/panes blobs.
//!
//! Parsing never fails hard: corrupt JSON or a schema from a newer build
//! yields `None` and the caller starts from empty state.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use freshell_core::tab::Tab;
use freshell_layout::{repair_layout, PanesState};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tabs::TabsState;
use crate::workspace::Workspace;

/// Current tabs schema version - increment when making breaking changes
pub const TABS_SCHEMA_VERSION: u32 = 1;
/// Current panes schema version - increment when making breaking changes
pub const PANES_SCHEMA_VERSION: u32 = 1;

pub const TABS_FILE: &str = "tabs.json";
pub const PANES_FILE: &str = "panes.json";

/// Get the config directory path
pub fn get_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("freshell")
}

fn default_schema_version() -> u32 {
    0 // pre-versioning blobs
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TabsBlob<'a> {
    version: u32,
    tabs: &'a TabsState,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PanesBlob<'a> {
    version: u32,
    #[serde(flatten)]
    panes: &'a PanesState,
}

/// Panes blob as read from disk. Layouts stay opaque until migration.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPanesBlob {
    #[serde(default = "default_schema_version")]
    version: u32,
    #[serde(default)]
    layouts: HashMap<String, Value>,
    #[serde(default)]
    active_pane: HashMap<String, String>,
    #[serde(default)]
    pane_titles: HashMap<String, HashMap<String, String>>,
    #[serde(default)]
    pane_title_set_by_user: HashMap<String, HashMap<String, bool>>,
}

fn blob_version(obj: &serde_json::Map<String, Value>) -> u32 {
    obj.get("version")
        .and_then(Value::as_u64)
        .map(|v| u32::try_from(v).unwrap_or(u32::MAX))
        .unwrap_or_else(default_schema_version)
}

/// Parse a persisted tabs blob. Malformed tabs are dropped individually.
pub fn parse_persisted_tabs(raw: &str) -> Option<TabsState> {
    let value: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            log::warn!("Corrupt tabs blob: {}", e);
            return None;
        }
    };
    let obj = value.as_object()?;
    let version = blob_version(obj);
    if version > TABS_SCHEMA_VERSION {
        log::warn!(
            "Tabs blob is v{} but this build supports up to v{}, ignoring",
            version,
            TABS_SCHEMA_VERSION
        );
        return None;
    }

    let body = obj.get("tabs").and_then(Value::as_object);
    let active_tab_id = body
        .and_then(|b| b.get("activeTabId"))
        .and_then(Value::as_str)
        .map(str::to_string);
    let tabs = body
        .and_then(|b| b.get("tabs"))
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|t| match serde_json::from_value::<Tab>(t.clone()) {
                    Ok(tab) => Some(tab),
                    Err(e) => {
                        log::warn!("Dropping malformed tab: {}", e);
                        None
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    Some(migrate_tabs(version, TabsState { active_tab_id, tabs }))
}

/// Migrate tabs from older schema versions to the current version
fn migrate_tabs(version: u32, mut tabs: TabsState) -> TabsState {
    let original_version = version;
    let mut version = version;

    // v0 tabs predate pane layouts; their terminal settings are folded into
    // the first pane when the layout is created, so only validation is needed
    if version == 0 {
        log::info!("Migrating tabs from pre-versioning (v0) to v1");
        version = 1;
    }

    tabs.validate();

    if original_version != version {
        log::info!("Tabs migrated from v{} to v{}", original_version, version);
    }
    tabs
}

/// Parse a persisted panes blob, repairing each layout.
pub fn parse_persisted_panes(raw: &str) -> Option<PanesState> {
    let blob: RawPanesBlob = match serde_json::from_str(raw) {
        Ok(blob) => blob,
        Err(e) => {
            log::warn!("Corrupt panes blob: {}", e);
            return None;
        }
    };
    if blob.version > PANES_SCHEMA_VERSION {
        log::warn!(
            "Panes blob is v{} but this build supports up to v{}, ignoring",
            blob.version,
            PANES_SCHEMA_VERSION
        );
        return None;
    }
    Some(migrate_panes(blob))
}

fn migrate_panes(blob: RawPanesBlob) -> PanesState {
    if blob.version == 0 {
        log::info!("Migrating panes from pre-versioning (v0) to v1");
    }

    let mut panes = PanesState::default();
    for (tab_id, raw_layout) in blob.layouts {
        match repair_layout(&raw_layout) {
            Some(layout) => {
                panes.layouts.insert(tab_id, layout);
            }
            None => log::warn!("Dropping unrecoverable layout for tab {}", tab_id),
        }
    }

    let has_pane = |panes: &PanesState, tab_id: &str, pane_id: &str| {
        panes
            .layouts
            .get(tab_id)
            .is_some_and(|l| l.find_pane_content(pane_id).is_some())
    };

    for (tab_id, pane_id) in blob.active_pane {
        if has_pane(&panes, &tab_id, &pane_id) {
            panes.active_pane.insert(tab_id, pane_id);
        }
    }
    for (tab_id, titles) in blob.pane_titles {
        let titles: HashMap<String, String> = titles
            .into_iter()
            .filter(|(pane_id, _)| has_pane(&panes, &tab_id, pane_id))
            .collect();
        if !titles.is_empty() {
            panes.pane_titles.insert(tab_id, titles);
        }
    }
    for (tab_id, flags) in blob.pane_title_set_by_user {
        let flags: HashMap<String, bool> = flags
            .into_iter()
            .filter(|(pane_id, _)| has_pane(&panes, &tab_id, pane_id))
            .collect();
        if !flags.is_empty() {
            panes.pane_title_set_by_user.insert(tab_id, flags);
        }
    }
    panes
}

pub fn serialize_tabs(tabs: &TabsState) -> Result<String> {
    let blob = TabsBlob {
        version: TABS_SCHEMA_VERSION,
        tabs,
    };
    Ok(serde_json::to_string_pretty(&blob)?)
}

pub fn serialize_panes(panes: &PanesState) -> Result<String> {
    let blob = PanesBlob {
        version: PANES_SCHEMA_VERSION,
        panes,
    };
    Ok(serde_json::to_string_pretty(&blob)?)
}

/// Load the workspace from `dir`. Missing or unreadable blobs give empty state.
pub fn load_workspace(dir: &Path) -> Result<Workspace> {
    let tabs = read_optional(&dir.join(TABS_FILE))?
        .and_then(|raw| parse_persisted_tabs(&raw))
        .unwrap_or_default();
    let panes = read_optional(&dir.join(PANES_FILE))?
        .and_then(|raw| parse_persisted_panes(&raw))
        .unwrap_or_default();
    Ok(Workspace::new(tabs, panes))
}

/// Save the workspace to `dir`
pub fn save_workspace(dir: &Path, workspace: &Workspace) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    write_atomic(&dir.join(TABS_FILE), &serialize_tabs(workspace.tabs())?)?;
    write_atomic(&dir.join(PANES_FILE), &serialize_panes(workspace.panes())?)?;
    Ok(())
}

/// Read a JSON file into `T`. `Ok(None)` when the file doesn't exist.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let Some(raw) = read_optional(path)? else {
        return Ok(None);
    };
    let value = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(Some(value))
}

/// Write `value` as pretty JSON, creating parent directories.
pub fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    write_atomic(path, &serde_json::to_string_pretty(value)?)
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    std::fs::read_to_string(path)
        .map(Some)
        .with_context(|| format!("failed to read {}", path.display()))
}

/// Write via a sibling temp file and rename, so a crash never leaves a
/// half-written blob.
fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, content).with_context(|| format!("failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}
