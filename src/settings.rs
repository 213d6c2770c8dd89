//! Sync agent settings, persisted as `settings.json` next to the workspace.

use anyhow::{Context, Result};
use freshell_core::ws::{DEFAULT_RANGE_DAYS, RANGE_DAYS_CHOICES};
use freshell_state::persistence::{get_config_dir, load_json, save_json};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Current settings schema version
pub const SETTINGS_VERSION: u32 = 1;

fn default_settings_version() -> u32 {
    0
}

fn default_server_url() -> String {
    "ws://127.0.0.1:3001/ws".to_string()
}

fn default_device_label() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .filter(|h| !h.trim().is_empty())
        .unwrap_or_else(|| "This device".to_string())
}

fn default_range_days() -> u32 {
    DEFAULT_RANGE_DAYS
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Settings schema version for migration support
    #[serde(default = "default_settings_version")]
    pub version: u32,
    /// WebSocket endpoint of the registry server
    #[serde(default = "default_server_url")]
    pub server_url: String,
    /// Token sent in the hello handshake
    #[serde(default)]
    pub token: Option<String>,
    /// Stable id of this device. Generated on first run.
    #[serde(default)]
    pub device_id: String,
    /// Name shown next to this device's tabs elsewhere
    #[serde(default = "default_device_label")]
    pub device_label: String,
    /// Closed-history window requested on connect
    #[serde(default = "default_range_days")]
    pub range_days: u32,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            server_url: default_server_url(),
            token: None,
            device_id: String::new(),
            device_label: default_device_label(),
            range_days: default_range_days(),
        }
    }
}

pub fn get_settings_path() -> PathBuf {
    get_config_dir().join("settings.json")
}

/// Load settings from `path`. A missing file gives defaults; a file that
/// doesn't parse is recovered field by field. The file is only written
/// back when it was missing, recovered or migrated.
///
/// A file that can't be recovered at all is an error and is left untouched,
/// since starting over would mint a new device identity.
pub fn load_settings(path: &Path) -> Result<SyncSettings> {
    let (mut settings, write_back) = match load_json::<SyncSettings>(path) {
        Ok(Some(settings)) => (settings, false),
        Ok(None) => {
            log::info!("Settings file not found at {}, using defaults", path.display());
            (SyncSettings::default(), true)
        }
        Err(e) => {
            log::warn!("Failed to parse settings directly: {:#}, attempting partial recovery", e);
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let settings = recover_settings_from_json(&content).with_context(|| {
                format!("settings file {} could not be recovered and was left as is", path.display())
            })?;
            log::info!("Recovered settings with partial data");
            (settings, true)
        }
    };

    let original_version = settings.version;
    let migrated = migrate_settings(&mut settings);
    if migrated && original_version != settings.version {
        log::info!("Settings migrated from v{} to v{}", original_version, settings.version);
    }
    if write_back || migrated {
        if let Err(e) = save_settings(path, &settings) {
            log::warn!("Failed to save settings: {:#}", e);
        }
    }
    Ok(settings)
}

/// Extract the valid fields of a malformed settings file, using defaults
/// for the rest. Fails if the device identity itself is unreadable.
fn recover_settings_from_json(content: &str) -> Result<SyncSettings> {
    let value: serde_json::Value =
        serde_json::from_str(content).context("Settings file is not valid JSON")?;
    let obj = value
        .as_object()
        .context("Settings file root is not a JSON object")?;

    let mut settings = SyncSettings {
        version: default_settings_version(),
        ..SyncSettings::default()
    };

    if let Some(v) = obj.get("version").and_then(|v| v.as_u64()) {
        settings.version = u32::try_from(v).unwrap_or(SETTINGS_VERSION);
    }

    if let Some(v) = obj.get("device_id") {
        match v.as_str() {
            Some(id) => settings.device_id = id.to_string(),
            None if v.is_null() => {}
            None => anyhow::bail!("device_id is not a string"),
        }
    }

    if let Some(v) = obj.get("server_url").and_then(|v| v.as_str()) {
        settings.server_url = v.to_string();
    } else if obj.contains_key("server_url") {
        log::warn!("Could not parse server_url, using default");
    }

    if let Some(v) = obj.get("token") {
        match serde_json::from_value::<Option<String>>(v.clone()) {
            Ok(token) => settings.token = token,
            Err(_) => log::warn!("Could not parse token, ignoring it"),
        }
    }

    if let Some(v) = obj.get("device_label").and_then(|v| v.as_str()) {
        settings.device_label = v.to_string();
    }

    if let Some(v) = obj.get("range_days") {
        match v.as_u64().and_then(|d| u32::try_from(d).ok()) {
            Some(days) => settings.range_days = days,
            None => log::warn!("Could not parse range_days, using default"),
        }
    }

    Ok(settings)
}

/// Bring settings up to the current version and fill values that must
/// never be empty. Returns true if anything changed.
fn migrate_settings(settings: &mut SyncSettings) -> bool {
    let mut changed = false;

    if settings.version > SETTINGS_VERSION {
        log::warn!(
            "Settings version {} is newer than supported version {}, some settings may be ignored",
            settings.version,
            SETTINGS_VERSION
        );
    } else if settings.version < SETTINGS_VERSION {
        settings.version = SETTINGS_VERSION;
        changed = true;
    }

    if settings.device_id.trim().is_empty() {
        settings.device_id = uuid::Uuid::new_v4().to_string();
        log::info!("Generated device id {}", settings.device_id);
        changed = true;
    }

    if !RANGE_DAYS_CHOICES.contains(&settings.range_days) {
        log::warn!(
            "Unsupported range of {} days, using {}",
            settings.range_days,
            DEFAULT_RANGE_DAYS
        );
        settings.range_days = DEFAULT_RANGE_DAYS;
        changed = true;
    }

    changed
}

pub fn save_settings(path: &Path, settings: &SyncSettings) -> Result<()> {
    save_json(path, settings)?;
    // The token is a credential
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_run_generates_and_saves_device_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let settings = load_settings(&path).unwrap();
        assert!(!settings.device_id.is_empty());
        assert_eq!(settings.version, SETTINGS_VERSION);
        assert!(path.exists());

        // Stable across runs
        assert_eq!(load_settings(&path).unwrap().device_id, settings.device_id);
    }

    #[test]
    fn partial_file_gets_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"serverUrl": "ignored", "server_url": "ws://box:9000/ws", "device_id": "dev-1"}"#)
            .unwrap();

        let settings = load_settings(&path).unwrap();
        assert_eq!(settings.server_url, "ws://box:9000/ws");
        assert_eq!(settings.device_id, "dev-1");
        assert_eq!(settings.range_days, DEFAULT_RANGE_DAYS);
        assert_eq!(settings.version, SETTINGS_VERSION);
    }

    #[test]
    fn unsupported_range_is_reset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"version": 1, "device_id": "d", "range_days": 45}"#).unwrap();
        assert_eq!(load_settings(&path).unwrap().range_days, DEFAULT_RANGE_DAYS);
    }

    #[test]
    fn wrong_typed_field_keeps_identity_and_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"version": 1, "device_id": "dev-7", "token": "secret", "range_days": "90"}"#,
        )
        .unwrap();

        let settings = load_settings(&path).unwrap();
        assert_eq!(settings.device_id, "dev-7");
        assert_eq!(settings.token.as_deref(), Some("secret"));
        assert_eq!(settings.range_days, DEFAULT_RANGE_DAYS);

        // The repaired file parses directly and keeps the same identity
        let saved: SyncSettings = load_json(&path).unwrap().unwrap();
        assert_eq!(saved.device_id, "dev-7");
        assert_eq!(saved.token.as_deref(), Some("secret"));
    }

    #[test]
    fn unrecoverable_file_is_an_error_and_left_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{oops").unwrap();

        assert!(load_settings(&path).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{oops");
    }

    #[test]
    fn unreadable_device_id_is_not_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let raw = r#"{"device_id": 42, "token": "secret"}"#;
        std::fs::write(&path, raw).unwrap();

        assert!(load_settings(&path).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), raw);
    }
}
