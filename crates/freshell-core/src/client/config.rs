use serde::{Deserialize, Serialize};

/// Where and as whom the sync transport connects.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncConnectionConfig {
    /// WebSocket endpoint, e.g. `ws://127.0.0.1:3001/ws`
    pub url: String,
    /// Stable id of this device (first half of every tab key)
    pub device_id: String,
    /// Bearer token forwarded in the hello handshake
    #[serde(default)]
    pub token: Option<String>,
}
