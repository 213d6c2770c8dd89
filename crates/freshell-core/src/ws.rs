use crate::registry::{RegistryGroups, RegistryTabRecord};
use serde::{Deserialize, Serialize};

/// Closed-history window served when a query omits `rangeDays`.
pub const DEFAULT_RANGE_DAYS: u32 = 30;

/// Closed-history windows the user can pick from.
pub const RANGE_DAYS_CHOICES: [u32; 3] = [DEFAULT_RANGE_DAYS, 90, 365];

/// Outbound messages (client → server)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase", deny_unknown_fields)]
pub enum ClientMessage {
    #[serde(rename = "hello")]
    Hello {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token: Option<String>,
        device_id: String,
    },
    /// Full snapshot of this device's registry records. No response.
    #[serde(rename = "tabs.sync.push")]
    TabsSyncPush { snapshot: Vec<RegistryTabRecord> },
    #[serde(rename = "tabs.sync.query")]
    TabsSyncQuery {
        request_id: String,
        device_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        range_days: Option<u32>,
    },
}

impl ClientMessage {
    /// Short name for logging.
    pub fn type_name(&self) -> &'static str {
        match self {
            ClientMessage::Hello { .. } => "hello",
            ClientMessage::TabsSyncPush { .. } => "tabs.sync.push",
            ClientMessage::TabsSyncQuery { .. } => "tabs.sync.query",
        }
    }
}

/// Inbound messages (server → client)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    #[serde(rename = "ready")]
    Ready {
        #[serde(default)]
        server_instance_id: String,
    },
    #[serde(rename = "tabs.sync.snapshot")]
    TabsSyncSnapshot {
        request_id: String,
        #[serde(default)]
        data: RegistryGroups,
    },
    #[serde(rename = "error")]
    Error {
        #[serde(default)]
        code: String,
        #[serde(default)]
        message: String,
    },
    /// Any message type this client doesn't consume.
    #[serde(other)]
    Unknown,
}

/// Parse an inbound text frame. Malformed JSON yields `None`.
pub fn parse_server_message(text: &str) -> Option<ServerMessage> {
    match serde_json::from_str::<ServerMessage>(text) {
        Ok(msg) => Some(msg),
        Err(e) => {
            log::warn!("Failed to parse server message: {}", e);
            None
        }
    }
}
