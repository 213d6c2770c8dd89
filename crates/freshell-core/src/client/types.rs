use crate::ws::ServerMessage;
use serde::{Deserialize, Serialize};

/// Status of the sync transport.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ConnectionStatus {
    /// Not connected
    Disconnected,
    /// Socket opening / waiting for the ready handshake
    Connecting,
    /// Handshake complete, messages flow both ways
    Connected,
    /// Lost connection, attempting to reconnect
    Reconnecting { attempt: u32 },
    /// Unrecoverable error
    Error(String),
}

/// Event sent from the transport task back to the sync runner.
#[derive(Clone, Debug, PartialEq)]
pub enum ConnectionEvent {
    /// Connection status changed
    StatusChanged(ConnectionStatus),
    /// Handshake finished; `server_instance_id` identifies the backend process
    Connected { server_instance_id: String },
    /// Inbound message after the handshake
    Message(ServerMessage),
}

/// Error type distinguishing auth failures from transient network errors.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Token rejected: do not retry.
    #[error("authentication rejected: {0}")]
    Auth(String),
    /// Network/transient error: retry with backoff.
    #[error("{0}")]
    Transient(String),
}

/// Initial reconnect delay; doubles per attempt.
pub const RECONNECT_BASE_SECS: u64 = 1;
pub const MAX_BACKOFF_SECS: u64 = 30;
pub const MAX_RECONNECT_ATTEMPTS: u32 = 10;

/// Backoff before reconnect attempt `attempt` (1-based).
pub fn reconnect_backoff_secs(attempt: u32) -> u64 {
    std::cmp::min(
        RECONNECT_BASE_SECS.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1))),
        MAX_BACKOFF_SECS,
    )
}
