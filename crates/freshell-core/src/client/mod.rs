pub mod config;
pub mod connection;
pub mod types;

pub use config::SyncConnectionConfig;
pub use connection::SyncConnection;
pub use types::{ConnectionEvent, ConnectionStatus, TransportError};
