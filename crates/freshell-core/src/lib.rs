pub mod channel;
pub mod content;
pub mod id;
pub mod registry;
pub mod tab;
pub mod time;
pub mod types;
pub mod ws;

#[cfg(feature = "client")]
pub mod client;
