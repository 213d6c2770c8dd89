pub mod fingerprint;
pub mod runner;
pub mod scheduler;

pub use runner::{SyncCommand, SyncEvent, SyncRunner};
pub use scheduler::SyncScheduler;
