pub mod persistence;
pub mod tabs;
pub mod workspace;

pub use tabs::TabsState;
pub use workspace::{ClosedTab, Workspace};
