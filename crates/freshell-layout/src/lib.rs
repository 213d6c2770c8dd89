pub mod node;
pub mod panes;
pub mod repair;

pub use node::{new_pane_id, normalize_sizes, PaneNode, MIN_SPLIT_PERCENT};
pub use panes::{ClosePaneOutcome, PanesState};
pub use repair::repair_layout;
