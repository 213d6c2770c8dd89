pub mod history;
pub mod reconcile;
pub mod reopen;
pub mod retention;
pub mod snapshot;

pub use history::ClosedHistory;
pub use reconcile::{reconcile, ReconcileInput};
pub use reopen::{jump_to_tab, open_copy, payload_to_content, JumpOutcome};
pub use retention::{should_keep_closed_tab, ClosedTabFacts};
pub use snapshot::{
    build_closed_record, build_open_record, count_pane_leaves, sanitize_pane_payload, SnapshotContext,
};
