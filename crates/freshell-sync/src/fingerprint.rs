//! Structural fingerprints of the workspace.
//!
//! Fingerprints are serialized JSON strings compared for equality. They
//! cover what other devices see (tab list, titles, status, pane tree shape,
//! pane titles and the sanitized pane payloads) and ignore split sizes,
//! zoom and runtime handles, so resizing or a terminal reconnect never
//! triggers a push.

use std::collections::HashMap;

use freshell_core::tab::{Tab, TabStatus};
use freshell_core::types::SplitDirection;
use freshell_layout::PaneNode;
use freshell_registry::sanitize_pane_payload;
use freshell_state::Workspace;
use serde::Serialize;
use serde_json::Value;

#[derive(Serialize)]
#[serde(tag = "t", rename_all = "lowercase")]
enum NodeShape<'a> {
    Leaf {
        id: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<&'a str>,
        /// Sanitized without an origin, so a reconnect alone never differs.
        payload: Value,
    },
    Split {
        id: &'a str,
        direction: SplitDirection,
        children: [Box<NodeShape<'a>>; 2],
    },
}

impl<'a> NodeShape<'a> {
    fn of(node: &'a PaneNode, titles: Option<&'a HashMap<String, String>>) -> Self {
        match node {
            PaneNode::Leaf { id, content } => NodeShape::Leaf {
                id,
                title: titles.and_then(|t| t.get(id)).map(String::as_str),
                payload: sanitize_pane_payload(content, ""),
            },
            PaneNode::Split {
                id,
                direction,
                children,
                ..
            } => NodeShape::Split {
                id,
                direction: *direction,
                children: [
                    Box::new(NodeShape::of(&children[0], titles)),
                    Box::new(NodeShape::of(&children[1], titles)),
                ],
            },
        }
    }
}

#[derive(Serialize)]
struct TabShape<'a> {
    title: &'a str,
    status: TabStatus,
    title_set_by_user: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    layout: Option<NodeShape<'a>>,
}

/// Fingerprint of a single tab.
pub fn tab_fingerprint(
    tab: &Tab,
    layout: Option<&PaneNode>,
    pane_titles: Option<&HashMap<String, String>>,
) -> String {
    let shape = TabShape {
        title: &tab.title,
        status: tab.status,
        title_set_by_user: tab.title_set_by_user,
        layout: layout.map(|node| NodeShape::of(node, pane_titles)),
    };
    serde_json::to_string(&shape).unwrap_or_default()
}

/// Per-tab fingerprints, in tab order.
pub fn workspace_fingerprints(workspace: &Workspace) -> Vec<(String, String)> {
    workspace
        .tabs()
        .tabs
        .iter()
        .map(|tab| {
            let fingerprint = tab_fingerprint(
                tab,
                workspace.layout(&tab.id),
                workspace.panes().pane_titles.get(&tab.id),
            );
            (tab.id.clone(), fingerprint)
        })
        .collect()
}

/// Fingerprint of the whole workspace from its per-tab fingerprints.
pub fn combine(per_tab: &[(String, String)], closed_keys: &[&str]) -> String {
    serde_json::to_string(&(per_tab, closed_keys)).unwrap_or_default()
}
