//! Rebuild a valid pane tree from untrusted JSON.
//!
//! Persisted layouts are stored opaquely so a single bad node does not
//! discard a whole blob. Repair is applied when the blob is migrated.

use std::collections::HashSet;

use freshell_core::content::PaneContent;
use freshell_core::types::SplitDirection;
use serde_json::Value;

use crate::node::{new_pane_id, normalize_sizes, PaneNode};

/// Turn an opaque JSON node into a valid tree.
///
/// - unknown or malformed leaf content becomes `picker`
/// - missing ids are generated, duplicate ids are re-issued
/// - invalid split sizes reset to `[50, 50]`
/// - splits with one usable child collapse to that child, splits with more
///   than two chain the extras into nested splits of the same direction
///
/// Returns `None` when nothing usable remains.
pub fn repair_layout(value: &Value) -> Option<PaneNode> {
    let mut node = repair_node(value)?;
    let mut seen = HashSet::new();
    dedupe_ids(&mut node, &mut seen);
    Some(node)
}

fn repair_node(value: &Value) -> Option<PaneNode> {
    let obj = value.as_object()?;
    let id = obj
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .unwrap_or_else(new_pane_id);

    let node_type = obj.get("type").and_then(Value::as_str);
    let is_split = node_type == Some("split") || (node_type.is_none() && obj.contains_key("children"));

    if !is_split {
        if node_type.is_some_and(|t| t != "leaf") {
            log::warn!("Unknown pane node type {:?}, treating as leaf", node_type);
        }
        let content = obj
            .get("content")
            .and_then(|c| serde_json::from_value::<PaneContent>(c.clone()).ok())
            .unwrap_or_else(|| {
                log::warn!("Pane {} has unreadable content, resetting to picker", id);
                PaneContent::Picker
            });
        return Some(PaneNode::Leaf { id, content });
    }

    let mut children: Vec<PaneNode> = obj
        .get("children")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(repair_node).collect())
        .unwrap_or_default();

    let direction = obj
        .get("direction")
        .and_then(|d| serde_json::from_value::<SplitDirection>(d.clone()).ok())
        .unwrap_or_default();

    match children.len() {
        0 => None,
        1 => children.pop(),
        2 => {
            let sizes = obj
                .get("sizes")
                .and_then(|s| serde_json::from_value::<[f32; 2]>(s.clone()).ok())
                .and_then(normalize_sizes)
                .unwrap_or_else(|| {
                    log::warn!("Split {} has invalid sizes, resetting to equal", id);
                    [50.0, 50.0]
                });
            let second = children.pop()?;
            let first = children.pop()?;
            Some(PaneNode::Split {
                id,
                direction,
                sizes,
                children: Box::new([first, second]),
            })
        }
        n => {
            log::warn!("Split {} has {} children, nesting extras", id, n);
            let mut rest = children.pop()?;
            while children.len() > 1 {
                let prev = children.pop()?;
                rest = PaneNode::split(direction, prev, rest);
            }
            let first = children.pop()?;
            Some(PaneNode::Split {
                id,
                direction,
                sizes: [50.0, 50.0],
                children: Box::new([first, rest]),
            })
        }
    }
}

fn dedupe_ids(node: &mut PaneNode, seen: &mut HashSet<String>) {
    let id = match node {
        PaneNode::Leaf { id, .. } | PaneNode::Split { id, .. } => id,
    };
    if !seen.insert(id.clone()) {
        let fresh = new_pane_id();
        log::warn!("Duplicate pane id {}, re-issued as {}", id, fresh);
        *id = fresh.clone();
        seen.insert(fresh);
    }
    if let PaneNode::Split { children, .. } = node {
        for child in children.iter_mut() {
            dedupe_ids(child, seen);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn valid_tree_survives_unchanged() {
        let value = json!({
            "type": "split", "id": "s", "direction": "vertical", "sizes": [30.0, 70.0],
            "children": [
                {"type": "leaf", "id": "a", "content": {"kind": "terminal", "mode": "shell"}},
                {"type": "leaf", "id": "b", "content": {"kind": "browser", "url": "http://x"}}
            ]
        });
        let node = repair_layout(&value).unwrap();
        let expected: PaneNode = serde_json::from_value(value).unwrap();
        assert_eq!(node, expected);
    }

    #[test]
    fn unknown_content_becomes_picker() {
        let value = json!({"type": "leaf", "id": "a", "content": {"kind": "hologram"}});
        let node = repair_layout(&value).unwrap();
        assert_eq!(node.find_pane_content("a"), Some(&PaneContent::Picker));
    }

    #[test]
    fn single_child_split_collapses() {
        let value = json!({
            "type": "split", "id": "s", "direction": "horizontal", "sizes": [50, 50],
            "children": [
                {"type": "leaf", "id": "a", "content": {"kind": "picker"}},
                "garbage"
            ]
        });
        let node = repair_layout(&value).unwrap();
        assert!(node.is_leaf());
        assert_eq!(node.id(), "a");
    }

    #[test]
    fn bad_sizes_reset() {
        let value = json!({
            "type": "split", "id": "s", "direction": "horizontal", "sizes": [0, 0],
            "children": [
                {"type": "leaf", "id": "a", "content": {"kind": "picker"}},
                {"type": "leaf", "id": "b", "content": {"kind": "picker"}}
            ]
        });
        match repair_layout(&value).unwrap() {
            PaneNode::Split { sizes, .. } => assert_eq!(sizes, [50.0, 50.0]),
            other => panic!("expected split, got {:?}", other),
        }
    }

    #[test]
    fn duplicate_and_missing_ids_are_reissued() {
        let value = json!({
            "type": "split", "id": "a", "direction": "horizontal", "sizes": [50, 50],
            "children": [
                {"type": "leaf", "id": "a", "content": {"kind": "picker"}},
                {"type": "leaf", "content": {"kind": "picker"}}
            ]
        });
        let node = repair_layout(&value).unwrap();
        let ids = node.collect_leaf_ids();
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], "a");
        assert_ne!(ids[0], ids[1]);
        assert!(!ids[1].is_empty());
        assert_eq!(node.id(), "a");
    }

    #[test]
    fn extra_children_nest_in_order() {
        let value = json!({
            "type": "split", "id": "s", "direction": "vertical", "sizes": [33, 33, 34],
            "children": [
                {"type": "leaf", "id": "a", "content": {"kind": "picker"}},
                {"type": "leaf", "id": "b", "content": {"kind": "picker"}},
                {"type": "leaf", "id": "c", "content": {"kind": "picker"}}
            ]
        });
        let node = repair_layout(&value).unwrap();
        assert_eq!(node.collect_leaf_ids(), vec!["a", "b", "c"]);
        assert_eq!(node.count_leaves(), 3);
    }

    #[test]
    fn non_objects_and_empty_splits_are_dropped() {
        assert!(repair_layout(&json!(42)).is_none());
        assert!(repair_layout(&json!({"type": "split", "children": []})).is_none());
    }
}
