use freshell_core::content::PaneContent;
use freshell_core::types::SplitDirection;
use serde::{Deserialize, Serialize};

/// Smallest share a split child can be resized to, in percent.
pub const MIN_SPLIT_PERCENT: f32 = 5.0;

/// Fresh random pane/split id.
pub fn new_pane_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Recursive pane tree node
///
/// A split always has exactly two children; `sizes` are percentages of the
/// split's extent and sum to 100.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PaneNode {
    Leaf {
        id: String,
        content: PaneContent,
    },
    Split {
        id: String,
        direction: SplitDirection,
        sizes: [f32; 2],
        children: Box<[PaneNode; 2]>,
    },
}

impl PaneNode {
    /// New leaf with a generated id.
    pub fn leaf(content: PaneContent) -> Self {
        PaneNode::Leaf {
            id: new_pane_id(),
            content,
        }
    }

    /// New even split with a generated id.
    pub fn split(direction: SplitDirection, first: PaneNode, second: PaneNode) -> Self {
        PaneNode::Split {
            id: new_pane_id(),
            direction,
            sizes: [50.0, 50.0],
            children: Box::new([first, second]),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            PaneNode::Leaf { id, .. } | PaneNode::Split { id, .. } => id,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, PaneNode::Leaf { .. })
    }

    /// Leaf ids, depth-first, first child before second.
    pub fn collect_leaf_ids(&self) -> Vec<String> {
        self.collect_leaves()
            .into_iter()
            .map(|(id, _)| id.to_string())
            .collect()
    }

    /// Leaf contents in the same order as [`collect_leaf_ids`](Self::collect_leaf_ids).
    pub fn collect_pane_contents(&self) -> Vec<&PaneContent> {
        self.collect_leaves()
            .into_iter()
            .map(|(_, content)| content)
            .collect()
    }

    /// `(pane_id, content)` pairs, depth-first.
    pub fn collect_leaves(&self) -> Vec<(&str, &PaneContent)> {
        let mut leaves = Vec::new();
        self.collect_leaves_recursive(&mut leaves);
        leaves
    }

    fn collect_leaves_recursive<'a>(&'a self, leaves: &mut Vec<(&'a str, &'a PaneContent)>) {
        match self {
            PaneNode::Leaf { id, content } => leaves.push((id.as_str(), content)),
            PaneNode::Split { children, .. } => {
                for child in children.iter() {
                    child.collect_leaves_recursive(leaves);
                }
            }
        }
    }

    pub fn count_leaves(&self) -> usize {
        match self {
            PaneNode::Leaf { .. } => 1,
            PaneNode::Split { children, .. } => children.iter().map(PaneNode::count_leaves).sum(),
        }
    }

    pub fn find_pane_content(&self, pane_id: &str) -> Option<&PaneContent> {
        match self {
            PaneNode::Leaf { id, content } => (id == pane_id).then_some(content),
            PaneNode::Split { children, .. } => {
                children.iter().find_map(|c| c.find_pane_content(pane_id))
            }
        }
    }

    pub fn find_pane_content_mut(&mut self, pane_id: &str) -> Option<&mut PaneContent> {
        match self {
            PaneNode::Leaf { id, content } => (id == pane_id).then_some(content),
            PaneNode::Split { children, .. } => children
                .iter_mut()
                .find_map(|c| c.find_pane_content_mut(pane_id)),
        }
    }

    /// True if any node (leaf or split) carries `node_id`.
    pub fn contains(&self, node_id: &str) -> bool {
        self.id() == node_id
            || match self {
                PaneNode::Leaf { .. } => false,
                PaneNode::Split { children, .. } => children.iter().any(|c| c.contains(node_id)),
            }
    }

    pub fn first_leaf_id(&self) -> &str {
        match self {
            PaneNode::Leaf { id, .. } => id,
            PaneNode::Split { children, .. } => children[0].first_leaf_id(),
        }
    }

    pub fn last_leaf_id(&self) -> &str {
        match self {
            PaneNode::Leaf { id, .. } => id,
            PaneNode::Split { children, .. } => children[1].last_leaf_id(),
        }
    }

    /// Replace the leaf `target_id` with a split of (old leaf, `new_leaf`).
    /// Returns false if no such leaf exists.
    pub fn split_leaf(
        &mut self,
        target_id: &str,
        direction: SplitDirection,
        new_leaf: PaneNode,
    ) -> bool {
        if matches!(self, PaneNode::Leaf { id, .. } if id == target_id) {
            let old = std::mem::replace(self, placeholder());
            *self = PaneNode::split(direction, old, new_leaf);
            return true;
        }
        match self {
            PaneNode::Leaf { .. } => false,
            PaneNode::Split { children, .. } => {
                let [first, second] = &mut **children;
                if first.contains(target_id) {
                    first.split_leaf(target_id, direction, new_leaf)
                } else {
                    second.split_leaf(target_id, direction, new_leaf)
                }
            }
        }
    }

    /// Remove the leaf `pane_id` and promote its sibling into the parent's
    /// position. Returns the first leaf id of the promoted sibling.
    ///
    /// The root itself is never removed: a tree that is a single matching
    /// leaf returns `None` like an unknown id does.
    pub fn remove_leaf(&mut self, pane_id: &str) -> Option<String> {
        let PaneNode::Split { children, .. } = self else {
            return None;
        };

        let is_target = |node: &PaneNode| matches!(node, PaneNode::Leaf { id, .. } if id == pane_id);
        let sibling_index = if is_target(&children[0]) {
            1
        } else if is_target(&children[1]) {
            0
        } else {
            let [first, second] = &mut **children;
            return first
                .remove_leaf(pane_id)
                .or_else(|| second.remove_leaf(pane_id));
        };

        let [first, second] = std::mem::replace(&mut **children, [placeholder(), placeholder()]);
        let sibling = if sibling_index == 0 { first } else { second };
        let promoted_first = sibling.first_leaf_id().to_string();
        *self = sibling;
        Some(promoted_first)
    }

    /// Set the sizes of split `split_id`. Returns false if not found.
    pub fn set_split_sizes(&mut self, split_id: &str, new_sizes: [f32; 2]) -> bool {
        match self {
            PaneNode::Leaf { .. } => false,
            PaneNode::Split { id, sizes, .. } if id == split_id => {
                *sizes = new_sizes;
                true
            }
            PaneNode::Split { children, .. } => children
                .iter_mut()
                .any(|c| c.set_split_sizes(split_id, new_sizes)),
        }
    }
}

/// Temporary node used while moving subtrees out of `&mut self`.
fn placeholder() -> PaneNode {
    PaneNode::Leaf {
        id: String::new(),
        content: PaneContent::Picker,
    }
}

/// Clamp a pair of sizes to `[MIN_SPLIT_PERCENT, 100 - MIN_SPLIT_PERCENT]`
/// and rescale to sum to 100. Returns `None` for unusable input.
pub fn normalize_sizes(sizes: [f32; 2]) -> Option<[f32; 2]> {
    if sizes.iter().any(|s| !s.is_finite() || *s < 0.0) {
        return None;
    }
    let total = sizes[0] + sizes[1];
    if total <= 0.0 {
        return None;
    }
    let first = (sizes[0] * 100.0 / total).clamp(MIN_SPLIT_PERCENT, 100.0 - MIN_SPLIT_PERCENT);
    Some([first, 100.0 - first])
}
