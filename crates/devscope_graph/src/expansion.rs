//! Per-node expand/collapse state.

use rustc_hash::FxHashSet;
use tracing::trace;

use crate::builder::{GraphNode, NodeKind};

/// Id and label of the root node.
pub const ROOT_ID: &str = "state";

/// Depth below which nodes are expanded by default.
pub const DEFAULT_MAX_DEPTH: usize = 3;

/// Which graph nodes show their children, and which leaves show their value.
///
/// An explicit collapse beats an explicit expand, which beats the depth
/// default. The root starts explicitly expanded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExpansionState {
    expanded: FxHashSet<String>,
    collapsed: FxHashSet<String>,
    open_values: FxHashSet<String>,
    max_depth: usize,
}

impl Default for ExpansionState {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

impl ExpansionState {
    pub fn new(max_depth: usize) -> Self {
        let mut expanded = FxHashSet::default();
        expanded.insert(ROOT_ID.to_string());
        Self {
            expanded,
            collapsed: FxHashSet::default(),
            open_values: FxHashSet::default(),
            max_depth,
        }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn set_max_depth(&mut self, max_depth: usize) {
        self.max_depth = max_depth;
    }

    /// Whether the node `id` at `depth` shows its children.
    pub fn should_expand(&self, id: &str, depth: usize) -> bool {
        if self.collapsed.contains(id) {
            return false;
        }
        if self.expanded.contains(id) {
            return true;
        }
        depth < self.max_depth
    }

    pub fn expand(&mut self, id: &str) {
        self.collapsed.remove(id);
        self.expanded.insert(id.to_string());
    }

    pub fn collapse(&mut self, id: &str) {
        self.expanded.remove(id);
        self.collapsed.insert(id.to_string());
    }

    /// Flip an object node between open and closed. Returns the new state.
    pub fn toggle_node(&mut self, id: &str, depth: usize) -> bool {
        let open = !self.should_expand(id, depth);
        if open {
            self.expand(id);
        } else {
            self.collapse(id);
        }
        trace!(id, open, "graph node toggled");
        open
    }

    /// Show or hide a leaf's value bubble. Returns the new state.
    pub fn toggle_value(&mut self, id: &str) -> bool {
        let open = !self.open_values.remove(id);
        if open {
            self.open_values.insert(id.to_string());
        }
        open
    }

    /// Click on `node`: objects expand or collapse, leaves show or hide
    /// their value.
    pub fn toggle(&mut self, node: &GraphNode) -> bool {
        match node.kind {
            NodeKind::Object => self.toggle_node(&node.id, node.depth),
            NodeKind::Value => self.toggle_value(&node.id),
        }
    }

    pub fn is_value_open(&self, id: &str) -> bool {
        self.open_values.contains(id)
    }

    /// Forget every explicit choice.
    pub fn reset(&mut self) {
        *self = Self::new(self.max_depth);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, depth: usize, kind: NodeKind) -> GraphNode {
        GraphNode {
            id: id.to_string(),
            label: id.rsplit('.').next().unwrap_or(id).to_string(),
            depth,
            kind,
        }
    }

    #[test]
    fn test_depth_default() {
        let state = ExpansionState::new(2);
        assert!(state.should_expand("state.a", 1));
        assert!(!state.should_expand("state.a.b", 2));
    }

    #[test]
    fn test_root_expanded_even_at_zero_depth() {
        let state = ExpansionState::new(0);
        assert!(state.should_expand(ROOT_ID, 0));
        assert!(!state.should_expand("state.a", 1));
    }

    #[test]
    fn test_collapsed_wins() {
        let mut state = ExpansionState::new(3);
        state.expand("state.a");
        state.collapsed.insert("state.a".to_string());
        assert!(!state.should_expand("state.a", 1));
    }

    #[test]
    fn test_toggle_object_node() {
        let mut state = ExpansionState::new(1);
        let shallow = node("state.a", 0, NodeKind::Object);
        let deep = node("state.a.b", 4, NodeKind::Object);

        assert!(!state.toggle(&shallow));
        assert!(!state.should_expand("state.a", 0));
        assert!(state.toggle(&shallow));
        assert!(state.should_expand("state.a", 0));

        assert!(state.toggle(&deep));
        assert!(state.should_expand("state.a.b", 4));
    }

    #[test]
    fn test_toggle_leaf_value() {
        let mut state = ExpansionState::default();
        let leaf = node("state.count", 1, NodeKind::Value);

        assert!(state.toggle(&leaf));
        assert!(state.is_value_open("state.count"));
        assert!(!state.toggle(&leaf));
        assert!(!state.is_value_open("state.count"));
        assert!(state.should_expand("state.count", 1));
    }

    #[test]
    fn test_reset_keeps_max_depth() {
        let mut state = ExpansionState::new(5);
        state.collapse(ROOT_ID);
        state.toggle_value("state.x");
        state.reset();
        assert_eq!(state, ExpansionState::new(5));
    }
}
