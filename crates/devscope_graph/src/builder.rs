//! Breadth-first node/edge builder.

use std::collections::VecDeque;

use devscope_core::SerializedValue;
use rustc_hash::FxHashSet;
use serde::Serialize;
use tracing::trace;

use crate::expansion::ROOT_ID;

/// Node budget used by the graph view.
pub const DEFAULT_MAX_NODES: usize = 200;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// A plain object. Arrays are drawn as values even though they expand.
    Object,
    Value,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GraphNode {
    /// Dotted path from the root, e.g. `state.user.name`.
    pub id: String,
    /// Key under the parent.
    pub label: String,
    pub depth: usize,
    pub kind: NodeKind,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Graph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl Graph {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Ids of the direct children of `id`, in edge order.
    pub fn children<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.edges
            .iter()
            .filter(move |e| e.source == id)
            .map(|e| e.target.as_str())
    }
}

struct Pending<'a> {
    id: String,
    label: String,
    value: &'a SerializedValue,
    depth: usize,
}

/// Build the node/edge list for `root`, breadth first.
///
/// `should_expand(id, depth)` decides whether a node's children are visited.
/// At most `max_nodes` nodes are emitted; children stop being queued once the
/// emitted plus queued count reaches the budget, so every edge ends at an
/// emitted node. A child whose dotted id collides with one already emitted or
/// queued is skipped along with its edge.
pub fn build_graph(
    root: &SerializedValue,
    should_expand: impl Fn(&str, usize) -> bool,
    max_nodes: usize,
) -> Graph {
    let mut graph = Graph::default();
    let mut known: FxHashSet<String> = FxHashSet::default();
    let mut queue: VecDeque<Pending<'_>> = VecDeque::new();

    known.insert(ROOT_ID.to_string());
    queue.push_back(Pending {
        id: ROOT_ID.to_string(),
        label: ROOT_ID.to_string(),
        value: root,
        depth: 0,
    });

    while graph.nodes.len() < max_nodes {
        let Some(item) = queue.pop_front() else {
            break;
        };

        graph.nodes.push(GraphNode {
            id: item.id.clone(),
            label: item.label,
            depth: item.depth,
            kind: if item.value.is_object() {
                NodeKind::Object
            } else {
                NodeKind::Value
            },
        });

        if !should_expand(&item.id, item.depth) || !item.value.is_container() {
            continue;
        }

        for (key, child) in item.value.children() {
            if graph.nodes.len() + queue.len() >= max_nodes {
                trace!(max_nodes, "graph node budget reached");
                break;
            }
            let child_id = format!("{}.{}", item.id, key);
            if !known.insert(child_id.clone()) {
                trace!(id = %child_id, "duplicate graph id skipped");
                continue;
            }
            graph.edges.push(GraphEdge {
                source: item.id.clone(),
                target: child_id.clone(),
            });
            queue.push_back(Pending {
                id: child_id,
                label: key,
                value: child,
                depth: item.depth + 1,
            });
        }
    }

    graph
}

/// Resolve a node id back to the value it was built from.
///
/// The root prefix is stripped and the rest is walked one dotted segment at a
/// time; array segments are indices. Keys that themselves contain `.` cannot
/// be resolved.
pub fn lookup_path<'a>(root: &'a SerializedValue, id: &str) -> Option<&'a SerializedValue> {
    if id == ROOT_ID {
        return Some(root);
    }
    let path = id
        .strip_prefix(ROOT_ID)
        .and_then(|rest| rest.strip_prefix('.'))
        .unwrap_or(id);

    path.split('.')
        .filter(|part| !part.is_empty())
        .try_fold(root, |value, part| match value {
            SerializedValue::Object(_) => value.get(part),
            SerializedValue::Array(_) => part.parse::<usize>().ok().and_then(|i| value.at(i)),
            _ => None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(json: &str) -> SerializedValue {
        SerializedValue::from_json(&serde_json::from_str(json).unwrap())
    }

    fn ids(graph: &Graph) -> Vec<&str> {
        graph.nodes.iter().map(|n| n.id.as_str()).collect()
    }

    #[test]
    fn test_breadth_first_order() {
        let state = parse(r#"{"a": {"x": 1}, "b": [true, null]}"#);
        let graph = build_graph(&state, |_, _| true, DEFAULT_MAX_NODES);

        assert_eq!(
            ids(&graph),
            vec!["state", "state.a", "state.b", "state.a.x", "state.b.0", "state.b.1"]
        );
        assert_eq!(graph.node("state.a").map(|n| n.kind), Some(NodeKind::Object));
        assert_eq!(graph.node("state.b").map(|n| n.kind), Some(NodeKind::Value));
        assert_eq!(graph.node("state.b.1").map(|n| n.label.as_str()), Some("1"));
        assert_eq!(graph.children("state.b").collect::<Vec<_>>(), vec!["state.b.0", "state.b.1"]);
    }

    #[test]
    fn test_collapsed_children_skipped() {
        let state = parse(r#"{"a": {"x": 1}, "b": 2}"#);
        let graph = build_graph(&state, |id, _| id != "state.a", DEFAULT_MAX_NODES);

        assert_eq!(ids(&graph), vec!["state", "state.a", "state.b"]);
        assert_eq!(graph.edges.len(), 2);
    }

    #[test]
    fn test_primitive_root() {
        let graph = build_graph(&SerializedValue::from(7), |_, _| true, DEFAULT_MAX_NODES);
        assert_eq!(ids(&graph), vec!["state"]);
        assert_eq!(graph.nodes[0].kind, NodeKind::Value);
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn test_budget_bounds_nodes_and_edges() {
        let items: Vec<String> = (0..50).map(|i| i.to_string()).collect();
        let state = parse(&format!("[{}]", items.join(",")));

        let graph = build_graph(&state, |_, _| true, 10);
        assert_eq!(graph.len(), 10);
        assert_eq!(graph.edges.len(), 9);
        assert!(graph.edges.iter().all(|e| graph.node(&e.target).is_some()));
    }

    #[test]
    fn test_budget_of_one() {
        let state = parse(r#"{"a": 1}"#);
        let graph = build_graph(&state, |_, _| true, 1);
        assert_eq!(ids(&graph), vec!["state"]);
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn test_dotted_key_collision() {
        let state = parse(r#"{"a": {"b": 1}, "a.b": 2}"#);
        let graph = build_graph(&state, |_, _| true, DEFAULT_MAX_NODES);

        assert_eq!(ids(&graph), vec!["state", "state.a", "state.a.b"]);
        assert_eq!(graph.edges.len(), 2);
        let mut unique = ids(&graph);
        unique.dedup();
        assert_eq!(unique.len(), graph.len());
    }

    #[test]
    fn test_lookup_path() {
        let state = parse(r#"{"user": {"tags": ["a", "b"]}, "n": 1}"#);

        assert_eq!(lookup_path(&state, "state"), Some(&state));
        assert_eq!(lookup_path(&state, "state.n"), Some(&SerializedValue::from(1)));
        assert_eq!(
            lookup_path(&state, "state.user.tags.1"),
            Some(&SerializedValue::from("b"))
        );
        assert_eq!(lookup_path(&state, "state.user.missing"), None);
        assert_eq!(lookup_path(&state, "state.n.deeper"), None);
    }
}
