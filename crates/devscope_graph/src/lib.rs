//! Graph view of a state tree.
//!
//! Turns a [`SerializedValue`](devscope_core::SerializedValue) into nodes and
//! edges, lays them out in depth columns and tracks the pan/zoom transform the
//! diagram is drawn with.
//!
//! ```rust
//! use devscope_core::{serialize, Value};
//! use devscope_graph::{build_graph, layout_graph, ExpansionState, LayoutConfig, DEFAULT_MAX_NODES};
//!
//! let state = serialize(&Value::object([
//!     ("user", Value::object([("name", Value::from("ada"))])),
//!     ("count", Value::from(3)),
//! ]));
//!
//! let expansion = ExpansionState::default();
//! let graph = build_graph(&state, |id, depth| expansion.should_expand(id, depth), DEFAULT_MAX_NODES);
//! let ids: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
//! assert_eq!(ids, ["state", "state.user", "state.count", "state.user.name"]);
//!
//! let layout = layout_graph(&graph.nodes, &LayoutConfig::default());
//! assert_eq!(layout.width, 2.0 * 40.0 + 3.0 * 180.0);
//! ```

mod builder;
mod expansion;
mod layout;
mod viewport;

pub use builder::{build_graph, lookup_path, Graph, GraphEdge, GraphNode, NodeKind, DEFAULT_MAX_NODES};
pub use expansion::{ExpansionState, DEFAULT_MAX_DEPTH, ROOT_ID};
pub use layout::{layout_graph, EdgePath, GraphLayout, LayoutConfig, Point};
pub use viewport::{
    clamp_scale, Modifiers, PointerId, ViewTransform, ViewportController, ViewportState,
    BUTTON_ZOOM_FACTOR, DRAG_THRESHOLD, MAX_SCALE, MIN_SCALE, WHEEL_ZOOM_RATE,
};
