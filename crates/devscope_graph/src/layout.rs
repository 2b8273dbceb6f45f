//! Column layout: one column per depth, nodes stacked and centered.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::Serialize;

use crate::builder::{GraphEdge, GraphNode};

/// Minimum height of the node area, excluding padding.
const MIN_CONTENT_HEIGHT: f32 = 280.0;
/// Minimum drawing surface.
const MIN_VIEW_WIDTH: f32 = 600.0;
const MIN_VIEW_HEIGHT: f32 = 300.0;

/// 2D point in layout (content) coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f32 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    pub fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutConfig {
    /// Horizontal distance between depth columns.
    pub col_width: f32,
    /// Vertical distance between nodes in a column.
    pub row_gap: f32,
    pub padding: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            col_width: 180.0,
            row_gap: 70.0,
            padding: 40.0,
        }
    }
}

/// Node positions plus the content size.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct GraphLayout {
    pub positions: IndexMap<String, Point>,
    pub width: f32,
    pub height: f32,
}

impl GraphLayout {
    pub fn position(&self, id: &str) -> Option<Point> {
        self.positions.get(id).copied()
    }

    /// Size of the drawing surface: the content size, but never smaller than
    /// 600 x 300.
    pub fn view_box(&self) -> (f32, f32) {
        (self.width.max(MIN_VIEW_WIDTH), self.height.max(MIN_VIEW_HEIGHT))
    }

    /// Curve for `edge`, or `None` if either end has no position.
    pub fn edge_path(&self, edge: &GraphEdge) -> Option<EdgePath> {
        let start = self.position(&edge.source)?;
        let end = self.position(&edge.target)?;
        Some(EdgePath::between(start, end))
    }
}

/// Cubic Bézier from a parent to a child, with both control points on the
/// vertical halfway between them.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct EdgePath {
    pub start: Point,
    pub control1: Point,
    pub control2: Point,
    pub end: Point,
}

impl EdgePath {
    pub fn between(start: Point, end: Point) -> Self {
        let mid_x = (start.x + end.x) / 2.0;
        Self {
            start,
            control1: Point::new(mid_x, start.y),
            control2: Point::new(mid_x, end.y),
            end,
        }
    }

    /// SVG path data, e.g. `M 40,150 C 130,150 130,80 220,80`.
    pub fn to_svg(&self) -> String {
        format!(
            "M {},{} C {},{} {},{} {},{}",
            self.start.x,
            self.start.y,
            self.control1.x,
            self.control1.y,
            self.control2.x,
            self.control2.y,
            self.end.x,
            self.end.y
        )
    }
}

/// Place `nodes` in depth columns.
///
/// Column `d` sits at `padding + d * col_width`. Nodes keep their input order
/// within a column, `row_gap` apart, and each column is centered vertically.
pub fn layout_graph(nodes: &[GraphNode], config: &LayoutConfig) -> GraphLayout {
    let mut columns: BTreeMap<usize, Vec<&GraphNode>> = BTreeMap::new();
    for node in nodes {
        columns.entry(node.depth).or_default().push(node);
    }

    let max_depth = columns.keys().next_back().copied().unwrap_or(0);
    let max_column = columns.values().map(Vec::len).max().unwrap_or(1).max(1);

    let width = config.padding * 2.0 + (max_depth + 1) as f32 * config.col_width;
    let height =
        config.padding * 2.0 + MIN_CONTENT_HEIGHT.max(max_column as f32 * config.row_gap);

    let mut positions = IndexMap::with_capacity(nodes.len());
    for (depth, column) in &columns {
        let x = config.padding + *depth as f32 * config.col_width;
        let span = (column.len() - 1) as f32 * config.row_gap;
        let start_y = height / 2.0 - span / 2.0;
        for (row, node) in column.iter().enumerate() {
            positions.insert(
                node.id.clone(),
                Point::new(x, start_y + row as f32 * config.row_gap),
            );
        }
    }

    GraphLayout {
        positions,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::NodeKind;
    use pretty_assertions::assert_eq;

    fn node(id: &str, depth: usize) -> GraphNode {
        GraphNode {
            id: id.to_string(),
            label: id.to_string(),
            depth,
            kind: NodeKind::Value,
        }
    }

    #[test]
    fn test_empty_layout() {
        let layout = layout_graph(&[], &LayoutConfig::default());
        assert_eq!(layout.width, 260.0);
        assert_eq!(layout.height, 360.0);
        assert!(layout.positions.is_empty());
        assert_eq!(layout.view_box(), (600.0, 360.0));
    }

    #[test]
    fn test_columns_centered() {
        let nodes = vec![node("state", 0), node("a", 1), node("b", 1), node("c", 1)];
        let layout = layout_graph(&nodes, &LayoutConfig::default());

        assert_eq!(layout.width, 80.0 + 2.0 * 180.0);
        assert_eq!(layout.height, 80.0 + 280.0);
        assert_eq!(layout.position("state"), Some(Point::new(40.0, 180.0)));
        assert_eq!(layout.position("a"), Some(Point::new(220.0, 110.0)));
        assert_eq!(layout.position("b"), Some(Point::new(220.0, 180.0)));
        assert_eq!(layout.position("c"), Some(Point::new(220.0, 250.0)));
    }

    #[test]
    fn test_tall_column_grows_height() {
        let mut nodes = vec![node("state", 0)];
        nodes.extend((0..6).map(|i| node(&format!("n{i}"), 1)));
        let layout = layout_graph(&nodes, &LayoutConfig::default());

        assert_eq!(layout.height, 80.0 + 420.0);
        assert_eq!(layout.position("n0"), Some(Point::new(220.0, 75.0)));
        assert_eq!(layout.position("n5"), Some(Point::new(220.0, 425.0)));
    }

    #[test]
    fn test_edge_path() {
        let nodes = vec![node("state", 0), node("a", 1), node("b", 1)];
        let layout = layout_graph(&nodes, &LayoutConfig::default());
        let edge = GraphEdge {
            source: "state".to_string(),
            target: "a".to_string(),
        };

        let path = layout.edge_path(&edge).unwrap();
        assert_eq!(path.to_svg(), "M 40,180 C 130,180 130,145 220,145");

        let dangling = GraphEdge {
            source: "state".to_string(),
            target: "missing".to_string(),
        };
        assert_eq!(layout.edge_path(&dangling), None);
    }
}
