use devscope_core::{serialize, SerializedValue, Value};
use devscope_graph::{
    build_graph, layout_graph, lookup_path, ExpansionState, LayoutConfig, NodeKind, Point,
    ViewportController, DEFAULT_MAX_NODES,
};

fn shop_state() -> SerializedValue {
    serialize(&Value::object([
        (
            "cart",
            Value::object([
                ("items", Value::array([Value::from("apple"), Value::from("pear")])),
                ("total", Value::from(4.5)),
            ]),
        ),
        (
            "user",
            Value::object([(
                "profile",
                Value::object([(
                    "address",
                    Value::object([("city", Value::from("Lyon"))]),
                )]),
            )]),
        ),
    ]))
}

#[test]
fn depth_limit_hides_deep_nodes_until_expanded() {
    let state = shop_state();
    let mut expansion = ExpansionState::new(2);

    let graph = build_graph(&state, |id, d| expansion.should_expand(id, d), DEFAULT_MAX_NODES);
    assert!(graph.node("state.user.profile").is_some());
    assert!(graph.node("state.user.profile.address").is_none());

    let profile = graph.node("state.user.profile").cloned().unwrap();
    assert_eq!(profile.kind, NodeKind::Object);
    assert!(expansion.toggle(&profile));

    let graph = build_graph(&state, |id, d| expansion.should_expand(id, d), DEFAULT_MAX_NODES);
    assert!(graph.node("state.user.profile.address").is_some());
    assert!(graph.node("state.user.profile.address.city").is_none());
}

#[test]
fn collapsing_root_leaves_single_node() {
    let state = shop_state();
    let mut expansion = ExpansionState::default();
    expansion.collapse("state");

    let graph = build_graph(&state, |id, d| expansion.should_expand(id, d), DEFAULT_MAX_NODES);
    assert_eq!(graph.len(), 1);
    assert!(graph.edges.is_empty());
}

#[test]
fn every_edge_has_positioned_ends() {
    let state = shop_state();
    let graph = build_graph(&state, |_, _| true, DEFAULT_MAX_NODES);
    let layout = layout_graph(&graph.nodes, &LayoutConfig::default());

    assert_eq!(layout.positions.len(), graph.len());
    for edge in &graph.edges {
        let path = layout.edge_path(edge).expect("both ends laid out");
        assert!(path.start.x < path.end.x);
    }
}

#[test]
fn budget_holds_for_wide_state() {
    let wide = Value::object((0..500).map(|i| (format!("k{i}"), Value::from(i))));
    let graph = build_graph(&serialize(&wide), |_, _| true, DEFAULT_MAX_NODES);

    assert_eq!(graph.len(), DEFAULT_MAX_NODES);
    assert!(graph.edges.iter().all(|e| graph.node(&e.target).is_some()));
}

#[test]
fn leaf_lookup_resolves_built_nodes() {
    let state = shop_state();
    let graph = build_graph(&state, |_, _| true, DEFAULT_MAX_NODES);

    for node in graph.nodes.iter().filter(|n| n.kind == NodeKind::Value) {
        assert!(lookup_path(&state, &node.id).is_some(), "{}", node.id);
    }
    assert_eq!(
        lookup_path(&state, "state.cart.items.1"),
        Some(&SerializedValue::from("pear"))
    );
}

#[test]
fn zoom_then_pan_keeps_layout_untouched() {
    let state = shop_state();
    let graph = build_graph(&state, |_, _| true, DEFAULT_MAX_NODES);
    let layout = layout_graph(&graph.nodes, &LayoutConfig::default());
    let root = layout.position("state").unwrap();

    let mut viewport = ViewportController::new();
    viewport.zoom_in(layout.view_box());
    viewport.pointer_down(1, Point::new(10.0, 10.0), true);
    viewport.pointer_move(1, Point::new(60.0, 10.0));
    viewport.pointer_up(1);

    let drawn = viewport.transform().to_view(root);
    let back = viewport.transform().to_content(drawn);
    assert!((back.x - root.x).abs() < 1e-3);
    assert_eq!(layout.position("state"), Some(root));
}
