//! Inspector state for a DevTools overlay.

use std::rc::Rc;

use devscope_core::display::{format_value_for_copy, leaf_value_string, truncate_value};
use devscope_core::{serialize, SerializedValue, Store};
use devscope_graph::{
    build_graph, layout_graph, lookup_path, ExpansionState, Graph, GraphLayout, LayoutConfig,
    NodeKind, ViewTransform, ViewportController, DEFAULT_MAX_NODES,
};
use devscope_history::{HistoryRecorder, PlaybackState, RecorderConfig};
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::highlight::{highlighter, HighlightedLine};
use crate::json_view::{JsonRow, JsonTree};
use crate::settings::{DevtoolsSettings, SettingsManager, SettingsStorage};

/// Which tab of the panel is showing
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ViewMode {
    #[default]
    Json,
    History,
    Graph,
    Settings,
}

/// The history tab of the selected store
#[derive(Clone, Debug, PartialEq)]
pub struct HistoryView {
    pub store: String,
    /// `"current/total"`, one-based
    pub position_label: String,
    pub index: usize,
    pub len: usize,
    pub playing: bool,
    pub recording: bool,
    pub can_step_back: bool,
    pub can_step_forward: bool,
    /// Snapshot at the current index
    pub snapshot: Option<SerializedValue>,
    /// The snapshot as highlighted, pretty printed JSON
    pub snapshot_lines: Vec<HighlightedLine>,
}

/// The graph tab of the selected store
#[derive(Clone, Debug, PartialEq)]
pub struct GraphView {
    pub store: String,
    pub graph: Graph,
    pub layout: GraphLayout,
    pub transform: ViewTransform,
    pub fit_width: bool,
    /// `(node id, value text)` for every leaf whose value bubble is open
    pub open_values: Vec<(String, String)>,
}

/// Registered stores, selection and view state of one DevTools panel.
///
/// The panel owns a [`HistoryRecorder`]; graph expansion, viewport and JSON
/// outline state are kept per store so switching back and forth preserves
/// them.
pub struct DevtoolsPanel<S> {
    settings: SettingsManager<S>,
    recorder: HistoryRecorder,
    open: bool,
    view: ViewMode,
    json_trees: FxHashMap<String, JsonTree>,
    expansions: FxHashMap<String, ExpansionState>,
    viewports: FxHashMap<String, ViewportController>,
    layout: LayoutConfig,
    max_nodes: usize,
}

impl<S: SettingsStorage> DevtoolsPanel<S> {
    /// Create a panel whose settings come from `storage`, with `defaults`
    /// filling whatever is not stored.
    pub fn new(storage: S, defaults: DevtoolsSettings) -> Self {
        let settings = SettingsManager::new(storage, defaults);
        let history = &settings.get().history;
        let config = RecorderConfig::default()
            .with_max_history(history.max_history)
            .with_playback_ms(history.playback_ms)
            .with_recording(history.recording);

        Self {
            recorder: HistoryRecorder::new(config),
            settings,
            open: false,
            view: ViewMode::default(),
            json_trees: FxHashMap::default(),
            expansions: FxHashMap::default(),
            viewports: FxHashMap::default(),
            layout: LayoutConfig::default(),
            max_nodes: DEFAULT_MAX_NODES,
        }
    }

    /// Node budget of the graph view.
    pub fn with_max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = max_nodes;
        self
    }

    pub fn with_layout(mut self, layout: LayoutConfig) -> Self {
        self.layout = layout;
        self
    }

    pub fn recorder(&self) -> &HistoryRecorder {
        &self.recorder
    }

    pub fn recorder_mut(&mut self) -> &mut HistoryRecorder {
        &mut self.recorder
    }

    // ------------------------------------------------------------------
    // Stores
    // ------------------------------------------------------------------

    /// Start inspecting `store` under `name`. The first store registered
    /// becomes the selected one.
    pub fn register_store(&mut self, name: impl Into<String>, store: Rc<dyn Store>) {
        let name = name.into();
        let settings = self.settings.get();
        self.expansions
            .entry(name.clone())
            .or_insert_with(|| ExpansionState::new(settings.graph.max_depth));
        self.json_trees
            .entry(name.clone())
            .or_insert_with(|| JsonTree::new(settings.json.expand_by_default));
        self.viewports.entry(name.clone()).or_default();

        debug!(store = %name, "store registered");
        self.recorder.register(name, store);
    }

    /// Stop inspecting `name`, dropping its history and view state.
    pub fn unregister_store(&mut self, name: &str) -> bool {
        self.expansions.remove(name);
        self.json_trees.remove(name);
        self.viewports.remove(name);
        self.recorder.unregister(name)
    }

    pub fn store_names(&self) -> Vec<String> {
        self.recorder.store_names().map(str::to_string).collect()
    }

    pub fn selected_store(&self) -> Option<&str> {
        self.recorder.selected()
    }

    /// Select `name`; stops playback when the selection changes.
    pub fn select_store(&mut self, name: &str) -> bool {
        self.recorder.select(name)
    }

    // ------------------------------------------------------------------
    // Panel chrome
    // ------------------------------------------------------------------

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn set_open(&mut self, open: bool) {
        self.open = open;
    }

    pub fn toggle_open(&mut self) -> bool {
        self.open = !self.open;
        self.open
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view
    }

    pub fn set_view_mode(&mut self, view: ViewMode) {
        if self.view != view {
            trace!(?view, "view mode changed");
            self.view = view;
        }
    }

    // ------------------------------------------------------------------
    // Settings
    // ------------------------------------------------------------------

    pub fn settings(&self) -> &DevtoolsSettings {
        self.settings.get()
    }

    pub fn settings_manager(&self) -> &SettingsManager<S> {
        &self.settings
    }

    /// Edit, clamp and persist the settings, then push them to the recorder
    /// and the views.
    pub fn update_settings(&mut self, edit: impl FnOnce(&mut DevtoolsSettings)) {
        self.settings.update(edit);
        self.apply_settings();
    }

    /// Restore the defaults and forget the stored settings.
    pub fn reset_settings(&mut self) {
        self.settings.reset();
        self.apply_settings();
    }

    fn apply_settings(&mut self) {
        let settings = self.settings.get().clone();

        self.recorder.set_recording(settings.history.recording);
        self.recorder.set_max_history(settings.history.max_history);
        if self.recorder.playback_ms() != settings.history.playback_ms {
            self.recorder.set_playback_ms(settings.history.playback_ms);
        }
        for expansion in self.expansions.values_mut() {
            expansion.set_max_depth(settings.graph.max_depth);
        }
        for tree in self.json_trees.values_mut() {
            tree.set_expand_by_default(settings.json.expand_by_default);
        }
        debug!(?settings, "settings applied");
    }

    // ------------------------------------------------------------------
    // JSON view
    // ------------------------------------------------------------------

    /// Live state of the selected store, serialized.
    pub fn serialized_state(&self) -> Option<SerializedValue> {
        let name = self.recorder.selected()?;
        let store = self.recorder.store(name)?;
        Some(serialize(&store.get_state()))
    }

    pub fn json_rows(&self) -> Vec<JsonRow> {
        match (self.serialized_state(), self.json_tree()) {
            (Some(state), Some(tree)) => tree.rows(&state),
            _ => Vec::new(),
        }
    }

    /// Plain-text outline of the selected store.
    pub fn render_json(&self) -> Option<String> {
        let state = self.serialized_state()?;
        Some(self.json_tree()?.render(&state))
    }

    /// Open or close the outline row at `path`. Returns the new state.
    pub fn toggle_json(&mut self, path: &str) -> Option<bool> {
        Some(self.json_tree_mut()?.toggle(path))
    }

    /// Clipboard text for the outline row at `path`.
    pub fn copy_json(&self, path: &str) -> Option<String> {
        JsonTree::copy_text(&self.serialized_state()?, path)
    }

    pub fn json_tree(&self) -> Option<&JsonTree> {
        self.json_trees.get(self.recorder.selected()?)
    }

    pub fn json_tree_mut(&mut self) -> Option<&mut JsonTree> {
        let name = self.recorder.selected()?;
        self.json_trees.get_mut(name)
    }

    // ------------------------------------------------------------------
    // Graph view
    // ------------------------------------------------------------------

    fn build_selected_graph(&self, state: &SerializedValue) -> Option<Graph> {
        let expansion = self.expansions.get(self.recorder.selected()?)?;
        Some(build_graph(
            state,
            |id, depth| expansion.should_expand(id, depth),
            self.max_nodes,
        ))
    }

    /// Build and lay out the selected store's state.
    pub fn graph(&self) -> Option<GraphView> {
        let name = self.recorder.selected()?;
        let state = self.serialized_state()?;
        let graph = self.build_selected_graph(&state)?;
        let layout = layout_graph(&graph.nodes, &self.layout);

        let expansion = self.expansions.get(name)?;
        let open_values = graph
            .nodes
            .iter()
            .filter(|node| node.kind == NodeKind::Value && expansion.is_value_open(&node.id))
            .map(|node| {
                let text = truncate_value(&leaf_value_string(lookup_path(&state, &node.id)));
                (node.id.clone(), text)
            })
            .collect();

        let transform = self
            .viewports
            .get(name)
            .map(ViewportController::transform)
            .unwrap_or_default();

        trace!(store = name, nodes = graph.len(), "graph built");
        Some(GraphView {
            store: name.to_string(),
            graph,
            layout,
            transform,
            fit_width: self.settings.get().graph.fit_width,
            open_values,
        })
    }

    pub fn viewport(&self) -> Option<&ViewportController> {
        self.viewports.get(self.recorder.selected()?)
    }

    pub fn viewport_mut(&mut self) -> Option<&mut ViewportController> {
        let name = self.recorder.selected()?;
        self.viewports.get_mut(name)
    }

    pub fn expansion(&self) -> Option<&ExpansionState> {
        self.expansions.get(self.recorder.selected()?)
    }

    /// Click on the graph node `id`.
    ///
    /// Returns the node's new open state, or `None` when the click is
    /// swallowed (it ends a drag) or `id` is not on screen.
    pub fn toggle_graph_node(&mut self, id: &str) -> Option<bool> {
        if self.viewport().is_some_and(ViewportController::should_suppress_click) {
            trace!(id, "click suppressed after drag");
            return None;
        }
        let state = self.serialized_state()?;
        let node = self.build_selected_graph(&state)?.node(id)?.clone();

        let name = self.recorder.selected()?;
        let open = self.expansions.get_mut(name)?.toggle(&node);
        debug!(store = name, id, open, "graph node toggled");
        Some(open)
    }

    /// Truncated value text of the node `id` in the selected store.
    pub fn leaf_value(&self, id: &str) -> Option<String> {
        let state = self.serialized_state()?;
        Some(truncate_value(&leaf_value_string(lookup_path(&state, id))))
    }

    // ------------------------------------------------------------------
    // History view
    // ------------------------------------------------------------------

    pub fn history_view(&self) -> Option<HistoryView> {
        let name = self.recorder.selected()?;
        let len = self.recorder.history_len(name);
        let index = self.recorder.current_index(name).unwrap_or_default();
        let snapshot = self.recorder.current_snapshot(name);
        let snapshot_lines = snapshot
            .as_ref()
            .map(|s| highlighter().highlight(&format_value_for_copy(s)))
            .unwrap_or_default();

        Some(HistoryView {
            store: name.to_string(),
            position_label: self.recorder.position_label(name),
            index,
            len,
            playing: self.recorder.is_playing(),
            recording: self.recorder.is_recording(),
            can_step_back: self.recorder.can_step_back(name),
            can_step_forward: self.recorder.can_step_forward(name),
            snapshot,
            snapshot_lines,
        })
    }

    /// Travel to `index` of the selected store's history (clamped).
    pub fn scrub(&mut self, index: i64) -> Option<usize> {
        let name = self.recorder.selected()?.to_string();
        self.recorder.apply_index(&name, index)
    }

    pub fn step_back(&mut self) -> Option<usize> {
        self.recorder.step(-1)
    }

    pub fn step_forward(&mut self) -> Option<usize> {
        self.recorder.step(1)
    }

    pub fn jump_to_start(&mut self) -> Option<usize> {
        self.recorder.jump_to_start()
    }

    pub fn jump_to_end(&mut self) -> Option<usize> {
        self.recorder.jump_to_end()
    }

    pub fn toggle_play(&mut self) -> PlaybackState {
        self.recorder.toggle_play()
    }

    /// Toggle recording and persist the choice.
    pub fn toggle_recording(&mut self) -> bool {
        let recording = !self.settings.get().history.recording;
        self.update_settings(|s| s.history.recording = recording);
        recording
    }

    // ------------------------------------------------------------------
    // Time
    // ------------------------------------------------------------------

    /// Advance the panel's clocks by `elapsed_ms`.
    pub fn advance(&mut self, elapsed_ms: u64) {
        self.recorder.advance(elapsed_ms);
        for viewport in self.viewports.values_mut() {
            viewport.advance(elapsed_ms);
        }
    }
}

impl<S> std::fmt::Debug for DevtoolsPanel<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DevtoolsPanel")
            .field("open", &self.open)
            .field("view", &self.view)
            .field("selected", &self.recorder.selected())
            .field("max_nodes", &self.max_nodes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{MemorySettingsStorage, SETTINGS_KEY};
    use devscope_core::{MemoryStore, Value};
    use devscope_graph::Point;
    use pretty_assertions::assert_eq;

    fn panel() -> DevtoolsPanel<MemorySettingsStorage> {
        DevtoolsPanel::new(MemorySettingsStorage::default(), DevtoolsSettings::default())
    }

    fn counter(n: i32) -> Value {
        Value::object([("count", Value::from(n))])
    }

    #[test]
    fn test_first_store_selected() {
        let mut panel = panel();
        assert_eq!(panel.selected_store(), None);
        assert!(panel.history_view().is_none());

        panel.register_store("a", Rc::new(MemoryStore::new(counter(0))));
        panel.register_store("b", Rc::new(MemoryStore::new(counter(5))));
        assert_eq!(panel.selected_store(), Some("a"));
        assert_eq!(panel.store_names(), vec!["a", "b"]);

        assert!(panel.select_store("b"));
        assert!(!panel.select_store("missing"));
        let state = panel.serialized_state().unwrap();
        assert_eq!(state.get("count"), Some(&SerializedValue::from(5)));
    }

    #[test]
    fn test_open_and_view_mode() {
        let mut panel = panel();
        assert!(!panel.is_open());
        assert!(panel.toggle_open());
        assert_eq!(panel.view_mode(), ViewMode::Json);
        panel.set_view_mode(ViewMode::Graph);
        assert_eq!(panel.view_mode(), ViewMode::Graph);
    }

    #[test]
    fn test_settings_propagate() {
        let mut panel = panel();
        let store = Rc::new(MemoryStore::new(counter(0)));
        panel.register_store("counter", store.clone());

        panel.update_settings(|s| {
            s.history.recording = false;
            s.history.playback_ms = 50;
            s.graph.max_depth = 1;
            s.json.expand_by_default = false;
        });

        assert!(!panel.recorder().is_recording());
        assert_eq!(panel.recorder().playback_ms(), 100);
        assert_eq!(panel.expansion().map(ExpansionState::max_depth), Some(1));
        assert_eq!(panel.json_rows().len(), 1);

        store.set_state(counter(1), true);
        assert_eq!(panel.recorder().history_len("counter"), 1);

        assert!(panel.settings_manager().storage().get(SETTINGS_KEY).is_some());
        panel.reset_settings();
        assert!(panel.recorder().is_recording());
        assert_eq!(panel.settings_manager().storage().get(SETTINGS_KEY), None);
    }

    #[test]
    fn test_history_view_tracks_time_travel() {
        let mut panel = panel();
        let store = Rc::new(MemoryStore::new(counter(0)));
        panel.register_store("counter", store.clone());
        store.set_state(counter(1), true);
        store.set_state(counter(2), true);

        let view = panel.history_view().unwrap();
        assert_eq!(view.position_label, "3/3");
        assert!(view.can_step_back);
        assert!(!view.can_step_forward);

        assert_eq!(panel.step_back(), Some(1));
        panel.advance(0);
        let view = panel.history_view().unwrap();
        assert_eq!(view.position_label, "2/3");
        let snapshot = view.snapshot.as_ref().and_then(|s| s.get("count"));
        assert_eq!(snapshot, Some(&SerializedValue::from(1)));
        assert_eq!(view.snapshot_lines.len(), 3);
        assert_eq!(panel.copy_json("/count"), Some("1".to_string()));
    }

    #[test]
    fn test_graph_toggle_and_leaf_bubbles() {
        let mut panel = panel();
        let state = Value::object([("user", Value::object([("name", Value::from("Ada"))]))]);
        panel.register_store("app", Rc::new(MemoryStore::new(state)));

        let view = panel.graph().unwrap();
        assert_eq!(view.graph.len(), 3);
        assert!(view.fit_width);
        assert!(view.open_values.is_empty());

        assert_eq!(panel.toggle_graph_node("state.user.name"), Some(true));
        let view = panel.graph().unwrap();
        assert_eq!(view.open_values, vec![("state.user.name".to_string(), "Ada".to_string())]);

        assert_eq!(panel.toggle_graph_node("state.user"), Some(false));
        assert_eq!(panel.graph().unwrap().graph.len(), 2);
        assert_eq!(panel.toggle_graph_node("state.nope"), None);
    }

    #[test]
    fn test_click_after_drag_is_swallowed() {
        let mut panel = panel();
        panel.register_store("app", Rc::new(MemoryStore::new(counter(0))));

        let viewport = panel.viewport_mut().unwrap();
        viewport.pointer_down(1, Point::new(0.0, 0.0), true);
        viewport.pointer_move(1, Point::new(40.0, 0.0));
        viewport.pointer_up(1);

        assert_eq!(panel.toggle_graph_node("state"), None);
        panel.advance(0);
        assert_eq!(panel.toggle_graph_node("state"), Some(false));
    }

    #[test]
    fn test_unregister_drops_view_state() {
        let mut panel = panel();
        panel.register_store("a", Rc::new(MemoryStore::new(counter(0))));
        assert!(panel.unregister_store("a"));
        assert!(panel.graph().is_none());
        assert!(panel.json_rows().is_empty());
        assert!(!panel.unregister_store("a"));
    }
}
