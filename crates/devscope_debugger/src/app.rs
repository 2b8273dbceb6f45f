//! Loading recorded states and printing panel views.

use std::path::Path;
use std::rc::Rc;

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use devscope_core::display::{leaf_value_string, truncate_value};
use devscope_core::{MemoryStore, Store, Timestamp, Value};
use devscope_graph::{NodeKind, Point};
use devscope_history::HistoryEntry;
use devscope_panel::settings::{MemorySettingsStorage, PartialSettings};
use devscope_panel::{DevtoolsPanel, DevtoolsSettings, ViewMode};
use tracing::{debug, info};

/// Name the replayed store is registered under.
pub const STORE_NAME: &str = "store";

/// Layout of a states file
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum InputFormat {
    /// A JSON array when the whole file parses as one, JSON lines otherwise
    #[default]
    Auto,
    /// One JSON array holding every state
    Json,
    /// One state per non-empty line
    Jsonl,
}

/// Read states from `path`.
pub fn load_states(path: &Path, format: InputFormat) -> Result<Vec<serde_json::Value>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_states(&text, format).with_context(|| format!("failed to parse {}", path.display()))
}

/// Parse states laid out as `format`.
pub fn parse_states(text: &str, format: InputFormat) -> Result<Vec<serde_json::Value>> {
    match format {
        InputFormat::Json => match serde_json::from_str(text)? {
            serde_json::Value::Array(states) => Ok(states),
            _ => bail!("expected a JSON array of states"),
        },
        InputFormat::Jsonl => parse_lines(text),
        InputFormat::Auto => match serde_json::from_str(text) {
            Ok(serde_json::Value::Array(states)) => Ok(states),
            _ => parse_lines(text),
        },
    }
}

fn parse_lines(text: &str) -> Result<Vec<serde_json::Value>> {
    let mut states = Vec::new();
    for (n, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let state = serde_json::from_str(line).with_context(|| format!("line {}", n + 1))?;
        states.push(state);
    }
    Ok(states)
}

/// Read a settings file holding any subset of the settings.
pub fn load_settings(path: &Path) -> Result<DevtoolsSettings> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read settings {}", path.display()))?;
    let partial: PartialSettings = serde_json::from_str(&text)
        .with_context(|| format!("invalid settings {}", path.display()))?;
    Ok(DevtoolsSettings::with_overrides(&partial).clamped())
}

/// A panel watching one store fed with recorded states.
pub struct Session {
    panel: DevtoolsPanel<MemorySettingsStorage>,
}

impl Session {
    /// Replay `states` in order; the first one is the initial state.
    pub fn open(
        states: Vec<serde_json::Value>,
        settings: DevtoolsSettings,
        max_nodes: usize,
    ) -> Result<Self> {
        let Some((initial, rest)) = states.split_first() else {
            bail!("no states to replay");
        };

        let store = Rc::new(MemoryStore::new(Value::from_json(initial)));
        let mut panel = DevtoolsPanel::new(MemorySettingsStorage::default(), settings)
            .with_max_nodes(max_nodes);
        panel.register_store(STORE_NAME, store.clone());

        for state in rest {
            store.set_state(Value::from_json(state), true);
        }
        info!(
            states = states.len(),
            entries = panel.recorder().history_len(STORE_NAME),
            "states replayed"
        );
        Ok(Self { panel })
    }

    /// Time-travel to `index` (clamped) and let the update settle.
    pub fn travel(&mut self, index: i64) {
        let landed = self.panel.scrub(index);
        self.panel.advance(0);
        debug!(index, ?landed, "time travel");
    }

    pub fn render(&mut self, view: ViewMode) -> String {
        self.panel.set_view_mode(view);
        match view {
            ViewMode::Json => self.panel.render_json().unwrap_or_default(),
            ViewMode::History => self.render_history(),
            ViewMode::Graph => self.render_graph(),
            ViewMode::Settings => match serde_json::to_string_pretty(self.panel.settings()) {
                Ok(text) => text + "\n",
                Err(err) => format!("settings unavailable: {err}\n"),
            },
        }
    }

    fn render_history(&self) -> String {
        let Some(view) = self.panel.history_view() else {
            return String::new();
        };
        let state = if view.recording { "recording" } else { "paused" };
        let mut out = format!("{} {} ({state})\n", view.store, view.position_label);

        let entries = self.panel.recorder().entries(&view.store);
        let start = entries.first().map(|e| e.timestamp).unwrap_or_default();
        for (i, entry) in entries.iter().enumerate() {
            out.push_str(&entry_line(i, i == view.index, start, entry));
        }

        out.push('\n');
        for line in &view.snapshot_lines {
            out.push_str(&line.text);
            out.push('\n');
        }
        out
    }

    fn render_graph(&self) -> String {
        let Some(view) = self.panel.graph() else {
            return String::new();
        };
        let (width, height) = view.layout.view_box();
        let mut out = format!(
            "{} nodes, {} edges, {width}x{height}\n",
            view.graph.len(),
            view.graph.edges.len()
        );

        for node in &view.graph.nodes {
            let at = view.layout.position(&node.id).unwrap_or(Point::ZERO);
            let kind = match node.kind {
                NodeKind::Object => "object",
                NodeKind::Value => "value",
            };
            out.push_str(&format!(
                "{}{} [{kind}] ({:.0}, {:.0})\n",
                "  ".repeat(node.depth),
                node.label,
                at.x,
                at.y
            ));
        }
        for edge in &view.graph.edges {
            if let Some(path) = view.layout.edge_path(edge) {
                out.push_str(&format!(
                    "{} -> {}: {}\n",
                    edge.source,
                    edge.target,
                    path.to_svg()
                ));
            }
        }
        out
    }
}

fn entry_line(index: usize, current: bool, start: Timestamp, entry: &HistoryEntry) -> String {
    let marker = if current { '>' } else { ' ' };
    let summary = truncate_value(&leaf_value_string(Some(&entry.snapshot)));
    format!(
        "{marker} {index:>3}  +{}ms  {summary}\n",
        entry.timestamp.since(start)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn counters() -> Vec<serde_json::Value> {
        parse_states(r#"[{"count": 0}, {"count": 1}, {"count": 2}]"#, InputFormat::Auto).unwrap()
    }

    #[test]
    fn test_parse_array_and_lines() {
        assert_eq!(counters().len(), 3);

        let lines = parse_states("{\"a\": 1}\n\n{\"a\": 2}\n", InputFormat::Auto).unwrap();
        assert_eq!(lines, vec![serde_json::json!({"a": 1}), serde_json::json!({"a": 2})]);

        let err = parse_states("{\"a\": 1}\n{oops", InputFormat::Auto).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_explicit_formats() {
        let single_array_line = "[1, 2, 3]\n";
        assert_eq!(parse_states(single_array_line, InputFormat::Auto).unwrap().len(), 3);
        assert_eq!(
            parse_states(single_array_line, InputFormat::Jsonl).unwrap(),
            vec![serde_json::json!([1, 2, 3])]
        );

        let two_lines = "{\"a\": 1}\n{\"a\": 2}\n";
        assert!(parse_states(two_lines, InputFormat::Json).is_err());
        assert!(parse_states("{\"a\": 1}", InputFormat::Json).is_err());
        assert_eq!(parse_states("[{\"a\": 1}]", InputFormat::Json).unwrap().len(), 1);
    }

    #[test]
    fn test_empty_input_rejected() {
        assert!(Session::open(Vec::new(), DevtoolsSettings::default(), 200).is_err());
    }

    #[test]
    fn test_json_view_follows_time_travel() {
        let mut session = Session::open(counters(), DevtoolsSettings::default(), 200).unwrap();
        assert_eq!(session.render(ViewMode::Json), "▾ Object {1}\n  count: 2\n");

        session.travel(0);
        assert_eq!(session.render(ViewMode::Json), "▾ Object {1}\n  count: 0\n");
        assert_eq!(session.panel.recorder().history_len(STORE_NAME), 3);
    }

    #[test]
    fn test_history_view_marks_current() {
        let mut session = Session::open(counters(), DevtoolsSettings::default(), 200).unwrap();
        session.travel(-10);

        let text = session.render(ViewMode::History);
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("store 1/3 (recording)"));
        assert!(lines.next().is_some_and(|l| l.starts_with(">   0")));
        assert!(lines.next().is_some_and(|l| l.starts_with("    1")));
        assert!(text.ends_with("{\n  \"count\": 0\n}\n"));
    }

    #[test]
    fn test_graph_view_respects_budget() {
        let wide = serde_json::json!({
            "a": 1, "b": 2, "c": 3, "d": 4, "e": 5
        });
        let mut session = Session::open(vec![wide], DevtoolsSettings::default(), 3).unwrap();

        let text = session.render(ViewMode::Graph);
        assert!(text.starts_with("3 nodes, 2 edges"));
        assert!(text.contains("state -> state.a: M "));
        assert!(!text.contains("state.c"));
    }

    #[test]
    fn test_graph_lines() {
        let state = serde_json::json!({ "a": 1, "b": 2 });
        let mut session = Session::open(vec![state], DevtoolsSettings::default(), 200).unwrap();

        assert_eq!(
            session.render(ViewMode::Graph),
            "3 nodes, 2 edges, 600x360\n\
             state [object] (40, 180)\n\
             \x20 a [value] (220, 145)\n\
             \x20 b [value] (220, 215)\n\
             state -> state.a: M 40,180 C 130,180 130,145 220,145\n\
             state -> state.b: M 40,180 C 130,180 130,215 220,215\n"
        );
    }

    #[test]
    fn test_settings_file_merges_and_clamps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"history": {"maxHistory": 2}, "graph": {"maxDepth": 4}}"#)
            .unwrap();

        let settings = load_settings(&path).unwrap();
        assert_eq!(settings.history.max_history, 10);
        assert_eq!(settings.history.playback_ms, 1200);
        assert_eq!(settings.graph.max_depth, 4);

        assert!(load_settings(&dir.path().join("missing.json")).is_err());
    }
}
