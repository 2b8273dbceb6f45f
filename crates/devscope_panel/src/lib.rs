//! devscope Panel
//!
//! The inspector state behind a DevTools overlay:
//!
//! - [`settings`] - user settings with partial defaults, range clamping and
//!   pluggable persistence
//! - [`json_view`] - collapsible outline of a serialized state
//! - [`highlight`] - regex based highlighter for function sources
//! - [`DevtoolsPanel`] - registered stores, selection, view mode and the
//!   history, JSON and graph views of the selected store
//!
//! # Example
//!
//! ```rust
//! use std::rc::Rc;
//! use devscope_core::{MemoryStore, Store, Value};
//! use devscope_panel::settings::{DevtoolsSettings, MemorySettingsStorage};
//! use devscope_panel::{DevtoolsPanel, ViewMode};
//!
//! let store = Rc::new(MemoryStore::new(Value::object([("count", Value::from(0))])));
//! let mut panel = DevtoolsPanel::new(MemorySettingsStorage::default(), DevtoolsSettings::default());
//! panel.register_store("counter", store.clone());
//!
//! store.set_state(Value::object([("count", Value::from(1))]), true);
//! panel.set_view_mode(ViewMode::History);
//!
//! let history = panel.history_view().unwrap();
//! assert_eq!(history.position_label, "2/2");
//! ```

pub mod highlight;
pub mod json_view;
mod panel;
pub mod settings;

pub use highlight::{highlighter, CodeHighlighter, HighlightedLine, TokenKind};
pub use json_view::{JsonRow, JsonTree, RowKind};
pub use panel::{DevtoolsPanel, GraphView, HistoryView, ViewMode};
pub use settings::{DevtoolsSettings, SettingsManager, SettingsStorage};
