//! State history and time travel.
//!
//! This crate provides:
//! - `HistoryBuffer` - bounded, timestamped snapshots of one store
//! - `HistoryRecorder` - records every registered store, travels back to any
//!   entry and plays history forward on a timer
//!
//! # Example
//!
//! ```rust
//! use std::rc::Rc;
//! use devscope_core::{MemoryStore, Store, Value};
//! use devscope_history::{HistoryRecorder, RecorderConfig};
//!
//! let store = Rc::new(MemoryStore::new(Value::from(0)));
//! let mut recorder = HistoryRecorder::new(RecorderConfig::default());
//! recorder.register("counter", store.clone());
//!
//! store.set_state(Value::from(1), true);
//! store.set_state(Value::from(2), true);
//! assert_eq!(recorder.history_len("counter"), 3);
//!
//! // Travel back to the initial state; the store's own notification of the
//! // programmatic update is not recorded.
//! recorder.jump_to_start();
//! recorder.advance(0);
//! assert_eq!(recorder.history_len("counter"), 3);
//! assert_eq!(recorder.current_index("counter"), Some(0));
//! ```

mod buffer;
mod recorder;

pub use buffer::{HistoryBuffer, HistoryEntry};
pub use recorder::{HistoryRecorder, PlaybackState, RecorderConfig, MIN_PLAYBACK_MS};
