//! devscope Core
//!
//! This crate provides the foundational pieces shared by every devscope engine:
//!
//! - **Value model**: a dynamic, reference-counted state tree that may contain
//!   cycles, shared substructure, dates, maps, sets and function references
//! - **Snapshot serialization**: conversion of any [`Value`] into a cycle-free
//!   [`SerializedValue`] suitable for display and history
//! - **Store capability**: the `get_state` / `set_state` / `subscribe` surface of
//!   an inspected store, plus an in-memory implementation
//! - **Scheduler**: a cooperative virtual-time task queue standing in for the
//!   host event loop
//!
//! # Example
//!
//! ```rust
//! use devscope_core::{serialize, SerializedValue, Value};
//!
//! let state = Value::object([("count", Value::from(1))]);
//! state.insert("self", state.clone());
//!
//! let snapshot = serialize(&state);
//! assert_eq!(
//!     snapshot.get("self"),
//!     Some(&SerializedValue::from("[Circular]"))
//! );
//! ```

pub mod display;
pub mod error;
pub mod scheduler;
pub mod serialize;
pub mod store;
pub mod timestamp;
pub mod value;

pub use error::{Error, Result};
pub use scheduler::{Scheduler, TimerId};
pub use serialize::{serialize, CIRCULAR_MARKER};
pub use store::{Listener, MemoryStore, Store, Subscription};
pub use timestamp::Timestamp;
pub use value::{FunctionRef, SerializedValue, Value};
