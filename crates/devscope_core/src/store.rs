//! Store capability
//!
//! The inspected store is an external collaborator. devscope only needs three
//! things from it: read the current state, replace it, and be told when it
//! changes. [`MemoryStore`] is a small in-process implementation used by the
//! debugger binary and the tests.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use slotmap::{new_key_type, SlotMap};
use tracing::trace;

use crate::value::Value;

new_key_type! {
    /// Unique identifier for a registered listener
    pub struct ListenerId;
}

/// Change listener, called with `(next, previous)` state.
pub type Listener = Box<dyn FnMut(&Value, &Value)>;

/// Capability interface of an inspectable store.
pub trait Store {
    /// Synchronous, side-effect free read of the current state.
    fn get_state(&self) -> Value;

    /// Replace (`replace = true`) or shallow-merge the state, then notify.
    fn set_state(&self, next: Value, replace: bool);

    /// Register a listener. Dropping or calling
    /// [`Subscription::unsubscribe`] on the result removes it.
    fn subscribe(&self, listener: Listener) -> Subscription;
}

/// Handle returned by [`Store::subscribe`].
///
/// Unsubscribes exactly once, either explicitly or when dropped.
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(unsubscribe: impl FnOnce() + 'static) -> Self {
        Self {
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    /// A subscription with nothing to release.
    pub fn noop() -> Self {
        Self { unsubscribe: None }
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.unsubscribe.is_some())
            .finish()
    }
}

type SharedListener = Rc<RefCell<Listener>>;
type ListenerTable = Rc<RefCell<SlotMap<ListenerId, SharedListener>>>;

/// An in-memory store.
///
/// `set_state` with `replace = false` merges object keys shallowly into a new
/// object; any other combination replaces the state. Setting a state that is
/// the same value as the current one is ignored. Listeners run after the
/// state is updated, in registration order, and may read or write the store.
#[derive(Clone)]
pub struct MemoryStore {
    state: Rc<RefCell<Value>>,
    listeners: ListenerTable,
}

impl MemoryStore {
    pub fn new(initial: Value) -> Self {
        Self {
            state: Rc::new(RefCell::new(initial)),
            listeners: Rc::new(RefCell::new(SlotMap::with_key())),
        }
    }

    /// Number of active listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    fn merged(previous: &Value, next: Value) -> Value {
        match (previous, &next) {
            (Value::Object(prev), Value::Object(incoming)) => {
                let mut entries = prev.borrow().clone();
                for (k, v) in incoming.borrow().iter() {
                    entries.insert(k.clone(), v.clone());
                }
                Value::object(entries)
            }
            _ => next,
        }
    }
}

impl Store for MemoryStore {
    fn get_state(&self) -> Value {
        self.state.borrow().clone()
    }

    fn set_state(&self, next: Value, replace: bool) {
        let previous = self.get_state();
        if next.same(&previous) {
            trace!("set_state ignored: same value");
            return;
        }
        let next = if replace {
            next
        } else {
            Self::merged(&previous, next)
        };
        *self.state.borrow_mut() = next.clone();

        // Snapshot the table so listeners can subscribe/unsubscribe while we
        // iterate.
        let listeners: Vec<SharedListener> = self.listeners.borrow().values().cloned().collect();
        for listener in listeners {
            match listener.try_borrow_mut() {
                Ok(mut callback) => callback(&next, &previous),
                Err(_) => trace!("listener skipped: already running"),
            }
        }
    }

    fn subscribe(&self, listener: Listener) -> Subscription {
        let id = self
            .listeners
            .borrow_mut()
            .insert(Rc::new(RefCell::new(listener)));
        let table: Weak<RefCell<SlotMap<ListenerId, SharedListener>>> =
            Rc::downgrade(&self.listeners);
        Subscription::new(move || {
            if let Some(table) = table.upgrade() {
                table.borrow_mut().remove(id);
            }
        })
    }
}
