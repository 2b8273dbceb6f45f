//! History recorder with time travel and playback.
//!
//! The recorder subscribes to every registered store and appends a serialized
//! snapshot on each change. Time travel hands an earlier snapshot back to the
//! store with a full replace; the store's notification of that programmatic
//! update must not be recorded, so a guard flag is raised for the duration of
//! the call and cleared by a task posted on the recorder's scheduler. Clearing
//! happens on the next scheduling opportunity (the next [`advance`]), never
//! synchronously.
//!
//! Playback is a repeating timer on the same scheduler that advances the
//! selected store's index by one per tick and stops at the newest entry.
//!
//! [`advance`]: HistoryRecorder::advance

use std::cell::RefCell;
use std::rc::Rc;

use devscope_core::{
    serialize, Error, Scheduler, SerializedValue, Store, Subscription, TimerId, Timestamp, Value,
};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use tracing::{debug, trace, warn};

use crate::buffer::{HistoryBuffer, HistoryEntry};

/// Lower bound on the playback interval.
pub const MIN_PLAYBACK_MS: u64 = 100;

/// Configuration for the recorder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecorderConfig {
    /// Entries kept per store.
    pub max_history: usize,
    /// Delay between playback steps, in milliseconds.
    pub playback_ms: u64,
    /// Whether store changes are recorded.
    pub recording: bool,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            max_history: 100,
            playback_ms: 1200,
            recording: true,
        }
    }
}

impl RecorderConfig {
    /// Set the history bound.
    pub fn with_max_history(mut self, max_history: usize) -> Self {
        self.max_history = max_history;
        self
    }

    /// Set the playback delay.
    pub fn with_playback_ms(mut self, playback_ms: u64) -> Self {
        self.playback_ms = playback_ms;
        self
    }

    /// Enable or disable recording.
    pub fn with_recording(mut self, recording: bool) -> Self {
        self.recording = recording;
        self
    }
}

/// Playback state of the selected store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RecorderTask {
    /// Lower the time-travel guard.
    EndTimeTravel,
    /// Advance playback by one entry.
    PlaybackTick,
}

type Clock = Rc<dyn Fn() -> Timestamp>;

/// State reachable from store listeners.
struct Shared {
    buffers: IndexMap<String, HistoryBuffer>,
    recording: bool,
    time_traveling: bool,
    max_history: usize,
    clock: Clock,
}

impl Shared {
    fn on_store_change(&mut self, name: &str, state: &Value) {
        if !self.recording {
            trace!(store = name, "change ignored: recording disabled");
            return;
        }
        if self.time_traveling {
            trace!(store = name, "change ignored: caused by time travel");
            return;
        }
        let now = (self.clock)();
        let Some(buffer) = self.buffers.get_mut(name) else {
            trace!(store = name, "change ignored: unknown store");
            return;
        };
        buffer.push(HistoryEntry::new(now, serialize(state)));
        debug!(store = name, len = buffer.len(), "recorded state change");
    }
}

/// Records store history and drives time travel.
pub struct HistoryRecorder {
    config: RecorderConfig,
    shared: Rc<RefCell<Shared>>,
    stores: IndexMap<String, Rc<dyn Store>>,
    subscriptions: FxHashMap<String, Subscription>,
    selected: Option<String>,
    scheduler: Scheduler<RecorderTask>,
    playback: PlaybackState,
    playback_timer: Option<TimerId>,
}

impl HistoryRecorder {
    pub fn new(config: RecorderConfig) -> Self {
        let shared = Shared {
            buffers: IndexMap::new(),
            recording: config.recording,
            time_traveling: false,
            max_history: config.max_history.max(1),
            clock: Rc::new(Timestamp::now),
        };
        Self {
            config,
            shared: Rc::new(RefCell::new(shared)),
            stores: IndexMap::new(),
            subscriptions: FxHashMap::default(),
            selected: None,
            scheduler: Scheduler::new(),
            playback: PlaybackState::Idle,
            playback_timer: None,
        }
    }

    /// Use `clock` to timestamp new entries instead of the wall clock.
    pub fn with_clock(self, clock: impl Fn() -> Timestamp + 'static) -> Self {
        self.shared.borrow_mut().clock = Rc::new(clock);
        self
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Stores
    // ------------------------------------------------------------------

    /// Start tracking `store` under `name`.
    ///
    /// Creates the history with the store's current state if none exists yet,
    /// then subscribes. Registering a name again keeps its history and moves
    /// the subscription to the new store. The first registered store becomes
    /// the selected one.
    pub fn register(&mut self, name: impl Into<String>, store: Rc<dyn Store>) {
        let name = name.into();
        self.initialize(&name, store.as_ref());

        let shared = Rc::downgrade(&self.shared);
        let key = name.clone();
        let subscription = store.subscribe(Box::new(move |next, _previous| {
            let Some(shared) = shared.upgrade() else {
                return;
            };
            match shared.try_borrow_mut() {
                Ok(mut shared) => shared.on_store_change(&key, next),
                Err(_) => warn!(store = %key, "change dropped: recorder busy"),
            };
        }));

        self.subscriptions.insert(name.clone(), subscription);
        self.stores.insert(name.clone(), store);
        if self.selected.is_none() {
            self.selected = Some(name);
        }
    }

    /// Create the history for `name` with a single entry holding the store's
    /// current state. Returns `false` if a history already exists.
    pub fn initialize(&mut self, name: &str, store: &dyn Store) -> bool {
        let mut shared = self.shared.borrow_mut();
        if shared.buffers.contains_key(name) {
            return false;
        }
        let entry = HistoryEntry::new((shared.clock)(), serialize(&store.get_state()));
        let buffer = HistoryBuffer::with_initial(entry, shared.max_history);
        shared.buffers.insert(name.to_string(), buffer);
        debug!(store = name, "history initialized");
        true
    }

    /// Stop tracking `name`, unsubscribing and discarding its history.
    pub fn unregister(&mut self, name: &str) -> bool {
        let known = self.stores.shift_remove(name).is_some();
        if let Some(subscription) = self.subscriptions.remove(name) {
            subscription.unsubscribe();
        }
        self.shared.borrow_mut().buffers.shift_remove(name);

        if self.selected.as_deref() == Some(name) {
            self.stop_playback();
            self.selected = self.stores.keys().next().cloned();
        }
        known
    }

    /// Registered store names in registration order.
    pub fn store_names(&self) -> impl Iterator<Item = &str> {
        self.stores.keys().map(String::as_str)
    }

    pub fn store(&self, name: &str) -> Option<&Rc<dyn Store>> {
        self.stores.get(name)
    }

    /// Record a change of `name`'s state.
    ///
    /// Called by the store subscription; ignored while recording is disabled
    /// or while a time-travel update is in flight.
    pub fn on_store_change(&mut self, name: &str, state: &Value) {
        self.shared.borrow_mut().on_store_change(name, state);
    }

    /// Select the store that navigation and playback act on.
    ///
    /// Switching to a different store stops playback.
    pub fn select(&mut self, name: &str) -> bool {
        if !self.stores.contains_key(name) {
            trace!(store = name, "select ignored: unknown store");
            return false;
        }
        if self.selected.as_deref() != Some(name) {
            self.stop_playback();
            self.selected = Some(name.to_string());
        }
        true
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    // ------------------------------------------------------------------
    // Settings
    // ------------------------------------------------------------------

    pub fn is_recording(&self) -> bool {
        self.config.recording
    }

    pub fn set_recording(&mut self, recording: bool) {
        self.config.recording = recording;
        self.shared.borrow_mut().recording = recording;
    }

    /// Change the per-store bound. Existing histories are truncated at once.
    pub fn set_max_history(&mut self, max_history: usize) {
        let max_history = max_history.max(1);
        self.config.max_history = max_history;
        let mut shared = self.shared.borrow_mut();
        shared.max_history = max_history;
        for buffer in shared.buffers.values_mut() {
            buffer.set_max_history(max_history);
        }
    }

    pub fn playback_ms(&self) -> u64 {
        self.config.playback_ms
    }

    /// Change the playback delay; a running playback restarts at the new
    /// interval.
    pub fn set_playback_ms(&mut self, playback_ms: u64) {
        self.config.playback_ms = playback_ms;
        if self.playback == PlaybackState::Playing {
            self.restart_timer();
        }
    }

    /// Effective interval between playback steps.
    pub fn playback_interval(&self) -> u64 {
        self.config.playback_ms.max(MIN_PLAYBACK_MS)
    }

    /// Whether a time-travel update is still guarded.
    pub fn is_time_traveling(&self) -> bool {
        self.shared.borrow().time_traveling
    }

    // ------------------------------------------------------------------
    // History access
    // ------------------------------------------------------------------

    /// Number of entries for `name`; 0 for unknown stores.
    pub fn history_len(&self, name: &str) -> usize {
        self.with_history(name, HistoryBuffer::len).unwrap_or_default()
    }

    pub fn current_index(&self, name: &str) -> Option<usize> {
        self.with_history(name, |buffer| buffer.index())
    }

    /// Run `f` against the history of `name`.
    pub fn with_history<R>(&self, name: &str, f: impl FnOnce(&HistoryBuffer) -> R) -> Option<R> {
        self.shared.borrow().buffers.get(name).map(f)
    }

    /// Copy of the whole history of `name`.
    pub fn history(&self, name: &str) -> Option<HistoryBuffer> {
        self.with_history(name, HistoryBuffer::clone)
    }

    pub fn current_entry(&self, name: &str) -> Option<HistoryEntry> {
        self.with_history(name, |buffer| buffer.current().cloned())
            .flatten()
    }

    /// Copy of every entry of `name`, oldest first.
    pub fn entries(&self, name: &str) -> Vec<HistoryEntry> {
        self.with_history(name, |buffer| buffer.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn snapshot_at(&self, name: &str, index: usize) -> Option<SerializedValue> {
        self.with_history(name, |buffer| buffer.get(index).map(|e| e.snapshot.clone()))
            .flatten()
    }

    pub fn current_snapshot(&self, name: &str) -> Option<SerializedValue> {
        self.with_history(name, |buffer| buffer.current().map(|e| e.snapshot.clone()))
            .flatten()
    }

    /// `"current/total"` for `name`.
    pub fn position_label(&self, name: &str) -> String {
        self.with_history(name, HistoryBuffer::position_label)
            .unwrap_or_else(|| "1/1".to_string())
    }

    pub fn can_step_back(&self, name: &str) -> bool {
        self.current_index(name).is_some_and(|index| index > 0)
    }

    pub fn can_step_forward(&self, name: &str) -> bool {
        self.with_history(name, |buffer| {
            buffer.last_index().is_some_and(|last| buffer.index() < last)
        })
        .unwrap_or(false)
    }

    // ------------------------------------------------------------------
    // Time travel
    // ------------------------------------------------------------------

    /// Replace `name`'s state with the snapshot at `index`.
    ///
    /// The index is clamped into the history; unknown stores and empty
    /// histories are a no-op. Returns the index that was applied.
    pub fn apply_index(&mut self, name: &str, index: i64) -> Option<usize> {
        let store = self.stores.get(name)?.clone();

        let (applied, snapshot) = {
            let mut shared = self.shared.borrow_mut();
            let buffer = shared.buffers.get(name)?;
            let applied = match buffer.checked(index) {
                Ok(applied) => applied,
                Err(Error::IndexOutOfRange { index, len }) => {
                    trace!(store = name, index, len, "time travel index clamped");
                    buffer.clamp(index)?
                }
                Err(err) => {
                    trace!(store = name, %err, "time travel ignored");
                    return None;
                }
            };
            let snapshot = buffer.get(applied)?.snapshot.clone();
            shared.time_traveling = true;
            (applied, snapshot)
        };

        store.set_state(snapshot.to_value(), true);

        if let Some(buffer) = self.shared.borrow_mut().buffers.get_mut(name) {
            buffer.set_index(applied as i64);
        }
        self.scheduler.post(RecorderTask::EndTimeTravel);
        debug!(store = name, index = applied, "time travel applied");
        Some(applied)
    }

    /// Move the selected store `delta` entries from its current index.
    pub fn step(&mut self, delta: i64) -> Option<usize> {
        let name = self.selected.clone()?;
        let current = self.current_index(&name)? as i64;
        self.apply_index(&name, current.saturating_add(delta))
    }

    pub fn jump_to_start(&mut self) -> Option<usize> {
        let name = self.selected.clone()?;
        self.apply_index(&name, 0)
    }

    pub fn jump_to_end(&mut self) -> Option<usize> {
        let name = self.selected.clone()?;
        let last = self.history_len(&name).saturating_sub(1);
        self.apply_index(&name, last as i64)
    }

    // ------------------------------------------------------------------
    // Playback
    // ------------------------------------------------------------------

    pub fn playback_state(&self) -> PlaybackState {
        self.playback
    }

    pub fn is_playing(&self) -> bool {
        self.playback == PlaybackState::Playing
    }

    /// Flip between idle and playing.
    ///
    /// Starting requires the selected history to hold more than one entry;
    /// otherwise nothing happens.
    pub fn toggle_play(&mut self) -> PlaybackState {
        match self.playback {
            PlaybackState::Playing => self.stop_playback(),
            PlaybackState::Idle => {
                let len = self
                    .selected
                    .as_deref()
                    .map(|name| self.history_len(name))
                    .unwrap_or_default();
                if len <= 1 {
                    trace!(len, "playback not started: nothing to play");
                    return self.playback;
                }
                self.playback = PlaybackState::Playing;
                self.restart_timer();
                debug!(interval = self.playback_interval(), "playback started");
            }
        }
        self.playback
    }

    /// Stop playback and cancel its timer.
    pub fn stop_playback(&mut self) {
        if let Some(timer) = self.playback_timer.take() {
            self.scheduler.cancel(timer);
        }
        if self.playback == PlaybackState::Playing {
            debug!("playback stopped");
        }
        self.playback = PlaybackState::Idle;
    }

    fn restart_timer(&mut self) {
        if let Some(timer) = self.playback_timer.take() {
            self.scheduler.cancel(timer);
        }
        let interval = self.playback_interval();
        self.playback_timer = Some(
            self.scheduler
                .set_interval(interval, RecorderTask::PlaybackTick),
        );
    }

    fn playback_tick(&mut self) {
        if self.playback != PlaybackState::Playing {
            return;
        }
        let Some(name) = self.selected.clone() else {
            self.stop_playback();
            return;
        };
        let position = self.with_history(&name, |buffer| (buffer.index(), buffer.len()));
        match position {
            Some((index, len)) if index + 1 < len => {
                self.apply_index(&name, index as i64 + 1);
            }
            _ => {
                debug!(store = %name, "playback reached the newest entry");
                self.stop_playback();
            }
        }
    }

    // ------------------------------------------------------------------
    // Scheduling
    // ------------------------------------------------------------------

    /// Advance the recorder's clock by `elapsed_ms`, running every task that
    /// falls due: guard resets and playback steps.
    ///
    /// `advance(0)` is the "next tick": it runs only work posted with zero
    /// delay.
    pub fn advance(&mut self, elapsed_ms: u64) {
        let deadline = self.scheduler.now().saturating_add(elapsed_ms);
        while let Some((_, task)) = self.scheduler.next_due(deadline) {
            match task {
                RecorderTask::EndTimeTravel => self.shared.borrow_mut().time_traveling = false,
                RecorderTask::PlaybackTick => self.playback_tick(),
            }
        }
        self.scheduler.settle(deadline);
    }

    /// Number of scheduled tasks still pending.
    pub fn pending_tasks(&self) -> usize {
        self.scheduler.pending_count()
    }

    /// Unsubscribe from every store and cancel all pending work. Histories
    /// are kept.
    pub fn teardown(&mut self) {
        self.stop_playback();
        for (_, subscription) in self.subscriptions.drain() {
            subscription.unsubscribe();
        }
        self.scheduler.clear();
        self.shared.borrow_mut().time_traveling = false;
    }
}

impl Drop for HistoryRecorder {
    fn drop(&mut self) {
        self.teardown();
    }
}
