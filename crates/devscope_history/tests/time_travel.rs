use std::cell::RefCell;
use std::rc::Rc;

use devscope_core::{
    serialize, Listener, MemoryStore, SerializedValue, Store, Subscription, Timestamp, Value,
};
use devscope_history::{HistoryRecorder, PlaybackState, RecorderConfig};

/// Store wrapper that logs every `set_state` call.
struct LoggingStore {
    inner: MemoryStore,
    calls: RefCell<Vec<(SerializedValue, bool)>>,
}

impl LoggingStore {
    fn new(initial: Value) -> Self {
        Self {
            inner: MemoryStore::new(initial),
            calls: RefCell::new(Vec::new()),
        }
    }
}

impl Store for LoggingStore {
    fn get_state(&self) -> Value {
        self.inner.get_state()
    }

    fn set_state(&self, next: Value, replace: bool) {
        self.calls.borrow_mut().push((serialize(&next), replace));
        self.inner.set_state(next, replace);
    }

    fn subscribe(&self, listener: Listener) -> Subscription {
        self.inner.subscribe(listener)
    }
}

fn todo_state(items: &[&str]) -> Value {
    Value::object([(
        "todos",
        Value::array(items.iter().map(|item| Value::from(*item))),
    )])
}

fn recorder() -> HistoryRecorder {
    HistoryRecorder::new(RecorderConfig::default()).with_clock(|| Timestamp::from_millis(7))
}

#[test]
fn history_bound_keeps_newest_entries() {
    let store = Rc::new(MemoryStore::new(Value::from(0)));
    let mut recorder =
        HistoryRecorder::new(RecorderConfig::default().with_max_history(10));
    recorder.register("counter", store.clone());

    for n in 1..=25 {
        store.set_state(Value::from(n), true);
    }

    assert_eq!(recorder.history_len("counter"), 10);
    assert_eq!(recorder.snapshot_at("counter", 0), Some(SerializedValue::from(16)));
    assert_eq!(recorder.current_index("counter"), Some(9));
}

#[test]
fn every_kept_entry_restores_its_snapshot() {
    for (changes, max_history) in [(0, 5), (3, 5), (4, 5), (9, 5), (2, 3), (25, 10), (6, 1)] {
        let store = Rc::new(MemoryStore::new(Value::from(0)));
        let mut recorder =
            HistoryRecorder::new(RecorderConfig::default().with_max_history(max_history));
        recorder.register("counter", store.clone());
        for n in 1..=changes {
            store.set_state(Value::from(n), true);
        }

        let len = (changes as usize + 1).min(max_history);
        assert_eq!(recorder.history_len("counter"), len, "{changes} changes, max {max_history}");
        assert_eq!(recorder.current_index("counter"), Some(len - 1));
        assert_eq!(recorder.position_label("counter"), format!("{len}/{len}"));

        for i in 0..len {
            assert_eq!(recorder.apply_index("counter", i as i64), Some(i));
            recorder.advance(0);
            assert_eq!(
                Some(serialize(&store.get_state())),
                recorder.snapshot_at("counter", i),
                "entry {i} of {changes} changes, max {max_history}"
            );
            assert_eq!(recorder.history_len("counter"), len);
            assert_eq!(recorder.position_label("counter"), format!("{}/{len}", i + 1));
        }
    }
}

#[test]
fn time_travel_replaces_state_without_recording() {
    let store = Rc::new(LoggingStore::new(todo_state(&[])));
    let mut recorder = recorder();
    recorder.register("todos", store.clone());

    store.set_state(todo_state(&["milk"]), true);
    store.set_state(todo_state(&["milk", "eggs"]), true);
    store.calls.borrow_mut().clear();

    assert_eq!(recorder.apply_index("todos", 1), Some(1));
    recorder.advance(0);

    let calls = store.calls.borrow();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1, true);
    assert_eq!(
        calls[0].0.to_json(),
        serde_json::json!({ "todos": ["milk"] })
    );
    assert_eq!(recorder.history_len("todos"), 3);
    assert_eq!(recorder.position_label("todos"), "2/3");
}

#[test]
fn out_of_range_index_is_clamped() {
    let store = Rc::new(MemoryStore::new(Value::from("a")));
    let mut recorder = recorder();
    recorder.register("s", store.clone());
    store.set_state(Value::from("b"), true);

    assert_eq!(recorder.apply_index("s", 50), Some(1));
    recorder.advance(0);
    assert_eq!(recorder.apply_index("s", -3), Some(0));
    recorder.advance(0);
    assert_eq!(serialize(&store.get_state()), SerializedValue::from("a"));
}

#[test]
fn snapshots_are_isolated_from_later_mutation() {
    let state = todo_state(&["milk"]);
    let store = Rc::new(MemoryStore::new(state.clone()));
    let mut recorder = recorder();
    recorder.register("todos", store.clone());

    if let Some(Value::Array(items)) = state.get("todos") {
        items.borrow_mut().push(Value::from("bread"));
    }

    assert_eq!(
        recorder.snapshot_at("todos", 0).map(|s| s.to_json()),
        Some(serde_json::json!({ "todos": ["milk"] }))
    );
}

#[test]
fn playback_from_start_visits_every_entry_once() {
    let store = Rc::new(MemoryStore::new(Value::from(0)));
    let mut recorder = HistoryRecorder::new(RecorderConfig::default().with_playback_ms(300));
    recorder.register("counter", store.clone());
    for n in 1..=4 {
        store.set_state(Value::from(n), true);
    }

    let visited = Rc::new(RefCell::new(Vec::new()));
    let log = visited.clone();
    let _watch = store.subscribe(Box::new(move |next, _| {
        log.borrow_mut().push(serialize(next));
    }));

    recorder.jump_to_start();
    recorder.advance(0);
    recorder.toggle_play();
    recorder.advance(10_000);

    assert_eq!(recorder.playback_state(), PlaybackState::Idle);
    assert_eq!(recorder.current_index("counter"), Some(4));
    assert_eq!(
        *visited.borrow(),
        (0..=4i32).map(SerializedValue::from).collect::<Vec<_>>()
    );
    assert_eq!(recorder.history_len("counter"), 5);
}

#[test]
fn changes_resume_recording_after_guard_clears() {
    let store = Rc::new(MemoryStore::new(Value::from(1)));
    let mut recorder = recorder();
    recorder.register("n", store.clone());
    store.set_state(Value::from(2), true);

    recorder.jump_to_start();
    assert!(recorder.is_time_traveling());
    recorder.advance(0);
    assert!(!recorder.is_time_traveling());

    store.set_state(Value::from(3), true);
    assert_eq!(recorder.history_len("n"), 3);
    assert_eq!(recorder.current_index("n"), Some(2));
    assert!(recorder
        .entries("n")
        .iter()
        .all(|entry| entry.timestamp == Timestamp::from_millis(7)));
}
