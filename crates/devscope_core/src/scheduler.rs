//! Cooperative scheduler with a virtual clock.
//!
//! devscope runs on a single event loop. Anything that must happen "on the
//! next tick" or "every N milliseconds" is queued here as a typed task and
//! handed back to the owner when the host advances time. Nothing runs on its
//! own; the owner pulls due tasks with [`Scheduler::next_due`].
//!
//! Ordering contract: a task posted with zero delay during the current loop
//! iteration is never due before the owner's next call to `next_due`, so work
//! triggered synchronously in this iteration always observes state set before
//! the task was posted.
//!
//! ```rust
//! use devscope_core::Scheduler;
//!
//! let mut scheduler = Scheduler::new();
//! scheduler.set_interval(100, "tick");
//! scheduler.post("now");
//!
//! let deadline = scheduler.now().saturating_add(250);
//! let mut fired = Vec::new();
//! while let Some((_, task)) = scheduler.next_due(deadline) {
//!     fired.push(task);
//! }
//! scheduler.settle(deadline);
//! assert_eq!(fired, vec!["now", "tick", "tick"]);
//! ```

use slotmap::{new_key_type, SlotMap};

use crate::timestamp::Timestamp;

new_key_type! {
    /// Unique identifier for a scheduled task
    pub struct TimerId;
}

#[derive(Debug)]
struct Timer<T> {
    due: Timestamp,
    interval: Option<u64>,
    seq: u64,
    task: T,
}

/// Virtual-time task queue.
#[derive(Debug)]
pub struct Scheduler<T> {
    now: Timestamp,
    timers: SlotMap<TimerId, Timer<T>>,
    next_seq: u64,
}

impl<T: Clone> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            now: Timestamp::zero(),
            timers: SlotMap::with_key(),
            next_seq: 0,
        }
    }

    /// Current virtual time.
    pub fn now(&self) -> Timestamp {
        self.now
    }

    /// Queue `task` for the next scheduling opportunity.
    pub fn post(&mut self, task: T) -> TimerId {
        self.set_timeout(0, task)
    }

    /// Queue `task` to run once after `delay_ms`.
    pub fn set_timeout(&mut self, delay_ms: u64, task: T) -> TimerId {
        self.insert(delay_ms, None, task)
    }

    /// Queue `task` to run every `interval_ms` (at least 1ms).
    pub fn set_interval(&mut self, interval_ms: u64, task: T) -> TimerId {
        let interval_ms = interval_ms.max(1);
        self.insert(interval_ms, Some(interval_ms), task)
    }

    fn insert(&mut self, delay_ms: u64, interval: Option<u64>, task: T) -> TimerId {
        let seq = self.bump_seq();
        self.timers.insert(Timer {
            due: self.now.saturating_add(delay_ms),
            interval,
            seq,
            task,
        })
    }

    fn bump_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    /// Cancel a pending task. Returns `false` if it already ran or was
    /// cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        self.timers.remove(id).is_some()
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.timers.contains_key(id)
    }

    pub fn pending_count(&self) -> usize {
        self.timers.len()
    }

    pub fn is_idle(&self) -> bool {
        self.timers.is_empty()
    }

    /// Drop every pending task.
    pub fn clear(&mut self) {
        self.timers.clear();
    }

    /// Pop the earliest task due at or before `deadline`.
    ///
    /// Ties are broken by scheduling order. The virtual clock moves to the
    /// task's due time; repeating tasks are re-armed for their next period.
    pub fn next_due(&mut self, deadline: Timestamp) -> Option<(TimerId, T)> {
        let (id, due) = self
            .timers
            .iter()
            .filter(|(_, timer)| timer.due <= deadline)
            .min_by_key(|(_, timer)| (timer.due, timer.seq))
            .map(|(id, timer)| (id, timer.due))?;

        if due > self.now {
            self.now = due;
        }

        let interval = self.timers.get(id).and_then(|timer| timer.interval);
        match interval {
            Some(period) => {
                let seq = self.bump_seq();
                let timer = self.timers.get_mut(id)?;
                timer.due = due.saturating_add(period);
                timer.seq = seq;
                Some((id, timer.task.clone()))
            }
            None => self.timers.remove(id).map(|timer| (id, timer.task)),
        }
    }

    /// Move the virtual clock forward to `deadline` once due tasks have been
    /// drained.
    pub fn settle(&mut self, deadline: Timestamp) {
        if deadline > self.now {
            self.now = deadline;
        }
    }
}

impl<T: Clone> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn drain(scheduler: &mut Scheduler<&'static str>, elapsed: u64) -> Vec<&'static str> {
        let deadline = scheduler.now().saturating_add(elapsed);
        let mut fired = Vec::new();
        while let Some((_, task)) = scheduler.next_due(deadline) {
            fired.push(task);
        }
        scheduler.settle(deadline);
        fired
    }

    #[test]
    fn test_post_runs_on_next_drain() {
        let mut scheduler = Scheduler::new();
        scheduler.post("a");
        scheduler.post("b");
        assert_eq!(drain(&mut scheduler, 0), vec!["a", "b"]);
        assert!(scheduler.is_idle());
    }

    #[test]
    fn test_timeouts_ordered_by_due_time() {
        let mut scheduler = Scheduler::new();
        scheduler.set_timeout(50, "late");
        scheduler.set_timeout(10, "early");
        scheduler.post("now");

        assert_eq!(drain(&mut scheduler, 20), vec!["now", "early"]);
        assert_eq!(scheduler.now().as_millis(), 20);
        assert_eq!(drain(&mut scheduler, 30), vec!["late"]);
    }

    #[test]
    fn test_interval_repeats_until_cancelled() {
        let mut scheduler = Scheduler::new();
        let id = scheduler.set_interval(100, "tick");

        assert_eq!(drain(&mut scheduler, 99), Vec::<&str>::new());
        assert_eq!(drain(&mut scheduler, 301), vec!["tick", "tick", "tick", "tick"]);
        assert!(scheduler.is_pending(id));

        assert!(scheduler.cancel(id));
        assert!(!scheduler.cancel(id));
        assert_eq!(drain(&mut scheduler, 1_000), Vec::<&str>::new());
    }

    #[test]
    fn test_cancel_during_drain() {
        let mut scheduler = Scheduler::new();
        let tick = scheduler.set_interval(10, "tick");
        let deadline = scheduler.now().saturating_add(100);

        let mut count = 0;
        while let Some((id, _)) = scheduler.next_due(deadline) {
            count += 1;
            if count == 3 {
                scheduler.cancel(id);
            }
        }
        assert_eq!(count, 3);
        assert!(!scheduler.is_pending(tick));
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let mut scheduler = Scheduler::new();
        scheduler.set_interval(0, "spin");
        assert_eq!(drain(&mut scheduler, 3).len(), 3);
    }
}
