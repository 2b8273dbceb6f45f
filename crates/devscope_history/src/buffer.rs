//! Bounded history of one store.

use std::collections::VecDeque;

use devscope_core::{Error, Result, SerializedValue, Timestamp};
use serde::Serialize;

/// A captured snapshot.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HistoryEntry {
    /// Capture time in milliseconds.
    pub timestamp: Timestamp,
    /// Serialized state at that time.
    pub snapshot: SerializedValue,
}

impl HistoryEntry {
    pub fn new(timestamp: Timestamp, snapshot: SerializedValue) -> Self {
        Self {
            timestamp,
            snapshot,
        }
    }
}

/// Ordered snapshots plus the current index.
///
/// Holds at most `max_history` entries; appending past the bound drops the
/// oldest. The index always points at an entry while the buffer is non-empty
/// and moves to the newest entry on every append.
#[derive(Clone, Debug)]
pub struct HistoryBuffer {
    entries: VecDeque<HistoryEntry>,
    index: usize,
    max_history: usize,
}

impl HistoryBuffer {
    /// Create an empty buffer. `max_history` is at least 1.
    pub fn new(max_history: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            index: 0,
            max_history: max_history.max(1),
        }
    }

    /// Create a buffer holding a single initial entry.
    pub fn with_initial(entry: HistoryEntry, max_history: usize) -> Self {
        let mut buffer = Self::new(max_history);
        buffer.push(entry);
        buffer
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    /// Current index; 0 for an empty buffer.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn last_index(&self) -> Option<usize> {
        self.entries.len().checked_sub(1)
    }

    pub fn get(&self, index: usize) -> Option<&HistoryEntry> {
        self.entries.get(index)
    }

    pub fn current(&self) -> Option<&HistoryEntry> {
        self.entries.get(self.index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    /// Append an entry, evict from the front past the bound, and make the new
    /// entry current.
    pub fn push(&mut self, entry: HistoryEntry) {
        self.entries.push_back(entry);
        self.evict();
        self.index = self.entries.len() - 1;
    }

    /// Change the bound, evicting the oldest entries if needed. The current
    /// index keeps pointing at the same entry when it survives, otherwise at
    /// the oldest remaining one.
    pub fn set_max_history(&mut self, max_history: usize) {
        self.max_history = max_history.max(1);
        let evicted = self.evict();
        self.index = self.index.saturating_sub(evicted);
    }

    fn evict(&mut self) -> usize {
        let excess = self.entries.len().saturating_sub(self.max_history);
        self.entries.drain(..excess);
        excess
    }

    /// Validate `index` against the buffer.
    ///
    /// Errors with [`Error::EmptyHistory`] when there is nothing recorded and
    /// [`Error::IndexOutOfRange`] when `index` falls outside `[0, len)`.
    pub fn checked(&self, index: i64) -> Result<usize> {
        let len = self.entries.len();
        if len == 0 {
            return Err(Error::EmptyHistory(String::new()));
        }
        if index < 0 || index as u64 >= len as u64 {
            return Err(Error::IndexOutOfRange { index, len });
        }
        Ok(index as usize)
    }

    /// Clamp `index` into `[0, len - 1]`; `None` when the buffer is empty.
    pub fn clamp(&self, index: i64) -> Option<usize> {
        let last = self.last_index()?;
        Some(index.clamp(0, last as i64) as usize)
    }

    /// Set the current index. Out-of-range values are clamped.
    pub fn set_index(&mut self, index: i64) -> Option<usize> {
        let clamped = self.clamp(index)?;
        self.index = clamped;
        Some(clamped)
    }

    /// `"current/total"`, 1-based, with a total of at least 1.
    pub fn position_label(&self) -> String {
        let total = self.entries.len().max(1);
        let current = if self.entries.is_empty() { 1 } else { self.index + 1 };
        format!("{current}/{total}")
    }
}
