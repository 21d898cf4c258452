//! # Write Scheduling Priority Queue
//!
//! Round-robins writable data streams under an urgency/incremental priority
//! scheme. The frame builder asks for one stream at a time; a stream keeps
//! its turn for at most a configured number of consecutive grants before the
//! next stream of the same level is scheduled.
//!
//! Control streams never enter this queue; they live in a separate ordered
//! set drained first by the frame builder.

#![forbid(unsafe_code)]

use crate::types::StreamId;
use std::collections::{HashMap, VecDeque};

/// Stream priority: urgency 0 (highest) through 7 (lowest), plus an
/// incremental flag that interleaves streams of equal urgency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Priority {
    pub urgency: u8,
    pub incremental: bool,
}

impl Priority {
    pub const MAX_URGENCY: u8 = 7;

    pub fn new(urgency: u8, incremental: bool) -> Self {
        Self {
            urgency: urgency.min(Self::MAX_URGENCY),
            incremental,
        }
    }

    fn level(self) -> usize {
        (self.urgency as usize) * 2 + usize::from(self.incremental)
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self {
            urgency: 3,
            incremental: false,
        }
    }
}

const PRIORITY_LEVELS: usize = (Priority::MAX_URGENCY as usize + 1) * 2;

#[derive(Debug, Default)]
struct Level {
    queue: VecDeque<StreamId>,
    // Consecutive grants handed to the stream at the queue front.
    grants: u64,
}

/// Priority queue of writable stream IDs.
#[derive(Debug)]
pub struct PriorityQueue {
    levels: [Level; PRIORITY_LEVELS],
    index: HashMap<StreamId, Priority>,
    writes_per_stream: u64,
}

impl Default for PriorityQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl PriorityQueue {
    pub fn new() -> Self {
        Self {
            levels: std::array::from_fn(|_| Level::default()),
            index: HashMap::new(),
            writes_per_stream: 1,
        }
    }

    /// Maximum consecutive `next()` grants per stream before the same-level
    /// round-robin advances.
    pub fn set_writes_per_stream(&mut self, writes: u64) {
        self.writes_per_stream = writes.max(1);
    }

    /// Insert `id` at `priority`, or move it if queued at a different
    /// priority. Re-inserting with the same priority is a no-op and keeps
    /// the stream's round-robin position.
    pub fn insert_or_update(&mut self, id: StreamId, priority: Priority) {
        match self.index.get(&id) {
            Some(&current) if current.level() == priority.level() => {
                self.index.insert(id, priority);
            }
            Some(&current) => {
                self.unlink(id, current);
                self.levels[priority.level()].queue.push_back(id);
                self.index.insert(id, priority);
            }
            None => {
                self.levels[priority.level()].queue.push_back(id);
                self.index.insert(id, priority);
            }
        }
    }

    /// Update the priority of a queued stream without re-queuing when the
    /// level is unchanged. Returns whether anything changed.
    pub fn set_priority(&mut self, id: StreamId, priority: Priority) -> bool {
        match self.index.get(&id) {
            Some(&current) if current == priority => false,
            Some(_) => {
                self.insert_or_update(id, priority);
                true
            }
            None => false,
        }
    }

    /// Remove `id` from the queue. Returns whether it was present.
    pub fn erase(&mut self, id: StreamId) -> bool {
        match self.index.remove(&id) {
            Some(priority) => {
                self.unlink(id, priority);
                true
            }
            None => false,
        }
    }

    fn unlink(&mut self, id: StreamId, priority: Priority) {
        let level = &mut self.levels[priority.level()];
        if let Some(pos) = level.queue.iter().position(|&queued| queued == id) {
            level.queue.remove(pos);
            if pos == 0 {
                level.grants = 0;
            }
        }
    }

    /// The stream the frame builder should write next, without consuming a
    /// grant.
    pub fn peek(&self) -> Option<StreamId> {
        self.levels
            .iter()
            .find_map(|level| level.queue.front().copied())
    }

    /// The stream the frame builder should write next. Consumes one grant;
    /// after `writes_per_stream` consecutive grants the stream rotates to
    /// the back of its level.
    pub fn next(&mut self) -> Option<StreamId> {
        let level = self.levels.iter_mut().find(|level| !level.queue.is_empty())?;
        let id = *level.queue.front().expect("non-empty level");
        level.grants += 1;
        if level.grants >= self.writes_per_stream && level.queue.len() > 1 {
            level.queue.rotate_left(1);
            level.grants = 0;
        } else if level.grants >= self.writes_per_stream {
            level.grants = 0;
        }
        Some(id)
    }

    pub fn contains(&self, id: StreamId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn clear(&mut self) {
        self.index.clear();
        for level in &mut self.levels {
            level.queue.clear();
            level.grants = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_higher_urgency_first() {
        let mut queue = PriorityQueue::new();
        queue.insert_or_update(StreamId(0), Priority::new(5, false));
        queue.insert_or_update(StreamId(4), Priority::new(1, false));
        queue.insert_or_update(StreamId(8), Priority::new(3, true));
        assert_eq!(queue.next(), Some(StreamId(4)));
        queue.erase(StreamId(4));
        assert_eq!(queue.next(), Some(StreamId(8)));
    }

    #[test]
    fn test_round_robin_within_level() {
        let mut queue = PriorityQueue::new();
        queue.set_writes_per_stream(1);
        queue.insert_or_update(StreamId(0), Priority::new(3, true));
        queue.insert_or_update(StreamId(4), Priority::new(3, true));
        queue.insert_or_update(StreamId(8), Priority::new(3, true));

        assert_eq!(queue.next(), Some(StreamId(0)));
        assert_eq!(queue.next(), Some(StreamId(4)));
        assert_eq!(queue.next(), Some(StreamId(8)));
        assert_eq!(queue.next(), Some(StreamId(0)));
    }

    #[test]
    fn test_writes_per_stream_budget() {
        let mut queue = PriorityQueue::new();
        queue.set_writes_per_stream(3);
        queue.insert_or_update(StreamId(0), Priority::new(3, true));
        queue.insert_or_update(StreamId(4), Priority::new(3, true));

        assert_eq!(queue.next(), Some(StreamId(0)));
        assert_eq!(queue.next(), Some(StreamId(0)));
        assert_eq!(queue.next(), Some(StreamId(0)));
        assert_eq!(queue.next(), Some(StreamId(4)));
        assert_eq!(queue.next(), Some(StreamId(4)));
    }

    #[test]
    fn test_set_priority_reports_change() {
        let mut queue = PriorityQueue::new();
        queue.insert_or_update(StreamId(0), Priority::new(3, false));
        assert!(!queue.set_priority(StreamId(0), Priority::new(3, false)));
        assert!(queue.set_priority(StreamId(0), Priority::new(1, false)));
        assert!(!queue.set_priority(StreamId(4), Priority::new(1, false)));
        assert_eq!(queue.next(), Some(StreamId(0)));
    }

    #[test]
    fn test_same_priority_reinsert_keeps_position() {
        let mut queue = PriorityQueue::new();
        queue.insert_or_update(StreamId(0), Priority::new(3, true));
        queue.insert_or_update(StreamId(4), Priority::new(3, true));
        queue.insert_or_update(StreamId(0), Priority::new(3, true));
        assert_eq!(queue.next(), Some(StreamId(0)));
    }

    #[test]
    fn test_erase_front_resets_budget() {
        let mut queue = PriorityQueue::new();
        queue.set_writes_per_stream(2);
        queue.insert_or_update(StreamId(0), Priority::new(0, true));
        queue.insert_or_update(StreamId(4), Priority::new(0, true));
        assert_eq!(queue.next(), Some(StreamId(0)));
        assert!(queue.erase(StreamId(0)));
        assert_eq!(queue.next(), Some(StreamId(4)));
        assert_eq!(queue.next(), Some(StreamId(4)));
        assert_eq!(queue.next(), Some(StreamId(4)));
        assert_eq!(queue.len(), 1);
    }
}
