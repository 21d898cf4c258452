//! # Stream ID Sets
//!
//! Compact set of stream IDs of a single type. IDs are normalized to
//! `(id - base) / 4` and stored in a coalescing [`IntervalSet`], so the
//! steady-state shape (a receiver that has opened 0, 4, 8, ... N) is a
//! single interval regardless of N.

#![forbid(unsafe_code)]

use crate::interval_set::IntervalSet;
use crate::types::{StreamId, STREAM_INCREMENT};

/// Set of stream IDs sharing one type.
///
/// Construction fixes the `base`, the lowest legal ID of the type. Every ID
/// passed in must satisfy `(id - base) % 4 == 0`; anything else is a
/// programmer error and panics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamIdSet {
    streams: IntervalSet,
    base: u64,
}

impl StreamIdSet {
    pub fn new(base: StreamId) -> Self {
        Self {
            streams: IntervalSet::new(),
            base: base.value(),
        }
    }

    fn index(&self, id: StreamId) -> u64 {
        let offset = id
            .value()
            .checked_sub(self.base)
            .expect("stream id below set base");
        assert_eq!(
            offset % STREAM_INCREMENT,
            0,
            "stream id {} misaligned for base {}",
            id,
            self.base
        );
        offset / STREAM_INCREMENT
    }

    /// Add a single stream ID.
    pub fn add(&mut self, id: StreamId) {
        self.add_range(id, id);
    }

    /// Add every ID of the type from `first` to `last` inclusive.
    pub fn add_range(&mut self, first: StreamId, last: StreamId) {
        let first = self.index(first);
        let last = self.index(last);
        self.streams.insert(first, last);
    }

    /// Remove a single stream ID.
    pub fn remove(&mut self, id: StreamId) {
        let idx = self.index(id);
        self.streams.withdraw(idx, idx);
    }

    pub fn contains(&self, id: StreamId) -> bool {
        let idx = self.index(id);
        self.streams.contains(idx, idx)
    }

    /// Number of IDs represented (expanded cardinality, not interval count).
    pub fn len(&self) -> u64 {
        self.streams.covered_len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    pub fn clear(&mut self) {
        self.streams.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contiguous_ids_collapse() {
        let mut set = StreamIdSet::new(StreamId(0));
        for id in (0..400u64).step_by(4) {
            set.add(StreamId(id));
        }
        assert_eq!(set.len(), 100);
        assert_eq!(set.streams.iter().count(), 1);
    }

    #[test]
    fn test_nonzero_base() {
        let mut set = StreamIdSet::new(StreamId(0x01));
        set.add(StreamId(1));
        set.add(StreamId(5));
        set.add(StreamId(13));
        assert!(set.contains(StreamId(1)));
        assert!(set.contains(StreamId(5)));
        assert!(!set.contains(StreamId(9)));
        assert!(set.contains(StreamId(13)));
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_remove_splits_run() {
        let mut set = StreamIdSet::new(StreamId(2));
        set.add_range(StreamId(2), StreamId(18));
        assert_eq!(set.len(), 5);
        set.remove(StreamId(10));
        assert!(!set.contains(StreamId(10)));
        assert!(set.contains(StreamId(6)));
        assert!(set.contains(StreamId(14)));
        assert_eq!(set.len(), 4);
    }

    #[test]
    #[should_panic(expected = "misaligned")]
    fn test_misaligned_insert_panics() {
        let mut set = StreamIdSet::new(StreamId(0));
        set.add(StreamId(2));
    }

    #[test]
    fn test_matches_reference_set() {
        // Mirrors every mutation against a plain set of raw IDs.
        let mut set = StreamIdSet::new(StreamId(3));
        let mut reference = std::collections::HashSet::new();
        let ids = [3u64, 7, 11, 19, 23, 43, 47, 7, 11];
        for &id in &ids {
            set.add(StreamId(id));
            reference.insert(id);
        }
        set.remove(StreamId(19));
        reference.remove(&19);

        assert_eq!(set.len(), reference.len() as u64);
        for id in (3..64u64).step_by(4) {
            assert_eq!(set.contains(StreamId(id)), reference.contains(&id));
        }
    }
}
