//! Fixed-size working memory shared by every phase of a sort.

use std::cmp::Ordering;

use crate::config::SortConfig;
use crate::record::Record;

/// Arena slot: a record plus the index of the merge cursor it was read from.
///
/// The origin is only meaningful while merging and never reaches the on-disk codec.
/// Slots are ordered by their records only.
#[derive(Debug, Clone, Copy, Default)]
pub struct Slot {
    pub record: Record,
    pub origin: usize,
}

impl Slot {
    pub fn new(record: Record, origin: usize) -> Self {
        Slot { record, origin }
    }
}

impl Ord for Slot {
    fn cmp(&self, other: &Self) -> Ordering {
        self.record.cmp(&other.record)
    }
}

impl PartialOrd for Slot {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Slot {
    fn eq(&self, other: &Self) -> bool {
        self.record == other.record
    }
}

impl Eq for Slot {}

/// Heap slots and block buffers, allocated once and lent to one phase at a time.
pub struct Arena {
    pub(crate) slots: Vec<Slot>,
    pub(crate) input: Vec<u8>,
    pub(crate) output: Vec<u8>,
    pub(crate) cursor_buffers: Vec<Vec<u8>>,
}

impl Arena {
    pub fn new(config: &SortConfig) -> Self {
        let slot_count = config.heap_capacity().max(config.merge_heap_capacity());
        log::debug!(
            "allocating arena (slots: {}, block buffers: {})",
            slot_count,
            config.fan_in() + 2
        );

        Arena {
            slots: vec![Slot::default(); slot_count],
            input: vec![0; config.block_size()],
            output: vec![0; config.block_size()],
            cursor_buffers: vec![vec![0; config.block_size()]; config.fan_in()],
        }
    }

    /// Total number of heap slots.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }
}

#[cfg(test)]
mod test {
    use super::{Arena, Slot};
    use crate::config::SortConfig;
    use crate::record::Record;

    #[test]
    fn test_arena_sizing() {
        let config = SortConfig::new(256, 4, 2048).unwrap();
        let arena = Arena::new(&config);

        assert_eq!(arena.slot_count(), 256);
        assert_eq!(arena.input.len(), 256);
        assert_eq!(arena.output.len(), 256);
        assert_eq!(arena.cursor_buffers.len(), 4);
    }

    #[test]
    fn test_slot_order_ignores_origin() {
        let a = Slot::new(Record::with_id(1, 1.0), 3);
        let b = Slot::new(Record::with_id(1, 1.0), 0);
        let c = Slot::new(Record::with_id(1, 2.0), 0);

        assert_eq!(a, b);
        assert!(a < c);
    }
}
