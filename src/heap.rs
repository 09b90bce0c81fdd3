//! Bounded min-heap over a borrowed window of the record arena.
//!
//! The heap distinguishes its *logical size* (entries taking part in heap order) from its
//! *capacity* (addressable slots). Slots in `[capacity, window)` are hidden: they stay in the
//! backing store but are excluded from every comparison until the window is rebuilt over them.
//! Replacement selection uses this to park records that belong to the next run without any
//! extra allocation.

use std::error::Error;
use std::fmt;
use std::fmt::Display;

/// Heap invariant violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeapError {
    /// Insertion into a heap whose logical size already equals its capacity.
    Overflow { capacity: usize },
    /// Removal from an empty heap.
    Underflow,
}

impl Error for HeapError {}

impl Display for HeapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeapError::Overflow { capacity } => write!(f, "heap overflow (capacity: {})", capacity),
            HeapError::Underflow => write!(f, "heap underflow"),
        }
    }
}

/// Array-backed binary min-heap with an independently shrinkable capacity.
pub struct MinHeap<'a, T> {
    slots: &'a mut [T],
    len: usize,
    capacity: usize,
}

impl<'a, T: Ord + Copy> MinHeap<'a, T> {
    /// Creates an empty heap able to address every slot of `slots`.
    pub fn new(slots: &'a mut [T]) -> Self {
        let capacity = slots.len();
        MinHeap {
            slots,
            len: 0,
            capacity,
        }
    }

    /// Creates a heap over the first `len` entries of `slots` with the given capacity and heapifies them.
    ///
    /// # Panics
    /// Panics if `len > capacity` or `capacity > slots.len()`.
    pub fn with_window(slots: &'a mut [T], len: usize, capacity: usize) -> Self {
        let mut heap = MinHeap::new(slots);
        heap.rewindow(len, capacity);
        heap
    }

    /// Number of entries participating in heap order.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Maximum number of addressable slots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total number of slots of the backing window.
    pub fn window(&self) -> usize {
        self.slots.len()
    }

    /// Number of slots excluded from the heap by [`MinHeap::hide_min`] or [`MinHeap::shrink_capacity`].
    pub fn hidden(&self) -> usize {
        self.slots.len() - self.capacity
    }

    pub fn peek(&self) -> Option<&T> {
        if self.len == 0 {
            None
        } else {
            Some(&self.slots[0])
        }
    }

    /// Heap entries in backing-store order.
    pub fn as_slice(&self) -> &[T] {
        &self.slots[..self.len]
    }

    /// Appends an item at the next logical slot and sifts it up.
    pub fn insert(&mut self, item: T) -> Result<(), HeapError> {
        if self.len >= self.capacity {
            return Err(HeapError::Overflow {
                capacity: self.capacity,
            });
        }

        let pos = self.len;
        self.slots[pos] = item;
        self.len += 1;
        self.sift_up(pos);

        return Ok(());
    }

    /// Removes and returns the minimum.
    pub fn extract_min(&mut self) -> Result<T, HeapError> {
        if self.len == 0 {
            return Err(HeapError::Underflow);
        }

        self.len -= 1;
        self.slots.swap(0, self.len);
        self.sift_down(0);

        return Ok(self.slots[self.len]);
    }

    /// Restores heap order over `[0, len)` bottom-up.
    pub fn build_heap(&mut self) {
        for pos in (0..self.len / 2).rev() {
            self.sift_down(pos);
        }
    }

    /// Moves the minimum to the capacity boundary and shrinks both the logical size and the capacity by one.
    ///
    /// The hidden entry stays in the backing store but takes no part in comparisons until the heap is rebuilt
    /// over the hidden region.
    pub fn hide_min(&mut self) -> Result<(), HeapError> {
        if self.len == 0 {
            return Err(HeapError::Underflow);
        }

        self.len -= 1;
        self.slots.swap(0, self.len);
        // the boundary slot is outside the logical region once len < capacity
        self.slots.swap(self.len, self.capacity - 1);
        self.capacity -= 1;
        self.sift_down(0);

        return Ok(());
    }

    /// Shrinks the capacity by one if it exceeds the logical size.
    pub fn shrink_capacity(&mut self) {
        if self.len < self.capacity {
            self.capacity -= 1;
        }
    }

    /// Relocates the `count` hidden slots at the tail of the window to its head,
    /// so that a fresh view with [`MinHeap::rewindow`] can be built directly over them.
    ///
    /// # Panics
    /// Panics if `count` exceeds the window size.
    pub fn repartition_hidden(&mut self, count: usize) {
        let window = self.slots.len();
        self.slots.rotate_left(window - count);
        self.len = 0;
        self.capacity = 0;
    }

    /// Re-windows the heap to `len` entries and `capacity` slots and rebuilds heap order.
    ///
    /// # Panics
    /// Panics if `len > capacity` or `capacity` exceeds the window size.
    pub fn rewindow(&mut self, len: usize, capacity: usize) {
        assert!(len <= capacity, "heap size {} exceeds capacity {}", len, capacity);
        assert!(
            capacity <= self.slots.len(),
            "heap capacity {} exceeds window {}",
            capacity,
            self.slots.len()
        );

        self.len = len;
        self.capacity = capacity;
        self.build_heap();
    }

    fn sift_up(&mut self, mut pos: usize) {
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if self.slots[pos] >= self.slots[parent] {
                break;
            }
            self.slots.swap(pos, parent);
            pos = parent;
        }
    }

    fn sift_down(&mut self, mut pos: usize) {
        loop {
            let left = 2 * pos + 1;
            if left >= self.len {
                return;
            }

            let right = left + 1;
            let child = if right < self.len && self.slots[right] < self.slots[left] {
                right
            } else {
                left
            };

            if self.slots[pos] <= self.slots[child] {
                return;
            }
            self.slots.swap(pos, child);
            pos = child;
        }
    }
}

#[cfg(test)]
mod test {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use rstest::*;

    use super::{HeapError, MinHeap};

    fn assert_heap_order(heap: &MinHeap<i32>) {
        let entries = heap.as_slice();
        for pos in 1..entries.len() {
            assert!(
                entries[(pos - 1) / 2] <= entries[pos],
                "heap order broken at {}: {:?}",
                pos,
                entries
            );
        }
    }

    #[rstest]
    #[case(vec![])]
    #[case(vec![1])]
    #[case(vec![5, 4, 3, 2, 1])]
    #[case(vec![3, 1, 3, 1, 2, 2])]
    fn test_heap_sort(#[case] input: Vec<i32>) {
        let mut slots = vec![0; input.len()];
        let mut heap = MinHeap::new(&mut slots);
        for item in input.iter() {
            heap.insert(*item).unwrap();
        }

        let mut actual = Vec::new();
        while !heap.is_empty() {
            actual.push(heap.extract_min().unwrap());
        }

        let mut expected = input.clone();
        expected.sort();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_heap_invariant_random_operations() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut slots = vec![0; 64];
        let mut heap = MinHeap::new(&mut slots);

        for _ in 0..2000 {
            if heap.len() < heap.capacity() && (heap.is_empty() || rng.gen_bool(0.6)) {
                heap.insert(rng.gen_range(-100..100)).unwrap();
            } else {
                let min = *heap.peek().unwrap();
                assert_eq!(heap.extract_min().unwrap(), min);
                assert!(heap.as_slice().iter().all(|item| *item >= min));
            }
            assert_heap_order(&heap);
        }
    }

    #[test]
    fn test_build_heap() {
        let mut slots = vec![9, 8, 7, 6, 5, 4, 3, 2, 1, 0];
        let heap = MinHeap::with_window(&mut slots, 10, 10);

        assert_heap_order(&heap);
        assert_eq!(heap.peek(), Some(&0));
    }

    #[test]
    fn test_heap_errors() {
        let mut slots = vec![0; 2];
        let mut heap = MinHeap::new(&mut slots);

        assert_eq!(heap.extract_min(), Err(HeapError::Underflow));
        assert_eq!(heap.hide_min(), Err(HeapError::Underflow));
        heap.insert(1).unwrap();
        heap.insert(2).unwrap();
        assert_eq!(heap.insert(3), Err(HeapError::Overflow { capacity: 2 }));
    }

    #[test]
    fn test_hide_min() {
        let mut slots = vec![4, 2, 6, 1, 5, 3];
        let mut heap = MinHeap::with_window(&mut slots, 6, 6);

        heap.hide_min().unwrap();
        assert_eq!((heap.len(), heap.capacity(), heap.hidden()), (5, 5, 1));
        assert_heap_order(&heap);

        heap.hide_min().unwrap();
        assert_eq!((heap.len(), heap.capacity(), heap.hidden()), (4, 4, 2));

        // hidden entries no longer take part in comparisons
        assert_eq!(heap.extract_min().unwrap(), 3);
        assert_eq!(heap.extract_min().unwrap(), 4);
        drop(heap);
        assert_eq!(&slots[4..], &[2, 1]);
    }

    #[test]
    fn test_hide_min_after_shrink() {
        let mut slots = vec![1, 2, 3, 4];
        let mut heap = MinHeap::with_window(&mut slots, 4, 4);

        assert_eq!(heap.extract_min().unwrap(), 1);
        assert_eq!((heap.len(), heap.capacity()), (3, 4));
        heap.hide_min().unwrap();
        assert_eq!((heap.len(), heap.capacity()), (2, 3));
        assert_eq!(heap.extract_min().unwrap(), 3);
        heap.shrink_capacity();
        assert_eq!((heap.len(), heap.capacity()), (1, 2));
        heap.shrink_capacity();
        heap.shrink_capacity();
        assert_eq!((heap.len(), heap.capacity()), (1, 1));
        drop(heap);
        assert_eq!(slots[3], 2);
    }

    #[rstest]
    #[case(1)]
    #[case(3)]
    #[case(5)]
    #[case(8)]
    fn test_repartition_hidden(#[case] hidden: usize) {
        let mut slots: Vec<i32> = (0..8).rev().collect();
        let mut heap = MinHeap::with_window(&mut slots, 8, 8);
        for _ in 0..hidden {
            heap.hide_min().unwrap();
        }
        assert_eq!(heap.hidden(), hidden);
        while !heap.is_empty() {
            heap.extract_min().unwrap();
            heap.shrink_capacity();
        }
        assert_eq!(heap.capacity(), 0);

        heap.repartition_hidden(hidden);
        heap.rewindow(hidden, hidden);

        let mut actual = Vec::new();
        while !heap.is_empty() {
            actual.push(heap.extract_min().unwrap());
        }
        assert_eq!(actual, Vec::from_iter(0..hidden as i32));
    }
}
