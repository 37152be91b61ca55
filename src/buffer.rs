use crate::error::{PipelineError, Result};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug)]
struct Slots {
    storage: Box<[i64]>,
    /// Index of the newest live element, `None` while empty
    cursor: Option<usize>,
}

/// A fixed-capacity, overwrite-on-full integer buffer shared between one
/// writer and one drainer.
///
/// Live content always sits at `storage[0..=cursor]`, oldest first. Once the
/// buffer is full a push shifts every element one slot toward the front,
/// evicting the oldest, and stores the new value in the last slot. That shift
/// is O(capacity); capacities here are small and pushes are already thinned
/// out by the upstream filters.
///
/// Clones share the same storage and lock.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    slots: Arc<Mutex<Slots>>,
    capacity: usize,
}

impl RingBuffer {
    /// Create an empty ring buffer with `capacity` slots
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(PipelineError::InvalidCapacity(capacity));
        }

        Ok(Self {
            slots: Arc::new(Mutex::new(Slots {
                storage: vec![0; capacity].into_boxed_slice(),
                cursor: None,
            })),
            capacity,
        })
    }

    /// Append a value, evicting the oldest one if the buffer is full
    pub fn push(&self, value: i64) {
        let last = self.capacity - 1;
        let mut slots = self.slots.lock();
        let cursor = slots.cursor;

        match cursor {
            Some(cursor) if cursor == last => {
                slots.storage.copy_within(1.., 0);
                slots.storage[last] = value;
            }
            cursor => {
                let next = cursor.map_or(0, |c| c + 1);
                slots.storage[next] = value;
                slots.cursor = Some(next);
            }
        }
    }

    /// Take a snapshot of the live content (oldest first) and mark the buffer empty.
    ///
    /// Returns an empty vector when nothing was pushed since the last drain.
    /// A buffer holding a single element drains that element.
    pub fn drain_and_reset(&self) -> Vec<i64> {
        let mut slots = self.slots.lock();
        match slots.cursor.take() {
            Some(cursor) => slots.storage[..=cursor].to_vec(),
            None => Vec::new(),
        }
    }

    /// Number of live elements
    pub fn len(&self) -> usize {
        self.slots.lock().cursor.map_or(0, |c| c + 1)
    }

    /// Check if the buffer holds no live elements
    pub fn is_empty(&self) -> bool {
        self.slots.lock().cursor.is_none()
    }

    /// Check if the next push will evict the oldest element
    pub fn is_full(&self) -> bool {
        self.slots.lock().cursor == Some(self.capacity - 1)
    }

    /// Get the capacity of the buffer
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Index of the newest live element, `None` while empty
    pub fn write_cursor(&self) -> Option<usize> {
        self.slots.lock().cursor
    }
}
