//! FIFO queue of pending callbacks.
//!
//! One instance serves as the runtime's ready queue; the lifecycle
//! interest registry is built from two more. Entries are stored in a slot
//! map and ordered by a separate deque of `(key, generation)` pairs, so
//! cancellation only removes the slot and the stale deque entry is
//! skipped on pop. Slot reuse cannot resurrect a cancelled entry because
//! the generation stamped into the deque no longer matches.

use std::collections::VecDeque;

use log::trace;
use slab::Slab;

use crate::callback::Callback;

/// FIFO of one-shot callbacks with generation-checked cancellation.
#[derive(Debug)]
pub(crate) struct CallbackQueue {
    entries: Slab<Entry>,
    /// Pop order. May contain stale keys; an entry is live iff the slab
    /// slot exists and carries the same generation.
    order: VecDeque<(usize, u64)>,
    next_generation: u64,
}

#[derive(Debug)]
struct Entry {
    generation: u64,
    callback: Callback,
}

impl CallbackQueue {
    pub(crate) fn new() -> CallbackQueue {
        CallbackQueue {
            entries: Slab::new(),
            order: VecDeque::new(),
            next_generation: 0,
        }
    }

    /// Append a callback, returning its `(key, generation)` pair.
    pub(crate) fn append(&mut self, callback: Callback) -> (usize, u64) {
        let generation = self.next_generation;
        self.next_generation += 1;
        let key = self.entries.insert(Entry { generation, callback });
        self.order.push_back((key, generation));
        trace!("queueing callback: key={}, generation={}", key, generation);
        (key, generation)
    }

    /// Remove and return the head of the queue, skipping cancelled
    /// entries.
    pub(crate) fn pop(&mut self) -> Option<Callback> {
        self.pop_before(u64::max_value())
    }

    /// Remove and return the head of the queue if it was appended before
    /// `bound` (exclusive, in generations). Used by interest drains: a
    /// drain captures the bound once and so never reaches entries
    /// appended while it runs.
    pub(crate) fn pop_before(&mut self, bound: u64) -> Option<Callback> {
        loop {
            let (key, generation) = *self.order.front()?;
            let live = self.entries.get(key)
                .map_or(false, |entry| entry.generation == generation);
            if !live {
                // Cancelled; drop the stale order entry and move on.
                let _ = self.order.pop_front();
                continue;
            }
            if generation >= bound {
                return None;
            }
            let _ = self.order.pop_front();
            return Some(self.entries.remove(key).callback);
        }
    }

    /// Cancel the entry at `key`, if `generation` still matches. Returns
    /// whether an entry was removed.
    pub(crate) fn cancel(&mut self, key: usize, generation: u64) -> bool {
        let live = self.entries.get(key)
            .map_or(false, |entry| entry.generation == generation);
        if live {
            trace!("cancelling queued callback: key={}, generation={}", key, generation);
            drop(self.entries.remove(key));
        }
        live
    }

    /// The generation the next append will receive, usable as a drain
    /// bound.
    pub(crate) fn generation_bound(&self) -> u64 {
        self.next_generation
    }

    /// Whether the queue holds no live entries.
    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of live entries.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
