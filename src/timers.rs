//! Deadline-ordered timer queue.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

use log::trace;
use slab::Slab;

use crate::callback::Callback;

/// Time-ordered queue of one-shot callbacks.
///
/// Callbacks are keyed by a monotonic deadline; equal deadlines fire in
/// submission order. Cancellation removes the slot immediately and leaves
/// the heap entry to be skipped lazily, so cancelling never pays for a
/// heap rebuild.
///
/// Timer precision is best-effort. The loop gives expired timers priority
/// over ready callbacks, nothing more.
#[derive(Debug)]
pub(crate) struct TimerQueue {
    entries: Slab<Entry>,
    deadlines: BinaryHeap<Reverse<Deadline>>,
    next_generation: u64,
}

#[derive(Debug)]
struct Entry {
    generation: u64,
    callback: Callback,
}

/// Ordered by `deadline`, ties broken by submission order.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
struct Deadline {
    deadline: Instant,
    generation: u64,
    key: usize,
}

impl TimerQueue {
    pub(crate) fn new() -> TimerQueue {
        TimerQueue {
            entries: Slab::new(),
            deadlines: BinaryHeap::new(),
            next_generation: 0,
        }
    }

    /// Add a callback to fire once `after` has elapsed, returning its
    /// `(key, generation)` pair.
    pub(crate) fn append(&mut self, after: Duration, callback: Callback) -> (usize, u64) {
        let deadline = Instant::now() + after;
        let generation = self.next_generation;
        self.next_generation += 1;
        let key = self.entries.insert(Entry { generation, callback });
        self.deadlines.push(Reverse(Deadline { deadline, generation, key }));
        trace!("adding timeout: key={}, generation={}, deadline={:?}", key, generation, deadline);
        (key, generation)
    }

    /// Whether the earliest live deadline has passed.
    pub(crate) fn ready(&mut self) -> bool {
        self.discard_stale();
        match self.deadlines.peek() {
            Some(deadline) => deadline.0.deadline <= Instant::now(),
            None => false,
        }
    }

    /// Remove and return the earliest live callback whose deadline has
    /// passed.
    pub(crate) fn pop_ready(&mut self) -> Option<Callback> {
        self.discard_stale();
        match self.deadlines.peek() {
            Some(deadline) if deadline.0.deadline <= Instant::now() => {
                let deadline = self.deadlines.pop().unwrap().0;
                trace!("timeout expired: key={}, generation={}", deadline.key, deadline.generation);
                Some(self.entries.remove(deadline.key).callback)
            },
            _ => None,
        }
    }

    /// Time from now until the earliest live deadline, zero if it has
    /// already passed and `None` if the queue is empty.
    pub(crate) fn interval(&mut self) -> Option<Duration> {
        self.discard_stale();
        self.deadlines.peek().map(|deadline| {
            let now = Instant::now();
            if deadline.0.deadline <= now {
                Duration::from_millis(0)
            } else {
                deadline.0.deadline.duration_since(now)
            }
        })
    }

    /// Cancel the entry at `key`, if `generation` still matches. Returns
    /// whether an entry was removed.
    pub(crate) fn cancel(&mut self, key: usize, generation: u64) -> bool {
        let live = self.entries.get(key)
            .map_or(false, |entry| entry.generation == generation);
        if live {
            trace!("cancelling timeout: key={}, generation={}", key, generation);
            drop(self.entries.remove(key));
        }
        live
    }

    /// Whether the queue holds no live entries.
    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pop heap entries whose slot has been cancelled, so `peek` always
    /// sees a live deadline.
    fn discard_stale(&mut self) {
        while let Some(deadline) = self.deadlines.peek() {
            let live = self.entries.get(deadline.0.key)
                .map_or(false, |entry| entry.generation == deadline.0.generation);
            if live {
                break;
            }
            let _ = self.deadlines.pop();
        }
    }
}
