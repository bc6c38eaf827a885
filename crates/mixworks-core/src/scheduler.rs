//! Deterministic virtual clock for deferred work.
//!
//! Tasks are held in a min-heap keyed by `(due, seq)`, so tasks due at the
//! same instant fire in the order they were scheduled. Time only moves when
//! the owner calls [`Scheduler::advance_by`] or [`Scheduler::advance_to`].
//! Cancellation is lazy: the handle is remembered and the entry is skipped
//! when it reaches the top of the heap.

use crate::fixed::Millis;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

/// Opaque handle to a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskHandle(u64);

/// A task that came due during an advance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiredTask<T> {
    pub handle: TaskHandle,
    pub due: Millis,
    pub payload: T,
}

#[derive(Debug)]
struct ScheduledTask<T> {
    due: Millis,
    seq: u64,
    payload: T,
}

impl<T> PartialEq for ScheduledTask<T> {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl<T> Eq for ScheduledTask<T> {}

impl<T> PartialOrd for ScheduledTask<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for ScheduledTask<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap.
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Virtual-clock scheduler carrying payloads of type `T`.
#[derive(Debug)]
pub struct Scheduler<T> {
    now: Millis,
    queue: BinaryHeap<ScheduledTask<T>>,
    cancelled: HashSet<u64>,
    next_seq: u64,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            now: 0,
            queue: BinaryHeap::new(),
            cancelled: HashSet::new(),
            next_seq: 0,
        }
    }

    /// Current virtual time.
    pub fn now(&self) -> Millis {
        self.now
    }

    /// Schedule `payload` to fire `delay` ms from now.
    pub fn schedule(&mut self, delay: Millis, payload: T) -> TaskHandle {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(ScheduledTask {
            due: self.now.saturating_add(delay),
            seq,
            payload,
        });
        TaskHandle(seq)
    }

    /// Cancel a pending task. Returns `false` if it already fired, was
    /// already cancelled, or never existed.
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        let pending = self.queue.iter().any(|task| task.seq == handle.0);
        pending && self.cancelled.insert(handle.0)
    }

    /// Number of tasks still waiting to fire.
    pub fn pending(&self) -> usize {
        self.queue.len() - self.cancelled.len()
    }

    /// Due time of the earliest live task.
    pub fn next_due(&self) -> Option<Millis> {
        self.queue
            .iter()
            .filter(|task| !self.cancelled.contains(&task.seq))
            .map(|task| task.due)
            .min()
    }

    /// Move the clock forward by `delta` and return every task that came due,
    /// in firing order.
    pub fn advance_by(&mut self, delta: Millis) -> Vec<FiredTask<T>> {
        self.advance_to(self.now.saturating_add(delta))
    }

    /// Move the clock to `target` (never backwards) and return every task
    /// due at or before it, in firing order.
    pub fn advance_to(&mut self, target: Millis) -> Vec<FiredTask<T>> {
        let target = target.max(self.now);
        let mut fired = Vec::new();
        while self.queue.peek().is_some_and(|task| task.due <= target) {
            let Some(task) = self.queue.pop() else {
                break;
            };
            if self.cancelled.remove(&task.seq) {
                continue;
            }
            fired.push(FiredTask {
                handle: TaskHandle(task.seq),
                due: task.due,
                payload: task.payload,
            });
        }
        self.now = target;
        fired
    }
}
