//! Cancellable deadline queue for single-threaded scheduling
//!
//! Nothing here sleeps: the host polls [`TimerQueue::pop_due`] with the
//! current time and runs whatever came due.

use crate::Millis;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

/// Handle for cancelling a scheduled task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

#[derive(Debug, Clone, Copy)]
struct Deadline {
    at: Millis,
    id: u64,
}

impl PartialEq for Deadline {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Deadline {}

impl PartialOrd for Deadline {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Deadline {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap: earliest deadline first, ties in scheduling order
        other
            .at
            .total_cmp(&self.at)
            .then_with(|| other.id.cmp(&self.id))
    }
}

/// Tasks keyed by deadline
#[derive(Debug)]
pub struct TimerQueue<T> {
    heap: BinaryHeap<Deadline>,
    tasks: HashMap<u64, (Millis, T)>,
    next_id: u64,
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            tasks: HashMap::new(),
            next_id: 0,
        }
    }

    /// Schedule `task` to come due at `at`
    pub fn schedule(&mut self, at: Millis, task: T) -> TimerId {
        let id = self.next_id;
        self.next_id += 1;
        self.heap.push(Deadline { at, id });
        self.tasks.insert(id, (at, task));
        TimerId(id)
    }

    /// Cancel a pending task; returns false if it already ran or was cancelled
    pub fn cancel(&mut self, id: TimerId) -> bool {
        self.tasks.remove(&id.0).is_some()
    }

    /// Deadline of a pending task
    pub fn deadline(&self, id: TimerId) -> Option<Millis> {
        self.tasks.get(&id.0).map(|(at, _)| *at)
    }

    /// Remove and return every task with a deadline at or before `now`,
    /// earliest first
    pub fn pop_due(&mut self, now: Millis) -> Vec<T> {
        let mut due = Vec::new();
        while let Some(top) = self.heap.peek() {
            if top.at > now {
                break;
            }
            let top = *top;
            self.heap.pop();
            if let Some((_, task)) = self.tasks.remove(&top.id) {
                due.push(task);
            }
        }
        due
    }

    /// Earliest pending deadline
    pub fn next_deadline(&mut self) -> Option<Millis> {
        while let Some(top) = self.heap.peek() {
            if self.tasks.contains_key(&top.id) {
                return Some(top.at);
            }
            self.heap.pop();
        }
        None
    }

    /// Number of pending tasks
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Cancel everything
    pub fn clear(&mut self) {
        self.heap.clear();
        self.tasks.clear();
    }
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pop_due_in_deadline_order() {
        let mut timers = TimerQueue::new();
        timers.schedule(300.0, "c");
        timers.schedule(100.0, "a");
        timers.schedule(200.0, "b");

        assert!(timers.pop_due(50.0).is_empty());
        assert_eq!(timers.pop_due(250.0), vec!["a", "b"]);
        assert_eq!(timers.len(), 1);
        assert_eq!(timers.next_deadline(), Some(300.0));
    }

    #[test]
    fn test_ties_keep_scheduling_order() {
        let mut timers = TimerQueue::new();
        timers.schedule(100.0, 1);
        timers.schedule(100.0, 2);
        timers.schedule(100.0, 3);
        assert_eq!(timers.pop_due(100.0), vec![1, 2, 3]);
    }

    #[test]
    fn test_cancel() {
        let mut timers = TimerQueue::new();
        let a = timers.schedule(100.0, "a");
        timers.schedule(200.0, "b");

        assert!(timers.cancel(a));
        assert!(!timers.cancel(a));
        assert_eq!(timers.len(), 1);
        assert_eq!(timers.next_deadline(), Some(200.0));
        assert_eq!(timers.pop_due(1000.0), vec!["b"]);
        assert!(timers.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut timers = TimerQueue::new();
        timers.schedule(1.0, ());
        timers.schedule(2.0, ());
        timers.clear();
        assert!(timers.is_empty());
        assert_eq!(timers.next_deadline(), None);
    }
}
