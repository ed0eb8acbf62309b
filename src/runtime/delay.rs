//! Delay queue for simulated processing latency.
//!
//! Driven cooperatively by the event loop: once per iteration the loop drains
//! whatever has come due. The queue never waits and owns no thread.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// FIFO of tasks, each due a fixed delay after it was scheduled.
///
/// The delay is constant, so due times are non-decreasing from front to
/// back and only the head ever needs inspecting to find ready work.
#[derive(Debug)]
pub struct DelayQueue<T> {
    tasks: VecDeque<DelayedTask<T>>,
    delay: Duration,
}

#[derive(Debug)]
struct DelayedTask<T> {
    due: Instant,
    task: T,
}

impl<T> DelayQueue<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            tasks: VecDeque::new(),
            delay,
        }
    }

    /// Append a task due at `now + delay`.
    pub fn schedule(&mut self, now: Instant, task: T) {
        let due = now + self.delay;
        debug_assert!(
            self.tasks.back().map_or(true, |t| t.due <= due),
            "due times must be non-decreasing"
        );
        self.tasks.push_back(DelayedTask { due, task });
    }

    /// Remove and return the head task if its due time has passed.
    ///
    /// Call in a loop to drain everything due. Tasks behind a not-yet-due
    /// head are never touched, preserving FIFO order.
    pub fn pop_due(&mut self, now: Instant) -> Option<T> {
        if self.tasks.front().is_some_and(|t| t.due <= now) {
            self.tasks.pop_front().map(|t| t.task)
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drains_due_prefix_in_order() {
        let mut queue = DelayQueue::new(Duration::from_millis(100));
        let t0 = Instant::now();

        queue.schedule(t0, "a");
        queue.schedule(t0 + Duration::from_millis(10), "b");
        queue.schedule(t0 + Duration::from_millis(50), "c");

        // Only the first two are due 120ms in; "c" stays untouched.
        let now = t0 + Duration::from_millis(120);
        assert_eq!(queue.pop_due(now), Some("a"));
        assert_eq!(queue.pop_due(now), Some("b"));
        assert_eq!(queue.pop_due(now), None);
        assert_eq!(queue.len(), 1);

        let later = t0 + Duration::from_millis(200);
        assert_eq!(queue.pop_due(later), Some("c"));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_never_yields_future_task() {
        let mut queue = DelayQueue::new(Duration::from_secs(10));
        let t0 = Instant::now();
        queue.schedule(t0, 1);
        assert_eq!(queue.pop_due(t0), None);
        assert_eq!(queue.pop_due(t0 + Duration::from_secs(9)), None);
        assert_eq!(queue.pop_due(t0 + Duration::from_secs(10)), Some(1));
    }

    #[test]
    fn test_fifo_for_equal_due_times() {
        let mut queue = DelayQueue::new(Duration::ZERO);
        let t0 = Instant::now();
        for i in 0..5 {
            queue.schedule(t0, i);
        }
        for i in 0..5 {
            assert_eq!(queue.pop_due(t0), Some(i));
        }
    }
}
