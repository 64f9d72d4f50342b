//! Virtual time and the cancellable event queue
//!
//! The beacon application runs over a logical clock: nothing blocks, and
//! "waiting" is expressed by posting a future event into a queue. All events
//! execute sequentially in time order on a single thread, so no locking is
//! needed anywhere in the crate.
//!
//! Cancellation is deterministic: once [`EventQueue::cancel`] returns, the
//! cancelled entry can never surface from the queue again. This is what lets
//! the application guarantee that a stopped beacon sender never fires one
//! last time from a stale timer.

use serde::Serialize;
use std::collections::{BinaryHeap, HashSet};
use std::ops::Add;
use std::time::Duration;

/// A point in virtual time, measured in microseconds since the start of the
/// run. Monotonic by construction: the queue only ever moves it forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The start of virtual time.
    pub const ZERO: Timestamp = Timestamp(0);

    /// Create a timestamp from microseconds.
    pub fn from_micros(micros: u64) -> Self {
        Timestamp(micros)
    }

    /// Create a timestamp from milliseconds.
    pub fn from_millis(millis: u64) -> Self {
        Timestamp(millis * 1_000)
    }

    /// Microseconds since the start of the run.
    pub fn as_micros(&self) -> u64 {
        self.0
    }

    /// Elapsed time since `earlier`, clamped to zero if `earlier` is in the
    /// future. The clamp keeps derived quantities (propagation delay) from
    /// going negative even against a misbehaving time source.
    pub fn saturating_duration_since(&self, earlier: Timestamp) -> Duration {
        Duration::from_micros(self.0.saturating_sub(earlier.0))
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: Duration) -> Timestamp {
        Timestamp(self.0 + rhs.as_micros() as u64)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:03}ms", self.0 / 1_000, self.0 % 1_000)
    }
}

/// Opaque token identifying a scheduled event, used to cancel it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

/// A payload scheduled for a future instant.
struct Scheduled<E> {
    at: Timestamp,
    /// Insertion sequence, used to keep FIFO order at equal timestamps.
    seq: u64,
    id: u64,
    payload: E,
}

impl<E> PartialEq for Scheduled<E> {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}

impl<E> Eq for Scheduled<E> {}

impl<E> PartialOrd for Scheduled<E> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<E> Ord for Scheduled<E> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Reverse ordering for min-heap (earliest time first, then FIFO)
        other.at.cmp(&self.at).then(other.seq.cmp(&self.seq))
    }
}

/// Single-threaded event queue over virtual time.
///
/// Events are popped strictly in `(time, insertion)` order. Cancelled events
/// are skipped transparently; callers never observe them.
pub struct EventQueue<E> {
    now: Timestamp,
    heap: BinaryHeap<Scheduled<E>>,
    cancelled: HashSet<u64>,
    next_seq: u64,
}

impl<E> EventQueue<E> {
    /// Create an empty queue with the clock at [`Timestamp::ZERO`].
    pub fn new() -> Self {
        Self {
            now: Timestamp::ZERO,
            heap: BinaryHeap::new(),
            cancelled: HashSet::new(),
            next_seq: 0,
        }
    }

    /// The current virtual time.
    pub fn now(&self) -> Timestamp {
        self.now
    }

    /// Schedule `payload` to surface `delay` after the current time.
    pub fn schedule_after(&mut self, delay: Duration, payload: E) -> TimerHandle {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Scheduled {
            at: self.now + delay,
            seq,
            id: seq,
            payload,
        });
        TimerHandle(seq)
    }

    /// Cancel a previously scheduled event. Returns `true` if the event was
    /// still pending. After this returns, the event can never surface.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        if self.cancelled.contains(&handle.0) {
            return false;
        }
        if self.heap.iter().any(|s| s.id == handle.0) {
            self.cancelled.insert(handle.0);
            true
        } else {
            false
        }
    }

    /// The instant of the earliest pending (non-cancelled) event.
    pub fn next_deadline(&mut self) -> Option<Timestamp> {
        self.purge_cancelled();
        self.heap.peek().map(|s| s.at)
    }

    /// Pop the next event due at or before `deadline`, advancing the clock
    /// to its scheduled instant. Returns `None` once nothing is due.
    pub fn pop_due(&mut self, deadline: Timestamp) -> Option<(Timestamp, E)> {
        self.purge_cancelled();
        if self.heap.peek().map_or(false, |s| s.at <= deadline) {
            let s = self.heap.pop().expect("peeked entry present");
            self.now = s.at;
            Some((s.at, s.payload))
        } else {
            None
        }
    }

    /// Move the clock forward to `t` (never backwards).
    pub fn advance_to(&mut self, t: Timestamp) {
        if t > self.now {
            self.now = t;
        }
    }

    /// Number of pending (non-cancelled) events.
    pub fn pending(&self) -> usize {
        self.heap
            .iter()
            .filter(|s| !self.cancelled.contains(&s.id))
            .count()
    }

    /// Drop cancelled entries sitting at the head of the heap.
    fn purge_cancelled(&mut self) {
        while let Some(head) = self.heap.peek() {
            if self.cancelled.remove(&head.id) {
                self.heap.pop();
            } else {
                break;
            }
        }
    }
}

impl<E> Default for EventQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_arithmetic() {
        let t = Timestamp::from_millis(100) + Duration::from_micros(50);
        assert_eq!(t.as_micros(), 100_050);

        let earlier = Timestamp::from_micros(40_000);
        assert_eq!(
            t.saturating_duration_since(earlier),
            Duration::from_micros(60_050)
        );
        // Clamped, never negative
        assert_eq!(earlier.saturating_duration_since(t), Duration::ZERO);
    }

    #[test]
    fn test_events_pop_in_time_order() {
        let mut queue = EventQueue::new();
        queue.schedule_after(Duration::from_millis(30), "c");
        queue.schedule_after(Duration::from_millis(10), "a");
        queue.schedule_after(Duration::from_millis(20), "b");

        let deadline = Timestamp::from_millis(100);
        assert_eq!(queue.pop_due(deadline).unwrap().1, "a");
        assert_eq!(queue.now(), Timestamp::from_millis(10));
        assert_eq!(queue.pop_due(deadline).unwrap().1, "b");
        assert_eq!(queue.pop_due(deadline).unwrap().1, "c");
        assert!(queue.pop_due(deadline).is_none());
    }

    #[test]
    fn test_fifo_at_equal_timestamps() {
        let mut queue = EventQueue::new();
        queue.schedule_after(Duration::from_millis(5), 1);
        queue.schedule_after(Duration::from_millis(5), 2);
        queue.schedule_after(Duration::from_millis(5), 3);

        let deadline = Timestamp::from_millis(5);
        assert_eq!(queue.pop_due(deadline).unwrap().1, 1);
        assert_eq!(queue.pop_due(deadline).unwrap().1, 2);
        assert_eq!(queue.pop_due(deadline).unwrap().1, 3);
    }

    #[test]
    fn test_pop_due_respects_deadline() {
        let mut queue = EventQueue::new();
        queue.schedule_after(Duration::from_millis(10), "early");
        queue.schedule_after(Duration::from_millis(50), "late");

        assert!(queue.pop_due(Timestamp::from_millis(20)).is_some());
        assert!(queue.pop_due(Timestamp::from_millis(20)).is_none());
        assert_eq!(queue.pending(), 1);
    }

    #[test]
    fn test_cancelled_event_never_surfaces() {
        let mut queue = EventQueue::new();
        let handle = queue.schedule_after(Duration::from_millis(10), "doomed");
        queue.schedule_after(Duration::from_millis(20), "kept");

        assert!(queue.cancel(handle));
        assert_eq!(queue.pending(), 1);
        assert_eq!(queue.next_deadline(), Some(Timestamp::from_millis(20)));

        let (_, payload) = queue.pop_due(Timestamp::from_millis(100)).unwrap();
        assert_eq!(payload, "kept");
        assert!(queue.pop_due(Timestamp::from_millis(100)).is_none());
    }

    #[test]
    fn test_cancel_unknown_handle() {
        let mut queue: EventQueue<()> = EventQueue::new();
        let handle = queue.schedule_after(Duration::from_millis(1), ());
        queue.pop_due(Timestamp::from_millis(1)).unwrap();
        // Already fired, nothing left to cancel
        assert!(!queue.cancel(handle));
    }

    #[test]
    fn test_advance_to_is_monotonic() {
        let mut queue: EventQueue<()> = EventQueue::new();
        queue.advance_to(Timestamp::from_millis(50));
        queue.advance_to(Timestamp::from_millis(20));
        assert_eq!(queue.now(), Timestamp::from_millis(50));
    }
}
