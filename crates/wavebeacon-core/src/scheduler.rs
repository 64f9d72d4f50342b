//! Periodic broadcast scheduling
//!
//! The first broadcast fires `interval + uniform(jitter.min, jitter.max)`
//! after arming; every subsequent one fires exactly `interval` after the
//! previous fire. The jitter is applied once, to desynchronize co-located
//! senders at startup — it never re-randomizes per period and never
//! compounds.
//!
//! The scheduler stores the handle of its single pending timer. [`cancel`]
//! invalidates it deterministically: once it returns, no further fire can
//! surface from the queue, even one that was already armed.
//!
//! [`cancel`]: BeaconScheduler::cancel

use crate::clock::{EventQueue, TimerHandle};
use crate::config::JitterRange;
use rand::Rng;
use std::time::Duration;
use tracing::debug;

/// Owns the periodic timer and the startup jitter policy.
#[derive(Debug)]
pub struct BeaconScheduler {
    interval: Duration,
    jitter: JitterRange,
    pending: Option<TimerHandle>,
}

impl BeaconScheduler {
    pub fn new(interval: Duration, jitter: JitterRange) -> Self {
        Self {
            interval,
            jitter,
            pending: None,
        }
    }

    /// Arm the first broadcast at `interval + jitter offset` from now.
    pub fn arm<E>(&mut self, queue: &mut EventQueue<E>, rng: &mut impl Rng, event: E) {
        let offset = self.jitter.sample(rng);
        debug!(interval = ?self.interval, ?offset, "arming first broadcast");
        self.pending = Some(queue.schedule_after(self.interval + offset, event));
    }

    /// Arm the next broadcast exactly `interval` after the previous fire.
    /// Call only from inside the fired broadcast handler, when the queue's
    /// clock sits at the fire instant.
    pub fn rearm<E>(&mut self, queue: &mut EventQueue<E>, event: E) {
        self.pending = Some(queue.schedule_after(self.interval, event));
    }

    /// Cancel the pending broadcast, if any. Returns whether one was
    /// actually invalidated.
    pub fn cancel<E>(&mut self, queue: &mut EventQueue<E>) -> bool {
        match self.pending.take() {
            Some(handle) => queue.cancel(handle),
            None => false,
        }
    }

    /// Whether a broadcast is currently armed.
    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }
}
