//! Request pacing: submission-time clock and execution-time wire pacer
//!
//! Two independent pacers with distinct roles:
//!
//! - [`SubmissionClock`] stamps every submitted item with an eligibility
//!   time. A burst of submissions gets evenly spaced future stamps, so
//!   submission order maps to non-decreasing eligibility order.
//! - [`WirePacer`] is consulted by whichever worker is about to hit the
//!   network. The queue is unordered and workers run concurrently, so actual
//!   request cadence is enforced again here.
//!
//! Execution order across workers is best-effort: an item stamped earlier may
//! still be fetched after one stamped later.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

/// Hands out eligibility stamps spaced at least `interval` apart
#[derive(Debug)]
pub struct SubmissionClock {
    interval: Duration,
    next_eligible: Mutex<Instant>,
}

impl SubmissionClock {
    /// Create a clock whose first slot is now
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_eligible: Mutex::new(Instant::now()),
        }
    }

    /// Reserve the next slot
    ///
    /// `slot = max(next_eligible, now)`, and `next_eligible` moves to
    /// `slot + interval`.
    pub fn assign(&self) -> Instant {
        let now = Instant::now();
        let mut next = self.next_eligible.lock();
        let slot = (*next).max(now);
        *next = slot + self.interval;
        slot
    }

    /// The slot the next submission would receive, without reserving it
    pub fn current(&self) -> Instant {
        let next = *self.next_eligible.lock();
        next.max(Instant::now())
    }
}

/// Spaces actual fetches at least `interval` apart
///
/// Each acquisition claims `slot = max(last_slot + interval, now)` under the
/// lock and then sleeps until that slot. An idle gap never builds up credit,
/// so the first two fetches after a quiet period are still `interval` apart.
#[derive(Debug)]
pub struct WirePacer {
    interval: Duration,
    last_slot: Mutex<Option<Instant>>,
}

impl WirePacer {
    /// Create a pacer; a zero interval only serializes slot assignment
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_slot: Mutex::new(None),
        }
    }

    /// Wait for the next wire slot and claim it
    ///
    /// A slot is consumed even if the caller is cancelled while sleeping.
    pub async fn acquire(&self) -> Instant {
        let slot = self.reserve();
        tokio::time::sleep_until(slot).await;
        slot
    }

    fn reserve(&self) -> Instant {
        let now = Instant::now();
        let mut last_slot = self.last_slot.lock();
        let slot = match *last_slot {
            Some(previous) => (previous + self.interval).max(now),
            None => now,
        };
        *last_slot = Some(slot);
        slot
    }
}
