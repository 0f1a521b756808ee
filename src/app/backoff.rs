//! Shared backoff controller and session owner
//!
//! Two states keyed off `now < deadline`: NORMAL and PENALIZED. A transport
//! failure anywhere in the pool calls [`BackoffController::trip`], which
//! pushes the shared deadline out by the current factor, grows the factor
//! (`factor * 2 + increment`, saturating) and replaces the session with an
//! empty one. A single window never exceeds [`MAX_WINDOW`]. Returning to
//! NORMAL is purely time based.
//!
//! Deadline, factor and session sit behind a single lock so a worker can
//! never observe a half-applied trip.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::warn;

use crate::app::client::Session;
use crate::constants::backoff::MAX_WINDOW;

/// Outcome of a single trip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffWindow {
    /// Fetches are suppressed until this instant
    pub deadline: Instant,
    /// Window length applied by this trip
    pub penalty: Duration,
    /// Penalty the next trip will apply
    pub next_penalty: Duration,
    /// Generation of the session installed by this trip
    pub session_generation: u64,
}

#[derive(Debug)]
struct BackoffState {
    deadline: Option<Instant>,
    factor: Duration,
    trips: u64,
    session: Arc<Session>,
}

/// Global NORMAL/PENALIZED gate shared by every worker
#[derive(Debug)]
pub struct BackoffController {
    increment: Duration,
    state: Mutex<BackoffState>,
}

impl BackoffController {
    /// Create a controller in NORMAL state with a fresh session
    pub fn new(initial_factor: Duration, increment: Duration) -> Self {
        Self {
            increment,
            state: Mutex::new(BackoffState {
                deadline: None,
                factor: initial_factor,
                trips: 0,
                session: Arc::new(Session::new()),
            }),
        }
    }

    /// Enter (or extend) the PENALIZED state after a failed fetch
    pub fn trip(&self) -> BackoffWindow {
        let now = Instant::now();
        let mut state = self.state.lock();

        let penalty = state.factor.min(MAX_WINDOW);
        let candidate = now + penalty;
        let deadline = match state.deadline {
            Some(current) if current > candidate => current,
            _ => candidate,
        };

        state.deadline = Some(deadline);
        state.factor = state
            .factor
            .saturating_mul(2)
            .saturating_add(self.increment);
        state.trips += 1;
        state.session = Arc::new(state.session.successor());

        let window = BackoffWindow {
            deadline,
            penalty,
            next_penalty: state.factor,
            session_generation: state.session.generation(),
        };
        drop(state);

        warn!(
            "Backing off for {:?} (next penalty {:?}), session reset to generation {}",
            penalty, window.next_penalty, window.session_generation
        );
        window
    }

    /// Whether fetches are currently suppressed
    pub fn is_penalized(&self) -> bool {
        self.remaining().is_some()
    }

    /// Time left in the current window, `None` when NORMAL
    pub fn remaining(&self) -> Option<Duration> {
        let deadline = self.state.lock().deadline?;
        let now = Instant::now();
        (deadline > now).then(|| deadline - now)
    }

    /// Deadline of the most recent window (may lie in the past)
    pub fn deadline(&self) -> Option<Instant> {
        self.state.lock().deadline
    }

    /// Penalty the next trip will apply
    pub fn factor(&self) -> Duration {
        self.state.lock().factor
    }

    /// Number of trips so far
    pub fn trip_count(&self) -> u64 {
        self.state.lock().trips
    }

    /// Session every fetch should use right now
    pub fn current_session(&self) -> Arc<Session> {
        Arc::clone(&self.state.lock().session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_normal() {
        let backoff = BackoffController::new(Duration::from_secs(3), Duration::from_secs(2));
        assert!(!backoff.is_penalized());
        assert_eq!(backoff.deadline(), None);
        assert_eq!(backoff.trip_count(), 0);
        assert_eq!(backoff.current_session().generation(), 0);
    }

    #[test]
    fn test_factor_grows_double_plus_increment() {
        let backoff = BackoffController::new(Duration::from_secs(3), Duration::from_secs(2));

        let first = backoff.trip();
        assert_eq!(first.penalty, Duration::from_secs(3));
        assert_eq!(first.next_penalty, Duration::from_secs(8));

        let second = backoff.trip();
        assert_eq!(second.penalty, Duration::from_secs(8));
        assert_eq!(second.next_penalty, Duration::from_secs(18));

        let third = backoff.trip();
        assert_eq!(third.penalty, Duration::from_secs(18));
        assert_eq!(backoff.factor(), Duration::from_secs(38));
        assert_eq!(backoff.trip_count(), 3);
    }

    #[test]
    fn test_windows_strictly_grow_across_trips() {
        let backoff =
            BackoffController::new(Duration::from_millis(1), Duration::from_millis(0));
        let mut previous = Duration::ZERO;
        for _ in 0..10 {
            let window = backoff.trip();
            assert!(window.penalty > previous);
            previous = window.penalty;
        }
    }

    #[test]
    fn test_trip_penalizes_and_replaces_session() {
        let backoff = BackoffController::new(Duration::from_secs(60), Duration::from_secs(2));
        let before = backoff.current_session();

        let window = backoff.trip();

        assert!(backoff.is_penalized());
        assert!(backoff.remaining().unwrap() <= Duration::from_secs(60));
        let after = backoff.current_session();
        assert_eq!(after.generation(), before.generation() + 1);
        assert_eq!(window.session_generation, after.generation());
        assert!(!Arc::ptr_eq(&before, &after));
    }

    #[test]
    fn test_deadline_only_moves_forward() {
        // A long first window followed by a trip with a shorter candidate
        // must keep the later deadline.
        let backoff = BackoffController::new(Duration::from_secs(100), Duration::ZERO);
        let first = backoff.trip();
        let second = backoff.trip();
        assert!(second.deadline >= first.deadline);
    }

    #[test]
    fn test_long_outage_saturates_instead_of_overflowing() {
        let backoff = BackoffController::new(Duration::from_secs(3), Duration::from_secs(2));
        let mut previous_deadline = None;

        for _ in 0..200 {
            let window = backoff.trip();
            assert!(window.penalty <= MAX_WINDOW);
            assert!(window.deadline <= Instant::now() + MAX_WINDOW);
            if let Some(previous) = previous_deadline {
                assert!(window.deadline >= previous);
            }
            previous_deadline = Some(window.deadline);
        }

        assert_eq!(backoff.trip_count(), 200);
        assert_eq!(backoff.factor(), Duration::MAX);
        assert!(backoff.remaining().unwrap() <= MAX_WINDOW);
    }

    #[test]
    fn test_penalty_expires() {
        let backoff = BackoffController::new(Duration::from_millis(20), Duration::ZERO);
        backoff.trip();
        assert!(backoff.is_penalized());
        std::thread::sleep(Duration::from_millis(40));
        assert!(!backoff.is_penalized());
        assert!(backoff.remaining().is_none());
    }
}
