//! Waiting for the queue to drain
//!
//! The queue's idle signal says when nothing is queued or in flight. A drain
//! waits for that signal, lets the queue settle, and then requires it to stay
//! idle for a whole confirmation window. Any queue activity in between starts
//! the wait over.

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use crate::app::queue::WorkQueue;

/// How a drain ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DrainOutcome {
    /// Queue stayed idle across the confirmation window
    Drained,
    /// The interrupt fired first; `remaining` items were still outstanding
    Interrupted { remaining: usize },
}

impl DrainOutcome {
    pub fn is_drained(&self) -> bool {
        matches!(self, DrainOutcome::Drained)
    }

    /// Outstanding items at the moment of interruption, 0 when drained
    pub fn remaining(&self) -> usize {
        match self {
            DrainOutcome::Drained => 0,
            DrainOutcome::Interrupted { remaining } => *remaining,
        }
    }
}

/// Wait until `queue` is confirmed idle or `interrupt` resolves
pub async fn drain<F>(
    queue: &WorkQueue,
    settle: Duration,
    confirm: Duration,
    interrupt: F,
) -> DrainOutcome
where
    F: Future<Output = ()>,
{
    tokio::pin!(interrupt);
    let mut outstanding = queue.subscribe();
    let interrupted = |queue: &WorkQueue| DrainOutcome::Interrupted {
        remaining: queue.outstanding(),
    };

    loop {
        tokio::select! {
            _ = outstanding.wait_for(|count| *count == 0) => {},
            _ = &mut interrupt => return interrupted(queue),
        }

        tokio::select! {
            _ = tokio::time::sleep(settle) => {},
            _ = &mut interrupt => return interrupted(queue),
        }

        if !queue.is_idle() {
            debug!("Queue picked up work while settling, waiting again");
            continue;
        }

        outstanding.borrow_and_update();
        tokio::select! {
            _ = tokio::time::sleep(confirm) => {
                if queue.is_idle() {
                    return DrainOutcome::Drained;
                }
            }
            _ = outstanding.changed() => {
                debug!("Queue activity during confirmation window, waiting again");
            }
            _ = &mut interrupt => return interrupted(queue),
        }
    }
}
