//! Rate limiting module
//!
//! NCBI's usage policy for Primer-BLAST asks clients to:
//!
//! - **Contact the server at most once every three seconds**, process-wide
//! - **Poll any single job at most once a minute**
//!
//! The first rule is enforced here by [`ContactLimiter`], which every HTTP
//! request awaits before touching the network. The second rule is the poll
//! interval of the attempt runner. Together they bound how many searches can
//! usefully run side by side: [`max_workers`].

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Process-wide pacing gate for contacts with the remote service
///
/// Turns are granted one at a time; a caller arriving less than
/// `min_interval` after the previous grant is suspended for the remainder.
#[derive(Debug)]
pub struct ContactLimiter {
    min_interval: Duration,
    last_contact: Mutex<Option<Instant>>,
}

impl ContactLimiter {
    /// Create a new limiter allowing one contact per `min_interval`
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_contact: Mutex::new(None),
        }
    }

    /// Limiter that never waits, for local stubs and tests
    pub fn unlimited() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until this caller may contact the server
    ///
    /// The lock is held across the sleep so that waiting callers queue up
    /// behind each other instead of all waking at the same instant.
    pub async fn wait_turn(&self) {
        let mut last = self.last_contact.lock().await;

        if let Some(previous) = *last {
            // An interval past the clock's range never becomes ready
            let wait = match previous.checked_add(self.min_interval) {
                Some(ready_at) => ready_at.saturating_duration_since(Instant::now()),
                None => self.min_interval,
            };
            if !wait.is_zero() {
                debug!("Contact limiter: waiting {:.2}s", wait.as_secs_f64());
                tokio::time::sleep(wait).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// Safe number of concurrent searches for the given pacing
///
/// With one poll per `poll_interval` per job and one contact per
/// `contact_interval` overall, `floor(poll / contact)` jobs can be kept busy
/// without queueing. Never less than one.
pub fn max_workers(poll_interval: Duration, contact_interval: Duration) -> usize {
    if contact_interval.is_zero() {
        return usize::MAX;
    }
    let workers = poll_interval.as_millis() / contact_interval.as_millis().max(1);
    (workers as usize).max(1)
}
