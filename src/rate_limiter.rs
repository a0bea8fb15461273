//! Rate Governor (§4.A): tracks remaining quota and reset time, enforces a
//! minimum inter-request spacing, and blocks callers while the budget is
//! exhausted.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::Error;

const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(100);
const LOW_BUDGET_THRESHOLD: u64 = 100;
const MAX_EXHAUSTED_WAIT: Duration = Duration::from_secs(10);

struct State {
    remaining: u64,
    limit: u64,
    reset_at: Option<Instant>,
    last_call_at: Option<Instant>,
}

/// Shared, mutex-guarded rate-limit state. One instance per run, cloned via
/// `Arc` into every worker.
pub struct RateGovernor {
    inner: Mutex<State>,
    min_interval: Duration,
}

impl RateGovernor {
    pub fn new() -> Self {
        Self::with_min_interval(DEFAULT_MIN_INTERVAL)
    }

    pub fn with_min_interval(min_interval: Duration) -> Self {
        Self {
            inner: Mutex::new(State {
                remaining: u64::MAX,
                limit: u64::MAX,
                reset_at: None,
                last_call_at: None,
            }),
            min_interval,
        }
    }

    /// Suspend the caller until it is polite to make another request,
    /// per §4.A's three-rule contract. Reads and writes happen under the
    /// lock; the lock is released before any sleep so other workers can
    /// still read/update state while this one waits.
    pub async fn wait_if_needed(&self, cancel: &CancellationToken) -> Result<(), Error> {
        let wait = {
            let state = self.inner.lock().await;
            self.next_wait(&state)
        };
        let Some(duration) = wait else { return Ok(()) };
        tokio::select! {
            _ = tokio::time::sleep(duration) => Ok(()),
            _ = cancel.cancelled() => Err(Error::Cancelled),
        }
    }

    fn next_wait(&self, state: &State) -> Option<Duration> {
        let now = Instant::now();

        if let Some(last) = state.last_call_at {
            let elapsed = now.saturating_duration_since(last);
            if elapsed < self.min_interval {
                return Some(self.min_interval - elapsed);
            }
        }

        if state.remaining > 0 && state.remaining < LOW_BUDGET_THRESHOLD {
            return Some(self.min_interval * 2);
        }

        if state.remaining == 0 {
            if let Some(reset_at) = state.reset_at {
                if reset_at > now {
                    return Some((reset_at - now).min(MAX_EXHAUSTED_WAIT));
                }
            }
        }

        None
    }

    /// Record quota values observed from a response's rate-limit headers.
    /// `reset_at_unix` is seconds since the epoch, as GitHub reports it.
    pub async fn record(&self, remaining: u64, limit: u64, reset_at_unix: i64) {
        let mut state = self.inner.lock().await;
        state.remaining = remaining;
        state.limit = limit;
        state.reset_at = unix_to_instant(reset_at_unix);
        state.last_call_at = Some(Instant::now());
    }
}

impl Default for RateGovernor {
    fn default() -> Self {
        Self::new()
    }
}

/// Converts a unix timestamp to a `tokio::time::Instant` relative to now.
/// Timestamps in the past collapse to `now` (the caller never waits for a
/// reset that already happened).
fn unix_to_instant(reset_at_unix: i64) -> Option<Instant> {
    let now_unix = chrono::Utc::now().timestamp();
    let delta = reset_at_unix - now_unix;
    if delta <= 0 {
        Some(Instant::now())
    } else {
        Some(Instant::now() + Duration::from_secs(delta as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod wait_if_needed {
        use super::*;

        #[tokio::test]
        async fn with_fresh_state_returns_immediately() {
            //* Given
            let governor = RateGovernor::new();
            let cancel = CancellationToken::new();

            //* When
            let start = std::time::Instant::now();
            let result = governor.wait_if_needed(&cancel).await;

            //* Then
            assert!(result.is_ok());
            assert!(start.elapsed() < Duration::from_millis(50));
        }

        #[tokio::test]
        async fn enforces_min_interval_between_calls() {
            //* Given
            let governor = RateGovernor::with_min_interval(Duration::from_millis(80));
            let cancel = CancellationToken::new();
            governor.record(5000, 5000, chrono::Utc::now().timestamp() + 3600).await;

            //* When
            let start = std::time::Instant::now();
            governor.wait_if_needed(&cancel).await.unwrap();
            governor.wait_if_needed(&cancel).await.unwrap();

            //* Then
            assert!(start.elapsed() >= Duration::from_millis(70));
        }

        #[tokio::test]
        async fn cancellation_during_suspension_fails_with_cancelled() {
            //* Given
            let governor = RateGovernor::new();
            let cancel = CancellationToken::new();
            governor.record(0, 5000, chrono::Utc::now().timestamp() + 5).await;
            cancel.cancel();

            //* When
            let result = governor.wait_if_needed(&cancel).await;

            //* Then
            assert!(matches!(result, Err(Error::Cancelled)));
        }

        #[tokio::test]
        async fn exhausted_budget_waits_bounded_by_ten_seconds() {
            //* Given
            let governor = RateGovernor::new();
            let cancel = CancellationToken::new();
            governor
                .record(0, 5000, chrono::Utc::now().timestamp() + 3600)
                .await;

            //* When
            let wait = {
                let state = governor.inner.lock().await;
                governor.next_wait(&state)
            };

            //* Then
            assert_eq!(wait, Some(MAX_EXHAUSTED_WAIT));
        }
    }

    mod record {
        use super::*;

        #[tokio::test]
        async fn stores_observed_quota() {
            //* Given
            let governor = RateGovernor::new();

            //* When
            governor.record(42, 5000, chrono::Utc::now().timestamp() + 10).await;

            //* Then
            let state = governor.inner.lock().await;
            assert_eq!(state.remaining, 42);
            assert_eq!(state.limit, 5000);
        }
    }
}
