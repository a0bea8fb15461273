//! Retry Wrapper (§4.C): classifies failures as transient or permanent and
//! retries transient ones with exponential backoff, honoring cancellation.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{Error, Kind};

const BASE_BACKOFF: Duration = Duration::from_secs(5);
const MAX_ATTEMPTS: u32 = 5;
const WARMUP_DELAY: Duration = Duration::from_millis(500);

/// What the retry wrapper needs to know about a failed attempt.
pub struct Failure {
    pub message: String,
    pub status: Option<u16>,
}

/// Runs `op` up to [`MAX_ATTEMPTS`] times, retrying only transient failures
/// (§4.C). `op` returns `Ok(T)` on success or `Err(Failure)` describing the
/// attempt's failure; the wrapper decides whether to retry.
pub async fn with_retry<T, F, Fut>(cancel: &CancellationToken, mut op: F) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, Failure>>,
{
    for attempt in 1..=MAX_ATTEMPTS {
        if attempt == 1 {
            sleep_or_cancel(cancel, WARMUP_DELAY).await?;
        } else {
            let backoff = BASE_BACKOFF * 2u32.pow(attempt - 2);
            sleep_or_cancel(cancel, backoff).await?;
        }

        match op().await {
            Ok(value) => return Ok(value),
            Err(failure) => {
                if !Error::is_transient(&failure.message, failure.status) {
                    return Err(Error::classify(failure.status, failure.message));
                }
                if attempt == MAX_ATTEMPTS {
                    return Err(Error::TransientNetwork(failure.message));
                }
            }
        }
    }
    unreachable!("loop always returns by the final attempt")
}

async fn sleep_or_cancel(cancel: &CancellationToken, duration: Duration) -> Result<(), Error> {
    tokio::select! {
        _ = tokio::time::sleep(duration) => Ok(()),
        _ = cancel.cancelled() => Err(Error::Cancelled),
    }
}
