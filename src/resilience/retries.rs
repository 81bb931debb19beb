//! Fixed-interval retry executor.
//!
//! # Responsibilities
//! - Run an operation up to `max_attempts` times, sequentially
//! - Sleep exactly `delay` between failed attempts
//! - Stop at once when the operation signals a terminal failure
//!
//! The executor does not log or classify; callers wrap errors in
//! [`RetryError::Retry`] or [`RetryError::Stop`] themselves.

use std::future::Future;
use std::time::Duration;

/// Outcome of a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryError<E> {
    /// Transient failure; try again if attempts remain.
    Retry(E),
    /// Terminal failure; surface `E` without further attempts.
    Stop(E),
}

impl<E> RetryError<E> {
    pub fn into_inner(self) -> E {
        match self {
            RetryError::Retry(e) | RetryError::Stop(e) => e,
        }
    }
}

/// Run `operation` until it succeeds, stops, or attempts run out.
///
/// Returns the first success, the error carried by a [`RetryError::Stop`], or
/// the last attempt's error. A `max_attempts` of zero still runs once.
pub async fn run<T, E, F, Fut>(max_attempts: u32, delay: Duration, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RetryError<E>>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => return Ok(value),
            Err(RetryError::Stop(e)) => return Err(e),
            Err(RetryError::Retry(e)) => {
                if attempt >= max_attempts {
                    return Err(e);
                }
                tokio::time::sleep(delay).await;
            }
        }
    }
}
