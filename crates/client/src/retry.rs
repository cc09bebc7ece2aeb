//! Retry and Timeout Policy
//!
//! Bounded retry with linear backoff for transient failures, and a
//! client-side timeout that surfaces as a user-facing message instead of
//! a raw cancellation error. The policy and the loop are independent of
//! what they wrap, so they are tested without a network.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::error::{ChatClientError, ChatResult};

/// How often and how patiently an operation is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Base delay; attempt `n` waits `n * backoff_base` before retrying.
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            backoff_base: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Linear backoff before the attempt following attempt `attempt`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.backoff_base * attempt
    }
}

/// Boxed per-attempt future lending the caller's state.
pub type AttemptFuture<'s, T> = Pin<Box<dyn Future<Output = ChatResult<T>> + 's>>;

/// Run `op` until it succeeds, the failure is not retryable, or the
/// attempt budget is spent.
///
/// Each attempt borrows `state` exclusively for its duration, so a
/// retried attempt always starts from whatever the previous one left
/// behind — there is never more than one attempt in flight.
pub async fn retry<S, T, F>(policy: &RetryPolicy, state: &mut S, mut op: F) -> ChatResult<T>
where
    F: for<'s> FnMut(&'s mut S, u32) -> AttemptFuture<'s, T>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op(state, attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < policy.max_attempts && err.is_retryable() => {
                tracing::debug!(attempt, error = %err, "retrying after transient failure");
                tokio::time::sleep(policy.backoff_delay(attempt)).await;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Bound `future` by `duration`, mapping expiry to
/// [`ChatClientError::Timeout`].
pub async fn with_timeout<T>(
    duration: Duration,
    future: impl Future<Output = ChatResult<T>>,
) -> ChatResult<T> {
    match tokio::time::timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(ChatClientError::Timeout),
    }
}
