//! Bounded retry loop with exponential backoff for rate-limited fetches.
//!
//! The loop knows nothing about HTTP. Each attempt reports a `FetchError`, and
//! `RetryPolicy::delay_for` decides how long to wait before trying again:
//!   - `RateLimited` waits for the server's `Retry-After` if given, otherwise
//!     `min(base_delay * 2^(attempt-1), max_delay)`
//!   - other per-attempt failures retry immediately
//!   - `Cancelled` / `RetriesExhausted` are never retried
//!
//! Waiting goes through the `Sleeper` trait so tests can observe delays
//! without real time passing. Every wait races the cancellation token.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::error::FetchError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
  pub max_attempts: u32,
  pub base_delay: Duration,
  pub max_delay: Duration,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      max_attempts: 5,
      base_delay: Duration::from_millis(2000),
      max_delay: Duration::from_millis(32000),
    }
  }
}

impl RetryPolicy {
  /// Exponential backoff for a 1-based attempt number, capped at `max_delay`.
  pub fn backoff(&self, attempt: u32) -> Duration {
    let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
    self.base_delay.saturating_mul(factor).min(self.max_delay)
  }

  /// Wait before the next attempt, or `None` if the error must not be retried.
  pub fn delay_for(&self, err: &FetchError, attempt: u32) -> Option<Duration> {
    match err {
      FetchError::RateLimited { retry_after } => {
        Some(retry_after.unwrap_or_else(|| self.backoff(attempt)))
      }
      FetchError::Http { .. } | FetchError::MalformedResponse(_) | FetchError::Transport(_) => {
        Some(Duration::ZERO)
      }
      FetchError::RetriesExhausted { .. } | FetchError::Cancelled => None,
    }
  }
}

#[async_trait]
pub trait Sleeper: Send + Sync {
  async fn sleep(&self, delay: Duration);
}

/// Real timer.
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
  async fn sleep(&self, delay: Duration) {
    tokio::time::sleep(delay).await;
  }
}

/// Run `op` until it succeeds, the attempt budget is spent, or `cancel` fires.
///
/// `op` receives the 1-based attempt number.
pub async fn run<T, F, Fut>(
  policy: &RetryPolicy,
  sleeper: &dyn Sleeper,
  cancel: &CancellationToken,
  mut op: F,
) -> Result<T, FetchError>
where
  F: FnMut(u32) -> Fut,
  Fut: Future<Output = Result<T, FetchError>>,
{
  let max = policy.max_attempts.max(1);
  let mut last: Option<FetchError> = None;

  for attempt in 1..=max {
    if cancel.is_cancelled() {
      debug!(target: "trivia", attempt, "fetch cancelled before attempt");
      return Err(FetchError::Cancelled);
    }

    let err = tokio::select! {
      biased;
      _ = cancel.cancelled() => {
        debug!(target: "trivia", attempt, "fetch cancelled during attempt");
        return Err(FetchError::Cancelled);
      }
      res = op(attempt) => match res {
        Ok(v) => return Ok(v),
        Err(e) => e,
      },
    };

    warn!(target: "trivia", attempt, max_attempts = max, error = %err, "Fetch attempt failed");

    let Some(delay) = policy.delay_for(&err, attempt) else {
      return Err(err);
    };

    if attempt < max && !delay.is_zero() {
      debug!(target: "trivia", attempt, delay_ms = delay.as_millis() as u64, "Waiting before retry");
      tokio::select! {
        biased;
        _ = cancel.cancelled() => {
          debug!(target: "trivia", attempt, "fetch cancelled during backoff");
          return Err(FetchError::Cancelled);
        }
        _ = sleeper.sleep(delay) => {}
      }
    }
    last = Some(err);
  }

  let last = last.unwrap_or(FetchError::Transport("no attempt was made".into()));
  error!(target: "trivia", attempts = max, error = %last, "Giving up on fetch");
  Err(FetchError::RetriesExhausted { attempts: max, last: Box::new(last) })
}
