//! Open Trivia DB client: the question source behind every quiz.
//!
//! One `fetch_batch` call runs up to `max_attempts` GET requests through the
//! retry loop (see `retry`). Each request carries a `_=<unix millis>` query
//! parameter so intermediary caches cannot replay a stale 429.
//! Logs record status codes, attempt numbers and latencies, never payloads.

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER, USER_AGENT};
use reqwest::StatusCode;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use crate::config::{QuizConfig, QuizMeta};
use crate::domain::QuizBatch;
use crate::error::FetchError;
use crate::normalize::{build_batch, RawResponse};
use crate::retry::{self, RetryPolicy, Sleeper, TokioSleeper};

/// Anything that can hand the engine a complete batch of questions.
#[async_trait]
pub trait QuestionSource: Send + Sync {
  /// Fetch `size` questions. Transient failures are retried internally; the
  /// error is either `RetriesExhausted` (with the last cause) or `Cancelled`.
  async fn fetch_batch(&self, size: usize, cancel: &CancellationToken) -> Result<QuizBatch, FetchError>;
}

#[derive(Clone)]
pub struct TriviaClient {
  pub client: reqwest::Client,
  pub base_url: String,
  pub policy: RetryPolicy,
  pub meta: QuizMeta,
  sleeper: Arc<dyn Sleeper>,
}

impl TriviaClient {
  pub fn from_config(cfg: &QuizConfig) -> Result<Self, FetchError> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(cfg.source.request_timeout_secs))
      .build()
      .map_err(|e| FetchError::Transport(e.to_string()))?;

    Ok(Self {
      client,
      base_url: cfg.source.base_url.clone(),
      policy: cfg.retry.policy(),
      meta: cfg.quiz.clone(),
      sleeper: Arc::new(TokioSleeper),
    })
  }

  /// Replace the timer used between retries.
  #[cfg(test)]
  pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
    self.sleeper = sleeper;
    self
  }

  /// One request/parse/normalize cycle.
  #[instrument(level = "debug", skip(self), fields(base_url = %self.base_url))]
  async fn attempt(&self, size: usize, attempt: u32) -> Result<QuizBatch, FetchError> {
    let cache_buster = SystemTime::now()
      .duration_since(UNIX_EPOCH)
      .map(|d| d.as_millis())
      .unwrap_or_default();

    let start = Instant::now();
    let res = self.client.get(&self.base_url)
      .header(USER_AGENT, "trivia-quiz/0.1")
      .query(&[("amount", size.to_string()), ("_", cache_buster.to_string())])
      .send().await?;

    let status = res.status();
    debug!(target: "trivia", attempt, status = status.as_u16(), elapsed = ?start.elapsed(), "Trivia response received");

    if status == StatusCode::TOO_MANY_REQUESTS {
      let retry_after = parse_retry_after(res.headers());
      return Err(FetchError::RateLimited { retry_after });
    }
    if !status.is_success() {
      return Err(FetchError::Http { status: status.as_u16() });
    }

    let raw: RawResponse = res.json().await?;
    let batch = {
      let mut rng = rand::thread_rng();
      build_batch(raw, &self.meta, &mut rng)?
    };
    Ok(batch)
  }
}

#[async_trait]
impl QuestionSource for TriviaClient {
  #[instrument(level = "info", skip(self, cancel), fields(%size, max_attempts = self.policy.max_attempts))]
  async fn fetch_batch(&self, size: usize, cancel: &CancellationToken) -> Result<QuizBatch, FetchError> {
    let start = Instant::now();
    let result = retry::run(&self.policy, self.sleeper.as_ref(), cancel, |attempt| self.attempt(size, attempt)).await;
    let elapsed = start.elapsed();

    match &result {
      Ok(batch) => info!(target: "trivia", ?elapsed, questions = batch.len(), "Quiz batch ready"),
      Err(e) => error!(target: "trivia", ?elapsed, error = %e, "Quiz batch unavailable"),
    }
    result
  }
}

/// `Retry-After` as whole seconds, read from the leading digits (`3.5` waits 3 s).
/// HTTP-date values and junk are ignored.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
  let value = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();
  let digits = value.find(|c: char| !c.is_ascii_digit()).unwrap_or(value.len());
  value[..digits].parse::<u64>().ok().map(Duration::from_secs)
}
