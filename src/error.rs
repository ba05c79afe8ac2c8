//! Error families for the question source, the quiz engine and configuration.

use std::time::Duration;

use thiserror::Error;

use crate::engine::Phase;

/// Failures of the question source.
///
/// Everything except `RetriesExhausted` and `Cancelled` describes a single
/// attempt; those are absorbed by the retry loop and only surface as the
/// `last` cause of an exhausted fetch.
#[derive(Error, Debug)]
pub enum FetchError {
  #[error("rate limited by the trivia service (retry after {retry_after:?})")]
  RateLimited { retry_after: Option<Duration> },
  #[error("HTTP error: status {status}")]
  Http { status: u16 },
  #[error("malformed response: {0}")]
  MalformedResponse(String),
  #[error("transport error: {0}")]
  Transport(String),
  #[error("failed to fetch quiz data after {attempts} attempts: {last}")]
  RetriesExhausted { attempts: u32, last: Box<FetchError> },
  #[error("fetch cancelled")]
  Cancelled,
}

impl From<reqwest::Error> for FetchError {
  fn from(e: reqwest::Error) -> Self {
    if e.is_decode() {
      FetchError::MalformedResponse(e.to_string())
    } else {
      FetchError::Transport(e.to_string())
    }
  }
}

/// Misuse of the quiz engine contract. Never retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
  #[error("no questions available")]
  EmptyBatch,
  #[error("question index {index} is out of range ({len} questions)")]
  OutOfRange { index: usize, len: usize },
  #[error("cannot {operation} while the quiz is {phase}")]
  InvalidState { operation: &'static str, phase: Phase },
  #[error("question {question} has already been answered")]
  AlreadyAnswered { question: u32 },
  #[error("question {question} has not been answered yet")]
  NotAnswered { question: u32 },
  #[error("option {index} does not exist ({len} options)")]
  OptionOutOfRange { index: usize, len: usize },
}

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("failed to read config file {path}: {source}")]
  Read { path: String, source: std::io::Error },
  #[error("failed to parse config file {path}: {source}")]
  Parse { path: String, source: toml::de::Error },
  #[error("invalid config: {0}")]
  Invalid(String),
}
