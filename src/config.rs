//! Loading quiz configuration (trivia source, retry tuning, quiz metadata) from TOML.
//!
//! See `QuizConfig` for the expected schema. Every section and key is optional.

use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info};

use crate::error::ConfigError;
use crate::retry::RetryPolicy;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct QuizConfig {
  #[serde(default)]
  pub source: SourceCfg,
  #[serde(default)]
  pub retry: RetryCfg,
  #[serde(default)]
  pub quiz: QuizMeta,
}

/// Where questions come from.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SourceCfg {
  pub base_url: String,
  pub batch_size: usize,
  pub request_timeout_secs: u64,
}

impl Default for SourceCfg {
  fn default() -> Self {
    Self {
      base_url: "https://opentdb.com/api.php".into(),
      batch_size: 20,
      request_timeout_secs: 20,
    }
  }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RetryCfg {
  pub max_attempts: u32,
  pub base_delay_ms: u64,
  pub max_delay_ms: u64,
}

impl Default for RetryCfg {
  fn default() -> Self {
    Self { max_attempts: 5, base_delay_ms: 2000, max_delay_ms: 32000 }
  }
}

impl RetryCfg {
  pub fn policy(&self) -> RetryPolicy {
    RetryPolicy {
      max_attempts: self.max_attempts,
      base_delay: Duration::from_millis(self.base_delay_ms),
      max_delay: Duration::from_millis(self.max_delay_ms),
    }
  }
}

/// Metadata stamped onto every batch, shown on the welcome screen.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct QuizMeta {
  pub title: String,
  pub topic: String,
  pub duration_minutes: u32,
  /// Kept as text; see `normalize::parse_points`.
  pub correct_answer_marks: String,
  // Displayed only; wrong answers cost a life, not points.
  pub negative_marks: String,
  pub lives: u32,
}

impl Default for QuizMeta {
  fn default() -> Self {
    Self {
      title: "General Knowledge Quiz".into(),
      topic: "General Knowledge".into(),
      duration_minutes: 15,
      correct_answer_marks: "4.0".into(),
      negative_marks: "1.0".into(),
      lives: 3,
    }
  }
}

impl QuizConfig {
  pub fn from_toml_str(s: &str, path: &str) -> Result<Self, ConfigError> {
    let cfg: QuizConfig = toml::from_str(s)
      .map_err(|source| ConfigError::Parse { path: path.to_string(), source })?;
    cfg.validate()?;
    Ok(cfg)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.retry.max_attempts == 0 {
      return Err(ConfigError::Invalid("retry.max_attempts must be at least 1".into()));
    }
    if self.retry.base_delay_ms > self.retry.max_delay_ms {
      return Err(ConfigError::Invalid("retry.base_delay_ms must not exceed retry.max_delay_ms".into()));
    }
    if self.source.batch_size == 0 {
      return Err(ConfigError::Invalid("source.batch_size must be at least 1".into()));
    }
    if self.quiz.lives == 0 {
      return Err(ConfigError::Invalid("quiz.lives must be at least 1".into()));
    }
    Ok(())
  }
}

/// Load `QuizConfig` from QUIZ_CONFIG_PATH, or defaults if the variable is unset.
/// A path that is set but unreadable or invalid is an error.
pub fn load_config_from_env() -> Result<QuizConfig, ConfigError> {
  let Ok(path) = std::env::var("QUIZ_CONFIG_PATH") else {
    info!(target: "trivia_quiz", "QUIZ_CONFIG_PATH not set; using built-in defaults");
    return Ok(QuizConfig::default());
  };
  let s = std::fs::read_to_string(&path).map_err(|source| {
    error!(target: "trivia_quiz", %path, error = %source, "Failed to read TOML config file");
    ConfigError::Read { path: path.clone(), source }
  })?;
  let cfg = QuizConfig::from_toml_str(&s, &path).inspect_err(|e| {
    error!(target: "trivia_quiz", %path, error = %e, "Rejected TOML config");
  })?;
  info!(target: "trivia_quiz", %path, "Loaded quiz config (TOML)");
  Ok(cfg)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_file_yields_defaults() {
    let cfg = QuizConfig::from_toml_str("", "mem").expect("config");
    assert_eq!(cfg.retry.max_attempts, 5);
    assert_eq!(cfg.retry.base_delay_ms, 2000);
    assert_eq!(cfg.retry.max_delay_ms, 32000);
    assert_eq!(cfg.source.batch_size, 20);
    assert_eq!(cfg.quiz.lives, 3);
    assert_eq!(cfg.quiz.correct_answer_marks, "4.0");
  }

  #[test]
  fn partial_sections_keep_remaining_defaults() {
    let cfg = QuizConfig::from_toml_str(
      "[retry]\nmax_attempts = 2\n[quiz]\ntopic = \"Science\"\n",
      "mem",
    )
    .expect("config");
    assert_eq!(cfg.retry.max_attempts, 2);
    assert_eq!(cfg.retry.base_delay_ms, 2000);
    assert_eq!(cfg.quiz.topic, "Science");
    assert_eq!(cfg.quiz.title, "General Knowledge Quiz");
  }

  #[test]
  fn rejects_zero_attempts_and_zero_lives() {
    let err = QuizConfig::from_toml_str("[retry]\nmax_attempts = 0\n", "mem").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
    let err = QuizConfig::from_toml_str("[quiz]\nlives = 0\n", "mem").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
  }

  #[test]
  fn rejects_garbage() {
    let err = QuizConfig::from_toml_str("retry = [", "mem").unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
  }
}
