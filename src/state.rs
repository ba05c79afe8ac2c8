//! Application state shared by all connections: configuration and the question source.
//!
//! Nothing here is mutable. Quiz progress lives in each connection's
//! `QuizSession`, never in shared state.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::config::QuizConfig;
use crate::error::FetchError;
use crate::trivia::{QuestionSource, TriviaClient};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<QuizConfig>,
    pub source: Arc<dyn QuestionSource>,
}

impl AppState {
    /// Build state from config: Open Trivia DB client with the configured retry policy.
    #[instrument(level = "info", skip_all)]
    pub fn new(config: QuizConfig) -> Result<Self, FetchError> {
        let client = TriviaClient::from_config(&config)?;
        info!(
            target: "trivia_quiz",
            base_url = %client.base_url,
            batch_size = config.source.batch_size,
            max_attempts = client.policy.max_attempts,
            base_delay_ms = config.retry.base_delay_ms,
            max_delay_ms = config.retry.max_delay_ms,
            "Trivia source configured."
        );
        Ok(Self::with_source(config, Arc::new(client)))
    }

    pub fn with_source(config: QuizConfig, source: Arc<dyn QuestionSource>) -> Self {
        Self { config: Arc::new(config), source }
    }
}
