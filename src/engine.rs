//! Quiz state machine: question sequencing, answer evaluation, score and lives.
//!
//! Phases:
//!   NotStarted --start()--> Presenting --advance()--> Presenting | Terminal
//!   Presenting --select_option() with last life lost--> Terminal
//!
//! Terminal is absorbing. All operations are synchronous; the engine owns its
//! batch and state outright, so callers never share or lock it.

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::domain::{Question, QuizBatch};
use crate::error::EngineError;

#[cfg(test)]
pub const DEFAULT_LIVES: u32 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
  NotStarted,
  Presenting,
  Terminal,
}

impl std::fmt::Display for Phase {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let s = match self {
      Phase::NotStarted => "not started",
      Phase::Presenting => "in progress",
      Phase::Terminal => "finished",
    };
    f.write_str(s)
  }
}

/// Why the quiz reached Terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
  QuestionsExhausted,
  LivesExhausted,
}

/// Result of answering the current question.
#[derive(Clone, Debug, PartialEq)]
pub enum AnswerOutcome {
  Correct { points: f64, score: f64 },
  /// `correct_index` lets the presentation layer highlight the right option.
  Incorrect { correct_index: usize, lives_remaining: u32 },
}

impl AnswerOutcome {
  pub fn is_correct(&self) -> bool {
    matches!(self, AnswerOutcome::Correct { .. })
  }
}

#[derive(Clone, Debug)]
struct QuizState {
  current_index: usize,
  score: f64,
  lives_remaining: u32,
  selected_option: Option<usize>,
}

/// Read-only view for the presentation layer.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSnapshot {
  pub phase: Phase,
  pub current_index: usize,
  pub total_questions: usize,
  pub score: f64,
  pub lives_remaining: u32,
  pub selected_option: Option<usize>,
  pub progress: Option<f64>,
  pub end_reason: Option<EndReason>,
}

pub struct QuizEngine {
  batch: QuizBatch,
  state: QuizState,
  phase: Phase,
  end_reason: Option<EndReason>,
}

impl QuizEngine {
  #[cfg(test)]
  pub fn new(batch: QuizBatch) -> Self {
    Self::with_lives(batch, DEFAULT_LIVES)
  }

  pub fn with_lives(batch: QuizBatch, lives: u32) -> Self {
    Self {
      batch,
      state: QuizState { current_index: 0, score: 0.0, lives_remaining: lives, selected_option: None },
      phase: Phase::NotStarted,
      end_reason: None,
    }
  }

  #[instrument(level = "debug", skip(self), fields(questions = self.batch.len()))]
  pub fn start(&mut self) -> Result<(), EngineError> {
    self.require(Phase::NotStarted, "start")?;
    if self.batch.is_empty() {
      return Err(EngineError::EmptyBatch);
    }
    self.phase = Phase::Presenting;
    info!(target: "quiz", questions = self.batch.len(), lives = self.state.lives_remaining, "Quiz started");
    Ok(())
  }

  pub fn current_question(&self) -> Result<&Question, EngineError> {
    let len = self.batch.len();
    self
      .batch
      .questions
      .get(self.state.current_index)
      .ok_or(EngineError::OutOfRange { index: self.state.current_index, len })
  }

  /// Answer the current question. The first answer locks it.
  #[instrument(level = "debug", skip(self), fields(index = self.state.current_index))]
  pub fn select_option(&mut self, option_index: usize) -> Result<AnswerOutcome, EngineError> {
    self.require(Phase::Presenting, "answer")?;
    let question = self.current_question()?;
    if self.state.selected_option.is_some() {
      return Err(EngineError::AlreadyAnswered { question: question.id });
    }
    let option = question
      .options
      .get(option_index)
      .ok_or(EngineError::OptionOutOfRange { index: option_index, len: question.options.len() })?;

    let question_id = question.id;
    let outcome = if option.is_correct {
      let points = self.batch.correct_answer_points;
      self.state.score += points;
      AnswerOutcome::Correct { points, score: self.state.score }
    } else {
      let correct_index = question.correct_index().unwrap_or(option_index);
      self.state.lives_remaining = self.state.lives_remaining.saturating_sub(1);
      AnswerOutcome::Incorrect { correct_index, lives_remaining: self.state.lives_remaining }
    };
    self.state.selected_option = Some(option_index);

    debug!(target: "quiz", question = question_id, option_index, correct = outcome.is_correct(), score = self.state.score, lives = self.state.lives_remaining, "Answer evaluated");

    // Only a wrong answer can end the quiz here.
    if !outcome.is_correct() && self.state.lives_remaining == 0 {
      self.finish(EndReason::LivesExhausted);
    }
    Ok(outcome)
  }

  /// Move past an answered question. Returns the phase after the move.
  #[instrument(level = "debug", skip(self), fields(index = self.state.current_index))]
  pub fn advance(&mut self) -> Result<Phase, EngineError> {
    self.require(Phase::Presenting, "advance")?;
    if self.state.selected_option.is_none() {
      let question = self.current_question()?.id;
      return Err(EngineError::NotAnswered { question });
    }
    self.state.selected_option = None;
    self.state.current_index += 1;
    if self.state.current_index >= self.batch.len() {
      self.state.current_index = self.batch.len();
      self.finish(EndReason::QuestionsExhausted);
    }
    Ok(self.phase)
  }

  pub fn progress_fraction(&self) -> Result<f64, EngineError> {
    self.require(Phase::Presenting, "report progress")?;
    Ok((self.state.current_index + 1) as f64 / self.batch.len() as f64)
  }

  pub fn is_terminal(&self) -> bool {
    self.phase == Phase::Terminal
  }

  pub fn final_score(&self) -> Result<f64, EngineError> {
    self.require(Phase::Terminal, "report the final score")?;
    Ok(self.state.score)
  }

  #[cfg(test)]
  pub fn phase(&self) -> Phase { self.phase }
  pub fn score(&self) -> f64 { self.state.score }
  pub fn lives_remaining(&self) -> u32 { self.state.lives_remaining }
  pub fn current_index(&self) -> usize { self.state.current_index }
  pub fn total_questions(&self) -> usize { self.batch.len() }
  #[cfg(test)]
  pub fn selected_option(&self) -> Option<usize> { self.state.selected_option }
  pub fn end_reason(&self) -> Option<EndReason> { self.end_reason }

  pub fn snapshot(&self) -> QuizSnapshot {
    QuizSnapshot {
      phase: self.phase,
      current_index: self.state.current_index,
      total_questions: self.batch.len(),
      score: self.state.score,
      lives_remaining: self.state.lives_remaining,
      selected_option: self.state.selected_option,
      progress: self.progress_fraction().ok(),
      end_reason: self.end_reason,
    }
  }

  fn require(&self, phase: Phase, operation: &'static str) -> Result<(), EngineError> {
    if self.phase == phase {
      Ok(())
    } else {
      Err(EngineError::InvalidState { operation, phase: self.phase })
    }
  }

  fn finish(&mut self, reason: EndReason) {
    self.phase = Phase::Terminal;
    self.end_reason = Some(reason);
    info!(target: "quiz", ?reason, score = self.state.score, lives = self.state.lives_remaining, answered_through = self.state.current_index, "Quiz finished");
  }
}
