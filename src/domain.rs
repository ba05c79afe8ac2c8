//! Domain models: answer options, questions, and the quiz batch handed to the engine.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identity of an answer option, independent of its position after shuffling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionId(pub Uuid);

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnswerOption {
  pub id: OptionId,
  pub text: String,
  pub is_correct: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Question {
  /// Sequential, starting at 1 in source order.
  pub id: u32,
  pub text: String,
  #[serde(default)] pub category: String,
  #[serde(default)] pub difficulty: String,
  /// Presentation order. Exactly one entry has `is_correct`.
  pub options: Vec<AnswerOption>,
}

impl Question {
  /// Position of the correct option in `options`.
  pub fn correct_index(&self) -> Option<usize> {
    self.options.iter().position(|o| o.is_correct)
  }
}

/// Everything one quiz session needs, built in full before the engine sees it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuizBatch {
  pub title: String,
  pub topic: String,
  pub duration_minutes: u32,
  pub correct_answer_points: f64,
  pub questions: Vec<Question>,
}

impl QuizBatch {
  pub fn len(&self) -> usize { self.questions.len() }

  pub fn is_empty(&self) -> bool { self.questions.is_empty() }
}
