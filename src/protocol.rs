//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.
//! Correctness flags never appear in outgoing questions.

use serde::{Deserialize, Serialize};

use crate::config::QuizMeta;
use crate::domain::{OptionId, Question};
use crate::engine::{AnswerOutcome, EndReason, QuizSnapshot};
use crate::error::FetchError;

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    /// Fetch a fresh batch; replaces any quiz in progress.
    LoadQuiz,
    Start,
    SelectOption {
        index: usize,
    },
    Next,
    Snapshot,
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    QuizReady {
        title: String,
        topic: String,
        #[serde(rename = "durationMinutes")]
        duration_minutes: u32,
        #[serde(rename = "totalQuestions")]
        total_questions: usize,
        lives: u32,
    },
    Question {
        question: QuestionOut,
    },
    AnswerResult {
        correct: bool,
        #[serde(rename = "selectedIndex")]
        selected_index: usize,
        #[serde(rename = "correctIndex")]
        correct_index: usize,
        score: f64,
        #[serde(rename = "livesRemaining")]
        lives_remaining: u32,
    },
    Finished {
        #[serde(rename = "finalScore")]
        final_score: f64,
        reason: EndReason,
    },
    Snapshot {
        snapshot: QuizSnapshot,
    },
    /// Terminal error surface; the client offers a reload.
    LoadFailed {
        message: String,
        attempts: u32,
        #[serde(rename = "canRetry")]
        can_retry: bool,
    },
    Error {
        message: String,
    },
}

#[derive(Debug, Serialize)]
pub struct OptionOut {
    pub id: OptionId,
    pub text: String,
}

/// DTO for question delivery.
#[derive(Debug, Serialize)]
pub struct QuestionOut {
    pub id: u32,
    pub number: usize,
    pub total: usize,
    pub progress: f64,
    pub text: String,
    pub category: String,
    pub difficulty: String,
    pub options: Vec<OptionOut>,
}

/// Convert an internal `Question` to the public DTO.
pub fn to_out(q: &Question, index: usize, total: usize, progress: f64) -> QuestionOut {
    QuestionOut {
        id: q.id,
        number: index + 1,
        total,
        progress,
        text: q.text.clone(),
        category: q.category.clone(),
        difficulty: q.difficulty.clone(),
        options: q
            .options
            .iter()
            .map(|o| OptionOut { id: o.id, text: o.text.clone() })
            .collect(),
    }
}

pub fn answer_result(selected_index: usize, outcome: &AnswerOutcome, score: f64, lives_remaining: u32) -> ServerWsMessage {
    let (correct, correct_index) = match outcome {
        AnswerOutcome::Correct { .. } => (true, selected_index),
        AnswerOutcome::Incorrect { correct_index, .. } => (false, *correct_index),
    };
    ServerWsMessage::AnswerResult { correct, selected_index, correct_index, score, lives_remaining }
}

pub fn load_failed(err: &FetchError) -> ServerWsMessage {
    let attempts = match err {
        FetchError::RetriesExhausted { attempts, .. } => *attempts,
        _ => 0,
    };
    ServerWsMessage::LoadFailed {
        message: "Failed to fetch quiz data. Please try again later.".into(),
        attempts,
        can_retry: true,
    }
}

//
// HTTP request/response DTOs
//

/// Welcome-screen data.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizInfoOut {
    pub title: String,
    pub topic: String,
    pub duration_minutes: u32,
    pub question_count: usize,
    pub lives: u32,
    pub correct_answer_marks: String,
    pub negative_marks: String,
}

impl QuizInfoOut {
    pub fn new(meta: &QuizMeta, question_count: usize) -> Self {
        Self {
            title: meta.title.clone(),
            topic: meta.topic.clone(),
            duration_minutes: meta.duration_minutes,
            question_count,
            lives: meta.lives,
            correct_answer_marks: meta.correct_answer_marks.clone(),
            negative_marks: meta.negative_marks.clone(),
        }
    }
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}
