//! Per-connection quiz session: owns one engine and turns client commands into
//! server events. Everything here is synchronous; fetching a batch happens in
//! the WebSocket loop, which hands the finished batch to `install`.

use tracing::{info, instrument, warn};

use crate::domain::QuizBatch;
use crate::engine::QuizEngine;
use crate::error::EngineError;
use crate::protocol::{answer_result, to_out, ClientWsMessage, ServerWsMessage};

pub struct QuizSession {
  lives: u32,
  engine: Option<QuizEngine>,
}

impl QuizSession {
  pub fn new(lives: u32) -> Self {
    Self { lives, engine: None }
  }

  #[cfg(test)]
  pub fn engine(&self) -> Option<&QuizEngine> {
    self.engine.as_ref()
  }

  /// Replace whatever quiz was running with a fresh engine over `batch`.
  #[instrument(level = "info", skip(self, batch), fields(questions = batch.len()))]
  pub fn install(&mut self, batch: QuizBatch) -> ServerWsMessage {
    let ready = ServerWsMessage::QuizReady {
      title: batch.title.clone(),
      topic: batch.topic.clone(),
      duration_minutes: batch.duration_minutes,
      total_questions: batch.len(),
      lives: self.lives,
    };
    self.engine = Some(QuizEngine::with_lives(batch, self.lives));
    ready
  }

  /// Handle every command except `LoadQuiz`, which needs the network.
  #[instrument(level = "debug", skip(self))]
  pub fn handle(&mut self, msg: ClientWsMessage) -> Vec<ServerWsMessage> {
    let result = match msg {
      ClientWsMessage::Ping => Ok(vec![ServerWsMessage::Pong]),
      ClientWsMessage::LoadQuiz => Ok(vec![error("load_quiz is handled by the connection loop")]),
      ClientWsMessage::Start => self.with_engine(|engine| {
        engine.start()?;
        Ok(vec![question_message(engine)?])
      }),
      ClientWsMessage::SelectOption { index } => self.with_engine(|engine| {
        let outcome = engine.select_option(index)?;
        let mut out = vec![answer_result(index, &outcome, engine.score(), engine.lives_remaining())];
        if engine.is_terminal() {
          out.push(finished_message(engine)?);
        }
        Ok(out)
      }),
      ClientWsMessage::Next => self.with_engine(|engine| {
        engine.advance()?;
        if engine.is_terminal() {
          Ok(vec![finished_message(engine)?])
        } else {
          Ok(vec![question_message(engine)?])
        }
      }),
      ClientWsMessage::Snapshot => self.with_engine(|engine| {
        Ok(vec![ServerWsMessage::Snapshot { snapshot: engine.snapshot() }])
      }),
    };

    result.unwrap_or_else(|e| {
      warn!(target: "quiz", error = %e, "Rejected quiz command");
      vec![error(&e.to_string())]
    })
  }

  fn with_engine<F>(&mut self, f: F) -> Result<Vec<ServerWsMessage>, EngineError>
  where
    F: FnOnce(&mut QuizEngine) -> Result<Vec<ServerWsMessage>, EngineError>,
  {
    match self.engine.as_mut() {
      Some(engine) => f(engine),
      None => Ok(vec![error("No quiz loaded yet.")]),
    }
  }
}

fn question_message(engine: &QuizEngine) -> Result<ServerWsMessage, EngineError> {
  let q = engine.current_question()?;
  let progress = engine.progress_fraction()?;
  Ok(ServerWsMessage::Question {
    question: to_out(q, engine.current_index(), engine.total_questions(), progress),
  })
}

fn finished_message(engine: &QuizEngine) -> Result<ServerWsMessage, EngineError> {
  let final_score = engine.final_score()?;
  let reason = engine.end_reason().unwrap_or(crate::engine::EndReason::QuestionsExhausted);
  info!(target: "quiz", final_score, ?reason, "Results delivered");
  Ok(ServerWsMessage::Finished { final_score, reason })
}

fn error(message: &str) -> ServerWsMessage {
  ServerWsMessage::Error { message: message.to_string() }
}
