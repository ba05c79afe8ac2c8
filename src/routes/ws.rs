//! WebSocket upgrade + message loop. Each connection owns one `QuizSession`;
//! client messages are parsed as JSON and answered with one or more JSON events.
//!
//! `load_quiz` is the only command that waits on the network. While the fetch
//! runs the socket is still read, so a disconnect cancels pending retries.

use std::fmt::Display;
use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use crate::domain::QuizBatch;
use crate::error::FetchError;
use crate::protocol::{load_failed, ClientWsMessage, ServerWsMessage};
use crate::session::QuizSession;
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "trivia_quiz", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(socket: WebSocket, state: Arc<AppState>) {
  info!(target: "trivia_quiz", "WebSocket connected");
  let (mut tx, mut rx) = socket.split();
  let mut session = QuizSession::new(state.config.quiz.lives);

  while let Some(Ok(msg)) = rx.next().await {
    match msg {
      Message::Text(txt) => {
        let replies = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(ClientWsMessage::LoadQuiz) => match load_quiz(&mut rx, &mut tx, &state).await {
            Some(Ok(batch)) => vec![session.install(batch)],
            Some(Err(e)) => vec![load_failed(&e)],
            None => break,
          },
          Ok(incoming) => {
            debug!(target: "quiz", "WS received: {:?}", &incoming);
            session.handle(incoming)
          }
          Err(e) => vec![ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) }],
        };

        if !send_all(&mut tx, replies).await {
          break;
        }
      }
      Message::Ping(payload) => { let _ = tx.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "trivia_quiz", "WebSocket disconnected");
}

/// Fetch a batch while keeping an eye on the socket. `None` means the client went away.
async fn load_quiz<R, W, E>(rx: &mut R, tx: &mut W, state: &AppState) -> Option<Result<QuizBatch, FetchError>>
where
  R: Stream<Item = Result<Message, E>> + Unpin,
  W: Sink<Message> + Unpin,
  W::Error: Display,
{
  let cancel = CancellationToken::new();
  let fetch = state.source.fetch_batch(state.config.source.batch_size, &cancel);
  tokio::pin!(fetch);

  loop {
    tokio::select! {
      res = &mut fetch => return Some(res),
      incoming = rx.next() => match incoming {
        None | Some(Err(_)) | Some(Ok(Message::Close(_))) => {
          cancel.cancel();
          let res = (&mut fetch).await;
          info!(target: "trivia_quiz", cancelled = matches!(res, Err(FetchError::Cancelled)), "Client left during quiz load");
          return None;
        }
        Some(Ok(Message::Ping(payload))) => { let _ = tx.send(Message::Pong(payload)).await; }
        Some(Ok(_)) => {
          let busy = ServerWsMessage::Error { message: "Quiz is still loading.".into() };
          if !send_all(tx, vec![busy]).await {
            cancel.cancel();
            return None;
          }
        }
      },
    }
  }
}

/// Serialize and send every reply. Returns false once the socket is unusable.
async fn send_all<W>(tx: &mut W, replies: Vec<ServerWsMessage>) -> bool
where
  W: Sink<Message> + Unpin,
  W::Error: Display,
{
  for reply in replies {
    let out = serde_json::to_string(&reply).unwrap_or_else(|e| {
      serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
    });
    if let Err(e) = tx.send(Message::Text(out)).await {
      error!(target: "trivia_quiz", error = %e, "WS send error");
      return false;
    }
  }
  true
}

#[cfg(test)]
mod tests {
  use super::*;

  use std::sync::atomic::{AtomicBool, Ordering};
  use std::time::Duration;

  use async_trait::async_trait;
  use futures::channel::mpsc;
  use tokio::sync::Notify;

  use crate::config::QuizConfig;
  use crate::trivia::QuestionSource;

  /// Blocks until its token is cancelled, or until `release` fires.
  #[derive(Default)]
  struct SlowSource {
    started: Notify,
    release: Notify,
    saw_cancel: AtomicBool,
  }

  #[async_trait]
  impl QuestionSource for SlowSource {
    async fn fetch_batch(&self, _size: usize, cancel: &CancellationToken) -> Result<QuizBatch, FetchError> {
      self.started.notify_one();
      tokio::select! {
        _ = cancel.cancelled() => {
          self.saw_cancel.store(true, Ordering::SeqCst);
          Err(FetchError::Cancelled)
        }
        _ = self.release.notified() => Ok(QuizBatch {
          title: "Slow".into(),
          topic: "Waiting".into(),
          duration_minutes: 1,
          correct_answer_points: 1.0,
          questions: vec![],
        }),
      }
    }
  }

  fn state(source: Arc<SlowSource>) -> AppState {
    AppState::with_source(QuizConfig::default(), source)
  }

  type Incoming = Result<Message, axum::Error>;

  #[tokio::test]
  async fn disconnect_during_load_cancels_fetch() {
    let source = Arc::new(SlowSource::default());
    let state = state(source.clone());
    let (client_tx, mut rx) = mpsc::unbounded::<Incoming>();
    let (mut tx, _client_rx) = mpsc::unbounded::<Message>();

    let client = async {
      source.started.notified().await;
      drop(client_tx);
    };
    let (res, ()) = tokio::time::timeout(Duration::from_secs(5), async {
      tokio::join!(load_quiz(&mut rx, &mut tx, &state), client)
    })
    .await
    .expect("load_quiz returned");

    assert!(res.is_none());
    assert!(source.saw_cancel.load(Ordering::SeqCst));
  }

  #[tokio::test]
  async fn close_frame_during_load_cancels_fetch() {
    let source = Arc::new(SlowSource::default());
    let state = state(source.clone());
    let (client_tx, mut rx) = mpsc::unbounded::<Incoming>();
    let (mut tx, _client_rx) = mpsc::unbounded::<Message>();

    let client = async {
      source.started.notified().await;
      client_tx.unbounded_send(Ok(Message::Close(None))).expect("send close");
    };
    let (res, ()) = tokio::time::timeout(Duration::from_secs(5), async {
      tokio::join!(load_quiz(&mut rx, &mut tx, &state), client)
    })
    .await
    .expect("load_quiz returned");

    assert!(res.is_none());
    assert!(source.saw_cancel.load(Ordering::SeqCst));
  }

  #[tokio::test]
  async fn commands_while_loading_get_busy_reply() {
    let source = Arc::new(SlowSource::default());
    let state = state(source.clone());
    let (client_tx, mut rx) = mpsc::unbounded::<Incoming>();
    let (mut tx, mut client_rx) = mpsc::unbounded::<Message>();

    let client = async {
      source.started.notified().await;
      client_tx.unbounded_send(Ok(Message::Text(r#"{"type":"start"}"#.into()))).expect("send start");
      let reply = client_rx.next().await.expect("busy reply");
      source.release.notify_one();
      reply
    };
    let (res, reply) = tokio::time::timeout(Duration::from_secs(5), async {
      tokio::join!(load_quiz(&mut rx, &mut tx, &state), client)
    })
    .await
    .expect("load_quiz returned");

    match reply {
      Message::Text(txt) => assert!(txt.contains("still loading"), "unexpected reply {txt}"),
      other => panic!("unexpected {other:?}"),
    }
    assert!(matches!(res, Some(Ok(ref batch)) if batch.title == "Slow"));
    assert!(!source.saw_cancel.load(Ordering::SeqCst));
  }
}
