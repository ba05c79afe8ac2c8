//! Tracing setup for the quiz server.
//!
//! `LOG_LEVEL` takes a filter directive string; without it the server logs at
//! info with debug detail for its own targets:
//!   `trivia_quiz` connection and server lifecycle
//!   `trivia`      question fetches, retries and backoff waits
//!   `quiz`        engine transitions and session commands
//! `LOG_FORMAT=json` switches to one JSON object per event.

use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVES: &str = "info,trivia_quiz=debug,trivia=debug,quiz=debug,tower_http=info,axum=info";

pub fn init_tracing() {
  let filter = EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_target(true)
    .with_file(true)
    .with_line_number(true);

  if wants_json(std::env::var("LOG_FORMAT").ok().as_deref()) {
    builder.json().init();
  } else {
    builder.init();
  }
}

fn wants_json(format: Option<&str>) -> bool {
  format.is_some_and(|f| f.trim().eq_ignore_ascii_case("json"))
}
