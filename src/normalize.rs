//! Turning raw Open Trivia DB records into the internal question model.
//!
//! Text arrives HTML-entity encoded (`&quot;`, `&#039;`, ...). Options are the
//! incorrect answers plus the correct one, shuffled with Fisher–Yates from the
//! caller's RNG so tests can pin the order with a seeded generator.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;
use uuid::Builder;

use crate::config::QuizMeta;
use crate::domain::{AnswerOption, OptionId, Question, QuizBatch};
use crate::error::FetchError;

/// Top-level payload of `api.php`. `response_code` 0 means success.
#[derive(Debug, Deserialize)]
pub struct RawResponse {
  pub response_code: i64,
  #[serde(default)]
  pub results: Vec<RawQuestion>,
}

#[derive(Debug, Deserialize)]
pub struct RawQuestion {
  #[serde(default)] pub category: String,
  #[serde(default)] pub difficulty: String,
  pub question: String,
  pub correct_answer: String,
  #[serde(default)] pub incorrect_answers: Vec<String>,
}

/// Decode HTML entities into plain text.
pub fn decode_entities(s: &str) -> String {
  html_escape::decode_html_entities(s).into_owned()
}

/// Points for a correct answer. Anything that is not a finite positive number counts as 1.
pub fn parse_points(marks: &str) -> f64 {
  match marks.trim().parse::<f64>() {
    Ok(p) if p.is_finite() && p > 0.0 => p,
    _ => 1.0,
  }
}

fn option_id<R: Rng + ?Sized>(rng: &mut R) -> OptionId {
  OptionId(Builder::from_random_bytes(rng.gen()).into_uuid())
}

/// Build one question: decoded text, one correct option, uniform shuffle.
pub fn normalize_question<R: Rng + ?Sized>(id: u32, raw: &RawQuestion, rng: &mut R) -> Question {
  let mut options: Vec<AnswerOption> = raw
    .incorrect_answers
    .iter()
    .map(|a| AnswerOption { id: option_id(rng), text: decode_entities(a), is_correct: false })
    .collect();
  options.push(AnswerOption {
    id: option_id(rng),
    text: decode_entities(&raw.correct_answer),
    is_correct: true,
  });
  options.shuffle(rng);

  Question {
    id,
    text: decode_entities(&raw.question),
    category: decode_entities(&raw.category),
    difficulty: raw.difficulty.clone(),
    options,
  }
}

/// Validate the payload and build the whole batch; nothing partial escapes on error.
pub fn build_batch<R: Rng + ?Sized>(
  raw: RawResponse,
  meta: &QuizMeta,
  rng: &mut R,
) -> Result<QuizBatch, FetchError> {
  if raw.response_code != 0 {
    return Err(FetchError::MalformedResponse(format!(
      "API error: response code {}",
      raw.response_code
    )));
  }
  if let Some(bad) = raw.results.iter().position(|q| q.question.trim().is_empty()) {
    return Err(FetchError::MalformedResponse(format!("question {} has no text", bad + 1)));
  }

  let questions = raw
    .results
    .iter()
    .zip(1u32..)
    .map(|(q, id)| normalize_question(id, q, rng))
    .collect();

  Ok(QuizBatch {
    title: meta.title.clone(),
    topic: meta.topic.clone(),
    duration_minutes: meta.duration_minutes,
    correct_answer_points: parse_points(&meta.correct_answer_marks),
    questions,
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  use std::collections::HashSet;

  use rand::rngs::StdRng;
  use rand::SeedableRng;

  fn raw(question: &str, correct: &str, incorrect: &[&str]) -> RawQuestion {
    RawQuestion {
      category: "General Knowledge".into(),
      difficulty: "easy".into(),
      question: question.into(),
      correct_answer: correct.into(),
      incorrect_answers: incorrect.iter().map(|s| s.to_string()).collect(),
    }
  }

  fn sample_response() -> RawResponse {
    RawResponse {
      response_code: 0,
      results: vec![
        raw("Which planet is known as the &quot;Red Planet&quot;?", "Mars", &["Venus", "Jupiter", "Saturn"]),
        raw("The Great Wall is visible from space.", "False", &["True"]),
        raw("Who wrote &#039;Hamlet&#039;?", "Shakespeare", &["Marlowe", "Jonson", "Kyd"]),
      ],
    }
  }

  #[test]
  fn every_question_has_exactly_one_correct_option() {
    let mut rng = StdRng::seed_from_u64(7);
    let batch = build_batch(sample_response(), &QuizMeta::default(), &mut rng).expect("batch");
    let expected_lens = [4, 2, 4];
    for (q, len) in batch.questions.iter().zip(expected_lens) {
      assert_eq!(q.options.len(), len);
      assert_eq!(q.options.iter().filter(|o| o.is_correct).count(), 1);
    }
  }

  #[test]
  fn ids_are_sequential_and_entities_decoded() {
    let mut rng = StdRng::seed_from_u64(1);
    let batch = build_batch(sample_response(), &QuizMeta::default(), &mut rng).expect("batch");
    let ids: Vec<u32> = batch.questions.iter().map(|q| q.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(batch.questions[0].text, "Which planet is known as the \"Red Planet\"?");
    assert_eq!(batch.questions[2].text, "Who wrote 'Hamlet'?");
    assert_eq!(batch.topic, "General Knowledge");
    assert_eq!(batch.correct_answer_points, 4.0);
  }

  #[test]
  fn option_ids_are_unique() {
    let mut rng = StdRng::seed_from_u64(3);
    let q = normalize_question(1, &raw("q", "a", &["b", "c", "d"]), &mut rng);
    let ids: HashSet<OptionId> = q.options.iter().map(|o| o.id).collect();
    assert_eq!(ids.len(), 4);
  }

  #[test]
  fn shuffle_is_a_permutation() {
    let input = raw("q", "right", &["w1", "w2", "w3"]);
    for seed in 0..200 {
      let mut rng = StdRng::seed_from_u64(seed);
      let q = normalize_question(1, &input, &mut rng);
      let mut texts: Vec<&str> = q.options.iter().map(|o| o.text.as_str()).collect();
      texts.sort_unstable();
      assert_eq!(texts, vec!["right", "w1", "w2", "w3"]);
      let correct: Vec<&str> =
        q.options.iter().filter(|o| o.is_correct).map(|o| o.text.as_str()).collect();
      assert_eq!(correct, vec!["right"]);
    }
  }

  #[test]
  fn correct_position_is_not_biased() {
    let input = raw("q", "right", &["w1", "w2", "w3"]);
    let mut rng = StdRng::seed_from_u64(42);
    let runs = 4000;
    let mut counts = [0usize; 4];
    for _ in 0..runs {
      let q = normalize_question(1, &input, &mut rng);
      counts[q.correct_index().expect("correct option")] += 1;
    }
    // Expected 1000 per slot; a fixed or strongly skewed position falls far outside this band.
    for c in counts {
      assert!((800..=1200).contains(&c), "position counts {counts:?}");
    }
  }

  #[test]
  fn non_zero_response_code_is_malformed() {
    let mut rng = StdRng::seed_from_u64(0);
    let err = build_batch(RawResponse { response_code: 5, results: vec![] }, &QuizMeta::default(), &mut rng)
      .unwrap_err();
    assert!(matches!(err, FetchError::MalformedResponse(m) if m.contains("5")));
  }

  #[test]
  fn payload_parses_from_json() {
    let body = r#"{"response_code":0,"results":[{"type":"boolean","difficulty":"easy","category":"Science &amp; Nature","question":"Is 2 &lt; 3?","correct_answer":"True","incorrect_answers":["False"]}]}"#;
    let parsed: RawResponse = serde_json::from_str(body).expect("json");
    let mut rng = StdRng::seed_from_u64(9);
    let batch = build_batch(parsed, &QuizMeta::default(), &mut rng).expect("batch");
    assert_eq!(batch.questions[0].text, "Is 2 < 3?");
    assert_eq!(batch.questions[0].category, "Science & Nature");
  }

  #[test]
  fn points_fall_back_to_one() {
    assert_eq!(parse_points("4.0"), 4.0);
    assert_eq!(parse_points(" 2 "), 2.0);
    assert_eq!(parse_points("four"), 1.0);
    assert_eq!(parse_points(""), 1.0);
    assert_eq!(parse_points("0"), 1.0);
    assert_eq!(parse_points("NaN"), 1.0);
  }
}
