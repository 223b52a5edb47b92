//! Public trivia database (Open Trivia DB style) client and answer shuffling.

use rand::Rng;
use serde::Deserialize;
use tracing::{info, instrument};

use crate::domain::QuizItem;
use crate::error::UpstreamError;

/// Upper bound the public database accepts for `amount`.
pub const MAX_QUESTIONS: u32 = 50;

#[derive(Clone)]
pub struct TriviaDb {
  pub client: reqwest::Client,
  pub api_url: String,
}

#[derive(Clone, Debug, Default)]
pub struct TriviaQuery {
  pub amount: u32,
  pub category: Option<String>,
  pub difficulty: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TriviaQuestion {
  pub question: String,
  #[serde(default)]
  pub incorrect_answers: Vec<String>,
  pub correct_answer: String,
}

#[derive(Deserialize)]
struct TriviaResponse {
  #[serde(default)]
  response_code: Option<i64>,
  #[serde(default)]
  results: Option<Vec<TriviaQuestion>>,
}

impl TriviaDb {
  pub fn new(client: reqwest::Client, api_url: impl Into<String>) -> Self {
    Self { client, api_url: api_url.into() }
  }

  #[instrument(level = "info", skip(self), fields(amount = query.amount, category = ?query.category, difficulty = ?query.difficulty))]
  pub async fn fetch(&self, query: &TriviaQuery) -> Result<Vec<TriviaQuestion>, UpstreamError> {
    let mut params: Vec<(&str, String)> = vec![("amount", query.amount.to_string())];
    if let Some(c) = &query.category { params.push(("category", c.clone())); }
    if let Some(d) = &query.difficulty { params.push(("difficulty", d.clone())); }
    params.push(("type", "multiple".into()));

    let res = self.client.get(&self.api_url).query(&params).send().await?;
    if !res.status().is_success() {
      let status = res.status().as_u16();
      let body = res.text().await.unwrap_or_default();
      return Err(UpstreamError::Status { status, body });
    }

    let body: TriviaResponse = res.json().await?;
    let results = body.results.ok_or(UpstreamError::NoQuestions)?;
    info!(target: "quiz", response_code = ?body.response_code, count = results.len(), "Trivia questions received");
    Ok(results)
  }
}

/// Insert the correct answer among the incorrect ones at a uniformly random
/// position in `0..=incorrect.len()`.
pub fn to_quiz_item<R: Rng + ?Sized>(q: TriviaQuestion, rng: &mut R) -> QuizItem {
  let mut options = q.incorrect_answers;
  let idx = rng.gen_range(0..=options.len());
  options.insert(idx, q.correct_answer.clone());
  QuizItem { question: q.question, options, correct_answer: q.correct_answer, hint: None }
}
