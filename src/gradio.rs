//! Community quiz-generation space (Gradio on Hugging Face) with endpoint guessing.
//!
//! Spaces move between hostnames and Gradio versions change the predict
//! route and payload shape, so we walk a fixed list of candidates in order
//! and keep the first one that answers with a usable quiz.

use reqwest::{header::CONTENT_TYPE, Url};
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use crate::config::Settings;
use crate::domain::{normalize_quiz, Language, QuizItem, RawQuizItem};
use crate::error::UpstreamError;
use crate::jsonfix::parse_lenient;
use crate::util::trunc_for_log;

pub const PREDICT_PATHS: &[&str] = &["/run/predict", "/api/predict", "/api/generate-quiz"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PayloadShape {
  /// `{"data": [topic, count, difficulty, language]}`
  GradioData,
  /// `{"quizTopic", "numberOfQuestions", "difficulty", "language"}`
  PlainJson,
}

impl PayloadShape {
  fn label(self) -> &'static str {
    match self {
      PayloadShape::GradioData => "gradio-data",
      PayloadShape::PlainJson => "plain-json",
    }
  }

  fn payload(self, req: &GradioRequest) -> Value {
    match self {
      PayloadShape::GradioData => json!({
        "data": [req.topic, req.count, req.difficulty, req.language.label()]
      }),
      PayloadShape::PlainJson => json!({
        "quizTopic": req.topic,
        "numberOfQuestions": req.count.to_string(),
        "difficulty": req.difficulty,
        "language": req.language.label(),
      }),
    }
  }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidate {
  pub url: String,
  pub shape: PayloadShape,
}

#[derive(Clone, Debug)]
pub struct GradioRequest {
  pub topic: String,
  pub count: u32,
  pub difficulty: String,
  pub language: Language,
}

#[derive(Clone)]
pub struct GradioSpace {
  pub client: reqwest::Client,
  pub candidates: Vec<Candidate>,
  pub token: Option<String>,
}

/// `owner/name` -> `https://owner-name.hf.space`.
pub fn space_host(space_id: &str) -> Option<String> {
  let (owner, name) = space_id.trim().trim_matches('/').split_once('/')?;
  if owner.is_empty() || name.is_empty() || name.contains('/') {
    return None;
  }
  let slug = |s: &str| s.to_lowercase().replace(['_', '.'], "-");
  Some(format!("https://{}-{}.hf.space", slug(owner), slug(name)))
}

/// Ordered, de-duplicated candidate list. An explicit URL with a path is
/// tried verbatim first; then every base (explicit origin, guessed host)
/// is combined with each predict path; each URL gets both payload shapes.
pub fn candidates(space_url: Option<&str>, space_id: Option<&str>) -> Vec<Candidate> {
  let mut urls: Vec<String> = Vec::new();
  let mut bases: Vec<String> = Vec::new();

  if let Some(raw) = space_url {
    match Url::parse(raw) {
      Ok(u) if !matches!(u.scheme(), "http" | "https") => {
        warn!(target: "quizrelay_backend", url = %raw, scheme = u.scheme(), "Ignoring GRADIO_SPACE_URL without an http(s) scheme")
      }
      Ok(u) => {
        if !matches!(u.path(), "" | "/") {
          urls.push(raw.trim_end_matches('/').to_string());
        }
        bases.push(u.origin().ascii_serialization());
      }
      Err(e) => warn!(target: "quizrelay_backend", url = %raw, error = %e, "Ignoring unparseable GRADIO_SPACE_URL"),
    }
  }
  if let Some(id) = space_id {
    match space_host(id) {
      Some(host) => bases.push(host),
      None => warn!(target: "quizrelay_backend", space_id = %id, "GRADIO_SPACE_ID is not of the form owner/name"),
    }
  }

  for base in &bases {
    for path in PREDICT_PATHS {
      urls.push(format!("{base}{path}"));
    }
  }

  let mut seen = std::collections::HashSet::new();
  urls.retain(|u| seen.insert(u.clone()));

  urls
    .into_iter()
    .flat_map(|url| {
      [PayloadShape::GradioData, PayloadShape::PlainJson]
        .into_iter()
        .map(move |shape| Candidate { url: url.clone(), shape })
    })
    .collect()
}

/// Pull a quiz out of whatever the space answered with:
/// `{quiz:[..]}`, a bare array, or Gradio's `{data:[X]}` where X may itself
/// be a JSON string.
pub fn extract_quiz(body: &str) -> Result<Vec<QuizItem>, String> {
  let value: Value = parse_lenient(body).map_err(|e| format!("unparseable body: {e}"))?;
  let raw = find_quiz_items(&value, 0).ok_or_else(|| "no quiz array in body".to_string())?;
  let items = normalize_quiz(&raw);
  if items.is_empty() {
    Err("quiz array had no usable items".into())
  } else {
    Ok(items)
  }
}

fn find_quiz_items(v: &Value, depth: u8) -> Option<Vec<RawQuizItem>> {
  if depth > 4 {
    return None;
  }
  match v {
    Value::Array(items) if !items.is_empty() && items.iter().all(Value::is_object) => {
      serde_json::from_value(v.clone()).ok()
    }
    Value::Object(map) => {
      if let Some(q) = map.get("quiz") {
        return find_quiz_items(q, depth + 1);
      }
      match map.get("data") {
        Some(Value::Array(data)) => data
          .first()
          .and_then(|first| find_quiz_items(first, depth + 1))
          .or_else(|| find_quiz_items(&Value::Array(data.clone()), depth + 1)),
        _ => None,
      }
    }
    Value::String(s) => parse_lenient::<Value>(s).ok().and_then(|inner| find_quiz_items(&inner, depth + 1)),
    _ => None,
  }
}

impl GradioSpace {
  pub fn from_settings(client: reqwest::Client, settings: &Settings) -> Result<Self, Vec<&'static str>> {
    let candidates = candidates(settings.gradio_space_url.as_deref(), settings.gradio_space_id.as_deref());
    if candidates.is_empty() {
      return Err(vec!["GRADIO_SPACE_URL", "GRADIO_SPACE_ID"]);
    }
    Ok(Self { client, candidates, token: settings.hf_token.clone() })
  }

  /// Try candidates in order; stop at the first success.
  #[instrument(level = "info", skip(self, req), fields(topic = %req.topic, count = req.count, candidates = self.candidates.len()))]
  pub async fn generate(&self, req: &GradioRequest) -> Result<Vec<QuizItem>, UpstreamError> {
    let mut attempts = Vec::new();
    for (idx, cand) in self.candidates.iter().enumerate() {
      match self.try_candidate(cand, req).await {
        Ok(items) => {
          info!(target: "quiz", url = %cand.url, shape = cand.shape.label(), attempt = idx + 1, items = items.len(), "Community space answered");
          return Ok(items);
        }
        Err(reason) => {
          warn!(target: "quiz", url = %cand.url, shape = cand.shape.label(), %reason, "Community space candidate failed");
          attempts.push(format!("{} [{}]: {}", cand.url, cand.shape.label(), reason));
        }
      }
    }
    Err(UpstreamError::Exhausted { attempts })
  }

  async fn try_candidate(&self, cand: &Candidate, req: &GradioRequest) -> Result<Vec<QuizItem>, String> {
    let mut rb = self.client.post(&cand.url)
      .header(CONTENT_TYPE, "application/json")
      .json(&cand.shape.payload(req));
    if let Some(token) = &self.token {
      rb = rb.bearer_auth(token);
    }

    let res = rb.send().await.map_err(|e| e.to_string())?;
    let status = res.status();
    let body = res.text().await.map_err(|e| e.to_string())?;
    if !status.is_success() {
      return Err(format!("HTTP {}: {}", status.as_u16(), trunc_for_log(&body, 120)));
    }
    extract_quiz(&body)
  }
}
