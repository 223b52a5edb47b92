//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - quiz generation from each provider (validated, normalized items)
//!   - the "ask AI" tutor reply
//!   - topic recommendations

use rand::thread_rng;
use serde::Deserialize;
use tracing::{debug, info, instrument};

use crate::assistant::{build_prompt, clean_reply, TutorContext};
use crate::domain::{normalize_quiz, Language, QuizItem, RawQuiz};
use crate::error::{ApiError, UpstreamError};
use crate::gradio::GradioRequest;
use crate::jsonfix::{parse_lenient, strip_code_fences};
use crate::openrouter::ChatOptions;
use crate::protocol::{AssistantIn, QuizIn, TriviaIn, UserProfile};
use crate::state::AppState;
use crate::trivia::{to_quiz_item, TriviaQuery, MAX_QUESTIONS};
use crate::util::{fill_template, trunc_for_log};

const MISSING_PARAMS: &str = "Missing required parameters";
const GENERATE_FAILED: &str = "Failed to generate quiz";

/// Required fields of a quiz request, with the language resolved.
struct QuizParams {
  topic: String,
  count: u32,
  difficulty: String,
  language: Language,
}

fn quiz_params(req: &QuizIn) -> Result<QuizParams, ApiError> {
  match (&req.quiz_topic, req.number_of_questions, &req.difficulty) {
    (Some(topic), Some(count), Some(difficulty)) if count > 0 => Ok(QuizParams {
      topic: topic.clone(),
      count,
      difficulty: difficulty.clone(),
      language: req.language.unwrap_or_else(|| Language::detect(topic)),
    }),
    _ => Err(ApiError::bad_request(MISSING_PARAMS)),
  }
}

/// Parse model text (with one repair pass) and keep only consistent items.
fn quiz_from_model_text(text: &str) -> Result<Vec<QuizItem>, UpstreamError> {
  let raw: RawQuiz = parse_lenient(text).map_err(|e| {
    debug!(target: "quiz", raw = %trunc_for_log(text, 200), "Unparseable quiz JSON");
    UpstreamError::Parse(e.to_string())
  })?;
  let items = normalize_quiz(&raw.quiz);
  if items.is_empty() {
    return Err(UpstreamError::Malformed);
  }
  Ok(items)
}

#[instrument(level = "info", skip(state, req), fields(topic = ?req.quiz_topic, count = ?req.number_of_questions))]
pub async fn generate_quiz(state: &AppState, req: &QuizIn) -> Result<Vec<QuizItem>, ApiError> {
  let p = quiz_params(req)?;
  let gemini = state.gemini().map_err(ApiError::upstream(GENERATE_FAILED))?;
  let count = p.count.to_string();
  let prompt = fill_template(
    &state.prompts.quiz_template,
    &[("topic", &p.topic), ("count", &count), ("difficulty", &p.difficulty), ("language", p.language.label())],
  );

  let text = gemini.generate_text(&prompt, true).await.map_err(ApiError::upstream(GENERATE_FAILED))?;
  let items = quiz_from_model_text(&text).map_err(ApiError::upstream("Failed to parse quiz response"))?;
  info!(target: "quiz", provider = "gemini", items = items.len(), requested = p.count, "Quiz generated");
  Ok(items)
}

#[instrument(level = "info", skip(state, req), fields(topic = ?req.quiz_topic, model = ?req.model))]
pub async fn custom_quiz(state: &AppState, req: &QuizIn) -> Result<Vec<QuizItem>, ApiError> {
  let p = quiz_params(req)?;
  let (Some(model), Some(language)) = (&req.model, req.language) else {
    return Err(ApiError::bad_request(MISSING_PARAMS));
  };
  let openrouter = state.openrouter().map_err(ApiError::upstream(GENERATE_FAILED))?;
  let count = p.count.to_string();
  let prompt = fill_template(
    &state.prompts.custom_quiz_template,
    &[("topic", &p.topic), ("count", &count), ("difficulty", &p.difficulty), ("language", language.label())],
  );

  let opts = ChatOptions { temperature: 0.7, max_tokens: Some(2000), json_mode: true };
  let text = openrouter.chat(model, &prompt, opts).await.map_err(ApiError::upstream(GENERATE_FAILED))?;
  let items = quiz_from_model_text(&text)
    .map_err(ApiError::upstream("Failed to parse quiz response from OpenRouter"))?;
  info!(target: "quiz", provider = "openrouter", %model, items = items.len(), requested = p.count, "Quiz generated");
  Ok(items)
}

#[instrument(level = "info", skip(state, req), fields(topic = ?req.quiz_topic))]
pub async fn gradio_quiz(state: &AppState, req: &QuizIn) -> Result<Vec<QuizItem>, ApiError> {
  let p = quiz_params(req)?;
  let space = state.gradio().map_err(ApiError::upstream(GENERATE_FAILED))?;
  let request = GradioRequest { topic: p.topic, count: p.count, difficulty: p.difficulty, language: p.language };
  let items = space.generate(&request).await.map_err(ApiError::upstream(GENERATE_FAILED))?;
  info!(target: "quiz", provider = "gradio", items = items.len(), requested = p.count, "Quiz generated");
  Ok(items)
}

#[instrument(level = "info", skip(state, req), fields(category = ?req.category, count = ?req.num_questions, difficulty = ?req.difficulty))]
pub async fn trivia_quiz(state: &AppState, req: &TriviaIn) -> Result<Vec<QuizItem>, ApiError> {
  let amount = req.num_questions.ok_or_else(|| ApiError::bad_request(MISSING_PARAMS))?;
  if !(1..=MAX_QUESTIONS).contains(&amount) {
    return Err(ApiError::bad_request(format!("numQuestions must be between 1 and {MAX_QUESTIONS}")));
  }
  let query = TriviaQuery {
    amount,
    category: req.category.clone(),
    difficulty: req.difficulty.as_ref().map(|d| d.to_lowercase()),
  };

  let questions = state.trivia.fetch(&query).await.map_err(ApiError::upstream("Failed to fetch quiz"))?;
  let mut rng = thread_rng();
  let items: Vec<QuizItem> = questions.into_iter().map(|q| to_quiz_item(q, &mut rng)).collect();
  info!(target: "quiz", provider = "trivia", items = items.len(), requested = amount, "Quiz generated");
  Ok(items)
}

#[instrument(level = "info", skip(state, req), fields(mode = ?req.mode, history = req.messages.len()))]
pub async fn assistant_reply(state: &AppState, req: &AssistantIn) -> Result<String, ApiError> {
  const FAILED: &str = "AI Assistant failed";
  let gemini = state.gemini().map_err(ApiError::upstream(FAILED))?;
  let ctx = TutorContext {
    mode: req.mode,
    question: &req.question,
    options: &req.options,
    selected: req.selected_answer.as_deref(),
    messages: &req.messages,
    language: req.language.unwrap_or_else(|| Language::detect(&req.question)),
  };
  let prompt = build_prompt(&state.prompts, &ctx);
  let text = gemini.generate_text(&prompt, false).await.map_err(ApiError::upstream(FAILED))?;
  Ok(clean_reply(&text))
}

/// Topics as the model returns them: a bare array or `{ "topics": [...] }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum TopicsReply {
  List(Vec<String>),
  Wrapped { topics: Vec<String> },
}

/// Unparseable model output yields an empty list, not an error.
pub fn parse_topics(text: &str) -> Vec<String> {
  match serde_json::from_str::<TopicsReply>(&strip_code_fences(text)) {
    Ok(TopicsReply::List(t)) | Ok(TopicsReply::Wrapped { topics: t }) => {
      t.into_iter().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect()
    }
    Err(e) => {
      debug!(target: "quiz", error = %e, raw = %trunc_for_log(text, 200), "Topic list unparseable; returning none");
      Vec::new()
    }
  }
}

#[instrument(level = "info", skip(state, profile), fields(interests = profile.interests.len()))]
pub async fn recommend_topics(state: &AppState, profile: &UserProfile) -> Result<Vec<String>, ApiError> {
  const FAILED: &str = "Failed to generate recommendations";
  let gemini = state.gemini().map_err(ApiError::upstream(FAILED))?;
  let interests = if profile.interests.is_empty() { "none".to_string() } else { profile.interests.join(", ") };
  let language = profile.language.unwrap_or_default();
  let prompt = fill_template(
    &state.prompts.recommend_template,
    &[
      ("age", profile.age.as_deref().unwrap_or("unknown")),
      ("gender", profile.gender.as_deref().unwrap_or("unknown")),
      ("interests", &interests),
      ("location", profile.location.as_deref().unwrap_or("unknown")),
      ("language", language.label()),
    ],
  );
  let text = gemini.generate_text(&prompt, true).await.map_err(ApiError::upstream(FAILED))?;
  Ok(parse_topics(&text))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn params_require_topic_count_difficulty() {
    let ok = QuizIn {
      quiz_topic: Some("历史".into()),
      number_of_questions: Some(3),
      difficulty: Some("easy".into()),
      ..QuizIn::default()
    };
    let p = quiz_params(&ok).unwrap();
    assert_eq!(p.language, Language::Chinese);

    let zero = QuizIn { number_of_questions: Some(0), ..ok.clone() };
    assert!(matches!(quiz_params(&zero), Err(ApiError::BadRequest(_))));
    let no_topic = QuizIn { quiz_topic: None, ..ok };
    assert!(matches!(quiz_params(&no_topic), Err(ApiError::BadRequest(_))));
  }

  #[test]
  fn model_text_with_fences_and_trailing_commas_parses() {
    let text = "```json\n{\"quiz\":[{\"question\":\"Q\",\"options\":[\"a\",\"b\",],\"correctAnswer\":\"a\",},]}\n```";
    let items = quiz_from_model_text(text).unwrap();
    assert_eq!(items.len(), 1);
    assert!(items[0].is_consistent());
  }

  #[test]
  fn model_text_without_consistent_items_is_malformed() {
    let text = r#"{"quiz":[{"question":"Q","options":["a","b"],"correctAnswer":"c"}]}"#;
    assert!(matches!(quiz_from_model_text(text), Err(UpstreamError::Malformed)));
    assert!(matches!(quiz_from_model_text("nope"), Err(UpstreamError::Parse(_))));
  }

  #[test]
  fn topics_accept_both_shapes() {
    assert_eq!(parse_topics("```json\n[\"Space\", \" Jazz \"]\n```"), vec!["Space", "Jazz"]);
    assert_eq!(parse_topics(r#"{"topics":["Rust"]}"#), vec!["Rust"]);
    assert!(parse_topics("Here are some topics: ...").is_empty());
  }
}
