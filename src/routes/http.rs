//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs basic result info; failures become
//! `{error, details}` bodies through `ApiError`.

use std::sync::Arc;
use axum::{extract::State, Json, response::IntoResponse};
use tracing::{info, instrument};

use crate::error::{ApiError, ApiJson};
use crate::logic::*;
use crate::protocol::*;
use crate::state::AppState;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state, body), fields(mode = ?body.mode, options = body.options.len()))]
pub async fn http_post_ai_assistant(
  State(state): State<Arc<AppState>>,
  ApiJson(body): ApiJson<AssistantIn>,
) -> Result<Json<AssistantOut>, ApiError> {
  let message = assistant_reply(&state, &body).await?;
  info!(target: "quiz", reply_len = message.len(), "HTTP tutor reply served");
  Ok(Json(AssistantOut { message }))
}

#[instrument(level = "info", skip(state, body), fields(topic = ?body.quiz_topic, model = ?body.model))]
pub async fn http_post_custom_quiz(
  State(state): State<Arc<AppState>>,
  ApiJson(body): ApiJson<QuizIn>,
) -> Result<Json<QuizOut>, ApiError> {
  let quiz = custom_quiz(&state, &body).await?;
  Ok(Json(QuizOut { quiz }))
}

#[instrument(level = "info", skip(state, body), fields(topic = ?body.quiz_topic))]
pub async fn http_post_generate_quiz(
  State(state): State<Arc<AppState>>,
  ApiJson(body): ApiJson<QuizIn>,
) -> Result<Json<QuizOut>, ApiError> {
  let quiz = generate_quiz(&state, &body).await?;
  Ok(Json(QuizOut { quiz }))
}

#[instrument(level = "info", skip(state, body), fields(topic = ?body.quiz_topic))]
pub async fn http_post_gradio_quiz(
  State(state): State<Arc<AppState>>,
  ApiJson(body): ApiJson<QuizIn>,
) -> Result<Json<QuizOut>, ApiError> {
  let quiz = gradio_quiz(&state, &body).await?;
  Ok(Json(QuizOut { quiz }))
}

#[instrument(level = "info", skip(state, body), fields(category = ?body.category, count = ?body.num_questions))]
pub async fn http_post_trivia_quiz(
  State(state): State<Arc<AppState>>,
  ApiJson(body): ApiJson<TriviaIn>,
) -> Result<Json<QuizOut>, ApiError> {
  let quiz = trivia_quiz(&state, &body).await?;
  Ok(Json(QuizOut { quiz }))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_recommend_topic(
  State(state): State<Arc<AppState>>,
  ApiJson(body): ApiJson<UserProfile>,
) -> Result<Json<TopicsOut>, ApiError> {
  let topics = recommend_topics(&state, &body).await?;
  info!(target: "quiz", count = topics.len(), "HTTP topic recommendations served");
  Ok(Json(TopicsOut { topics }))
}
