//! WebSocket upgrade + quiz session loop. Each connection owns one
//! `QuizSession`; every client message is parsed as JSON, applied to the
//! session (calling core logic where needed) and answered with one JSON message.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::assistant::AssistantMode;
use crate::domain::{Language, QuizItem, Role};
use crate::error::{ApiError, UpstreamError};
use crate::logic::*;
use crate::protocol::{AssistantIn, ClientWsMessage, Provider, QuizIn, ServerWsMessage, TriviaIn};
use crate::retry::{retry_fixed, GENERATE_ATTEMPTS, GENERATE_DELAY};
use crate::session::{Advance, QuizSession};
use crate::state::AppState;

#[instrument(level = "info", skip(ws, state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "quizrelay_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state), fields(session = %Uuid::new_v4()))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "quizrelay_backend", "WebSocket connected");
  let mut session = QuizSession::default();
  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        // Parse, dispatch, serialize response.
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target: "quizrelay_backend", "WS received: {:?}", &incoming);
            handle_client_ws(incoming, &state, &mut session).await
          }
          Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
        };

        let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "quizrelay_backend", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "quizrelay_backend", "WebSocket disconnected");
}

fn question_msg(session: &QuizSession) -> ServerWsMessage {
  match session.current() {
    Some(item) => ServerWsMessage::Question {
      index: session.index(),
      total: session.total(),
      question: item.question.clone(),
      options: item.options.clone(),
      hint: item.hint.clone(),
    },
    None => no_quiz(),
  }
}

fn no_quiz() -> ServerWsMessage {
  ServerWsMessage::Error { message: "No quiz in progress.".into() }
}

async fn generate_for(state: &AppState, provider: Provider, quiz: &QuizIn, trivia: &TriviaIn) -> Result<Vec<QuizItem>, ApiError> {
  match provider {
    Provider::Gemini => generate_quiz(state, quiz).await,
    Provider::OpenRouter => custom_quiz(state, quiz).await,
    Provider::Gradio => gradio_quiz(state, quiz).await,
    Provider::Trivia => trivia_quiz(state, trivia).await,
  }
}

/// Ask the tutor about the current question, keeping the conversation in the session.
async fn tutor(state: &AppState, session: &mut QuizSession, mode: AssistantMode, text: Option<String>) -> Result<String, ApiError> {
  let item = session.current().cloned().ok_or_else(|| ApiError::bad_request("No quiz in progress."))?;
  if mode == AssistantMode::Initial {
    session.clear_chat();
  }
  if let Some(t) = text.filter(|t| !t.trim().is_empty()) {
    session.push_chat(Role::User, t);
  }
  let req = AssistantIn {
    mode,
    question: item.question,
    options: item.options,
    selected_answer: session.selected().map(str::to_string),
    messages: session.chat().to_vec(),
    language: Some(session.language()),
  };
  let reply = assistant_reply(state, &req).await?;
  session.push_chat(Role::Assistant, reply.clone());
  Ok(reply)
}

#[instrument(level = "info", skip(state, session))]
async fn handle_client_ws(msg: ClientWsMessage, state: &AppState, session: &mut QuizSession) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::Generate { provider, topic, number_of_questions, difficulty, model, category } => {
      let language = Language::detect(&topic);
      let quiz_req = QuizIn {
        quiz_topic: Some(topic.trim().to_string()).filter(|t| !t.is_empty()),
        number_of_questions,
        difficulty: difficulty.clone(),
        language: Some(language),
        model,
      };
      let trivia_req = TriviaIn { category, num_questions: number_of_questions, difficulty };
      let (quiz_ref, trivia_ref) = (&quiz_req, &trivia_req);

      let result = retry_fixed(
        GENERATE_ATTEMPTS,
        GENERATE_DELAY,
        |e: &ApiError| {
          !matches!(e, ApiError::BadRequest(_) | ApiError::Upstream { source: UpstreamError::NotConfigured(_), .. })
        },
        move |_| generate_for(state, provider, quiz_ref, trivia_ref),
      )
      .await;

      match result {
        Ok(items) if !items.is_empty() => {
          info!(target: "quiz", ?provider, items = items.len(), "WS quiz started");
          session.start(items, language);
          question_msg(session)
        }
        Ok(_) => ServerWsMessage::Error { message: language.generation_failed_message().into() },
        Err(ApiError::BadRequest(message)) => ServerWsMessage::Error { message },
        Err(e) => {
          warn!(target: "quiz", ?provider, error = %e, "WS quiz generation gave up");
          ServerWsMessage::Error { message: language.generation_failed_message().into() }
        }
      }
    }

    ClientWsMessage::Answer { option } => match session.select(&option) {
      Some(outcome) => {
        info!(target: "quiz", index = session.index(), correct = outcome.correct, score = outcome.score, "WS answer checked");
        ServerWsMessage::AnswerResult {
          correct: outcome.correct,
          correct_answer: outcome.correct_answer,
          score: outcome.score,
        }
      }
      None if session.is_active() => ServerWsMessage::Error { message: "Answer already submitted.".into() },
      None => no_quiz(),
    },

    ClientWsMessage::Next => {
      if !session.is_active() {
        return no_quiz();
      }
      match session.advance() {
        Advance::Question(_) => question_msg(session),
        Advance::Finished { score, total } => {
          info!(target: "quiz", score, total, "WS quiz finished");
          ServerWsMessage::Results { score, total }
        }
      }
    }

    ClientWsMessage::Hint => {
      let Some(item) = session.current() else { return no_quiz() };
      if let Some(hint) = item.hint.clone() {
        return ServerWsMessage::Hint { text: hint };
      }
      match tutor(state, session, AssistantMode::Initial, None).await {
        Ok(text) => ServerWsMessage::Hint { text },
        Err(e) => ServerWsMessage::Error { message: e.user_message() },
      }
    }

    ClientWsMessage::AskAi { text, mode } => {
      let mode = mode.unwrap_or(AssistantMode::Followup);
      match tutor(state, session, mode, text).await {
        Ok(text) => ServerWsMessage::AiReply { text },
        Err(e) => ServerWsMessage::Error { message: e.user_message() },
      }
    }

    ClientWsMessage::Recommend { profile } => match recommend_topics(state, &profile).await {
      Ok(topics) => ServerWsMessage::Topics { topics },
      Err(e) => ServerWsMessage::Error { message: e.user_message() },
    },

    ClientWsMessage::Reset => {
      session.reset();
      ServerWsMessage::Reset
    }
  }
}
