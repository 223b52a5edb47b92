//! Error types: `UpstreamError` for provider clients, `ApiError` for the HTTP
//! boundary. Every failure is scoped to one request and rendered as
//! `{ "error": ..., "details": ... }` with status 400 or 500.

use axum::{
  extract::{rejection::JsonRejection, FromRequest, Request},
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UpstreamError {
  #[error("Environment variables not set: {}", .0.join(", "))]
  NotConfigured(Vec<&'static str>),

  #[error("request failed: {0}")]
  Transport(#[from] reqwest::Error),

  #[error("API error: {status}")]
  Status { status: u16, body: String },

  #[error("No data received from API")]
  Empty,

  #[error("Failed to parse response JSON: {0}")]
  Parse(String),

  #[error("Malformed quiz JSON")]
  Malformed,

  #[error("No questions found")]
  NoQuestions,

  #[error("All {} candidate endpoints failed", .attempts.len())]
  Exhausted { attempts: Vec<String> },
}

#[derive(Debug, Error)]
pub enum ApiError {
  #[error("{0}")]
  BadRequest(String),

  #[error("{context}: {source}")]
  Upstream {
    context: &'static str,
    #[source]
    source: UpstreamError,
  },
}

impl ApiError {
  pub fn bad_request(msg: impl Into<String>) -> Self {
    ApiError::BadRequest(msg.into())
  }

  pub fn upstream(context: &'static str) -> impl FnOnce(UpstreamError) -> Self {
    move |source| ApiError::Upstream { context, source }
  }

  /// Text shown to an interactive user (WebSocket session).
  pub fn user_message(&self) -> String {
    self.body().error
  }

  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Upstream { source: UpstreamError::NoQuestions, .. } => StatusCode::BAD_REQUEST,
      ApiError::Upstream { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn body(&self) -> ErrorBody {
    match self {
      ApiError::BadRequest(msg) => ErrorBody { error: msg.clone(), details: None },
      ApiError::Upstream { context, source } => match source {
        UpstreamError::NotConfigured(_) | UpstreamError::NoQuestions | UpstreamError::Malformed => {
          ErrorBody { error: source.to_string(), details: None }
        }
        UpstreamError::Status { status, body } => ErrorBody {
          error: format!("API error: {status}"),
          details: Some(body.clone()),
        },
        UpstreamError::Exhausted { attempts } => ErrorBody {
          error: (*context).to_string(),
          details: Some(attempts.join("; ")),
        },
        other => ErrorBody { error: (*context).to_string(), details: Some(other.to_string()) },
      },
    }
  }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
  pub error: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub details: Option<String>,
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!(target: "quizrelay_backend", error = %self, "Request failed");
    } else {
      tracing::warn!(target: "quizrelay_backend", error = %self, "Request rejected");
    }
    (status, Json(self.body())).into_response()
  }
}

/// `Json` extractor whose rejection is rendered in the same
/// `{error, details}` shape (status 400) as every other failure.
pub struct ApiJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
  T: DeserializeOwned,
  S: Send + Sync,
{
  type Rejection = Response;

  async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
    match Json::<T>::from_request(req, state).await {
      Ok(Json(v)) => Ok(ApiJson(v)),
      Err(rejection) => Err(invalid_body(rejection)),
    }
  }
}

fn invalid_body(rejection: JsonRejection) -> Response {
  let body = ErrorBody {
    error: "Invalid request body".into(),
    details: Some(rejection.body_text()),
  };
  (StatusCode::BAD_REQUEST, Json(body)).into_response()
}
