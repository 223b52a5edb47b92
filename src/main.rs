//! QuizRelay · Quiz App Backend
//!
//! - Axum HTTP + WebSocket API
//! - Quiz generation relayed to a generative API, OpenRouter, a community
//!   Gradio space or the public trivia database
//! - "Ask AI" tutor and topic recommendations
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT                  : u16 (default 3000)
//!   GOOGLE_API_KEY        : generative API key (quiz, tutor, recommendations)
//!   GEMINI_API_URL        : generative API endpoint
//!   OPENROUTER_API_KEY    : enables the custom-model quiz endpoint
//!   OPENROUTER_API_URL    : OpenRouter chat completions endpoint
//!   GRADIO_SPACE_URL      : community space base URL or full predict URL
//!   GRADIO_SPACE_ID       : "owner/name", guessed as https://owner-name.hf.space
//!   HF_TOKEN              : bearer token for private spaces
//!   TRIVIA_API_URL        : default "https://opentdb.com/api.php"
//!   UPSTREAM_TIMEOUT_SECS : per-request upstream timeout (default 30)
//!   QUIZ_CONFIG_PATH      : path to TOML config (prompt overrides)
//!   LOG_LEVEL             : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT            : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod config;
mod error;
mod jsonfix;
mod gemini;
mod openrouter;
mod trivia;
mod gradio;
mod assistant;
mod retry;
mod session;
mod protocol;
mod state;
mod logic;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Build shared application state (settings, prompts, upstream clients).
  let state = Arc::new(AppState::from_env()?);
  let addr = SocketAddr::from(([0, 0, 0, 0], state.settings.port()));

  // Build the HTTP router with routes, CORS and tracing layers.
  let app = build_router(state);

  let listener = TcpListener::bind(addr).await?;
  info!(target: "quizrelay_backend", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  info!(target: "quizrelay_backend", "Server stopped");
  Ok(())
}

/// Resolves on Ctrl-C; in-flight requests are allowed to finish.
async fn shutdown_signal() {
  match tokio::signal::ctrl_c().await {
    Ok(()) => info!(target: "quizrelay_backend", "Shutdown signal received"),
    Err(e) => warn!(target: "quizrelay_backend", error = %e, "Could not listen for Ctrl-C; shutting down"),
  }
}
