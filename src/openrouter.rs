//! Minimal OpenRouter (OpenAI-compatible) chat.completions client.
//!
//! Calls are instrumented and log model names, latencies and token usage (not contents).
//! We never log the API key.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::config::Settings;
use crate::error::UpstreamError;

#[derive(Clone)]
pub struct OpenRouter {
  pub client: reqwest::Client,
  pub api_key: String,
  pub api_url: String,
}

/// Sampling knobs for one completion.
#[derive(Clone, Copy, Debug)]
pub struct ChatOptions {
  pub temperature: f32,
  pub max_tokens: Option<u32>,
  pub json_mode: bool,
}

impl OpenRouter {
  /// Build the client when both OPENROUTER_API_KEY and OPENROUTER_API_URL are present.
  pub fn from_settings(client: reqwest::Client, settings: &Settings) -> Result<Self, Vec<&'static str>> {
    match (&settings.openrouter_api_key, &settings.openrouter_api_url) {
      (Some(key), Some(url)) => Ok(Self { client, api_key: key.clone(), api_url: url.clone() }),
      (key, url) => {
        let mut missing = Vec::new();
        if key.is_none() { missing.push("OPENROUTER_API_KEY"); }
        if url.is_none() { missing.push("OPENROUTER_API_URL"); }
        Err(missing)
      }
    }
  }

  /// Single-turn chat completion returning the first choice's content.
  #[instrument(level = "info", skip(self, user), fields(%model, user_len = user.len(), json_mode = opts.json_mode))]
  pub async fn chat(&self, model: &str, user: &str, opts: ChatOptions) -> Result<String, UpstreamError> {
    let req = ChatCompletionRequest {
      model: model.to_string(),
      messages: vec![ChatMessageReq { role: "user".into(), content: user.into() }],
      temperature: opts.temperature,
      max_tokens: opts.max_tokens,
      response_format: opts.json_mode.then(|| ResponseFormat { r#type: "json_object".into() }),
    };

    let start = std::time::Instant::now();
    let res = self.client.post(&self.api_url)
      .header(USER_AGENT, "quizrelay-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await?;

    if !res.status().is_success() {
      let status = res.status().as_u16();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_openrouter_error(&body).unwrap_or(body);
      return Err(UpstreamError::Status { status, body: msg });
    }

    let body: ChatCompletionResponse = res.json().await?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenRouter usage");
    }
    let text = body.choices.into_iter().next()
      .and_then(|c| c.message.content)
      .map(|t| t.trim().to_string())
      .filter(|t| !t.is_empty())
      .ok_or(UpstreamError::Empty)?;

    info!(elapsed = ?start.elapsed(), text_len = text.len(), "OpenRouter response received");
    Ok(text)
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  max_tokens: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_format: Option<ResponseFormat>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }
#[derive(Serialize)]
struct ResponseFormat { #[serde(rename = "type")] r#type: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  #[serde(default)] choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from an OpenAI-style error body.
fn extract_openrouter_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  match serde_json::from_str::<EWrap>(body) {
    Ok(w) => Some(w.error.message),
    Err(_) => None,
  }
}
