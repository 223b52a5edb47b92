//! Minimal client for the generative-language `generateContent` API.
//!
//! The key travels as a `?key=` query parameter; it is never logged.

use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::config::Settings;
use crate::error::UpstreamError;
use crate::util::trunc_for_log;

#[derive(Clone)]
pub struct Gemini {
  pub client: reqwest::Client,
  pub api_key: String,
  pub api_url: String,
}

impl Gemini {
  /// Build the client when both GOOGLE_API_KEY and GEMINI_API_URL are present.
  pub fn from_settings(client: reqwest::Client, settings: &Settings) -> Result<Self, Vec<&'static str>> {
    match (&settings.google_api_key, &settings.gemini_api_url) {
      (Some(key), Some(url)) => Ok(Self { client, api_key: key.clone(), api_url: url.clone() }),
      (key, url) => {
        let mut missing = Vec::new();
        if key.is_none() { missing.push("GOOGLE_API_KEY"); }
        if url.is_none() { missing.push("GEMINI_API_URL"); }
        Err(missing)
      }
    }
  }

  /// Single-prompt completion. With `json_mode` the API is asked for
  /// `application/json`, which it honors most of the time.
  #[instrument(level = "info", skip(self, prompt), fields(prompt_len = prompt.len(), json_mode = json_mode))]
  pub async fn generate_text(&self, prompt: &str, json_mode: bool) -> Result<String, UpstreamError> {
    let req = GenerateRequest {
      contents: vec![Content { parts: vec![Part { text: prompt.to_string() }] }],
      generation_config: json_mode.then(|| GenerationConfig { response_mime_type: "application/json".into() }),
    };

    let start = std::time::Instant::now();
    let res = self.client.post(&self.api_url)
      .query(&[("key", self.api_key.as_str())])
      .header(USER_AGENT, "quizrelay-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .json(&req).send().await?;

    if !res.status().is_success() {
      let status = res.status().as_u16();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_gemini_error(&body).unwrap_or(body);
      return Err(UpstreamError::Status { status, body: msg });
    }

    let body: GenerateResponse = res.json().await?;
    let text = body.candidates.into_iter()
      .next()
      .and_then(|c| c.content)
      .and_then(|c| c.parts.into_iter().next())
      .map(|p| p.text)
      .ok_or(UpstreamError::Empty)?;

    info!(elapsed = ?start.elapsed(), text_len = text.len(), preview = %trunc_for_log(&text, 80), "Generative API response received");
    Ok(text)
  }
}

// --- DTOs ---

#[derive(Serialize)]
struct GenerateRequest {
  contents: Vec<Content>,
  #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
  generation_config: Option<GenerationConfig>,
}
#[derive(Serialize, Deserialize)]
struct Content { #[serde(default)] parts: Vec<Part> }
#[derive(Serialize, Deserialize)]
struct Part { #[serde(default)] text: String }
#[derive(Serialize)]
struct GenerationConfig { #[serde(rename = "responseMimeType")] response_mime_type: String }

#[derive(Deserialize)]
struct GenerateResponse {
  #[serde(default)] candidates: Vec<Candidate>,
}
#[derive(Deserialize)]
struct Candidate { #[serde(default)] content: Option<Content> }

/// Try to extract a clean error message from an API error body.
fn extract_gemini_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}
