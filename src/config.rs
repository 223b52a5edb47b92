//! Runtime settings (environment variables) and prompt templates (optional TOML).
//!
//! See `Settings` for the variables read at startup and `Prompts` for the
//! placeholders each template understands.

use std::{str::FromStr, time::Duration};

use serde::Deserialize;
use tracing::{error, info, warn};

pub const DEFAULT_TRIVIA_URL: &str = "https://opentdb.com/api.php";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Everything read from the environment. Blank values count as unset.
#[derive(Clone, Debug, Default)]
pub struct Settings {
  pub port: Option<u16>,
  pub google_api_key: Option<String>,
  pub gemini_api_url: Option<String>,
  pub openrouter_api_key: Option<String>,
  pub openrouter_api_url: Option<String>,
  pub gradio_space_url: Option<String>,
  pub gradio_space_id: Option<String>,
  pub hf_token: Option<String>,
  pub trivia_api_url: Option<String>,
  pub upstream_timeout_secs: Option<u64>,
}

fn env_opt(key: &str) -> Option<String> {
  std::env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Parse a set value; an unparseable one is reported and treated as unset.
fn parse_setting<T>(key: &str, raw: Option<String>) -> Option<T>
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  let raw = raw?;
  match raw.parse() {
    Ok(v) => Some(v),
    Err(e) => {
      warn!(target: "quizrelay_backend", key, value = %raw, error = %e, "Ignoring unparseable setting; using default");
      None
    }
  }
}

impl Settings {
  pub fn from_env() -> Self {
    Self {
      port: parse_setting("PORT", env_opt("PORT")),
      google_api_key: env_opt("GOOGLE_API_KEY"),
      gemini_api_url: env_opt("GEMINI_API_URL"),
      openrouter_api_key: env_opt("OPENROUTER_API_KEY"),
      openrouter_api_url: env_opt("OPENROUTER_API_URL"),
      gradio_space_url: env_opt("GRADIO_SPACE_URL"),
      gradio_space_id: env_opt("GRADIO_SPACE_ID"),
      hf_token: env_opt("HF_TOKEN"),
      trivia_api_url: env_opt("TRIVIA_API_URL"),
      upstream_timeout_secs: parse_setting("UPSTREAM_TIMEOUT_SECS", env_opt("UPSTREAM_TIMEOUT_SECS")),
    }
  }

  pub fn port(&self) -> u16 {
    self.port.unwrap_or(3000)
  }

  pub fn trivia_url(&self) -> &str {
    self.trivia_api_url.as_deref().unwrap_or(DEFAULT_TRIVIA_URL)
  }

  pub fn upstream_timeout(&self) -> Duration {
    Duration::from_secs(self.upstream_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS).max(1))
  }
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct QuizConfig {
  #[serde(default)]
  pub prompts: Prompts,
}

/// Prompt templates sent to the generative providers. Any subset can be
/// overridden in the `[prompts]` table of the TOML file.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  /// Generative API quiz. `{topic}` `{count}` `{difficulty}` `{language}`
  pub quiz_template: String,
  /// OpenRouter quiz. `{topic}` `{count}` `{difficulty}` `{language}`
  pub custom_quiz_template: String,
  /// Tutor preamble. `{question}` `{options}` `{selected}`
  pub tutor_base_template: String,
  pub tutor_hint_template: String,
  pub tutor_reveal_template: String,
  /// `{a}` `{b}`
  pub tutor_contrast_template: String,
  /// `{history}`
  pub tutor_followup_template: String,
  pub tutor_chinese_suffix: String,
  /// `{age}` `{gender}` `{interests}` `{location}` `{language}`
  pub recommend_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      quiz_template: r#"Generate a quiz based on the following requirements:
Topic: {topic}
Number of questions: {count}
Difficulty: {difficulty}
Language: {language}

Return the result in JSON format with the following structure:
{
  "quiz": [
    {
      "question": "Question content",
      "options": ["Option A", "Option B", "Option C", "Option D"],
      "correctAnswer": "Correct answer",
      "hint": "Short nudge that does not reveal the answer"
    }
  ]
}
Ensure the value of "correctAnswer" exactly matches one of the values in "options"."#
        .into(),
      custom_quiz_template: r#"Return only valid JSON. Create a {language} quiz as a JSON object with this exact shape:
{
  "quiz": [
    {
      "question": "string",
      "options": ["A","B","C","D"],
      "correctAnswer": "one of options",
      "hint": "concise, non-spoiler nudge that helps reasoning without revealing the answer"
    }
  ]
}
Topic: {topic}
Questions: {count}
Difficulty: {difficulty}
Rules:
- Each "options" must be plausible and mutually exclusive.
- "correctAnswer" must exactly match one item in "options".
- "hint" should guide thinking paths or key concept, avoid giving the exact answer.
- Avoid code fences or explanations; output JSON only."#
        .into(),
      tutor_base_template: "You are a tutor for multiple-choice quizzes. Provide exactly three concise points, each preceded by a hyphen. Each point should be very short (no more than 12 words). Keep overall length ~50% of a normal hint. Do NOT reveal the correct answer unless the user explicitly requests it. Ensure each point is on a new line.\nQuestion: {question}\nOptions: {options}\nUser selected: {selected}".into(),
      tutor_hint_template: "Mode: hint\nProvide three short, non-spoiler hints that guide toward identifying the correct option. Keep each bullet <=12 words. Do not state or imply the answer.".into(),
      tutor_reveal_template: "Mode: answer\nGive the correct option on the first line, then one-sentence justification, then a short confidence (0-1). Keep each line very short.".into(),
      tutor_contrast_template: "Mode: contrast\nCompare \"{a}\" vs \"{b}\" in three very short bullets:\n1) Key fact that supports {a}\n2) Key fact that supports {b}\n3) One-line neutral leaning or invite to reveal answer (do not state the answer unless asked).".into(),
      tutor_followup_template: "Mode: followup\nFollow the user's history: {history}\nRespond with three concise, non-spoiler hints, each <=12 words, aimed to resolve uncertainty.".into(),
      tutor_chinese_suffix: "Reply in Simplified Chinese.".into(),
      recommend_template: "You are a helpful assistant that recommends quiz topics.\nUser info:\nAge: {age}\nGender: {gender}\nInterests: {interests}\nLocation: {location}\nPlease generate 5 suitable quiz topics for this user, written in {language}. Return only a JSON array of strings.".into(),
    }
  }
}

/// Attempt to load `QuizConfig` from QUIZ_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_quiz_config_from_env() -> Option<QuizConfig> {
  let path = env_opt("QUIZ_CONFIG_PATH")?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<QuizConfig>(&s) {
      Ok(cfg) => {
        info!(target: "quizrelay_backend", %path, "Loaded quiz config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "quizrelay_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "quizrelay_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
