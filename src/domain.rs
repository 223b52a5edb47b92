//! Domain models used by the backend: quiz items, chat messages, language.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::util::is_chinese;

/// One multiple-choice question. `correct_answer` is always one of `options`
/// once it has gone through [`normalize_quiz`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizItem {
  pub question: String,
  pub options: Vec<String>,
  #[serde(rename = "correctAnswer")]
  pub correct_answer: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub hint: Option<String>,
}

impl QuizItem {
  pub fn is_consistent(&self) -> bool {
    self.options.contains(&self.correct_answer)
  }
}

/// Quiz item as models actually return it: any field may be missing or of
/// the wrong JSON type.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawQuizItem {
  #[serde(default)] pub question: Option<Value>,
  #[serde(default)] pub options: Option<Value>,
  #[serde(default, rename = "correctAnswer", alias = "correct_answer", alias = "answer")]
  pub correct_answer: Option<Value>,
  #[serde(default)] pub hint: Option<Value>,
}

/// Envelope `{ "quiz": [...] }` requested from generative providers.
#[derive(Debug, Deserialize)]
pub struct RawQuiz {
  pub quiz: Vec<RawQuizItem>,
}

fn value_to_text(v: &Value) -> String {
  match v {
    Value::Null => String::new(),
    Value::String(s) => s.clone(),
    other => other.to_string(),
  }
}

impl RawQuizItem {
  /// Coerce fields to strings and pin `correct_answer` to the exact text of
  /// the matching option. Returns `None` when no option matches, when the
  /// question is blank or when fewer than two options remain.
  pub fn normalize(&self) -> Option<QuizItem> {
    let question = self.question.as_ref().map(value_to_text).unwrap_or_default().trim().to_string();
    let options: Vec<String> = match &self.options {
      Some(Value::Array(items)) => items.iter().map(value_to_text).collect(),
      _ => Vec::new(),
    };
    let answer = self.correct_answer.as_ref().map(value_to_text).unwrap_or_default();
    let hint = self
      .hint
      .as_ref()
      .map(value_to_text)
      .map(|h| h.trim().to_string())
      .filter(|h| !h.is_empty());

    if question.is_empty() || options.len() < 2 {
      return None;
    }

    let matched = options
      .iter()
      .find(|o| **o == answer)
      .or_else(|| options.iter().find(|o| o.trim() == answer.trim()))
      .or_else(|| options.iter().find(|o| o.trim().to_lowercase() == answer.trim().to_lowercase()))?
      .clone();

    Some(QuizItem { question, options, correct_answer: matched, hint })
  }
}

/// Normalize every raw item, dropping (and logging) the ones that violate
/// the `correctAnswer ∈ options` invariant.
pub fn normalize_quiz(raw: &[RawQuizItem]) -> Vec<QuizItem> {
  raw
    .iter()
    .enumerate()
    .filter_map(|(idx, item)| {
      let out = item.normalize();
      if out.is_none() {
        warn!(target: "quiz", idx, "Dropping quiz item: blank question, too few options or answer not among options");
      }
      out
    })
    .collect()
}

/// Language a quiz (and the tutor's replies) should be written in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
  #[serde(rename = "中文", alias = "zh", alias = "Chinese")]
  Chinese,
  #[default]
  #[serde(rename = "English", alias = "en")]
  English,
}

impl Language {
  pub fn detect(topic: &str) -> Self {
    if is_chinese(topic) { Language::Chinese } else { Language::English }
  }

  pub fn label(self) -> &'static str {
    match self {
      Language::Chinese => "中文",
      Language::English => "English",
    }
  }

  /// User-facing message after quiz generation has failed for good.
  pub fn generation_failed_message(self) -> &'static str {
    match self {
      Language::Chinese => "生成题目失败，请重试。",
      Language::English => "Failed to generate quiz. Please try again.",
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  User,
  Assistant,
}

impl Role {
  pub fn upper(self) -> &'static str {
    match self {
      Role::User => "USER",
      Role::Assistant => "ASSISTANT",
    }
  }
}

/// One turn of the "ask AI" conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
  pub role: Role,
  pub content: String,
}
