//! "Ask AI" tutor: mode selection, A-or-B contrast detection and prompt assembly.

use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;

use crate::config::Prompts;
use crate::domain::{ChatMessage, Language, Role};
use crate::util::fill_template;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssistantMode {
  Initial,
  Reveal,
  #[default]
  #[serde(other)]
  Followup,
}

/// Everything the tutor gets to see about the current question.
#[derive(Clone, Debug, Default)]
pub struct TutorContext<'a> {
  pub mode: AssistantMode,
  pub question: &'a str,
  pub options: &'a [String],
  pub selected: Option<&'a str>,
  pub messages: &'a [ChatMessage],
  pub language: Language,
}

fn or_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| {
    Regex::new(r"(?i)([A-Za-z0-9'’&\-\s]+?)\s+or\s+([A-Za-z0-9'’&\-\s]+)\??").expect("static regex")
  })
}

fn line_dash_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r"(?m)^- ").expect("static regex"))
}

/// Newest user message of the form "A or B" where both sides name options.
pub fn detect_contrast(messages: &[ChatMessage], options: &[String]) -> Option<(String, String)> {
  let lowered: Vec<String> = options.iter().map(|o| o.to_lowercase()).collect();
  messages
    .iter()
    .rev()
    .filter(|m| m.role == Role::User)
    .find_map(|m| {
      let caps = or_re().captures(&m.content)?;
      let a = caps.get(1)?.as_str().trim().to_string();
      let b = caps.get(2)?.as_str().trim().to_string();
      (lowered.contains(&a.to_lowercase()) && lowered.contains(&b.to_lowercase())).then_some((a, b))
    })
}

pub fn build_prompt(prompts: &Prompts, ctx: &TutorContext<'_>) -> String {
  let options = ctx.options.join(" | ");
  let base = fill_template(
    &prompts.tutor_base_template,
    &[("question", ctx.question), ("options", &options), ("selected", ctx.selected.unwrap_or("N/A"))],
  );

  let mode_block = match ctx.mode {
    AssistantMode::Initial => prompts.tutor_hint_template.clone(),
    AssistantMode::Reveal => prompts.tutor_reveal_template.clone(),
    AssistantMode::Followup => match detect_contrast(ctx.messages, ctx.options) {
      Some((a, b)) => fill_template(&prompts.tutor_contrast_template, &[("a", &a), ("b", &b)]),
      None => {
        let history = ctx
          .messages
          .iter()
          .map(|m| format!("{}: {}", m.role.upper(), m.content))
          .collect::<Vec<_>>()
          .join("\n");
        fill_template(&prompts.tutor_followup_template, &[("history", &history)])
      }
    },
  };

  let mut prompt = format!("{base}\n{mode_block}");
  if ctx.language == Language::Chinese {
    prompt.push('\n');
    prompt.push_str(&prompts.tutor_chinese_suffix);
  }
  prompt
}

/// Drop the leading "- " bullet marker from each line.
pub fn clean_reply(text: &str) -> String {
  let cleaned = line_dash_re().replace_all(text.trim(), "").into_owned();
  if cleaned.trim().is_empty() { "No response".into() } else { cleaned }
}
