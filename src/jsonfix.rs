//! Repairs for the almost-JSON that generative models like to return.
//!
//! One repair pass only: strip code fences, try to parse, and if that fails
//! sanitize stray escapes and trailing commas and try exactly once more.

use std::sync::OnceLock;

use regex::Regex;
use serde::de::DeserializeOwned;

fn fence_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r"```json\n?|```").expect("static regex"))
}

fn trailing_comma_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r",\s*([}\]])").expect("static regex"))
}

/// Remove ```` ```json ```` / ```` ``` ```` markers anywhere in the text and trim.
pub fn strip_code_fences(s: &str) -> String {
  fence_re().replace_all(s, "").trim().to_string()
}

/// Drop backslashes that do not start a valid JSON escape and remove
/// trailing commas before `}` / `]`.
pub fn sanitize(s: &str) -> String {
  let mut unescaped = String::with_capacity(s.len());
  let mut chars = s.chars().peekable();
  while let Some(ch) = chars.next() {
    if ch != '\\' {
      unescaped.push(ch);
      continue;
    }
    match chars.peek() {
      Some(&next @ ('"' | '\\' | '/' | 'b' | 'f' | 'n' | 'r' | 't' | 'u')) => {
        unescaped.push('\\');
        unescaped.push(next);
        chars.next();
      }
      _ => {}
    }
  }
  trailing_comma_re().replace_all(&unescaped, "$1").into_owned()
}

/// Parse model output into `T`, tolerating code fences and one round of
/// sanitization. The error of the final attempt is returned.
pub fn parse_lenient<T: DeserializeOwned>(raw: &str) -> Result<T, serde_json::Error> {
  let stripped = strip_code_fences(raw);
  match serde_json::from_str::<T>(&stripped) {
    Ok(v) => Ok(v),
    Err(first) => {
      tracing::debug!(target: "quiz", error = %first, "JSON parse failed; retrying after sanitize");
      serde_json::from_str::<T>(&sanitize(&stripped))
    }
  }
}
