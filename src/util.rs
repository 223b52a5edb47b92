//! Small utility helpers used across modules.

use serde::{Deserialize, Deserializer};

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
/// Braces that do not form a known `{key}` are left untouched, so JSON
/// examples inside prompt templates survive.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// True if the char sits in the basic CJK Unified Ideographs block used for
/// topic language detection (U+4E00..=U+9FA5).
pub fn is_chinese_char(ch: char) -> bool {
  ('\u{4E00}'..='\u{9FA5}').contains(&ch)
}

/// True if any character of the text is Chinese.
pub fn is_chinese(text: &str) -> bool {
  text.chars().any(is_chinese_char)
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge request/response payloads.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  match s.char_indices().nth(max) {
    None => s.to_string(),
    Some((cut, _)) => format!("{}… ({} bytes total)", &s[..cut], s.len()),
  }
}

/// Accepts `3`, `"3"` or `" 3 "` and yields `Some(3)`. Empty strings and
/// `null` yield `None`; anything else is a deserialization error.
pub fn de_opt_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
  D: Deserializer<'de>,
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum Count {
    Num(u64),
    Text(String),
  }

  match Option::<Count>::deserialize(deserializer)? {
    None => Ok(None),
    Some(Count::Num(n)) => u32::try_from(n).map(Some).map_err(serde::de::Error::custom),
    Some(Count::Text(s)) => {
      let t = s.trim();
      if t.is_empty() {
        return Ok(None);
      }
      t.parse::<u32>().map(Some).map_err(serde::de::Error::custom)
    }
  }
}

/// Accepts a string or a number and yields it as a trimmed string.
/// Empty strings and `null` yield `None`.
pub fn de_opt_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
  D: Deserializer<'de>,
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum Text {
    Num(serde_json::Number),
    Str(String),
  }

  Ok(match Option::<Text>::deserialize(deserializer)? {
    None => None,
    Some(Text::Num(n)) => Some(n.to_string()),
    Some(Text::Str(s)) => {
      let t = s.trim();
      if t.is_empty() { None } else { Some(t.to_string()) }
    }
  })
}
