//! One play-through of a quiz: current question, selection, score and the
//! tutor conversation for the question on screen.

use crate::domain::{ChatMessage, Language, QuizItem, Role};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnswerOutcome {
  pub correct: bool,
  pub correct_answer: String,
  pub score: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Advance {
  Question(usize),
  Finished { score: u32, total: usize },
}

#[derive(Clone, Debug, Default)]
pub struct QuizSession {
  items: Vec<QuizItem>,
  index: usize,
  selected: Option<String>,
  score: u32,
  finished: bool,
  language: Language,
  chat: Vec<ChatMessage>,
}

impl QuizSession {
  pub fn start(&mut self, items: Vec<QuizItem>, language: Language) {
    *self = Self { items, language, ..Self::default() };
  }

  pub fn reset(&mut self) {
    *self = Self::default();
  }

  pub fn is_active(&self) -> bool {
    !self.items.is_empty() && !self.finished
  }

  pub fn language(&self) -> Language {
    self.language
  }

  pub fn index(&self) -> usize {
    self.index
  }

  pub fn total(&self) -> usize {
    self.items.len()
  }

  pub fn score(&self) -> u32 {
    self.score
  }

  pub fn selected(&self) -> Option<&str> {
    self.selected.as_deref()
  }

  pub fn current(&self) -> Option<&QuizItem> {
    if self.finished { None } else { self.items.get(self.index) }
  }

  /// Lock in an answer for the current question. Only the first selection
  /// per question counts; later ones return `None`.
  pub fn select(&mut self, option: &str) -> Option<AnswerOutcome> {
    if self.selected.is_some() {
      return None;
    }
    let item = self.current()?;
    let correct = option == item.correct_answer;
    let correct_answer = item.correct_answer.clone();
    self.selected = Some(option.to_string());
    if correct {
      self.score += 1;
    }
    Some(AnswerOutcome { correct, correct_answer, score: self.score })
  }

  /// Move on. Clears the selection and the tutor conversation.
  pub fn advance(&mut self) -> Advance {
    self.selected = None;
    self.chat.clear();
    if !self.finished && self.index + 1 < self.items.len() {
      self.index += 1;
      Advance::Question(self.index)
    } else {
      self.finished = true;
      Advance::Finished { score: self.score, total: self.items.len() }
    }
  }

  pub fn push_chat(&mut self, role: Role, content: impl Into<String>) {
    self.chat.push(ChatMessage { role, content: content.into() });
  }

  pub fn clear_chat(&mut self) {
    self.chat.clear();
  }

  pub fn chat(&self) -> &[ChatMessage] {
    &self.chat
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn item(q: &str, answer: &str) -> QuizItem {
    QuizItem {
      question: q.into(),
      options: vec!["a".into(), "b".into(), "c".into()],
      correct_answer: answer.into(),
      hint: None,
    }
  }

  #[test]
  fn plays_through_and_scores() {
    let mut s = QuizSession::default();
    s.start(vec![item("Q1", "a"), item("Q2", "b"), item("Q3", "c")], Language::English);
    assert!(s.is_active());

    let r = s.select("a").unwrap();
    assert!(r.correct);
    assert_eq!(r.score, 1);
    assert_eq!(s.select("b"), None, "second selection is ignored");
    assert_eq!(s.advance(), Advance::Question(1));

    let r = s.select("a").unwrap();
    assert!(!r.correct);
    assert_eq!(r.correct_answer, "b");
    assert_eq!(s.advance(), Advance::Question(2));

    s.select("c");
    assert_eq!(s.advance(), Advance::Finished { score: 2, total: 3 });
    assert!(!s.is_active());
    assert!(s.current().is_none());
    assert_eq!(s.select("c"), None);
  }

  #[test]
  fn advancing_clears_chat_and_selection() {
    let mut s = QuizSession::default();
    s.start(vec![item("Q1", "a"), item("Q2", "b")], Language::Chinese);
    s.push_chat(Role::User, "hint please");
    s.select("a");
    s.advance();
    assert!(s.chat().is_empty());
    assert_eq!(s.selected(), None);
    assert_eq!(s.language(), Language::Chinese);
  }

  #[test]
  fn start_and_reset_wipe_previous_state() {
    let mut s = QuizSession::default();
    s.start(vec![item("Q1", "a")], Language::English);
    s.select("a");
    s.start(vec![item("Q9", "b")], Language::English);
    assert_eq!(s.score(), 0);
    assert_eq!(s.index(), 0);
    assert_eq!(s.current().unwrap().question, "Q9");
    s.reset();
    assert_eq!(s.total(), 0);
    assert!(!s.is_active());
  }
}
