//! Quiz attempt state machine.
//!
//! `NotStarted -> InProgress -> Completed`, and `Completed -> InProgress` on
//! retake. The "answer before moving on" rule belongs to callers; the machine
//! only exposes `is_current_answered`.

use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::{QuestionSource, QuizQuestion};
use crate::error::SessionError;

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QuizState {
  NotStarted,
  InProgress,
  Completed,
}

impl QuizState {
  pub fn as_str(&self) -> &'static str {
    match self {
      QuizState::NotStarted => "not_started",
      QuizState::InProgress => "in_progress",
      QuizState::Completed => "completed",
    }
  }
}

#[derive(Clone, Debug)]
pub struct QuizSession {
  pub id: Uuid,
  pub place_name: String,
  questions: Vec<QuizQuestion>,
  selected_answers: Vec<Option<usize>>,
  current_index: usize,
  score: usize,
  state: QuizState,
  source: Option<QuestionSource>,
  notice: Option<String>,
}

impl QuizSession {
  pub fn new(place_name: impl Into<String>) -> Self {
    Self::with_id(Uuid::new_v4(), place_name)
  }

  /// A session under a caller-chosen id, so it can be addressed before its
  /// questions exist.
  pub fn with_id(id: Uuid, place_name: impl Into<String>) -> Self {
    Self {
      id,
      place_name: place_name.into(),
      questions: Vec::new(),
      selected_answers: Vec::new(),
      current_index: 0,
      score: 0,
      state: QuizState::NotStarted,
      source: None,
      notice: None,
    }
  }

  pub fn state(&self) -> QuizState { self.state }
  pub fn questions(&self) -> &[QuizQuestion] { &self.questions }
  pub fn selected_answers(&self) -> &[Option<usize>] { &self.selected_answers }
  pub fn current_index(&self) -> usize { self.current_index }
  pub fn score(&self) -> usize { self.score }
  pub fn source(&self) -> Option<QuestionSource> { self.source }
  pub fn notice(&self) -> Option<&str> { self.notice.as_deref() }

  fn require(&self, op: &'static str, want: QuizState) -> Result<(), SessionError> {
    if self.state == want {
      Ok(())
    } else {
      Err(SessionError::InvalidState { op, state: self.state.as_str() })
    }
  }

  pub fn start(&mut self, questions: Vec<QuizQuestion>, source: QuestionSource, notice: Option<String>) -> Result<(), SessionError> {
    self.require("start", QuizState::NotStarted)?;
    if questions.is_empty() {
      return Err(SessionError::NoQuestions);
    }
    self.selected_answers = vec![None; questions.len()];
    self.questions = questions;
    self.current_index = 0;
    self.score = 0;
    self.source = Some(source);
    self.notice = notice;
    self.state = QuizState::InProgress;
    info!(target: "quiz", id = %self.id, n = self.questions.len(), ?source, "Quiz started");
    Ok(())
  }

  /// Out-of-range question or option indices are ignored.
  pub fn select_answer(&mut self, question: usize, option: usize) -> Result<(), SessionError> {
    self.require("select_answer", QuizState::InProgress)?;
    match self.questions.get(question) {
      Some(q) if option < q.options.len() => self.selected_answers[question] = Some(option),
      _ => debug!(target: "quiz", id = %self.id, question, option, "Ignoring out-of-range answer"),
    }
    Ok(())
  }

  /// Advances; on the last question this finishes the quiz.
  pub fn next(&mut self) -> Result<(), SessionError> {
    self.require("next", QuizState::InProgress)?;
    if self.current_index + 1 >= self.questions.len() {
      return self.finish();
    }
    self.current_index += 1;
    Ok(())
  }

  pub fn previous(&mut self) -> Result<(), SessionError> {
    self.require("previous", QuizState::InProgress)?;
    self.current_index = self.current_index.saturating_sub(1);
    Ok(())
  }

  pub fn finish(&mut self) -> Result<(), SessionError> {
    self.require("finish", QuizState::InProgress)?;
    self.score = self.questions.iter()
      .zip(&self.selected_answers)
      .filter(|(q, a)| **a == Some(q.correct_option_index))
      .count();
    self.state = QuizState::Completed;
    info!(target: "quiz", id = %self.id, score = self.score, total = self.questions.len(), "Quiz completed");
    Ok(())
  }

  /// Same questions, answers cleared.
  pub fn retake(&mut self) -> Result<(), SessionError> {
    self.require("retake", QuizState::Completed)?;
    self.selected_answers = vec![None; self.questions.len()];
    self.current_index = 0;
    self.score = 0;
    self.state = QuizState::InProgress;
    Ok(())
  }

  pub fn is_current_answered(&self) -> bool {
    matches!(self.selected_answers.get(self.current_index), Some(Some(_)))
  }
}
