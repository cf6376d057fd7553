//! Quiz generation: Gemini first, the static bank when Gemini can't deliver.
//!
//! Every AI quiz is shape-checked (non-empty, 4 options, index in range)
//! before it is accepted. A malformed quiz counts as a failed attempt, so it is
//! retried and eventually replaced by bank questions; it never reaches a session.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::bank::{BankKey, StaticQuestionBank};
use crate::classify::Category;
use crate::config::{GenerationSettings, Prompts};
use crate::domain::{Difficulty, QuestionSource, QuizQuestion, OPTIONS_PER_QUESTION};
use crate::error::PipelineError;
use crate::gemini::{generate_within, TextGenerator};
use crate::retry::RetryPolicy;
use crate::util::{fill_template, strip_code_fences, trunc_for_log};

pub const MIN_QUESTIONS: usize = 1;
pub const MAX_QUESTIONS: usize = 10;

pub fn clamp_count(count: usize) -> usize {
  count.clamp(MIN_QUESTIONS, MAX_QUESTIONS)
}

/// Everything needed to produce one quiz.
#[derive(Clone, Debug)]
pub struct QuizRequest<'a> {
  pub place_name: &'a str,
  /// What the bank regions are matched on.
  pub bank_key: BankKey<'a>,
  pub category: Category,
  pub difficulty: Difficulty,
  pub count: usize,
  pub context: Option<&'a str>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct QuizOutcome {
  pub questions: Vec<QuizQuestion>,
  pub source: QuestionSource,
  /// Why the bank was used, if it was.
  pub notice: Option<String>,
}

#[derive(Clone)]
pub struct QuizGenerator {
  ai: Arc<dyn TextGenerator>,
  prompts: Arc<Prompts>,
  bank: Arc<StaticQuestionBank>,
  timeout: Duration,
  retry: RetryPolicy,
}

impl QuizGenerator {
  pub fn new(ai: Arc<dyn TextGenerator>, prompts: Arc<Prompts>, bank: Arc<StaticQuestionBank>, settings: &GenerationSettings) -> Self {
    Self { ai, prompts, bank, timeout: settings.timeout(), retry: settings.retry_policy() }
  }

  pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
    self.retry = retry;
    self
  }

  /// One AI attempt, validated.
  #[instrument(level = "info", skip(self, existing_context), fields(has_context = existing_context.is_some()))]
  pub async fn generate(
    &self,
    place_name: &str,
    category: Category,
    difficulty: Difficulty,
    count: usize,
    existing_context: Option<&str>,
  ) -> Result<Vec<QuizQuestion>, PipelineError> {
    let context_block = existing_context
      .filter(|c| !c.trim().is_empty())
      .map(|c| fill_template(&self.prompts.quiz_context_template, &[("context", c)]))
      .unwrap_or_default();
    let count_s = count.to_string();
    let prompt = fill_template(&self.prompts.quiz_template, &[
      ("count", count_s.as_str()),
      ("difficulty", difficulty.as_str()),
      ("place_name", place_name),
      ("category", category.as_str()),
      ("context_block", context_block.as_str()),
    ]);
    let raw = generate_within(self.ai.as_ref(), &prompt, self.timeout).await?;
    debug!(target: "quiz", raw = %trunc_for_log(&raw, 300), "Quiz response");
    let mut questions = parse_quiz(&raw)?;
    questions.truncate(count);
    Ok(questions)
  }

  /// AI only, under the retry policy. Errors once every attempt has failed.
  pub async fn generate_with_retry(&self, req: &QuizRequest<'_>) -> Result<Vec<QuizQuestion>, PipelineError> {
    let count = clamp_count(req.count);
    self.retry
      .run("quiz", move |_| self.generate(req.place_name, req.category, req.difficulty, count, req.context))
      .await
  }

  /// Never fails: unconfigured goes straight to the bank, otherwise the bank
  /// is used once the retry budget is spent.
  #[instrument(level = "info", skip(self, req), fields(place = %req.place_name, count = req.count))]
  pub async fn generate_or_fallback(&self, req: &QuizRequest<'_>) -> QuizOutcome {
    let count = clamp_count(req.count);
    if !self.ai.is_configured() {
      info!(target: "quiz", "Gemini not configured; serving bank questions");
      return self.from_bank(&req.bank_key, count, PipelineError::NotConfigured.to_string());
    }

    match self.generate_with_retry(req).await {
      Ok(questions) => {
        info!(target: "quiz", n = questions.len(), "AI quiz accepted");
        QuizOutcome { questions, source: QuestionSource::Ai, notice: None }
      }
      Err(e) => {
        warn!(target: "quiz", error = %e, "AI quiz unavailable; serving bank questions");
        self.from_bank(&req.bank_key, count, format!("Using offline questions: {}", e))
      }
    }
  }

  fn from_bank(&self, bank_key: &BankKey<'_>, count: usize, notice: String) -> QuizOutcome {
    let (region, questions) = self.bank.select(bank_key, count);
    debug!(target: "quiz", region, n = questions.len(), "Bank selection");
    QuizOutcome { questions, source: QuestionSource::StaticBank, notice: Some(notice) }
  }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQuiz {
  #[serde(default)] questions: Vec<RawQuestion>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQuestion {
  question: String,
  #[serde(default)] options: Vec<String>,
  // Signed so that a negative index is a validation failure, not a decode one.
  correct_answer_index: i64,
  #[serde(default)] explanation: String,
  #[serde(default)] difficulty: String,
}

/// Decode and shape-check a model quiz.
pub fn parse_quiz(raw: &str) -> Result<Vec<QuizQuestion>, PipelineError> {
  let cleaned = strip_code_fences(raw);
  let quiz: RawQuiz = serde_json::from_str(&cleaned).map_err(|e| PipelineError::Decode(e.to_string()))?;
  if quiz.questions.is_empty() {
    return Err(PipelineError::Validation("No questions generated".into()));
  }
  quiz.questions.into_iter().map(|q| {
    if q.options.len() != OPTIONS_PER_QUESTION {
      return Err(PipelineError::Validation(format!("Invalid number of options for question: {}", q.question)));
    }
    let idx = usize::try_from(q.correct_answer_index).ok().filter(|i| *i < OPTIONS_PER_QUESTION)
      .ok_or_else(|| PipelineError::Validation(format!("Invalid correct answer index for question: {}", q.question)))?;
    Ok(QuizQuestion {
      question_text: q.question,
      options: q.options,
      correct_option_index: idx,
      explanation: q.explanation,
      difficulty: Difficulty::parse_lenient(&q.difficulty),
    })
  }).collect()
}
