//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Resolving and classifying places
//!   - Content, enhancement, summary and the combined explore flow
//!   - Creating quiz sessions (AI/bank, curated or topic trivia) and driving them
//!   - Gemini key settings

use tracing::{info, instrument};
use uuid::Uuid;

use crate::bank::BankKey;
use crate::classify::{classify, is_quiz_relevant, Category};
use crate::credentials::KeyStore;
use crate::domain::{Difficulty, Place, PlaceContent, PlaceSummary, QuestionSource, QuizQuestion, TriviaCategory};
use crate::error::{AppError, SessionError};
use crate::protocol::{ExploreOut, GeminiStatusOut, PlaceRef, ResolvedPlaceOut, TriviaCategoryOut};
use crate::quiz::{clamp_count, QuizRequest};
use crate::session::QuizSession;
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn resolve_location(state: &AppState, lat: f64, lon: f64) -> ResolvedPlaceOut {
  // Resolution degrades to the fallback place rather than failing.
  let place = state.resolver.resolve_coordinates(lat, lon).await.unwrap_or_else(|_| Place::fallback());
  ResolvedPlaceOut { category: classify(&place.name), quiz_relevant: is_quiz_relevant(&place), place }
}

pub async fn search_locations(state: &AppState, query: &str) -> Result<Vec<Place>, AppError> {
  Ok(state.resolver.search(query).await?)
}

#[instrument(level = "info", skip(state), fields(place = %place.name))]
pub async fn place_content(state: &AppState, place: &PlaceRef) -> Result<PlaceContent, AppError> {
  let category = classify(&place.name);
  Ok(state.content.generate_with_retry(&place.name, category, &place.location_context()).await?)
}

pub async fn enhance_description(state: &AppState, place_name: &str, description: &str) -> Result<String, AppError> {
  if description.trim().is_empty() {
    return Err(AppError::BadRequest("description must not be empty".into()));
  }
  Ok(state.content.enhance_description(place_name, description).await?)
}

pub async fn place_summary(state: &AppState, name: &str) -> PlaceSummary {
  state.wikipedia.summary(name).await
}

/// Content first, then a quiz grounded on that content. Only a content
/// failure fails the whole operation; the quiz falls back to the bank.
#[instrument(level = "info", skip(state), fields(place = %place.name))]
pub async fn explore(state: &AppState, place: &PlaceRef, difficulty: Option<&str>, count: Option<usize>) -> Result<ExploreOut, AppError> {
  let category = classify(&place.name);
  let content = state.content.generate_with_retry(&place.name, category, &place.location_context()).await?;

  let context = format!("{}\n{}", content.description, content.historical_significance);
  let req = QuizRequest {
    place_name: &place.name,
    bank_key: place.bank_key(),
    category,
    difficulty: parse_difficulty(difficulty),
    count: question_count(state, count),
    context: Some(&context),
  };
  let outcome = state.quiz.generate_or_fallback(&req).await;
  Ok(ExploreOut {
    place_name: place.name.clone(),
    category,
    content,
    quiz: outcome.questions,
    quiz_source: outcome.source,
    quiz_notice: outcome.notice,
  })
}

fn parse_difficulty(d: Option<&str>) -> Difficulty {
  d.map(Difficulty::parse_lenient).unwrap_or_default()
}

fn question_count(state: &AppState, requested: Option<usize>) -> usize {
  clamp_count(requested.unwrap_or(state.generation.default_question_count))
}

/// Register a session, generate, then start it if it is still registered.
/// `on_registered` sees the id before generation begins so the caller can
/// cancel by removing it. If this future is dropped mid-generation the
/// unstarted session is removed.
async fn generate_into_session<F>(
  state: &AppState,
  req: QuizRequest<'_>,
  session_id: Option<Uuid>,
  on_registered: F,
) -> Result<QuizSession, AppError>
where
  F: FnOnce(Uuid),
{
  let session = match session_id {
    Some(id) => QuizSession::with_id(id, req.place_name),
    None => QuizSession::new(req.place_name),
  };
  let id = state.register_session(session).await?;
  let pending = state.pending_session(id);
  on_registered(id);

  let outcome = state.quiz.generate_or_fallback(&req).await;
  let source = outcome.source;
  let started = state
    .update_session(id, |s| s.start(outcome.questions, outcome.source, outcome.notice))
    .await;
  match started {
    Ok(session) => {
      pending.release();
      info!(target: "quiz", %id, ?source, "Quiz session ready");
      Ok(session)
    }
    Err(SessionError::NotFound(_)) => {
      pending.release();
      info!(target: "quiz", %id, "Session removed during generation; result discarded");
      Err(SessionError::NotFound(id.to_string()).into())
    }
    Err(e) => {
      state.remove_session(id).await;
      pending.release();
      Err(e.into())
    }
  }
}

/// Start a quiz about a place. A caller-chosen `session_id` lets the caller
/// drop the session while its questions are still being generated.
#[instrument(level = "info", skip(state, on_registered), fields(place = %place.name))]
pub async fn create_quiz<F>(
  state: &AppState,
  place: &PlaceRef,
  difficulty: Option<&str>,
  count: Option<usize>,
  session_id: Option<Uuid>,
  on_registered: F,
) -> Result<QuizSession, AppError>
where
  F: FnOnce(Uuid),
{
  if place.name.trim().is_empty() {
    return Err(AppError::BadRequest("place name must not be empty".into()));
  }
  let req = QuizRequest {
    place_name: &place.name,
    bank_key: place.bank_key(),
    category: classify(&place.name),
    difficulty: parse_difficulty(difficulty),
    count: question_count(state, count),
    context: None,
  };
  generate_into_session(state, req, session_id, on_registered).await
}

/// Quiz for a popular place: its curated questions, or an AI quiz seeded
/// with its description when `ai` is set.
#[instrument(level = "info", skip(state, on_registered))]
pub async fn place_quiz<F>(
  state: &AppState,
  place_id: u32,
  ai: bool,
  session_id: Option<Uuid>,
  on_registered: F,
) -> Result<QuizSession, AppError>
where
  F: FnOnce(Uuid),
{
  let place = state.catalog.by_id(place_id)
    .ok_or_else(|| AppError::NotFound(format!("Unknown place id: {}", place_id)))?;

  if ai {
    let req = QuizRequest {
      place_name: &place.name,
      bank_key: BankKey { name: &place.name, display_name: Some(&place.address), country: None },
      category: classify(&place.name),
      difficulty: Difficulty::Medium,
      count: state.generation.default_question_count,
      context: Some(&place.description),
    };
    return generate_into_session(state, req, session_id, on_registered).await;
  }

  let questions = state.catalog.quiz_for(place_id).unwrap_or_default();
  start_ready_session(state, &place.name, questions, QuestionSource::Curated, session_id, on_registered).await
}

/// Register a session whose questions are already known.
async fn start_ready_session<F>(
  state: &AppState,
  title: &str,
  questions: Vec<QuizQuestion>,
  source: QuestionSource,
  session_id: Option<Uuid>,
  on_registered: F,
) -> Result<QuizSession, AppError>
where
  F: FnOnce(Uuid),
{
  let mut session = match session_id {
    Some(id) => QuizSession::with_id(id, title),
    None => QuizSession::new(title),
  };
  session.start(questions, source, None)?;
  let id = state.register_session(session.clone()).await?;
  on_registered(id);
  Ok(session)
}

pub fn trivia_categories() -> Vec<TriviaCategoryOut> {
  TriviaCategory::ALL.iter().map(|c| TriviaCategoryOut::from(*c)).collect()
}

/// Place-independent topic round from the built-in trivia banks.
#[instrument(level = "info", skip(state, on_registered))]
pub async fn start_trivia<F>(
  state: &AppState,
  category: Option<TriviaCategory>,
  count: Option<usize>,
  on_registered: F,
) -> Result<QuizSession, AppError>
where
  F: FnOnce(Uuid),
{
  let category = category.unwrap_or_default();
  let questions = state.bank.trivia(category, question_count(state, count));
  let title = format!("{} Trivia", category.display_name());
  let session = start_ready_session(state, &title, questions, QuestionSource::StaticBank, None, on_registered).await?;
  info!(target: "quiz", id = %session.id, category = category.display_name(), n = session.questions().len(), "Trivia session started");
  Ok(session)
}

#[derive(Clone, Copy, Debug)]
pub enum SessionOp {
  Answer { question: usize, option: usize },
  Next,
  Previous,
  Finish,
  Retake,
}

#[instrument(level = "debug", skip(state))]
pub async fn session_op(state: &AppState, id: Uuid, op: SessionOp) -> Result<QuizSession, AppError> {
  let session = state
    .update_session(id, |s| match op {
      SessionOp::Answer { question, option } => s.select_answer(question, option),
      SessionOp::Next => s.next(),
      SessionOp::Previous => s.previous(),
      SessionOp::Finish => s.finish(),
      SessionOp::Retake => s.retake(),
    })
    .await?;
  Ok(session)
}

pub async fn get_session(state: &AppState, id: Uuid) -> Result<QuizSession, AppError> {
  state.get_session(id).await.ok_or_else(|| SessionError::NotFound(id.to_string()).into())
}

pub async fn drop_session(state: &AppState, id: Uuid) -> Result<(), AppError> {
  if state.remove_session(id).await {
    Ok(())
  } else {
    Err(SessionError::NotFound(id.to_string()).into())
  }
}

pub fn classify_name(name: &str) -> Category {
  classify(name)
}

pub fn gemini_status(state: &AppState) -> GeminiStatusOut {
  GeminiStatusOut { configured: state.keys.is_configured(), message: state.keys.status_message() }
}

/// Malformed keys are rejected and leave the current key untouched.
pub fn set_gemini_key(state: &AppState, key: &str) -> Result<GeminiStatusOut, AppError> {
  if !KeyStore::is_valid_key(key.trim()) {
    return Err(AppError::BadRequest("Invalid Gemini API key format".into()));
  }
  state.keys.set(key);
  Ok(gemini_status(state))
}

pub fn clear_gemini_key(state: &AppState) -> GeminiStatusOut {
  state.keys.clear();
  gemini_status(state)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::PipelineError;
  use crate::session::QuizState;
  use crate::state::tests::test_state;
  use crate::testing::ScriptedAi;

  const CONTENT: &str = r#"{"description":"Seat of the Peshwas.","historicalSignificance":"Built 1732.",
    "interestingFacts":[],"bestTimeToVisit":"Winter","nearbyAttractions":[]}"#;
  const QUIZ: &str = r#"{"questions":[{"question":"Who?","options":["a","b","c","d"],"correctAnswerIndex":2}]}"#;

  fn pune() -> PlaceRef {
    PlaceRef { name: "Kothrud".into(), display_name: Some("Kothrud, Pune, Maharashtra, India".into()), country: Some("India".into()) }
  }

  #[tokio::test]
  async fn resolve_degrades_and_classifies() {
    let state = test_state(ScriptedAi::unconfigured());
    let out = resolve_location(&state, 0.0, 0.0).await;
    assert_eq!(out.place, Place::fallback());
    assert_eq!(out.category, Category::Location);
    assert!(out.quiz_relevant);
  }

  #[tokio::test]
  async fn unconfigured_quiz_uses_regional_bank() {
    let state = test_state(ScriptedAi::unconfigured());
    let s = create_quiz(&state, &pune(), None, Some(3), None, |_| {}).await.unwrap();
    assert_eq!(s.state(), QuizState::InProgress);
    assert_eq!(s.source(), Some(QuestionSource::StaticBank));
    assert_eq!(s.questions().len(), 3);
    assert!(state.get_session(s.id).await.is_some());
  }

  #[tokio::test]
  async fn explore_passes_content_as_quiz_context() {
    let ai = ScriptedAi::new(vec![Ok(CONTENT.into()), Ok(QUIZ.into())]);
    let out = explore(&test_state(ai.clone()), &pune(), Some("hard"), None).await.unwrap();
    assert_eq!(out.content.description, "Seat of the Peshwas.");
    assert_eq!(out.quiz.len(), 1);
    assert_eq!(out.quiz_source, QuestionSource::Ai);
    assert!(ai.prompt(1).contains("Use this additional context: Seat of the Peshwas.\nBuilt 1732."));
  }

  #[tokio::test]
  async fn explore_falls_back_to_bank_when_ai_quiz_is_invalid() {
    let bad = r#"{"questions":[{"question":"Q","options":["a","b"],"correctAnswerIndex":0}]}"#;
    let ai = ScriptedAi::new(vec![Ok(CONTENT.into()), Ok(bad.into()), Ok(bad.into()), Ok(bad.into())]);
    let out = explore(&test_state(ai.clone()), &pune(), None, Some(3)).await.unwrap();
    assert_eq!(ai.calls(), 4);
    assert_eq!(out.content.description, "Seat of the Peshwas.");
    assert_eq!(out.quiz_source, QuestionSource::StaticBank);
    assert_eq!(out.quiz.len(), 3);
    assert!(out.quiz.iter().all(|q| q.is_well_formed()));
    assert!(out.quiz.iter().any(|q| q.question_text.contains("Poona")));
    assert!(out.quiz_notice.unwrap().contains("Invalid number of options"));
  }

  #[tokio::test]
  async fn explore_fails_when_content_cannot_be_generated() {
    let err = explore(&test_state(ScriptedAi::unconfigured()), &pune(), None, None).await.unwrap_err();
    assert_eq!(err, AppError::Pipeline(PipelineError::NotConfigured));
  }

  #[tokio::test(start_paused = true)]
  async fn deleting_during_generation_discards_the_result() {
    let ai = ScriptedAi::stalling(1, vec![Ok(QUIZ.into())]);
    let state = test_state(ai);
    let task = {
      let state = state.clone();
      tokio::spawn(async move { create_quiz(&state, &pune(), None, None, None, |_| {}).await })
    };
    let id = loop {
      if let Some(id) = state.sessions.read().await.keys().next().copied() {
        break id;
      }
      tokio::task::yield_now().await;
    };
    assert!(state.remove_session(id).await);

    let out = task.await.unwrap();
    assert_eq!(out.unwrap_err(), AppError::Session(SessionError::NotFound(id.to_string())));
    assert!(state.sessions.read().await.is_empty());
  }

  #[tokio::test(start_paused = true)]
  async fn abandoned_generation_leaves_no_session_behind() {
    let state = test_state(ScriptedAi::stalling(1, vec![Ok(QUIZ.into())]));
    let task = {
      let state = state.clone();
      tokio::spawn(async move { create_quiz(&state, &pune(), None, None, None, |_| {}).await })
    };
    while state.sessions.read().await.is_empty() {
      tokio::task::yield_now().await;
    }
    task.abort();
    assert!(task.await.unwrap_err().is_cancelled());
    for _ in 0..4 {
      tokio::task::yield_now().await;
    }
    assert!(state.sessions.read().await.is_empty());
  }

  #[tokio::test]
  async fn caller_chosen_ids_are_used_and_not_reused() {
    let state = test_state(ScriptedAi::unconfigured());
    let id = Uuid::new_v4();
    let s = create_quiz(&state, &pune(), None, Some(2), Some(id), |_| {}).await.unwrap();
    assert_eq!(s.id, id);
    let err = create_quiz(&state, &pune(), None, Some(2), Some(id), |_| {}).await.unwrap_err();
    assert_eq!(err, AppError::Session(SessionError::Duplicate(id.to_string())));
  }

  #[tokio::test]
  async fn trivia_rounds_by_category() {
    let state = test_state(ScriptedAi::unconfigured());
    assert_eq!(trivia_categories().len(), 3);

    let s = start_trivia(&state, Some(TriviaCategory::History), Some(3), |_| {}).await.unwrap();
    assert_eq!(s.place_name, "History Trivia");
    assert_eq!(s.state(), QuizState::InProgress);
    assert_eq!(s.questions().len(), 3);
    assert_eq!(s.questions()[0].options[s.questions()[0].correct_option_index], "1945");

    let s = start_trivia(&state, None, None, |_| {}).await.unwrap();
    assert_eq!(s.place_name, "Geography Trivia");
    assert_eq!(s.questions().len(), 5);
    for (q, question) in s.questions().iter().enumerate() {
      session_op(&state, s.id, SessionOp::Answer { question: q, option: question.correct_option_index }).await.unwrap();
    }
    assert_eq!(session_op(&state, s.id, SessionOp::Finish).await.unwrap().score(), 5);
  }

  #[tokio::test]
  async fn curated_place_quiz_and_session_ops() {
    let state = test_state(ScriptedAi::unconfigured());
    let mut seen = None;
    let s = place_quiz(&state, 1, false, None, |id| seen = Some(id)).await.unwrap();
    assert_eq!(seen, Some(s.id));
    assert_eq!(s.source(), Some(QuestionSource::Curated));

    for (q, question) in s.questions().iter().enumerate() {
      session_op(&state, s.id, SessionOp::Answer { question: q, option: question.correct_option_index }).await.unwrap();
    }
    let done = session_op(&state, s.id, SessionOp::Finish).await.unwrap();
    assert_eq!(done.score(), s.questions().len());

    let err = session_op(&state, s.id, SessionOp::Next).await.unwrap_err();
    assert!(matches!(err, AppError::Session(SessionError::InvalidState { .. })));
    assert!(matches!(place_quiz(&state, 999, false, None, |_| {}).await, Err(AppError::NotFound(_))));
  }

  #[tokio::test]
  async fn key_settings() {
    let state = test_state(ScriptedAi::unconfigured());
    assert!(!gemini_status(&state).configured);
    assert!(set_gemini_key(&state, "nope").is_err());
    assert!(set_gemini_key(&state, "AIzaSyA1234567890abcdefghij").unwrap().configured);
    assert!(!clear_gemini_key(&state).configured);
  }
}
