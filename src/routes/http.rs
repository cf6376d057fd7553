//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented; failures render as `{ "error": message }`.

use std::sync::Arc;
use axum::{
  extract::{Path, Query, State},
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::{AppError, PipelineError, SessionError};
use crate::logic::{self, SessionOp};
use crate::protocol::*;
use crate::session::QuizSession;
use crate::state::AppState;

impl IntoResponse for AppError {
  fn into_response(self) -> Response {
    let status = match &self {
      AppError::Pipeline(PipelineError::NotConfigured) => StatusCode::SERVICE_UNAVAILABLE,
      AppError::Pipeline(PipelineError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
      AppError::Pipeline(PipelineError::LocationUnavailable(_)) => StatusCode::NOT_FOUND,
      AppError::Pipeline(_) => StatusCode::BAD_GATEWAY,
      AppError::Session(SessionError::NotFound(_)) => StatusCode::NOT_FOUND,
      AppError::Session(SessionError::InvalidState { .. }) => StatusCode::CONFLICT,
      AppError::Session(SessionError::Duplicate(_)) => StatusCode::CONFLICT,
      AppError::Session(SessionError::NoQuestions) => StatusCode::UNPROCESSABLE_ENTITY,
      AppError::NotFound(_) => StatusCode::NOT_FOUND,
      AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
    };
    if status.is_server_error() {
      warn!(target: "edai_backend", %status, error = %self, "Request failed");
    }
    (status, Json(ErrorOut { error: self.to_string() })).into_response()
  }
}

type ApiResult<T> = Result<Json<T>, AppError>;

fn view(s: &QuizSession) -> Json<SessionView> {
  Json(SessionView::from(s))
}

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut { ok: true, gemini_configured: state.keys.is_configured() })
}

#[instrument(level = "info", skip(state), fields(lat = q.lat, lon = q.lon))]
pub async fn http_reverse(State(state): State<Arc<AppState>>, Query(q): Query<ReverseQuery>) -> impl IntoResponse {
  let out = logic::resolve_location(&state, q.lat, q.lon).await;
  info!(target: "place", name = %out.place.name, category = %out.category, "HTTP location resolved");
  Json(out)
}

#[instrument(level = "info", skip(state, q), fields(query_len = q.q.len()))]
pub async fn http_search(State(state): State<Arc<AppState>>, Query(q): Query<SearchQuery>) -> ApiResult<SearchOut> {
  let places = logic::search_locations(&state, &q.q).await?;
  Ok(Json(SearchOut { places }))
}

#[instrument(level = "info")]
pub async fn http_category(Query(q): Query<NameQuery>) -> impl IntoResponse {
  let category = logic::classify_name(&q.name);
  Json(CategoryOut { name: q.name, category })
}

#[instrument(level = "info", skip(state, body), fields(place = %body.name))]
pub async fn http_place_content(State(state): State<Arc<AppState>>, Json(body): Json<PlaceRef>) -> ApiResult<crate::domain::PlaceContent> {
  Ok(Json(logic::place_content(&state, &body).await?))
}

#[instrument(level = "info", skip(state, body), fields(place = %body.place_name, description_len = body.description.len()))]
pub async fn http_place_enhance(State(state): State<Arc<AppState>>, Json(body): Json<EnhanceIn>) -> ApiResult<EnhanceOut> {
  let text = logic::enhance_description(&state, &body.place_name, &body.description).await?;
  Ok(Json(EnhanceOut { text }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_place_summary(State(state): State<Arc<AppState>>, Query(q): Query<NameQuery>) -> impl IntoResponse {
  Json(logic::place_summary(&state, &q.name).await)
}

#[instrument(level = "info", skip(state, body), fields(place = %body.place.name))]
pub async fn http_place_explore(State(state): State<Arc<AppState>>, Json(body): Json<QuizIn>) -> ApiResult<ExploreOut> {
  let out = logic::explore(&state, &body.place, body.difficulty.as_deref(), body.count).await?;
  info!(target: "place", place = %out.place_name, quiz_source = ?out.quiz_source, "HTTP explore served");
  Ok(Json(out))
}

#[instrument(level = "info", skip(state))]
pub async fn http_places(State(state): State<Arc<AppState>>, Query(q): Query<PlacesQuery>) -> impl IntoResponse {
  let places = match q.category.as_deref() {
    Some(c) => state.catalog.by_category(c).into_iter().cloned().collect(),
    None => state.catalog.all().to_vec(),
  };
  Json(PlacesOut { places })
}

#[instrument(level = "info", skip(state))]
pub async fn http_place_categories(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  let categories = state.catalog.categories().into_iter().map(String::from).collect();
  Json(CategoriesOut { categories })
}

#[instrument(level = "info", skip(state))]
pub async fn http_place_by_id(State(state): State<Arc<AppState>>, Path(id): Path<u32>) -> ApiResult<crate::domain::PopularPlace> {
  state.catalog.by_id(id)
    .cloned()
    .map(Json)
    .ok_or_else(|| AppError::NotFound(format!("Unknown place id: {}", id)))
}

#[instrument(level = "info", skip(state))]
pub async fn http_place_quiz(
  State(state): State<Arc<AppState>>,
  Path(id): Path<u32>,
  Query(q): Query<PlaceQuizQuery>,
) -> ApiResult<SessionView> {
  let session = logic::place_quiz(&state, id, q.ai, q.session_id, |_| {}).await?;
  Ok(view(&session))
}

#[instrument(level = "info", skip(state, body), fields(place = %body.place.name))]
pub async fn http_create_quiz(State(state): State<Arc<AppState>>, Json(body): Json<QuizIn>) -> ApiResult<SessionView> {
  let session = logic::create_quiz(&state, &body.place, body.difficulty.as_deref(), body.count, body.session_id, |_| {}).await?;
  info!(target: "quiz", id = %session.id, n = session.questions().len(), "HTTP quiz created");
  Ok(view(&session))
}

#[instrument(level = "info")]
pub async fn http_trivia_categories() -> impl IntoResponse {
  Json(TriviaCategoriesOut { categories: logic::trivia_categories() })
}

#[instrument(level = "info", skip(state))]
pub async fn http_start_trivia(State(state): State<Arc<AppState>>, Json(body): Json<TriviaIn>) -> ApiResult<SessionView> {
  Ok(view(&logic::start_trivia(&state, body.category, body.count, |_| {}).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_quiz(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> ApiResult<SessionView> {
  Ok(view(&logic::get_session(&state, id).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_delete_quiz(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> Result<StatusCode, AppError> {
  logic::drop_session(&state, id).await?;
  Ok(StatusCode::NO_CONTENT)
}

#[instrument(level = "info", skip(state, body), fields(q = body.question_index, o = body.option_index))]
pub async fn http_quiz_answer(
  State(state): State<Arc<AppState>>,
  Path(id): Path<Uuid>,
  Json(body): Json<AnswerIn>,
) -> ApiResult<SessionView> {
  let op = SessionOp::Answer { question: body.question_index, option: body.option_index };
  Ok(view(&logic::session_op(&state, id, op).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_quiz_next(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> ApiResult<SessionView> {
  Ok(view(&logic::session_op(&state, id, SessionOp::Next).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_quiz_previous(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> ApiResult<SessionView> {
  Ok(view(&logic::session_op(&state, id, SessionOp::Previous).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_quiz_finish(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> ApiResult<SessionView> {
  let session = logic::session_op(&state, id, SessionOp::Finish).await?;
  info!(target: "quiz", %id, score = session.score(), total = session.questions().len(), "HTTP quiz finished");
  Ok(view(&session))
}

#[instrument(level = "info", skip(state))]
pub async fn http_quiz_retake(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> ApiResult<SessionView> {
  Ok(view(&logic::session_op(&state, id, SessionOp::Retake).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_gemini_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(logic::gemini_status(&state))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_set_gemini_key(State(state): State<Arc<AppState>>, Json(body): Json<SetKeyIn>) -> ApiResult<GeminiStatusOut> {
  Ok(Json(logic::set_gemini_key(&state, &body.api_key)?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_clear_gemini_key(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(logic::clear_gemini_key(&state))
}
