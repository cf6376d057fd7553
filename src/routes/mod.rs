//! Router assembly: HTTP endpoints, WebSocket upgrade, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;
pub mod ws;

/// Build the application router with:
/// - WebSocket at `/ws`
/// - REST-ish API under `/api/v1/...`
/// - CORS (allow any origin/method/headers), adjust for production if needed
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // WebSocket
        .route("/ws", get(ws::ws_upgrade))
        // HTTP API
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/location/reverse", get(http::http_reverse))
        .route("/api/v1/location/search", get(http::http_search))
        .route("/api/v1/category", get(http::http_category))
        .route("/api/v1/place/content", post(http::http_place_content))
        .route("/api/v1/place/enhance", post(http::http_place_enhance))
        .route("/api/v1/place/summary", get(http::http_place_summary))
        .route("/api/v1/place/explore", post(http::http_place_explore))
        .route("/api/v1/places", get(http::http_places))
        .route("/api/v1/places/categories", get(http::http_place_categories))
        .route("/api/v1/places/:id", get(http::http_place_by_id))
        .route("/api/v1/places/:id/quiz", post(http::http_place_quiz))
        .route("/api/v1/quiz", post(http::http_create_quiz))
        .route("/api/v1/trivia", post(http::http_start_trivia))
        .route("/api/v1/trivia/categories", get(http::http_trivia_categories))
        .route("/api/v1/quiz/:id", get(http::http_get_quiz).delete(http::http_delete_quiz))
        .route("/api/v1/quiz/:id/answer", post(http::http_quiz_answer))
        .route("/api/v1/quiz/:id/next", post(http::http_quiz_next))
        .route("/api/v1/quiz/:id/previous", post(http::http_quiz_previous))
        .route("/api/v1/quiz/:id/finish", post(http::http_quiz_finish))
        .route("/api/v1/quiz/:id/retake", post(http::http_quiz_retake))
        .route(
            "/api/v1/settings/gemini",
            get(http::http_gemini_status)
                .put(http::http_set_gemini_key)
                .delete(http::http_clear_gemini_key),
        )
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::state::tests::test_state;
    use crate::testing::ScriptedAi;

    fn app() -> Router {
        build_router(Arc::new(test_state(ScriptedAi::unconfigured())))
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let req = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(b) => req.header("content-type", "application/json").body(Body::from(b.to_string())),
            None => req.body(Body::empty()),
        }
        .unwrap();
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, value)
    }

    #[tokio::test]
    async fn health_and_category() {
        let app = app();
        let (status, body) = call(&app, "GET", "/api/v1/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "ok": true, "geminiConfigured": false }));

        let (_, body) = call(&app, "GET", "/api/v1/category?name=Pune%20Railway%20Station", None).await;
        assert_eq!(body["category"], "Transportation");
    }

    #[tokio::test]
    async fn reverse_lookup_falls_back_to_pune() {
        let (status, body) = call(&app(), "GET", "/api/v1/location/reverse?lat=1.0&lon=2.0", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["place"]["name"], "Pune");
        assert_eq!(body["place"]["latitude"], 18.5204);
    }

    #[tokio::test]
    async fn search_errors_surface_as_bad_gateway() {
        let (status, body) = call(&app(), "GET", "/api/v1/location/search?q=pune", None).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"].as_str().unwrap().contains("nominatim"));
    }

    #[tokio::test]
    async fn content_requires_configured_gemini() {
        let (status, body) = call(&app(), "POST", "/api/v1/place/content", Some(json!({ "name": "Shaniwar Wada" }))).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body["error"].as_str().unwrap().contains("Settings"));
    }

    #[tokio::test]
    async fn quiz_lifecycle_over_http() {
        let app = app();
        let (status, s) = call(&app, "POST", "/api/v1/quiz", Some(json!({ "place": { "name": "Pune" }, "count": 2 }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(s["state"], "in_progress");
        assert_eq!(s["source"], "static_bank");
        assert_eq!(s["selectedAnswers"], json!([-1, -1]));
        let id = s["id"].as_str().unwrap().to_string();
        let correct = s["questions"][0]["correctOptionIndex"].as_u64().unwrap();

        let (_, s) = call(&app, "POST", &format!("/api/v1/quiz/{id}/answer"), Some(json!({ "questionIndex": 0, "optionIndex": correct }))).await;
        assert_eq!(s["selectedAnswers"][0], correct);
        let (_, s) = call(&app, "POST", &format!("/api/v1/quiz/{id}/next"), None).await;
        assert_eq!(s["currentIndex"], 1);
        let (_, s) = call(&app, "POST", &format!("/api/v1/quiz/{id}/finish"), None).await;
        assert_eq!(s["state"], "completed");
        assert_eq!(s["score"], 1);

        let (status, _) = call(&app, "POST", &format!("/api/v1/quiz/{id}/next"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (_, s) = call(&app, "POST", &format!("/api/v1/quiz/{id}/retake"), None).await;
        assert_eq!(s["selectedAnswers"], json!([-1, -1]));

        let (status, _) = call(&app, "DELETE", &format!("/api/v1/quiz/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(&app, "GET", &format!("/api/v1/quiz/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn popular_places_endpoints() {
        let app = app();
        let (_, body) = call(&app, "GET", "/api/v1/places?category=temple", None).await;
        assert_eq!(body["places"].as_array().unwrap().len(), 2);
        let (_, body) = call(&app, "GET", "/api/v1/places/categories", None).await;
        assert_eq!(body["categories"][0], "Historical Fort");
        let (status, _) = call(&app, "GET", "/api/v1/places/999", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (_, s) = call(&app, "POST", "/api/v1/places/1/quiz", None).await;
        assert_eq!(s["source"], "curated");
        assert_eq!(s["placeName"], "Shaniwar Wada");
    }

    #[tokio::test]
    async fn gemini_settings() {
        let app = app();
        let (status, _) = call(&app, "PUT", "/api/v1/settings/gemini", Some(json!({ "apiKey": "short" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (_, body) = call(&app, "PUT", "/api/v1/settings/gemini", Some(json!({ "apiKey": "AIzaSyA1234567890abcdefghij" }))).await;
        assert_eq!(body["configured"], true);
        let (_, body) = call(&app, "DELETE", "/api/v1/settings/gemini", None).await;
        assert_eq!(body["configured"], false);
    }

    #[tokio::test(start_paused = true)]
    async fn delete_during_generation_discards_the_quiz() {
        let state = Arc::new(test_state(ScriptedAi::stalling(3, vec![])));
        let app = build_router(state.clone());
        let id = uuid::Uuid::new_v4();

        let pending = {
            let app = app.clone();
            let body = json!({ "place": { "name": "Pune" }, "sessionId": id });
            tokio::spawn(async move { call(&app, "POST", "/api/v1/quiz", Some(body)).await })
        };
        while state.get_session(id).await.is_none() {
            tokio::task::yield_now().await;
        }
        let (_, s) = call(&app, "GET", &format!("/api/v1/quiz/{id}"), None).await;
        assert_eq!(s["state"], "not_started");

        let (status, _) = call(&app, "DELETE", &format!("/api/v1/quiz/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = pending.await.unwrap();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains(&id.to_string()));
        assert!(state.get_session(id).await.is_none());
    }

    #[tokio::test]
    async fn reused_session_id_is_a_conflict() {
        let app = app();
        let body = json!({ "place": { "name": "Pune" }, "sessionId": "67e55044-10b1-426f-9247-bb680e5fe0c8" });
        let (status, s) = call(&app, "POST", "/api/v1/quiz", Some(body.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(s["id"], "67e55044-10b1-426f-9247-bb680e5fe0c8");
        let (status, _) = call(&app, "POST", "/api/v1/quiz", Some(body)).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn trivia_endpoints() {
        let app = app();
        let (_, body) = call(&app, "GET", "/api/v1/trivia/categories", None).await;
        assert_eq!(body["categories"].as_array().unwrap().len(), 3);
        assert_eq!(body["categories"][1]["category"], "geography");

        let (status, s) = call(&app, "POST", "/api/v1/trivia", Some(json!({ "category": "general_knowledge", "count": 2 }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(s["placeName"], "General Knowledge Trivia");
        assert_eq!(s["source"], "static_bank");
        assert_eq!(s["selectedAnswers"], json!([-1, -1]));

        let (status, _) = call(&app, "POST", "/api/v1/trivia", Some(json!({ "category": "sports" }))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
