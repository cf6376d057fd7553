//! Edai · Place Content & Quiz Backend
//!
//! - Axum HTTP + WebSocket API
//! - Location resolution via Nominatim, place summaries via Wikipedia
//! - Place content and quizzes via Gemini, with a built-in offline question bank
//!
//! Important env variables:
//!   PORT               : u16 (default 3000)
//!   GEMINI_API_KEY     : initial Gemini key (can be changed at runtime via settings)
//!   GEMINI_BASE_URL    : default "https://generativelanguage.googleapis.com/v1beta"
//!   GEMINI_MODEL       : default "gemini-1.5-flash"
//!   NOMINATIM_BASE_URL : default "https://nominatim.openstreetmap.org"
//!   WIKIPEDIA_BASE_URL : default "https://en.wikipedia.org/api/rest_v1"
//!   PLACES_PATH        : popular places JSON (default: bundled Pune list)
//!   AGENT_CONFIG_PATH  : path to TOML config (prompts + generation tuning)
//!   LOG_LEVEL          : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT         : "pretty" (default) or "json"

mod telemetry;
mod util;
mod error;
mod domain;
mod config;
mod retry;
mod credentials;
mod gemini;
mod geocoding;
mod location;
mod classify;
mod bank;
mod content;
mod quiz;
mod session;
mod places;
mod wikipedia;
mod state;
mod protocol;
mod logic;
mod routes;
#[cfg(test)]
mod testing;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use crate::routes::build_router;
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Shared application state (clients, generators, catalog, session registry).
  let state = Arc::new(AppState::from_env()?);
  state.start_session_sweeper();

  // Build the HTTP router with routes, CORS and tracing layers.
  let app = build_router(state.clone());

  // Read port from env or default to 3000.
  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "edai_backend", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "edai_backend", error = %e, "Failed to listen for shutdown signal");
    std::future::pending::<()>().await;
  }
  info!(target: "edai_backend", "Shutdown signal received");
}
