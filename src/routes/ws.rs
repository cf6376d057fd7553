//! WebSocket upgrade + message loop. Each client message is parsed as JSON and
//! forwarded to core logic. We reply with a single JSON message per request.
//!
//! A connection owns the quiz sessions it creates; they are dropped when it
//! closes, including one whose questions are still being generated.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use crate::error::AppError;
use crate::logic::{self, SessionOp};
use crate::protocol::{ClientWsMessage, ServerWsMessage, SessionView};
use crate::session::QuizSession;
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "edai_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "edai_backend", "WebSocket connected");
  let mut owned: HashSet<Uuid> = HashSet::new();
  // Frames that arrived while a request was in flight.
  let mut backlog: VecDeque<Message> = VecDeque::new();

  loop {
    let msg = match backlog.pop_front() {
      Some(m) => m,
      None => match socket.recv().await {
        Some(Ok(m)) => m,
        _ => break,
      },
    };

    match msg {
      Message::Text(txt) => {
        let incoming = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => incoming,
          Err(e) => {
            let reply = ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) };
            if send(&mut socket, &reply).await.is_err() { break; }
            continue;
          }
        };
        debug!(target: "edai_backend", kind = incoming.kind(), "WS received");

        // Keep reading while the request runs so a disconnect cancels it.
        let reply = {
          let work = handle_client_ws(incoming, &state, &mut owned);
          tokio::pin!(work);
          loop {
            tokio::select! {
              r = &mut work => break Some(r),
              next = socket.recv() => match next {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break None,
                Some(Ok(other)) => backlog.push_back(other),
              },
            }
          }
        };

        let Some(reply) = reply else { break };
        if send(&mut socket, &reply).await.is_err() { break; }
      }
      Message::Close(_) => break,
      _ => {}
    }
  }

  for id in &owned {
    state.remove_session(*id).await;
  }
  info!(target: "edai_backend", dropped_sessions = owned.len(), "WebSocket disconnected");
}

async fn send(socket: &mut WebSocket, reply: &ServerWsMessage) -> Result<(), axum::Error> {
  let out = serde_json::to_string(reply).unwrap_or_else(|e| {
    serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
  });
  socket.send(Message::Text(out)).await.map_err(|e| {
    error!(target: "edai_backend", error = %e, "WS send error");
    e
  })
}

fn session_reply(r: Result<QuizSession, AppError>) -> ServerWsMessage {
  match r {
    Ok(s) => ServerWsMessage::Session { session: SessionView::from(&s) },
    Err(e) => ServerWsMessage::Error { message: e.to_string() },
  }
}

fn error_reply(e: AppError) -> ServerWsMessage {
  ServerWsMessage::Error { message: e.to_string() }
}

#[instrument(level = "info", skip_all, fields(kind = msg.kind()))]
async fn handle_client_ws(msg: ClientWsMessage, state: &AppState, owned: &mut HashSet<Uuid>) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::ResolveLocation { lat, lon } => {
      let result = logic::resolve_location(state, lat, lon).await;
      info!(target: "place", name = %result.place.name, "WS location resolved");
      ServerWsMessage::Location { result }
    }

    ClientWsMessage::SearchLocation { query } => match logic::search_locations(state, &query).await {
      Ok(places) => ServerWsMessage::SearchResults { places },
      Err(e) => error_reply(e),
    },

    ClientWsMessage::PlaceContent { place } => match logic::place_content(state, &place).await {
      Ok(content) => ServerWsMessage::Content { content },
      Err(e) => error_reply(e),
    },

    ClientWsMessage::EnhanceDescription { place_name, description } => {
      match logic::enhance_description(state, &place_name, &description).await {
        Ok(text) => ServerWsMessage::Enhanced { text },
        Err(e) => error_reply(e),
      }
    }

    ClientWsMessage::PlaceSummary { name } => ServerWsMessage::Summary { summary: logic::place_summary(state, &name).await },

    ClientWsMessage::Explore { place, difficulty, count } => {
      match logic::explore(state, &place, difficulty.as_deref(), count).await {
        Ok(result) => ServerWsMessage::Explore { result },
        Err(e) => error_reply(e),
      }
    }

    ClientWsMessage::StartQuiz { place, difficulty, count, session_id } => {
      let r = logic::create_quiz(state, &place, difficulty.as_deref(), count, session_id, |id| { owned.insert(id); }).await;
      session_reply(r)
    }

    ClientWsMessage::StartPlaceQuiz { place_id, ai, session_id } => {
      let r = logic::place_quiz(state, place_id, ai, session_id, |id| { owned.insert(id); }).await;
      session_reply(r)
    }

    ClientWsMessage::TriviaCategories => ServerWsMessage::TriviaCategories { categories: logic::trivia_categories() },

    ClientWsMessage::StartTrivia { category, count } => {
      session_reply(logic::start_trivia(state, category, count, |id| { owned.insert(id); }).await)
    }

    ClientWsMessage::GetSession { session_id } => session_reply(logic::get_session(state, session_id).await),

    ClientWsMessage::Answer { session_id, question_index, option_index } => {
      let op = SessionOp::Answer { question: question_index, option: option_index };
      session_reply(logic::session_op(state, session_id, op).await)
    }
    ClientWsMessage::Next { session_id } => session_reply(logic::session_op(state, session_id, SessionOp::Next).await),
    ClientWsMessage::Previous { session_id } => session_reply(logic::session_op(state, session_id, SessionOp::Previous).await),
    ClientWsMessage::Finish { session_id } => session_reply(logic::session_op(state, session_id, SessionOp::Finish).await),
    ClientWsMessage::Retake { session_id } => session_reply(logic::session_op(state, session_id, SessionOp::Retake).await),

    ClientWsMessage::DropSession { session_id } => match logic::drop_session(state, session_id).await {
      Ok(()) => {
        owned.remove(&session_id);
        ServerWsMessage::SessionDropped { session_id }
      }
      Err(e) => error_reply(e),
    },

    ClientWsMessage::GeminiStatus => {
      let s = logic::gemini_status(state);
      ServerWsMessage::GeminiStatus { configured: s.configured, message: s.message }
    }

    ClientWsMessage::SetGeminiKey { api_key } => match logic::set_gemini_key(state, &api_key) {
      Ok(s) => ServerWsMessage::GeminiStatus { configured: s.configured, message: s.message },
      Err(e) => error_reply(e),
    },

    ClientWsMessage::ClearGeminiKey => {
      let s = logic::clear_gemini_key(state);
      ServerWsMessage::GeminiStatus { configured: s.configured, message: s.message }
    }
  }
}
