//! Application state: collaborators, generators, static data and the quiz session registry.
//!
//! This module owns:
//!   - the location resolver (Nominatim behind the `Geocoder` seam)
//!   - content and quiz generators sharing one `TextGenerator` (Gemini)
//!   - the runtime Gemini key store
//!   - the popular-places catalog and the static question bank (read-only)
//!   - in-memory quiz sessions keyed by id, evicted once idle

use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::bank::StaticQuestionBank;
use crate::config::{load_agent_config_from_env, AgentConfig, GenerationSettings, ServiceUrls, SessionSettings};
use crate::content::ContentGenerator;
use crate::credentials::KeyStore;
use crate::error::SessionError;
use crate::gemini::{GeminiClient, TextGenerator};
use crate::geocoding::{Geocoder, NominatimClient};
use crate::location::LocationResolver;
use crate::places::PlacesCatalog;
use crate::quiz::QuizGenerator;
use crate::session::{QuizSession, QuizState};
use crate::wikipedia::WikipediaClient;

/// A registered session and when a caller last touched it.
#[derive(Clone, Debug)]
pub struct TrackedSession {
    pub session: QuizSession,
    pub touched: Instant,
}

impl TrackedSession {
    fn new(session: QuizSession) -> Self {
        Self { session, touched: Instant::now() }
    }
}

pub type SessionRegistry = Arc<RwLock<HashMap<Uuid, TrackedSession>>>;

/// External collaborators, injected so tests can swap them out.
pub struct Collaborators {
    pub ai: Arc<dyn TextGenerator>,
    pub geocoder: Arc<dyn Geocoder>,
    pub wikipedia: WikipediaClient,
    pub keys: Arc<KeyStore>,
    pub catalog: PlacesCatalog,
}

#[derive(Clone)]
pub struct AppState {
    pub resolver: LocationResolver,
    pub content: ContentGenerator,
    pub quiz: QuizGenerator,
    pub keys: Arc<KeyStore>,
    pub catalog: Arc<PlacesCatalog>,
    pub bank: Arc<StaticQuestionBank>,
    pub wikipedia: WikipediaClient,
    pub generation: GenerationSettings,
    pub session_settings: SessionSettings,
    pub sessions: SessionRegistry,
}

impl AppState {
    /// Build state from env: load config, places and the real HTTP clients.
    #[instrument(level = "info", skip_all)]
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let cfg = load_agent_config_from_env().unwrap_or_default();
        let urls = ServiceUrls::from_env();
        let keys = Arc::new(KeyStore::from_env());

        let gemini = GeminiClient::new(&urls.gemini_base_url, &urls.gemini_model, keys.clone(), &cfg.generation)?;
        info!(target: "edai_backend", base_url = %gemini.base_url, model = %gemini.model, "Gemini client ready");
        info!(target: "edai_backend", status = %keys.status_message(), "Gemini key status");

        let parts = Collaborators {
            ai: Arc::new(gemini),
            geocoder: Arc::new(NominatimClient::new(&urls.nominatim_base_url)?),
            wikipedia: WikipediaClient::new(&urls.wikipedia_base_url)?,
            keys,
            catalog: PlacesCatalog::load_from_env()?,
        };
        Ok(Self::assemble(parts, cfg))
    }

    pub fn assemble(parts: Collaborators, cfg: AgentConfig) -> Self {
        let prompts = Arc::new(cfg.prompts);
        let bank = Arc::new(StaticQuestionBank::builtin());
        Self {
            resolver: LocationResolver::new(parts.geocoder),
            content: ContentGenerator::new(parts.ai.clone(), prompts.clone(), &cfg.generation),
            quiz: QuizGenerator::new(parts.ai, prompts, bank.clone(), &cfg.generation),
            keys: parts.keys,
            catalog: Arc::new(parts.catalog),
            bank,
            wikipedia: parts.wikipedia,
            generation: cfg.generation,
            session_settings: cfg.sessions,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a session under its id. Ids are never reused.
    #[instrument(level = "debug", skip(self, session), fields(id = %session.id))]
    pub async fn register_session(&self, session: QuizSession) -> Result<Uuid, SessionError> {
        let id = session.id;
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&id) {
            return Err(SessionError::Duplicate(id.to_string()));
        }
        sessions.insert(id, TrackedSession::new(session));
        Ok(id)
    }

    pub async fn get_session(&self, id: Uuid) -> Option<QuizSession> {
        let mut sessions = self.sessions.write().await;
        let tracked = sessions.get_mut(&id)?;
        tracked.touched = Instant::now();
        Some(tracked.session.clone())
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn remove_session(&self, id: Uuid) -> bool {
        self.sessions.write().await.remove(&id).is_some()
    }

    /// Apply `f` to a registered session and return the updated snapshot.
    pub async fn update_session<F>(&self, id: Uuid, f: F) -> Result<QuizSession, SessionError>
    where
        F: FnOnce(&mut QuizSession) -> Result<(), SessionError>,
    {
        let mut sessions = self.sessions.write().await;
        let tracked = sessions.get_mut(&id).ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        tracked.touched = Instant::now();
        f(&mut tracked.session)?;
        Ok(tracked.session.clone())
    }

    /// Guard that drops session `id` if it is still `NotStarted` when the
    /// guard goes away unreleased.
    pub fn pending_session(&self, id: Uuid) -> PendingSession {
        PendingSession { sessions: self.sessions.clone(), id, released: false }
    }

    /// Remove sessions idle for longer than the configured TTL.
    pub async fn evict_idle_sessions(&self) -> usize {
        evict_idle(&self.sessions, self.session_settings.idle_ttl()).await
    }

    /// Periodically evict idle sessions for the lifetime of the process.
    pub fn start_session_sweeper(&self) {
        let sessions = self.sessions.clone();
        let ttl = self.session_settings.idle_ttl();
        let every = self.session_settings.sweep_interval();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                let evicted = evict_idle(&sessions, ttl).await;
                if evicted > 0 {
                    info!(target: "quiz", evicted, "Evicted idle quiz sessions");
                }
            }
        });
        info!(target: "edai_backend", ttl_secs = ttl.as_secs(), every_secs = every.as_secs(), "Session sweeper started");
    }
}

async fn evict_idle(sessions: &SessionRegistry, ttl: Duration) -> usize {
    let mut sessions = sessions.write().await;
    let before = sessions.len();
    sessions.retain(|_, t| t.touched.elapsed() < ttl);
    before - sessions.len()
}

/// Cancellation-safe cleanup of a session whose questions are still being
/// generated. Removes it on drop unless `release()` was called.
pub struct PendingSession {
    sessions: SessionRegistry,
    id: Uuid,
    released: bool,
}

impl PendingSession {
    pub fn release(mut self) {
        self.released = true;
    }
}

impl Drop for PendingSession {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else { return };
        let sessions = self.sessions.clone();
        let id = self.id;
        handle.spawn(async move {
            let mut sessions = sessions.write().await;
            if sessions.get(&id).is_some_and(|t| t.session.state() == QuizState::NotStarted) {
                sessions.remove(&id);
                debug!(target: "quiz", %id, "Abandoned session removed");
            }
        });
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::{Difficulty, QuestionSource, QuizQuestion};
    use crate::error::PipelineError;
    use crate::testing::{ScriptedAi, StaticGeocoder};

    /// State wired to fakes; Wikipedia points at a closed port so it always degrades.
    pub(crate) fn test_state(ai: Arc<ScriptedAi>) -> AppState {
        let mut cfg = AgentConfig::default();
        cfg.generation.retry_delay_ms = 0;
        let parts = Collaborators {
            ai,
            geocoder: StaticGeocoder::failing(),
            wikipedia: WikipediaClient::new("http://127.0.0.1:9").unwrap(),
            keys: Arc::new(KeyStore::new(None)),
            catalog: PlacesCatalog::bundled().unwrap(),
        };
        AppState::assemble(parts, cfg)
    }

    fn question() -> QuizQuestion {
        QuizQuestion {
            question_text: "Q".into(),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_option_index: 1,
            explanation: String::new(),
            difficulty: Difficulty::Easy,
        }
    }

    #[tokio::test]
    async fn registry_round_trip() {
        let state = test_state(ScriptedAi::new(vec![Err(PipelineError::NotConfigured)]));
        let id = state.register_session(QuizSession::new("Pune")).await.unwrap();
        assert_eq!(
            state.register_session(QuizSession::with_id(id, "Pune")).await.unwrap_err(),
            SessionError::Duplicate(id.to_string())
        );

        let s = state
            .update_session(id, |s| s.start(vec![question()], QuestionSource::Curated, None))
            .await
            .unwrap();
        assert_eq!(s.questions().len(), 1);

        let s = state.update_session(id, |s| s.select_answer(0, 1)).await.unwrap();
        assert_eq!(s.selected_answers(), &[Some(1)]);

        assert!(state.remove_session(id).await);
        assert!(!state.remove_session(id).await);
        assert_eq!(
            state.update_session(id, |s| s.next()).await.unwrap_err(),
            SessionError::NotFound(id.to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn idle_sessions_are_evicted() {
        let state = test_state(ScriptedAi::unconfigured());
        let stale = state.register_session(QuizSession::new("Pune")).await.unwrap();
        let fresh = state.register_session(QuizSession::new("Delhi")).await.unwrap();

        tokio::time::advance(state.session_settings.idle_ttl() - Duration::from_secs(1)).await;
        assert!(state.get_session(fresh).await.is_some());
        tokio::time::advance(Duration::from_secs(2)).await;

        assert_eq!(state.evict_idle_sessions().await, 1);
        assert!(state.get_session(stale).await.is_none());
        assert!(state.get_session(fresh).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_runs_on_its_interval() {
        let state = test_state(ScriptedAi::unconfigured());
        let id = state.register_session(QuizSession::new("Pune")).await.unwrap();
        state.start_session_sweeper();
        tokio::time::sleep(state.session_settings.idle_ttl() + state.session_settings.sweep_interval()).await;
        assert!(state.get_session(id).await.is_none());
    }

    #[tokio::test]
    async fn pending_guard_removes_only_unstarted_sessions() {
        let state = test_state(ScriptedAi::unconfigured());
        let abandoned = state.register_session(QuizSession::new("Pune")).await.unwrap();
        let started = state.register_session(QuizSession::new("Delhi")).await.unwrap();
        state.update_session(started, |s| s.start(vec![question()], QuestionSource::Curated, None)).await.unwrap();
        let kept = state.register_session(QuizSession::new("Paris")).await.unwrap();

        drop(state.pending_session(abandoned));
        drop(state.pending_session(started));
        state.pending_session(kept).release();
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }

        assert!(state.get_session(abandoned).await.is_none());
        assert!(state.get_session(started).await.is_some());
        assert!(state.get_session(kept).await.is_some());
    }
}
