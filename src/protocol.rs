//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::classify::Category;
use crate::bank::BankKey;
use crate::domain::{Place, PlaceContent, PlaceSummary, PopularPlace, QuestionSource, QuizQuestion, TriviaCategory};
use crate::session::{QuizSession, QuizState};

/// A place as clients refer to it: a name, optionally with where it is.
/// A full `Place` object deserializes into this too.
#[derive(Clone, Debug, Deserialize, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PlaceRef {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

impl PlaceRef {
    pub fn location_context(&self) -> String {
        self.display_name.clone().unwrap_or_else(|| self.name.clone())
    }

    /// What the static bank regions are matched on.
    pub fn bank_key(&self) -> BankKey<'_> {
        BankKey {
            name: &self.name,
            display_name: self.display_name.as_deref(),
            country: self.country.as_deref(),
        }
    }
}

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    ResolveLocation {
        lat: f64,
        lon: f64,
    },
    SearchLocation {
        query: String,
    },
    PlaceContent {
        place: PlaceRef,
    },
    EnhanceDescription {
        #[serde(rename = "placeName")]
        place_name: String,
        description: String,
    },
    PlaceSummary {
        name: String,
    },
    Explore {
        place: PlaceRef,
        #[serde(default)]
        difficulty: Option<String>,
        #[serde(default)]
        count: Option<usize>,
    },
    StartQuiz {
        place: PlaceRef,
        #[serde(default)]
        difficulty: Option<String>,
        #[serde(default)]
        count: Option<usize>,
        #[serde(default, rename = "sessionId")]
        session_id: Option<Uuid>,
    },
    StartPlaceQuiz {
        #[serde(rename = "placeId")]
        place_id: u32,
        #[serde(default)]
        ai: bool,
        #[serde(default, rename = "sessionId")]
        session_id: Option<Uuid>,
    },
    TriviaCategories,
    StartTrivia {
        #[serde(default)]
        category: Option<TriviaCategory>,
        #[serde(default)]
        count: Option<usize>,
    },
    GetSession {
        #[serde(rename = "sessionId")]
        session_id: Uuid,
    },
    Answer {
        #[serde(rename = "sessionId")]
        session_id: Uuid,
        #[serde(rename = "questionIndex")]
        question_index: usize,
        #[serde(rename = "optionIndex")]
        option_index: usize,
    },
    Next {
        #[serde(rename = "sessionId")]
        session_id: Uuid,
    },
    Previous {
        #[serde(rename = "sessionId")]
        session_id: Uuid,
    },
    Finish {
        #[serde(rename = "sessionId")]
        session_id: Uuid,
    },
    Retake {
        #[serde(rename = "sessionId")]
        session_id: Uuid,
    },
    DropSession {
        #[serde(rename = "sessionId")]
        session_id: Uuid,
    },
    GeminiStatus,
    SetGeminiKey {
        #[serde(rename = "apiKey")]
        api_key: String,
    },
    ClearGeminiKey,
}

impl ClientWsMessage {
    /// Message type for logs; payloads (API keys included) are never logged.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientWsMessage::Ping => "ping",
            ClientWsMessage::ResolveLocation { .. } => "resolve_location",
            ClientWsMessage::SearchLocation { .. } => "search_location",
            ClientWsMessage::PlaceContent { .. } => "place_content",
            ClientWsMessage::EnhanceDescription { .. } => "enhance_description",
            ClientWsMessage::PlaceSummary { .. } => "place_summary",
            ClientWsMessage::Explore { .. } => "explore",
            ClientWsMessage::StartQuiz { .. } => "start_quiz",
            ClientWsMessage::StartPlaceQuiz { .. } => "start_place_quiz",
            ClientWsMessage::TriviaCategories => "trivia_categories",
            ClientWsMessage::StartTrivia { .. } => "start_trivia",
            ClientWsMessage::GetSession { .. } => "get_session",
            ClientWsMessage::Answer { .. } => "answer",
            ClientWsMessage::Next { .. } => "next",
            ClientWsMessage::Previous { .. } => "previous",
            ClientWsMessage::Finish { .. } => "finish",
            ClientWsMessage::Retake { .. } => "retake",
            ClientWsMessage::DropSession { .. } => "drop_session",
            ClientWsMessage::GeminiStatus => "gemini_status",
            ClientWsMessage::SetGeminiKey { .. } => "set_gemini_key",
            ClientWsMessage::ClearGeminiKey => "clear_gemini_key",
        }
    }
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Location {
        result: ResolvedPlaceOut,
    },
    SearchResults {
        places: Vec<Place>,
    },
    Content {
        content: PlaceContent,
    },
    Enhanced {
        text: String,
    },
    Summary {
        summary: PlaceSummary,
    },
    Explore {
        result: ExploreOut,
    },
    Session {
        session: SessionView,
    },
    TriviaCategories {
        categories: Vec<TriviaCategoryOut>,
    },
    SessionDropped {
        #[serde(rename = "sessionId")]
        session_id: Uuid,
    },
    GeminiStatus {
        configured: bool,
        message: String,
    },
    Error {
        message: String,
    },
}

/// Wire view of a quiz session. Unanswered questions are `-1`.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub id: Uuid,
    pub place_name: String,
    pub state: QuizState,
    pub questions: Vec<QuizQuestion>,
    pub selected_answers: Vec<i64>,
    pub current_index: usize,
    pub current_answered: bool,
    pub score: usize,
    pub total: usize,
    pub source: Option<QuestionSource>,
    pub notice: Option<String>,
}

impl From<&QuizSession> for SessionView {
    fn from(s: &QuizSession) -> Self {
        Self {
            id: s.id,
            place_name: s.place_name.clone(),
            state: s.state(),
            questions: s.questions().to_vec(),
            selected_answers: s.selected_answers().iter().map(|a| a.map(|i| i as i64).unwrap_or(-1)).collect(),
            current_index: s.current_index(),
            current_answered: s.is_current_answered(),
            score: s.score(),
            total: s.questions().len(),
            source: s.source(),
            notice: s.notice().map(String::from),
        }
    }
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthOut {
    pub ok: bool,
    pub gemini_configured: bool,
}

#[derive(Debug, Deserialize)]
pub struct ReverseQuery {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedPlaceOut {
    pub place: Place,
    pub category: Category,
    pub quiz_relevant: bool,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

#[derive(Debug, Serialize)]
pub struct SearchOut {
    pub places: Vec<Place>,
}

#[derive(Debug, Deserialize)]
pub struct NameQuery {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct CategoryOut {
    pub name: String,
    pub category: Category,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhanceIn {
    pub place_name: String,
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct EnhanceOut {
    pub text: String,
}

/// Body of `place/explore` and `quiz` (create). `sessionId` is only used by
/// `quiz`: it makes the session addressable while it is being generated.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizIn {
    pub place: PlaceRef,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub count: Option<usize>,
    #[serde(default)]
    pub session_id: Option<Uuid>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExploreOut {
    pub place_name: String,
    pub category: Category,
    pub content: PlaceContent,
    pub quiz: Vec<QuizQuestion>,
    pub quiz_source: QuestionSource,
    /// Why bank questions were served, if they were.
    pub quiz_notice: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PlacesQuery {
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PlacesOut {
    pub places: Vec<PopularPlace>,
}

#[derive(Debug, Serialize)]
pub struct CategoriesOut {
    pub categories: Vec<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PlaceQuizQuery {
    #[serde(default)]
    pub ai: bool,
    #[serde(default)]
    pub session_id: Option<Uuid>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriviaCategoryOut {
    pub category: TriviaCategory,
    pub display_name: String,
    pub opentdb_id: u32,
}

impl From<TriviaCategory> for TriviaCategoryOut {
    fn from(c: TriviaCategory) -> Self {
        Self { category: c, display_name: c.display_name().to_string(), opentdb_id: c.opentdb_id() }
    }
}

#[derive(Debug, Serialize)]
pub struct TriviaCategoriesOut {
    pub categories: Vec<TriviaCategoryOut>,
}

#[derive(Debug, Deserialize, Default)]
pub struct TriviaIn {
    #[serde(default)]
    pub category: Option<TriviaCategory>,
    #[serde(default)]
    pub count: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerIn {
    pub question_index: usize,
    pub option_index: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetKeyIn {
    pub api_key: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct GeminiStatusOut {
    pub configured: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorOut {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn full_place_deserializes_as_place_ref() {
        let p: PlaceRef = serde_json::from_value(json!({
            "name": "Kothrud", "displayName": "Kothrud, Pune, Maharashtra, India",
            "latitude": 18.5, "longitude": 73.8, "country": "India"
        }))
        .unwrap();
        let key = p.bank_key();
        assert_eq!(key.name, "Kothrud");
        assert_eq!(key.display_name, Some("Kothrud, Pune, Maharashtra, India"));
        assert_eq!(key.country, Some("India"));
        assert_eq!(PlaceRef { name: "X".into(), ..Default::default() }.bank_key().country, None);
    }

    #[test]
    fn ws_messages_are_tagged() {
        let m: ClientWsMessage = serde_json::from_value(json!({
            "type": "answer",
            "sessionId": "67e55044-10b1-426f-9247-bb680e5fe0c8",
            "questionIndex": 0,
            "optionIndex": 2
        }))
        .unwrap();
        assert!(matches!(m, ClientWsMessage::Answer { question_index: 0, option_index: 2, .. }));

        let out = serde_json::to_value(ServerWsMessage::GeminiStatus { configured: false, message: "x".into() }).unwrap();
        assert_eq!(out, json!({ "type": "gemini_status", "configured": false, "message": "x" }));
    }

    #[test]
    fn unanswered_questions_are_minus_one_on_the_wire() {
        let s = QuizSession::new("Pune");
        let v = serde_json::to_value(SessionView::from(&s)).unwrap();
        assert_eq!(v["state"], "not_started");
        assert_eq!(v["selectedAnswers"], json!([]));
    }

    #[test]
    fn trivia_messages() {
        let m: ClientWsMessage = serde_json::from_value(json!({ "type": "start_trivia", "category": "history", "count": 3 })).unwrap();
        assert!(matches!(m, ClientWsMessage::StartTrivia { category: Some(TriviaCategory::History), count: Some(3) }));
        let m: ClientWsMessage = serde_json::from_value(json!({ "type": "start_trivia" })).unwrap();
        assert!(matches!(m, ClientWsMessage::StartTrivia { category: None, count: None }));

        let out = serde_json::to_value(TriviaCategoryOut::from(TriviaCategory::GeneralKnowledge)).unwrap();
        assert_eq!(out, json!({ "category": "general_knowledge", "displayName": "General Knowledge", "opentdbId": 9 }));
    }
}
