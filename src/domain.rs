//! Domain models used by the backend: places, generated content, quiz questions
//! and the curated popular-place records.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A resolved physical location. Replaced wholesale when the user picks another one.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Place {
  pub name: String,
  #[serde(default)] pub display_name: Option<String>,
  pub latitude: f64,
  pub longitude: f64,
  #[serde(default)] pub country: Option<String>,
  #[serde(default)] pub city: Option<String>,
}

impl Place {
  /// Static place used whenever single-location resolution fails.
  pub fn fallback() -> Self {
    Self {
      name: "Pune".into(),
      display_name: Some("Pune, Maharashtra, India".into()),
      latitude: 18.5204,
      longitude: 73.8567,
      country: Some("India".into()),
      city: Some("Pune".into()),
    }
  }
}

/// Descriptive content produced once per place by the content generator.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlaceContent {
  pub description: String,
  pub historical_significance: String,
  pub interesting_facts: Vec<String>,
  pub best_time_to_visit: String,
  pub nearby_attractions: Vec<String>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
  Easy,
  #[default]
  Medium,
  Hard,
}

impl Difficulty {
  /// Model output is free text; anything unrecognised counts as medium.
  pub fn parse_lenient(s: &str) -> Self {
    match s.trim().to_ascii_lowercase().as_str() {
      "easy" => Difficulty::Easy,
      "hard" => Difficulty::Hard,
      _ => Difficulty::Medium,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Difficulty::Easy => "easy",
      Difficulty::Medium => "medium",
      Difficulty::Hard => "hard",
    }
  }
}

impl fmt::Display for Difficulty {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Number of options every question must carry.
pub const OPTIONS_PER_QUESTION: usize = 4;

/// A multiple-choice question. Correctness is always index-based.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
  pub question_text: String,
  pub options: Vec<String>,
  pub correct_option_index: usize,
  #[serde(default)] pub explanation: String,
  #[serde(default)] pub difficulty: Difficulty,
}

impl QuizQuestion {
  /// Shape check shared by every question source.
  pub fn is_well_formed(&self) -> bool {
    self.options.len() == OPTIONS_PER_QUESTION && self.correct_option_index < OPTIONS_PER_QUESTION
  }
}

/// Where did the questions of a session come from?
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum QuestionSource {
  Ai,          // generated by Gemini and validated
  StaticBank,  // region-keyed built-in bank (last resort)
  Curated,     // bundled popular-places quiz
}

/// Topic of a place-independent trivia round.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum TriviaCategory {
  GeneralKnowledge,
  #[default]
  Geography,
  History,
}

impl TriviaCategory {
  pub const ALL: [TriviaCategory; 3] = [TriviaCategory::GeneralKnowledge, TriviaCategory::Geography, TriviaCategory::History];

  pub fn display_name(&self) -> &'static str {
    match self {
      TriviaCategory::GeneralKnowledge => "General Knowledge",
      TriviaCategory::Geography => "Geography",
      TriviaCategory::History => "History",
    }
  }

  /// Open Trivia DB category id.
  pub fn opentdb_id(&self) -> u32 {
    match self {
      TriviaCategory::GeneralKnowledge => 9,
      TriviaCategory::Geography => 22,
      TriviaCategory::History => 23,
    }
  }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
  pub latitude: f64,
  pub longitude: f64,
}

/// Curated question as stored in the places JSON (`correctAnswer` is an index).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceQuizQuestion {
  pub question: String,
  pub options: Vec<String>,
  pub correct_answer: usize,
  #[serde(default)] pub explanation: String,
}

/// Curated place record from the bundled asset.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopularPlace {
  pub id: u32,
  pub name: String,
  pub category: String,
  pub description: String,
  pub address: String,
  pub coordinates: Coordinates,
  pub established: String,
  #[serde(default)] pub key_facts: Vec<String>,
  #[serde(default)] pub quiz: Vec<PlaceQuizQuestion>,
}

/// Short encyclopedic summary of a place.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlaceSummary {
  pub title: String,
  pub description: String,
  #[serde(default)] pub image_url: Option<String>,
  #[serde(default)] pub page_url: Option<String>,
}
