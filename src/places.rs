//! Curated popular-places catalog.
//!
//! Loaded once at startup from `PLACES_PATH` (or the bundled Pune list) and
//! shared read-only.

use serde::Deserialize;
use tracing::{error, info, warn};

use crate::domain::{Difficulty, PopularPlace, QuizQuestion};

const BUNDLED: &str = include_str!("../data/pune_places.json");

#[derive(Deserialize)]
struct PlacesFile {
  places: Vec<PopularPlace>,
}

#[derive(Clone, Debug, Default)]
pub struct PlacesCatalog {
  places: Vec<PopularPlace>,
}

impl PlacesCatalog {
  pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
    let file: PlacesFile = serde_json::from_str(json)?;
    Ok(Self { places: file.places })
  }

  pub fn bundled() -> Result<Self, serde_json::Error> {
    Self::from_json(BUNDLED)
  }

  /// `PLACES_PATH` if set and readable, the bundled list otherwise.
  pub fn load_from_env() -> Result<Self, serde_json::Error> {
    if let Ok(path) = std::env::var("PLACES_PATH") {
      match std::fs::read_to_string(&path).map(|s| Self::from_json(&s)) {
        Ok(Ok(catalog)) => {
          info!(target: "edai_backend", %path, count = catalog.places.len(), "Loaded popular places");
          return Ok(catalog);
        }
        Ok(Err(e)) => error!(target: "edai_backend", %path, error = %e, "Failed to parse places file; using bundled list"),
        Err(e) => error!(target: "edai_backend", %path, error = %e, "Failed to read places file; using bundled list"),
      }
    }
    let catalog = Self::bundled()?;
    info!(target: "edai_backend", count = catalog.places.len(), "Loaded bundled popular places");
    Ok(catalog)
  }

  pub fn all(&self) -> &[PopularPlace] {
    &self.places
  }

  pub fn by_id(&self, id: u32) -> Option<&PopularPlace> {
    self.places.iter().find(|p| p.id == id)
  }

  pub fn by_category(&self, category: &str) -> Vec<&PopularPlace> {
    self.places.iter().filter(|p| p.category.eq_ignore_ascii_case(category)).collect()
  }

  /// Distinct categories in first-seen order.
  pub fn categories(&self) -> Vec<&str> {
    let mut out: Vec<&str> = Vec::new();
    for p in &self.places {
      if !out.contains(&p.category.as_str()) {
        out.push(&p.category);
      }
    }
    out
  }

  /// Curated questions for a place; malformed entries are dropped.
  pub fn quiz_for(&self, id: u32) -> Option<Vec<QuizQuestion>> {
    let place = self.by_id(id)?;
    let questions = place.quiz.iter()
      .map(|q| QuizQuestion {
        question_text: q.question.clone(),
        options: q.options.clone(),
        correct_option_index: q.correct_answer,
        explanation: q.explanation.clone(),
        difficulty: Difficulty::Medium,
      })
      .filter(|q| {
        let ok = q.is_well_formed();
        if !ok {
          warn!(target: "quiz", place = %place.name, question = %q.question_text, "Skipping malformed curated question");
        }
        ok
      })
      .collect();
    Some(questions)
  }
}
