//! Keyword-based place classification.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::Place;
use crate::util::contains_any;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Category {
  #[serde(rename = "Transportation")]
  Transportation,
  #[serde(rename = "Educational Institute")]
  EducationalInstitute,
  #[serde(rename = "Tourist Place")]
  TouristPlace,
  #[serde(rename = "Government Office")]
  GovernmentOffice,
  #[serde(rename = "Location")]
  Location,
}

impl Category {
  pub fn as_str(&self) -> &'static str {
    match self {
      Category::Transportation => "Transportation",
      Category::EducationalInstitute => "Educational Institute",
      Category::TouristPlace => "Tourist Place",
      Category::GovernmentOffice => "Government Office",
      Category::Location => "Location",
    }
  }
}

impl fmt::Display for Category {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// Priority order matters: first matching rule wins.
const RULES: &[(Category, &[&str])] = &[
  (Category::Transportation, &["airport", "station"]),
  (Category::EducationalInstitute, &["college", "university", "institute", "school"]),
  (Category::TouristPlace, &["temple", "fort", "palace", "museum"]),
  (Category::GovernmentOffice, &["office", "municipal", "government"]),
];

pub fn classify(place_name: &str) -> Category {
  RULES.iter()
    .find(|(_, keywords)| contains_any(place_name, keywords))
    .map(|(category, _)| *category)
    .unwrap_or(Category::Location)
}

const NOTABLE_KEYWORDS: &[&str] = &[
  "city", "town", "village", "district", "municipality",
  "india", "mumbai", "delhi", "pune", "bangalore", "kolkata", "chennai",
  "maharashtra", "gujarat", "rajasthan", "kerala", "goa",
  "fort", "palace", "monument", "temple", "church", "mosque",
  "museum", "park", "garden", "lake", "river", "mountain",
  "paris", "london", "tokyo", "new york", "sydney", "rome",
  "egypt", "japan", "france", "italy", "spain", "germany",
  "china", "australia", "canada", "brazil", "russia",
];

const ADDRESS_KEYWORDS: &[&str] = &["road", "street", "lane", "apartment", "building", "shop"];

/// Is the place notable enough for a place-specific quiz? Street-level
/// addresses are rejected even inside a notable city.
pub fn is_quiz_relevant(place: &Place) -> bool {
  let display = place.display_name.as_deref().unwrap_or("");
  let notable = contains_any(&place.name, NOTABLE_KEYWORDS) || contains_any(display, NOTABLE_KEYWORDS);
  let street_level = contains_any(&place.name, ADDRESS_KEYWORDS) || contains_any(display, ADDRESS_KEYWORDS);
  notable && !street_level
}
