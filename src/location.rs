//! Location resolution: device coordinates or free-text queries -> `Place`.
//!
//! Single-location lookups never fail: any provider problem degrades to
//! `Place::fallback()`. Searches surface provider failures so callers can show
//! an error state (an empty result list is still a success).

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::domain::Place;
use crate::error::PipelineError;
use crate::geocoding::{GeocodeMatch, Geocoder};

const UNKNOWN_LOCATION: &str = "Unknown Location";

#[derive(Clone)]
pub struct LocationResolver {
  geocoder: Arc<dyn Geocoder>,
}

impl LocationResolver {
  pub fn new(geocoder: Arc<dyn Geocoder>) -> Self {
    Self { geocoder }
  }

  /// Reverse lookup. Returns `Ok` in every case; failures yield the fallback place.
  #[instrument(level = "info", skip(self))]
  pub async fn resolve_coordinates(&self, lat: f64, lon: f64) -> Result<Place, PipelineError> {
    match self.geocoder.reverse(lat, lon).await {
      Ok(m) => {
        let place = to_place(m, Some((lat, lon)));
        info!(target: "place", name = %place.name, "Resolved current location");
        Ok(place)
      }
      Err(e) => {
        warn!(target: "place", error = %e, "Reverse geocoding failed; using fallback place");
        Ok(Place::fallback())
      }
    }
  }

  /// Forward lookup; every provider candidate is mapped to a `Place`.
  #[instrument(level = "info", skip(self), fields(query_len = query.len()))]
  pub async fn search(&self, query: &str) -> Result<Vec<Place>, PipelineError> {
    let query = query.trim();
    if query.is_empty() {
      return Ok(Vec::new());
    }
    let matches = self.geocoder.search(query).await?;
    Ok(matches.into_iter().map(|m| to_place(m, None)).collect())
  }
}

/// Prefer the provider's short name, then the first display-name segment.
pub fn place_name(m: &GeocodeMatch) -> String {
  m.name.as_deref()
    .map(str::trim)
    .filter(|n| !n.is_empty())
    .map(String::from)
    .or_else(|| {
      m.display_name.split(',').next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
    })
    .unwrap_or_else(|| UNKNOWN_LOCATION.to_string())
}

/// Reverse lookups keep the device coordinates; searches use the match's own.
fn to_place(m: GeocodeMatch, device: Option<(f64, f64)>) -> Place {
  let name = place_name(&m);
  let (latitude, longitude) = device.unwrap_or((m.lat, m.lon));
  let address = m.address.unwrap_or_default();
  Place {
    name,
    display_name: Some(m.display_name).filter(|d| !d.is_empty()),
    latitude,
    longitude,
    country: address.country,
    city: address.city.or(address.municipality),
  }
}
