//! Nominatim geocoding client (reverse + forward lookups).
//!
//! Nominatim's usage policy requires an identifying User-Agent; every request
//! carries one.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::error::PipelineError;

const APP_USER_AGENT: &str = "EdaiBackend/0.1 (Educational Travel App)";
const SEARCH_LIMIT: u32 = 5;

/// Raw match as returned by the provider, reduced to the fields we map.
#[derive(Clone, Debug, Deserialize, Default, PartialEq)]
pub struct GeocodeMatch {
  #[serde(default)] pub name: Option<String>,
  #[serde(default)] pub display_name: String,
  #[serde(default, deserialize_with = "de_coord")] pub lat: f64,
  #[serde(default, deserialize_with = "de_coord")] pub lon: f64,
  #[serde(default)] pub address: Option<Address>,
}

#[derive(Clone, Debug, Deserialize, Default, PartialEq)]
pub struct Address {
  #[serde(default)] pub city: Option<String>,
  #[serde(default)] pub municipality: Option<String>,
  #[serde(default)] pub state: Option<String>,
  #[serde(default)] pub country: Option<String>,
}

/// Nominatim returns coordinates as strings; accept numbers too.
fn de_coord<'de, D: serde::Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum Coord { S(String), F(f64) }
  match Coord::deserialize(d)? {
    Coord::F(f) => Ok(f),
    Coord::S(s) => s.trim().parse().map_err(serde::de::Error::custom),
  }
}

#[async_trait]
pub trait Geocoder: Send + Sync {
  async fn reverse(&self, lat: f64, lon: f64) -> Result<GeocodeMatch, PipelineError>;
  async fn search(&self, query: &str) -> Result<Vec<GeocodeMatch>, PipelineError>;
}

#[derive(Clone)]
pub struct NominatimClient {
  client: reqwest::Client,
  base_url: String,
}

impl NominatimClient {
  pub fn new(base_url: impl Into<String>) -> Result<Self, PipelineError> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .map_err(|e| PipelineError::provider("nominatim", e.to_string()))?;
    Ok(Self { client, base_url: base_url.into().trim_end_matches('/').to_string() })
  }

  async fn get_json<T: for<'a> Deserialize<'a>>(&self, endpoint: &str, query: &[(&str, String)]) -> Result<T, PipelineError> {
    let url = format!("{}/{}", self.base_url, endpoint);
    let res = self.client.get(&url)
      .header(USER_AGENT, APP_USER_AGENT)
      .query(query)
      .send().await
      .map_err(|e| PipelineError::provider("nominatim", e.to_string()))?;

    if !res.status().is_success() {
      return Err(PipelineError::provider("nominatim", format!("HTTP {}", res.status())));
    }
    res.json::<T>().await.map_err(|e| PipelineError::Decode(e.to_string()))
  }
}

#[async_trait]
impl Geocoder for NominatimClient {
  #[instrument(level = "debug", skip(self))]
  async fn reverse(&self, lat: f64, lon: f64) -> Result<GeocodeMatch, PipelineError> {
    let query = [
      ("lat", lat.to_string()),
      ("lon", lon.to_string()),
      ("format", "json".to_string()),
      ("addressdetails", "1".to_string()),
      ("zoom", "18".to_string()),
    ];
    let value: serde_json::Value = self.get_json("reverse", &query).await?;
    // Nominatim answers unknown coordinates with 200 + {"error": "..."}.
    if let Some(msg) = value.get("error").and_then(|e| e.as_str()) {
      return Err(PipelineError::LocationUnavailable(msg.to_string()));
    }
    serde_json::from_value(value).map_err(|e| PipelineError::Decode(e.to_string()))
  }

  #[instrument(level = "debug", skip(self), fields(query_len = query.len()))]
  async fn search(&self, query: &str) -> Result<Vec<GeocodeMatch>, PipelineError> {
    let params = [
      ("q", query.to_string()),
      ("format", "json".to_string()),
      ("addressdetails", "1".to_string()),
      ("limit", SEARCH_LIMIT.to_string()),
    ];
    let matches: Vec<GeocodeMatch> = self.get_json("search", &params).await?;
    debug!(target: "place", count = matches.len(), "Nominatim search results");
    Ok(matches)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;
  use wiremock::matchers::{header, method, path, query_param};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  #[tokio::test]
  async fn reverse_parses_string_coordinates_and_address() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/reverse"))
      .and(query_param("zoom", "18"))
      .and(header("user-agent", APP_USER_AGENT))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "lat": "18.5195", "lon": "73.8553",
        "name": "Shaniwar Wada",
        "display_name": "Shaniwar Wada, Shaniwar Peth, Pune, Maharashtra, India",
        "address": { "city": "Pune", "state": "Maharashtra", "country": "India" }
      })))
      .mount(&server)
      .await;

    let m = NominatimClient::new(server.uri()).unwrap().reverse(18.5195, 73.8553).await.unwrap();
    assert_eq!(m.name.as_deref(), Some("Shaniwar Wada"));
    assert!((m.lat - 18.5195).abs() < 1e-9);
    assert_eq!(m.address.unwrap().city.as_deref(), Some("Pune"));
  }

  #[tokio::test]
  async fn reverse_error_body_is_location_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/reverse"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "error": "Unable to geocode" })))
      .mount(&server)
      .await;

    let err = NominatimClient::new(server.uri()).unwrap().reverse(0.0, 0.0).await.unwrap_err();
    assert_eq!(err, PipelineError::LocationUnavailable("Unable to geocode".into()));
  }

  #[tokio::test]
  async fn search_surfaces_http_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/search"))
      .respond_with(ResponseTemplate::new(503))
      .mount(&server)
      .await;

    let err = NominatimClient::new(server.uri()).unwrap().search("pune").await.unwrap_err();
    assert!(matches!(err, PipelineError::Provider { provider: "nominatim", .. }));
  }

  #[tokio::test]
  async fn search_sends_limit_and_returns_all_matches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/search"))
      .and(query_param("q", "Aga Khan Palace"))
      .and(query_param("limit", "5"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!([
        { "lat": "18.5523", "lon": "73.9015", "display_name": "Aga Khan Palace, Pune, India" },
        { "lat": 18.0, "lon": 73.0, "display_name": "Aga Khan Palace Road, Pune, India" }
      ])))
      .mount(&server)
      .await;

    let out = NominatimClient::new(server.uri()).unwrap().search("Aga Khan Palace").await.unwrap();
    assert_eq!(out.len(), 2);
    assert_eq!(out[1].lat, 18.0);
  }
}
