use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use super::{PlacesError, PlacesLookupService};
use crate::{domains::place::model::PlaceInfo, utils::geo::Coordinate};

pub const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com/maps/api/place";
const SEARCH_RADIUS_M: u32 = 50;
const DETAIL_FIELDS: &str = "name,website,url,international_phone_number,place_id";

#[derive(Debug, Deserialize)]
struct NearbyResponse {
  status: String,
  #[serde(default)]
  results: Vec<NearbyResult>,
  error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NearbyResult {
  place_id: String,
}

#[derive(Debug, Deserialize)]
struct DetailsResponse {
  status: String,
  result: Option<PlaceDetails>,
  error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaceDetails {
  place_id: Option<String>,
  name: Option<String>,
  website: Option<String>,
  url: Option<String>,
  international_phone_number: Option<String>,
}

impl From<PlaceDetails> for PlaceInfo {
  fn from(details: PlaceDetails) -> Self {
    PlaceInfo {
      place_id: details.place_id,
      place_name: details.name,
      website: details.website,
      google_url: details.url,
      phone: details.international_phone_number,
    }
  }
}

fn check_status(status: String, message: Option<String>) -> Result<bool, PlacesError> {
  match status.as_str() {
    "OK" => Ok(true),
    "ZERO_RESULTS" | "NOT_FOUND" => Ok(false),
    _ => Err(PlacesError::Upstream { status, message }),
  }
}

/// Google Places Web API（Nearby Search と Place Details）のクライアント
pub struct GooglePlacesClient {
  client: reqwest::Client,
  api_key: String,
  base_url: String,
}

impl GooglePlacesClient {
  pub fn new(api_key: String, base_url: String) -> Self {
    Self {
      client: reqwest::Client::new(),
      api_key,
      base_url: base_url.trim_end_matches('/').to_string(),
    }
  }

  async fn nearest_place_id(&self, coordinate: Coordinate) -> Result<Option<String>, PlacesError> {
    let url = format!("{}/nearbysearch/json", self.base_url);
    let location = format!("{},{}", coordinate.lat, coordinate.lng);
    let radius = SEARCH_RADIUS_M.to_string();

    let response: NearbyResponse = self
      .client
      .get(&url)
      .query(&[
        ("location", location.as_str()),
        ("radius", radius.as_str()),
        ("type", "establishment"),
        ("key", self.api_key.as_str()),
      ])
      .send()
      .await?
      .error_for_status()?
      .json()
      .await?;

    if !check_status(response.status, response.error_message)? {
      return Ok(None);
    }
    Ok(response.results.into_iter().next().map(|r| r.place_id))
  }

  async fn place_details(&self, place_id: &str) -> Result<Option<PlaceInfo>, PlacesError> {
    let url = format!("{}/details/json", self.base_url);

    let response: DetailsResponse = self
      .client
      .get(&url)
      .query(&[
        ("place_id", place_id),
        ("fields", DETAIL_FIELDS),
        ("key", self.api_key.as_str()),
      ])
      .send()
      .await?
      .error_for_status()?
      .json()
      .await?;

    if !check_status(response.status, response.error_message)? {
      return Ok(None);
    }
    Ok(response.result.map(PlaceInfo::from))
  }
}

#[async_trait]
impl PlacesLookupService for GooglePlacesClient {
  async fn find_nearby(&self, coordinate: Coordinate) -> Result<Option<PlaceInfo>, PlacesError> {
    info!("Looking up place near {}", coordinate.key());

    let Some(place_id) = self.nearest_place_id(coordinate).await? else {
      return Ok(None);
    };
    self.place_details(&place_id).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use axum::{extract::Query, routing::get, Json, Router};
  use serde_json::{json, Value};
  use std::collections::HashMap;

  async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
      axum::serve(listener, router).await.expect("serve");
    });
    format!("http://{}", addr)
  }

  fn fake_google() -> Router {
    Router::new()
      .route(
        "/nearbysearch/json",
        get(|Query(params): Query<HashMap<String, String>>| async move {
          if params.get("location").map(String::as_str) == Some("0,0") {
            return Json(json!({ "status": "ZERO_RESULTS", "results": [] }));
          }
          if params.get("key").map(String::as_str) != Some("test-key") {
            return Json(json!({ "status": "REQUEST_DENIED", "error_message": "bad key" }));
          }
          Json(json!({ "status": "OK", "results": [{ "place_id": "abc" }, { "place_id": "def" }] }))
        }),
      )
      .route(
        "/details/json",
        get(|Query(params): Query<HashMap<String, String>>| async move {
          let body: Value = json!({
            "status": "OK",
            "result": {
              "place_id": params.get("place_id"),
              "name": "珈琲店",
              "url": "https://maps.google.com/?cid=1",
              "international_phone_number": "+81 3-0000-0000"
            }
          });
          Json(body)
        }),
      )
  }

  #[tokio::test]
  async fn finds_nearest_place_details() {
    let base_url = serve(fake_google()).await;
    let client = GooglePlacesClient::new("test-key".to_string(), format!("{}/", base_url));

    let place = client
      .find_nearby(Coordinate::new(35.0, 139.0))
      .await
      .expect("lookup succeeds")
      .expect("place found");

    assert_eq!(place.place_id.as_deref(), Some("abc"));
    assert_eq!(place.place_name.as_deref(), Some("珈琲店"));
    assert_eq!(place.website, None);
    assert_eq!(place.phone.as_deref(), Some("+81 3-0000-0000"));
  }

  #[tokio::test]
  async fn zero_results_is_not_an_error() {
    let base_url = serve(fake_google()).await;
    let client = GooglePlacesClient::new("test-key".to_string(), base_url);

    let place = client.find_nearby(Coordinate::new(0.0, 0.0)).await.expect("lookup succeeds");
    assert!(place.is_none());
  }

  #[tokio::test]
  async fn denied_request_is_an_upstream_error() {
    let base_url = serve(fake_google()).await;
    let client = GooglePlacesClient::new("wrong".to_string(), base_url);

    let err = client
      .find_nearby(Coordinate::new(35.0, 139.0))
      .await
      .expect_err("lookup fails");
    assert!(matches!(err, PlacesError::Upstream { ref status, .. } if status == "REQUEST_DENIED"));
    assert!(err.to_string().contains("bad key"));
  }
}
