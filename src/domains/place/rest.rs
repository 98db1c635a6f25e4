use axum::{
  extract::{Json, State},
  response::Json as JsonResponse,
  routing::{get, post},
  Router,
};

use super::model::{PlaceLookup, PlaceLookupRequest, UsageResponse};
use crate::{middleware::auth::AuthUser, state::SharedAppState, AppError};

pub fn place_routes() -> Router<SharedAppState> {
  Router::new()
    .route("/places/lookup", post(lookup_place_handler))
    .route("/places/usage", get(usage_handler))
}

/// 月間の上限は全利用者で共有するため、認証済みの利用者に限る
async fn lookup_place_handler(
  State(state): State<SharedAppState>,
  AuthUser(user_id): AuthUser,
  Json(payload): Json<PlaceLookupRequest>,
) -> Result<JsonResponse<PlaceLookup>, AppError> {
  tracing::debug!("Place lookup by user {} (consent: {})", user_id, payload.consent);
  state
    .place_service
    .lookup_place(payload)
    .await
    .map(JsonResponse)
    .map_err(Into::into)
}

async fn usage_handler(State(state): State<SharedAppState>) -> JsonResponse<UsageResponse> {
  JsonResponse(state.place_service.usage())
}

#[cfg(test)]
mod tests {
  use crate::{
    domains::place::model::{LookupSource, PlaceLookup, UsageResponse},
    places::{PlacesError, PlacesLookupService},
    test_support::{bearer_token, get, post_json, TestApp},
    utils::geo::Coordinate,
  };
  use async_trait::async_trait;
  use axum::http::StatusCode;
  use serde_json::json;
  use std::sync::Arc;

  struct FailingPlaces;

  #[async_trait]
  impl PlacesLookupService for FailingPlaces {
    async fn find_nearby(
      &self,
      _coordinate: Coordinate,
    ) -> Result<Option<crate::domains::place::model::PlaceInfo>, PlacesError> {
      Err(PlacesError::Upstream {
        status: "REQUEST_DENIED".to_string(),
        message: None,
      })
    }
  }

  #[tokio::test]
  async fn lookup_and_usage() {
    let app = TestApp::new();
    let token = bearer_token(&app, 4);
    let (status, body) = post_json(
      app.router(),
      "/api/v1/places/lookup",
      &json!({"latitude": 35.0, "longitude": 139.0, "consent": false}),
      Some(&token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let lookup: PlaceLookup = serde_json::from_slice(&body).expect("deserialize response");
    assert_eq!(lookup.source, LookupSource::Fallback);

    let (status, body) = get(app.router(), "/api/v1/places/usage").await;
    assert_eq!(status, StatusCode::OK);
    let usage: UsageResponse = serde_json::from_slice(&body).expect("deserialize response");
    assert_eq!(usage.usage.limit, 100);
    assert_eq!(usage.usage.count, 0);
    assert_eq!(usage.cached_places, 0);
  }

  #[tokio::test]
  async fn upstream_failure_is_bad_gateway() {
    let service: Arc<dyn PlacesLookupService> = Arc::new(FailingPlaces);
    let app = TestApp::with_places(Some(service));
    let token = bearer_token(&app, 4);
    let (status, _) = post_json(
      app.router(),
      "/api/v1/places/lookup",
      &json!({"latitude": 35.0, "longitude": 139.0, "consent": true}),
      Some(&token),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
  }

  #[tokio::test]
  async fn lookup_requires_authentication() {
    let service: Arc<dyn PlacesLookupService> = Arc::new(FailingPlaces);
    let app = TestApp::with_places(Some(service));
    let (status, _) = post_json(
      app.router(),
      "/api/v1/places/lookup",
      &json!({"latitude": 35.0, "longitude": 139.0, "consent": true}),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, body) = get(app.router(), "/api/v1/places/usage").await;
    let usage: UsageResponse = serde_json::from_slice(&body).expect("deserialize response");
    assert_eq!(usage.usage.count, 0);
  }
}
