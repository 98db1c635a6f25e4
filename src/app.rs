use axum::{response::Json as JsonResponse, routing::get, Router};
use serde_json::{json, Value};
use tower_http::{
  cors::{Any, CorsLayer},
  trace::TraceLayer,
};

use crate::{
  domains::{
    comment::rest::comment_routes, experience::rest::experience_routes, photo::rest::photo_routes,
    place::rest::place_routes, route::rest::route_routes,
  },
  state::SharedAppState,
};

pub fn create_app(state: SharedAppState) -> Router {
  let api = experience_routes()
    .merge(photo_routes(state.max_photo_size))
    .merge(comment_routes())
    .merge(route_routes())
    .merge(place_routes());

  let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

  Router::new()
    .route("/health", get(health_handler))
    .nest("/api/v1", api)
    .layer(cors)
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

pub async fn health_handler() -> JsonResponse<Value> {
  JsonResponse(json!({ "status": "ok" }))
}
