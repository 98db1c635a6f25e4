use axum::{
  extract::{Json, Path, Query, State},
  http::StatusCode,
  response::Json as JsonResponse,
  routing::get,
  Router,
};

use super::model::{CandidateQuery, CreateRouteRequest, Route};
use crate::{middleware::auth::MaybeAuthUser, ranking::RankedExperience, state::SharedAppState, AppError};

pub fn route_routes() -> Router<SharedAppState> {
  Router::new()
    .route("/routes", get(list_routes_handler).post(create_route_handler))
    .route("/routes/candidates", get(route_candidates_handler))
    .route("/routes/{id}", get(get_route_handler))
}

async fn list_routes_handler(State(state): State<SharedAppState>) -> Result<JsonResponse<Vec<Route>>, AppError> {
  state
    .route_service
    .list_routes()
    .await
    .map(JsonResponse)
    .map_err(Into::into)
}

async fn create_route_handler(
  State(state): State<SharedAppState>,
  MaybeAuthUser(user_id): MaybeAuthUser,
  Json(payload): Json<CreateRouteRequest>,
) -> Result<(StatusCode, JsonResponse<Route>), AppError> {
  let route = state.route_service.create_route(user_id, payload).await?;
  Ok((StatusCode::CREATED, JsonResponse(route)))
}

async fn get_route_handler(
  State(state): State<SharedAppState>,
  Path(id): Path<i32>,
) -> Result<JsonResponse<Route>, AppError> {
  state
    .route_service
    .get_route(id)
    .await
    .map(JsonResponse)
    .map_err(Into::into)
}

async fn route_candidates_handler(
  State(state): State<SharedAppState>,
  Query(query): Query<CandidateQuery>,
) -> Result<JsonResponse<Vec<RankedExperience>>, AppError> {
  state
    .route_service
    .route_candidates(query)
    .await
    .map(JsonResponse)
    .map_err(Into::into)
}
