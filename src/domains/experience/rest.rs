use axum::{
  extract::{Json, Path, Query, State},
  http::StatusCode,
  response::Json as JsonResponse,
  routing::get,
  Router,
};

use super::model::{CreateExperienceRequest, Experience, ExperienceListQuery, NearbyQuery};
use crate::{
  middleware::auth::MaybeAuthUser,
  ranking::{RankedExperience, RankedPage},
  state::SharedAppState,
  AppError,
};

pub fn experience_routes() -> Router<SharedAppState> {
  Router::new()
    .route("/experiences", get(list_experiences_handler).post(create_experience_handler))
    .route("/experiences/nearby", get(nearby_experiences_handler))
    .route("/experiences/{id}", get(get_experience_handler))
}

async fn list_experiences_handler(
  State(state): State<SharedAppState>,
  Query(query): Query<ExperienceListQuery>,
) -> Result<JsonResponse<RankedPage>, AppError> {
  state
    .experience_service
    .list_experiences(query)
    .await
    .map(JsonResponse)
    .map_err(Into::into)
}

async fn nearby_experiences_handler(
  State(state): State<SharedAppState>,
  Query(query): Query<NearbyQuery>,
) -> Result<JsonResponse<Vec<RankedExperience>>, AppError> {
  state
    .experience_service
    .nearby_experiences(query)
    .await
    .map(JsonResponse)
    .map_err(Into::into)
}

async fn get_experience_handler(
  State(state): State<SharedAppState>,
  Path(id): Path<i32>,
) -> Result<JsonResponse<Experience>, AppError> {
  state
    .experience_service
    .get_experience(id)
    .await
    .map(JsonResponse)
    .map_err(Into::into)
}

async fn create_experience_handler(
  State(state): State<SharedAppState>,
  MaybeAuthUser(user_id): MaybeAuthUser,
  Json(payload): Json<CreateExperienceRequest>,
) -> Result<(StatusCode, JsonResponse<Experience>), AppError> {
  let experience = state.experience_service.create_experience(user_id, payload).await?;
  Ok((StatusCode::CREATED, JsonResponse(experience)))
}
