use axum::{
  extract::{DefaultBodyLimit, Json, Multipart, Path, Query, State},
  http::StatusCode,
  response::Json as JsonResponse,
  routing::{get, patch, put},
  Router,
};

use super::model::{Photo, PhotoUpload, UpdatePhotoRequest};
use crate::{domains::LimitQuery, middleware::auth::AuthUser, state::SharedAppState, AppError};

/// multipart のヘッダーやキャプション分の余裕
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn photo_routes(max_photo_size: usize) -> Router<SharedAppState> {
  Router::new()
    .route(
      "/experiences/{id}/photos",
      get(list_photos_handler)
        .post(upload_photo_handler)
        .layer(DefaultBodyLimit::max(max_photo_size.saturating_add(MULTIPART_OVERHEAD))),
    )
    .route("/experiences/{id}/photos/{photo_id}/primary", put(set_primary_photo_handler))
    .route("/photos/{id}", patch(update_photo_handler).delete(delete_photo_handler))
    .route("/users/{id}/photos", get(list_user_photos_handler))
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> AppError {
  AppError::new(e.status(), e.body_text())
}

async fn read_upload(mut multipart: Multipart) -> Result<PhotoUpload, AppError> {
  let mut file: Option<(String, String, Vec<u8>)> = None;
  let mut caption = None;
  let mut is_primary = false;

  while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
    match field.name() {
      Some("file") => {
        let file_name = field.file_name().unwrap_or("photo").to_string();
        let content_type = field.content_type().unwrap_or("application/octet-stream").to_string();
        let data = field.bytes().await.map_err(multipart_error)?;
        file = Some((file_name, content_type, data.to_vec()));
      }
      Some("caption") => caption = Some(field.text().await.map_err(multipart_error)?),
      Some("is_primary") => {
        let value = field.text().await.map_err(multipart_error)?;
        is_primary = matches!(value.trim(), "true" | "1" | "on");
      }
      _ => {}
    }
  }

  let (file_name, content_type, data) = file.ok_or_else(|| AppError::bad_request("file フィールドが必要です"))?;

  Ok(PhotoUpload {
    file_name,
    content_type,
    data,
    caption,
    is_primary,
  })
}

async fn list_photos_handler(
  State(state): State<SharedAppState>,
  Path(experience_id): Path<i32>,
) -> Result<JsonResponse<Vec<Photo>>, AppError> {
  state
    .photo_service
    .list_photos(experience_id)
    .await
    .map(JsonResponse)
    .map_err(Into::into)
}

async fn upload_photo_handler(
  State(state): State<SharedAppState>,
  Path(experience_id): Path<i32>,
  AuthUser(user_id): AuthUser,
  multipart: Multipart,
) -> Result<(StatusCode, JsonResponse<Photo>), AppError> {
  let upload = read_upload(multipart).await?;
  let photo = state.photo_service.upload_photo(experience_id, user_id, upload).await?;
  Ok((StatusCode::CREATED, JsonResponse(photo)))
}

async fn set_primary_photo_handler(
  State(state): State<SharedAppState>,
  Path((experience_id, photo_id)): Path<(i32, i32)>,
  AuthUser(user_id): AuthUser,
) -> Result<JsonResponse<Photo>, AppError> {
  state
    .photo_service
    .set_primary_photo(experience_id, photo_id, user_id)
    .await
    .map(JsonResponse)
    .map_err(Into::into)
}

async fn update_photo_handler(
  State(state): State<SharedAppState>,
  Path(photo_id): Path<i32>,
  AuthUser(user_id): AuthUser,
  Json(payload): Json<UpdatePhotoRequest>,
) -> Result<JsonResponse<Photo>, AppError> {
  state
    .photo_service
    .update_photo(photo_id, user_id, payload)
    .await
    .map(JsonResponse)
    .map_err(Into::into)
}

async fn delete_photo_handler(
  State(state): State<SharedAppState>,
  Path(photo_id): Path<i32>,
  AuthUser(user_id): AuthUser,
) -> Result<StatusCode, AppError> {
  state.photo_service.delete_photo(photo_id, user_id).await?;
  Ok(StatusCode::NO_CONTENT)
}

async fn list_user_photos_handler(
  State(state): State<SharedAppState>,
  Path(user_id): Path<i32>,
  Query(query): Query<LimitQuery>,
) -> Result<JsonResponse<Vec<Photo>>, AppError> {
  state
    .photo_service
    .list_user_photos(user_id, query.resolved())
    .await
    .map(JsonResponse)
    .map_err(Into::into)
}
