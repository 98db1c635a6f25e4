use async_trait::async_trait;
use chrono::Utc;
use std::{error::Error, sync::Arc};
use uuid::Uuid;
use validator::Validate;

use super::{
  model::{NewPhoto, Photo, PhotoUpload, UpdatePhotoRequest},
  repository::PhotoRepository,
};
use crate::{
  domains::experience::repository::ExperienceRepository, impl_service_error_conversions, storage::PhotoStorage,
};

#[derive(Debug)]
pub enum PhotoServiceError {
  BadRequest(String),
  NotFound(String),
  Forbidden(String),
  InternalServerError(String),
}

impl Error for PhotoServiceError {}

impl std::fmt::Display for PhotoServiceError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      PhotoServiceError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
      PhotoServiceError::NotFound(msg) => write!(f, "Not Found: {}", msg),
      PhotoServiceError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
      PhotoServiceError::InternalServerError(msg) => write!(f, "Internal Server Error: {}", msg),
    }
  }
}

impl_service_error_conversions!(PhotoServiceError, InternalServerError, NotFound);

#[async_trait]
pub trait PhotoService: Send + Sync {
  async fn list_photos(&self, experience_id: i32) -> Result<Vec<Photo>, PhotoServiceError>;
  async fn list_user_photos(&self, user_id: i32, limit: i64) -> Result<Vec<Photo>, PhotoServiceError>;
  async fn upload_photo(
    &self,
    experience_id: i32,
    user_id: i32,
    upload: PhotoUpload,
  ) -> Result<Photo, PhotoServiceError>;
  async fn update_photo(
    &self,
    photo_id: i32,
    user_id: i32,
    req: UpdatePhotoRequest,
  ) -> Result<Photo, PhotoServiceError>;
  async fn delete_photo(&self, photo_id: i32, user_id: i32) -> Result<(), PhotoServiceError>;
  async fn set_primary_photo(&self, experience_id: i32, photo_id: i32, user_id: i32)
    -> Result<Photo, PhotoServiceError>;
}

pub struct PhotoServiceImpl<P, E> {
  photos: P,
  experiences: E,
  storage: Arc<dyn PhotoStorage>,
  max_file_size: usize,
}

impl<P, E> PhotoServiceImpl<P, E>
where
  P: PhotoRepository,
  E: ExperienceRepository,
{
  pub fn new(photos: P, experiences: E, storage: Arc<dyn PhotoStorage>, max_file_size: usize) -> Self {
    Self {
      photos,
      experiences,
      storage,
      max_file_size,
    }
  }

  async fn ensure_experience(&self, experience_id: i32) -> Result<(), PhotoServiceError> {
    match self.experiences.find_by_id(experience_id).await? {
      Some(_) => Ok(()),
      None => Err(PhotoServiceError::NotFound(format!("体験が見つかりません: {}", experience_id))),
    }
  }

  async fn owned_photo(&self, photo_id: i32, user_id: i32) -> Result<Photo, PhotoServiceError> {
    let photo = self
      .photos
      .find_by_id(photo_id)
      .await?
      .ok_or_else(|| PhotoServiceError::NotFound(format!("写真が見つかりません: {}", photo_id)))?;

    if photo.user_id != user_id {
      return Err(PhotoServiceError::Forbidden(
        "他のユーザーの写真は変更できません".to_string(),
      ));
    }
    Ok(photo)
  }
}

/// `{体験ID}/{ユーザーID}/{ミリ秒}_{ランダム}.{拡張子}`
pub fn object_key(experience_id: i32, user_id: i32, extension: &str) -> String {
  format!(
    "{}/{}/{}_{}.{}",
    experience_id,
    user_id,
    Utc::now().timestamp_millis(),
    Uuid::new_v4().simple(),
    extension
  )
}

#[async_trait]
impl<P, E> PhotoService for PhotoServiceImpl<P, E>
where
  P: PhotoRepository,
  E: ExperienceRepository,
{
  async fn list_photos(&self, experience_id: i32) -> Result<Vec<Photo>, PhotoServiceError> {
    self.ensure_experience(experience_id).await?;
    Ok(self.photos.list_by_experience(experience_id).await?)
  }

  async fn list_user_photos(&self, user_id: i32, limit: i64) -> Result<Vec<Photo>, PhotoServiceError> {
    Ok(self.photos.list_by_user(user_id, limit).await?)
  }

  async fn upload_photo(
    &self,
    experience_id: i32,
    user_id: i32,
    upload: PhotoUpload,
  ) -> Result<Photo, PhotoServiceError> {
    if !upload.is_image() {
      return Err(PhotoServiceError::BadRequest(
        "画像ファイルのみアップロードできます".to_string(),
      ));
    }
    if upload.data.is_empty() {
      return Err(PhotoServiceError::BadRequest("ファイルが空です".to_string()));
    }
    if upload.data.len() > self.max_file_size {
      return Err(PhotoServiceError::BadRequest(format!(
        "ファイルサイズは{}MB以下である必要があります",
        self.max_file_size / (1024 * 1024)
      )));
    }
    UpdatePhotoRequest {
      caption: upload.caption.clone(),
      is_primary: None,
    }
    .validate()
    .map_err(|e| PhotoServiceError::BadRequest(format!("Validation failed: {}", e)))?;

    self.ensure_experience(experience_id).await?;

    let key = object_key(experience_id, user_id, &upload.extension());
    let file_size = upload.data.len() as i64;
    let photo_url = self
      .storage
      .upload_file(&key, upload.data, &upload.content_type)
      .await
      .map_err(|e| PhotoServiceError::InternalServerError(format!("Failed to upload photo: {}", e)))?;

    let photo = self
      .photos
      .create(NewPhoto {
        experience_id,
        user_id,
        photo_url,
        caption: upload.caption.filter(|c| !c.trim().is_empty()),
        file_size,
        mime_type: upload.content_type,
        is_primary: upload.is_primary,
      })
      .await;

    match photo {
      Ok(photo) => {
        tracing::info!("Photo {} uploaded to experience {} by user {}", photo.id, experience_id, user_id);
        Ok(photo)
      }
      Err(e) => {
        // 行を作れなかった場合はアップロード済みのファイルを消す
        if let Err(cleanup) = self.storage.delete_file(&key).await {
          tracing::warn!("Failed to remove orphaned photo {}: {}", key, cleanup);
        }
        Err(e.into())
      }
    }
  }

  async fn update_photo(
    &self,
    photo_id: i32,
    user_id: i32,
    req: UpdatePhotoRequest,
  ) -> Result<Photo, PhotoServiceError> {
    req
      .validate()
      .map_err(|e| PhotoServiceError::BadRequest(format!("Validation failed: {}", e)))?;
    self.owned_photo(photo_id, user_id).await?;

    Ok(self.photos.update(photo_id, req.caption, req.is_primary).await?)
  }

  async fn delete_photo(&self, photo_id: i32, user_id: i32) -> Result<(), PhotoServiceError> {
    let photo = self.owned_photo(photo_id, user_id).await?;
    self.photos.delete(photo_id).await?;

    match self.storage.extract_key_from_url(&photo.photo_url) {
      Some(key) => {
        if let Err(e) = self.storage.delete_file(&key).await {
          tracing::warn!("Photo {} deleted but file {} remains: {}", photo_id, key, e);
        }
      }
      None => tracing::warn!("Photo {} has an unrecognized URL: {}", photo_id, photo.photo_url),
    }

    tracing::info!("Photo {} deleted by user {}", photo_id, user_id);
    Ok(())
  }

  async fn set_primary_photo(
    &self,
    experience_id: i32,
    photo_id: i32,
    user_id: i32,
  ) -> Result<Photo, PhotoServiceError> {
    let photo = self.owned_photo(photo_id, user_id).await?;
    if photo.experience_id != experience_id {
      return Err(PhotoServiceError::NotFound(format!(
        "写真 {} は体験 {} に属していません",
        photo_id, experience_id
      )));
    }

    Ok(self.photos.set_primary(experience_id, photo_id).await?)
  }
}
