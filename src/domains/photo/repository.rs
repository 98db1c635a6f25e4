use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use super::model::{NewPhoto, Photo};
use crate::db::RepositoryError;

const PHOTO_COLUMNS: &str = "id, experience_id, user_id, photo_url, photo_thumbnail_url, caption, file_size, \
   mime_type, is_primary, created_at, updated_at";

#[async_trait]
pub trait PhotoRepository: Send + Sync {
  /// 新しい順
  async fn list_by_experience(&self, experience_id: i32) -> Result<Vec<Photo>, RepositoryError>;
  async fn list_by_user(&self, user_id: i32, limit: i64) -> Result<Vec<Photo>, RepositoryError>;
  async fn find_by_id(&self, id: i32) -> Result<Option<Photo>, RepositoryError>;
  /// `is_primary` の場合は同じ体験の他の写真の代表設定を外す
  async fn create(&self, photo: NewPhoto) -> Result<Photo, RepositoryError>;
  async fn update(&self, id: i32, caption: Option<String>, is_primary: Option<bool>) -> Result<Photo, RepositoryError>;
  async fn set_primary(&self, experience_id: i32, photo_id: i32) -> Result<Photo, RepositoryError>;
  async fn delete(&self, id: i32) -> Result<(), RepositoryError>;
}

#[derive(Clone)]
pub struct SqlxPhotoRepository {
  pool: PgPool,
}

impl SqlxPhotoRepository {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

async fn clear_primary(
  tx: &mut Transaction<'_, Postgres>,
  experience_id: i32,
  except: Option<i32>,
) -> Result<(), sqlx::Error> {
  sqlx::query(
    "UPDATE experience_photos SET is_primary = FALSE, updated_at = NOW() \
     WHERE experience_id = $1 AND is_primary AND ($2::INT IS NULL OR id <> $2)",
  )
  .bind(experience_id)
  .bind(except)
  .execute(&mut **tx)
  .await?;
  Ok(())
}

#[async_trait]
impl PhotoRepository for SqlxPhotoRepository {
  async fn list_by_experience(&self, experience_id: i32) -> Result<Vec<Photo>, RepositoryError> {
    let photos = sqlx::query_as::<_, Photo>(&format!(
      "SELECT {PHOTO_COLUMNS} FROM experience_photos WHERE experience_id = $1 ORDER BY created_at DESC, id DESC"
    ))
    .bind(experience_id)
    .fetch_all(&self.pool)
    .await?;
    Ok(photos)
  }

  async fn list_by_user(&self, user_id: i32, limit: i64) -> Result<Vec<Photo>, RepositoryError> {
    let photos = sqlx::query_as::<_, Photo>(&format!(
      "SELECT {PHOTO_COLUMNS} FROM experience_photos WHERE user_id = $1 ORDER BY created_at DESC, id DESC LIMIT $2"
    ))
    .bind(user_id)
    .bind(limit)
    .fetch_all(&self.pool)
    .await?;
    Ok(photos)
  }

  async fn find_by_id(&self, id: i32) -> Result<Option<Photo>, RepositoryError> {
    let photo = sqlx::query_as::<_, Photo>(&format!("SELECT {PHOTO_COLUMNS} FROM experience_photos WHERE id = $1"))
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(photo)
  }

  async fn create(&self, photo: NewPhoto) -> Result<Photo, RepositoryError> {
    let mut tx = self.pool.begin().await?;

    if photo.is_primary {
      clear_primary(&mut tx, photo.experience_id, None).await?;
    }

    let created = sqlx::query_as::<_, Photo>(&format!(
      r#"
        INSERT INTO experience_photos (experience_id, user_id, photo_url, caption, file_size, mime_type, is_primary)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {PHOTO_COLUMNS}
      "#
    ))
    .bind(photo.experience_id)
    .bind(photo.user_id)
    .bind(&photo.photo_url)
    .bind(&photo.caption)
    .bind(photo.file_size)
    .bind(&photo.mime_type)
    .bind(photo.is_primary)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(created)
  }

  async fn update(&self, id: i32, caption: Option<String>, is_primary: Option<bool>) -> Result<Photo, RepositoryError> {
    let mut tx = self.pool.begin().await?;

    if is_primary == Some(true) {
      let current = sqlx::query_as::<_, Photo>(&format!("SELECT {PHOTO_COLUMNS} FROM experience_photos WHERE id = $1"))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| RepositoryError::NotFound(format!("photo {}", id)))?;
      clear_primary(&mut tx, current.experience_id, Some(id)).await?;
    }

    let updated = sqlx::query_as::<_, Photo>(&format!(
      r#"
        UPDATE experience_photos
        SET caption = COALESCE($2, caption), is_primary = COALESCE($3, is_primary), updated_at = NOW()
        WHERE id = $1
        RETURNING {PHOTO_COLUMNS}
      "#
    ))
    .bind(id)
    .bind(caption)
    .bind(is_primary)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| RepositoryError::NotFound(format!("photo {}", id)))?;

    tx.commit().await?;
    Ok(updated)
  }

  async fn set_primary(&self, experience_id: i32, photo_id: i32) -> Result<Photo, RepositoryError> {
    let mut tx = self.pool.begin().await?;

    clear_primary(&mut tx, experience_id, Some(photo_id)).await?;

    let photo = sqlx::query_as::<_, Photo>(&format!(
      r#"
        UPDATE experience_photos SET is_primary = TRUE, updated_at = NOW()
        WHERE id = $1 AND experience_id = $2
        RETURNING {PHOTO_COLUMNS}
      "#
    ))
    .bind(photo_id)
    .bind(experience_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| RepositoryError::NotFound(format!("photo {} of experience {}", photo_id, experience_id)))?;

    tx.commit().await?;
    Ok(photo)
  }

  async fn delete(&self, id: i32) -> Result<(), RepositoryError> {
    let result = sqlx::query("DELETE FROM experience_photos WHERE id = $1")
      .bind(id)
      .execute(&self.pool)
      .await?;

    if result.rows_affected() == 0 {
      return Err(RepositoryError::NotFound(format!("photo {}", id)));
    }
    Ok(())
  }
}
