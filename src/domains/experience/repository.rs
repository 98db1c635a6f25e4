use async_trait::async_trait;
use sqlx::PgPool;

use super::model::{CreateExperienceRequest, Experience, ExperienceRow};
use crate::db::RepositoryError;

const EXPERIENCE_COLUMNS: &str = "id, user_id, latitude, longitude, category, rating, address, age_group, gender, \
   time_of_day, place_id, place_name, website, google_url, phone, created_at";

#[async_trait]
pub trait ExperienceRepository: Send + Sync {
  /// 作成日時の降順
  async fn find_all(&self) -> Result<Vec<Experience>, RepositoryError>;
  async fn find_by_id(&self, id: i32) -> Result<Option<Experience>, RepositoryError>;
  async fn create(&self, user_id: Option<i32>, req: &CreateExperienceRequest) -> Result<Experience, RepositoryError>;
}

#[derive(Clone)]
pub struct SqlxExperienceRepository {
  pool: PgPool,
}

impl SqlxExperienceRepository {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

fn convert(row: ExperienceRow) -> Result<Experience, RepositoryError> {
  Experience::try_from(row).map_err(RepositoryError::InvalidRow)
}

#[async_trait]
impl ExperienceRepository for SqlxExperienceRepository {
  async fn find_all(&self) -> Result<Vec<Experience>, RepositoryError> {
    let rows = sqlx::query_as::<_, ExperienceRow>(&format!(
      "SELECT {EXPERIENCE_COLUMNS} FROM experiences ORDER BY created_at DESC, id DESC"
    ))
    .fetch_all(&self.pool)
    .await?;

    // 不正な行は一覧から除外する
    Ok(
      rows
        .into_iter()
        .filter_map(|row| match convert(row) {
          Ok(experience) => Some(experience),
          Err(e) => {
            tracing::warn!("Skipping experience row: {}", e);
            None
          }
        })
        .collect(),
    )
  }

  async fn find_by_id(&self, id: i32) -> Result<Option<Experience>, RepositoryError> {
    let row = sqlx::query_as::<_, ExperienceRow>(&format!("SELECT {EXPERIENCE_COLUMNS} FROM experiences WHERE id = $1"))
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;

    row.map(convert).transpose()
  }

  async fn create(&self, user_id: Option<i32>, req: &CreateExperienceRequest) -> Result<Experience, RepositoryError> {
    let place = req.place.clone().unwrap_or_default();

    let row = sqlx::query_as::<_, ExperienceRow>(&format!(
      r#"
        INSERT INTO experiences
          (user_id, latitude, longitude, category, rating, address, age_group, gender, time_of_day,
           place_id, place_name, website, google_url, phone)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        RETURNING {EXPERIENCE_COLUMNS}
      "#
    ))
    .bind(user_id)
    .bind(req.latitude)
    .bind(req.longitude)
    .bind(req.category.as_str())
    .bind(i16::from(req.rating))
    .bind(&req.address)
    .bind(req.age_group.as_str())
    .bind(req.gender.as_str())
    .bind(req.time_of_day.as_str())
    .bind(place.place_id)
    .bind(place.place_name)
    .bind(place.website)
    .bind(place.google_url)
    .bind(place.phone)
    .fetch_one(&self.pool)
    .await?;

    convert(row)
  }
}
