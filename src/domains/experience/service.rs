use async_trait::async_trait;
use std::{error::Error, time::Duration};
use validator::Validate;

use super::{
  model::{reference_point, CreateExperienceRequest, Experience, ExperienceListQuery, NearbyQuery},
  repository::ExperienceRepository,
};
use crate::{
  impl_service_error_conversions,
  ranking::{rank, ExperienceBrowser, FilterCriteria, RankedExperience, RankedPage, SortKey, SortOrder},
  utils::retry::{with_retry, MAX_ATTEMPTS, RETRY_DELAY},
};

pub const DEFAULT_NEARBY_RADIUS_KM: f64 = 1.0;

#[derive(Debug)]
pub enum ExperienceServiceError {
  BadRequest(String),
  NotFound(String),
  InternalServerError(String),
}

impl Error for ExperienceServiceError {}

impl std::fmt::Display for ExperienceServiceError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      ExperienceServiceError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
      ExperienceServiceError::NotFound(msg) => write!(f, "Not Found: {}", msg),
      ExperienceServiceError::InternalServerError(msg) => write!(f, "Internal Server Error: {}", msg),
    }
  }
}

impl_service_error_conversions!(ExperienceServiceError, InternalServerError, NotFound);

#[async_trait]
pub trait ExperienceService: Send + Sync {
  async fn list_experiences(&self, query: ExperienceListQuery) -> Result<RankedPage, ExperienceServiceError>;
  async fn nearby_experiences(&self, query: NearbyQuery) -> Result<Vec<RankedExperience>, ExperienceServiceError>;
  async fn get_experience(&self, id: i32) -> Result<Experience, ExperienceServiceError>;
  async fn create_experience(
    &self,
    user_id: Option<i32>,
    req: CreateExperienceRequest,
  ) -> Result<Experience, ExperienceServiceError>;
}

pub struct ExperienceServiceImpl<R> {
  repository: R,
  retry_delay: Duration,
}

impl<R> ExperienceServiceImpl<R>
where
  R: ExperienceRepository,
{
  pub fn new(repository: R) -> Self {
    Self {
      repository,
      retry_delay: RETRY_DELAY,
    }
  }

  pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
    self.retry_delay = retry_delay;
    self
  }

  async fn fetch_all(&self) -> Result<Vec<Experience>, ExperienceServiceError> {
    let experiences = with_retry("fetch experiences", MAX_ATTEMPTS, self.retry_delay, || {
      self.repository.find_all()
    })
    .await?;
    Ok(experiences)
  }
}

#[async_trait]
impl<R> ExperienceService for ExperienceServiceImpl<R>
where
  R: ExperienceRepository,
{
  async fn list_experiences(&self, query: ExperienceListQuery) -> Result<RankedPage, ExperienceServiceError> {
    let criteria = query.criteria().map_err(ExperienceServiceError::BadRequest)?;
    let reference = query.reference_point().map_err(ExperienceServiceError::BadRequest)?;

    let mut browser = ExperienceBrowser::with_inputs(self.fetch_all().await?, criteria, reference);
    browser.go_to_page(query.page.unwrap_or(1));

    Ok(browser.current())
  }

  async fn nearby_experiences(&self, query: NearbyQuery) -> Result<Vec<RankedExperience>, ExperienceServiceError> {
    let center = reference_point(Some(query.lat), Some(query.lng))
      .map_err(ExperienceServiceError::BadRequest)?
      .ok_or_else(|| ExperienceServiceError::BadRequest("lat と lng を指定してください".to_string()))?;

    let radius_km = query.radius_km.unwrap_or(DEFAULT_NEARBY_RADIUS_KM);
    if !radius_km.is_finite() || radius_km < 0.0 {
      return Err(ExperienceServiceError::BadRequest(
        "radius_km は0以上である必要があります".to_string(),
      ));
    }

    let criteria = FilterCriteria {
      max_distance: Some(radius_km),
      sort_by: SortKey::Distance,
      sort_order: SortOrder::Asc,
      ..Default::default()
    };

    Ok(rank(&self.fetch_all().await?, &criteria, Some(center)))
  }

  async fn get_experience(&self, id: i32) -> Result<Experience, ExperienceServiceError> {
    self
      .repository
      .find_by_id(id)
      .await?
      .ok_or_else(|| ExperienceServiceError::NotFound(format!("体験が見つかりません: {}", id)))
  }

  async fn create_experience(
    &self,
    user_id: Option<i32>,
    mut req: CreateExperienceRequest,
  ) -> Result<Experience, ExperienceServiceError> {
    req
      .validate()
      .map_err(|e| ExperienceServiceError::BadRequest(format!("Validation failed: {}", e)))?;

    if req.place.as_ref().is_some_and(|place| place.is_empty()) {
      req.place = None;
    }

    let experience = self.repository.create(user_id, &req).await?;
    tracing::info!(
      "Experience {} created ({}, user: {:?})",
      experience.id,
      experience.category,
      user_id
    );
    Ok(experience)
  }
}
