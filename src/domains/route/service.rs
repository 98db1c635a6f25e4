use async_trait::async_trait;
use std::{
  collections::{HashMap, HashSet},
  error::Error,
};
use validator::Validate;

use super::{
  model::{
    CandidateQuery, CreateRouteRequest, NewRoute, NewRouteStep, Route, RouteStepInput, DEFAULT_STAY_MINUTES,
    DEFAULT_TRAVEL_MINUTES, MAX_STEP_MINUTES, MIN_ROUTE_STEPS,
  },
  repository::RouteRepository,
};
use crate::{
  domains::experience::{
    model::{reference_point, Experience},
    repository::ExperienceRepository,
  },
  impl_service_error_conversions,
  ranking::{sort_by_distance, RankedExperience},
};

#[derive(Debug)]
pub enum RouteServiceError {
  BadRequest(String),
  NotFound(String),
  InternalServerError(String),
}

impl Error for RouteServiceError {}

impl std::fmt::Display for RouteServiceError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      RouteServiceError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
      RouteServiceError::NotFound(msg) => write!(f, "Not Found: {}", msg),
      RouteServiceError::InternalServerError(msg) => write!(f, "Internal Server Error: {}", msg),
    }
  }
}

impl_service_error_conversions!(RouteServiceError, InternalServerError, NotFound);

#[async_trait]
pub trait RouteService: Send + Sync {
  async fn create_route(&self, user_id: Option<i32>, req: CreateRouteRequest) -> Result<Route, RouteServiceError>;
  async fn list_routes(&self) -> Result<Vec<Route>, RouteServiceError>;
  async fn get_route(&self, id: i32) -> Result<Route, RouteServiceError>;
  async fn route_candidates(&self, query: CandidateQuery) -> Result<Vec<RankedExperience>, RouteServiceError>;
}

/// 既定の時間を埋めて順番を振る。最後のステップの移動時間は既定で0分
pub fn plan_steps(steps: &[RouteStepInput]) -> Result<Vec<NewRouteStep>, String> {
  if steps.len() < MIN_ROUTE_STEPS {
    return Err("ルートには2つ以上の体験が必要です".to_string());
  }

  let mut seen = HashSet::new();
  let last = steps.len() - 1;

  steps
    .iter()
    .enumerate()
    .map(|(index, step)| {
      if !seen.insert(step.experience_id) {
        return Err(format!("体験 {} が重複しています", step.experience_id));
      }

      let default_travel = if index == last { 0 } else { DEFAULT_TRAVEL_MINUTES };
      let duration_minutes = step.duration_minutes.unwrap_or(DEFAULT_STAY_MINUTES);
      let travel_time_to_next = step.travel_time_to_next.unwrap_or(default_travel);
      let minutes = 0..=MAX_STEP_MINUTES;
      if !minutes.contains(&duration_minutes) || !minutes.contains(&travel_time_to_next) {
        return Err(format!("時間は0分以上{}分以内である必要があります", MAX_STEP_MINUTES));
      }

      Ok(NewRouteStep {
        experience_id: step.experience_id,
        step_order: index as i32 + 1,
        duration_minutes,
        travel_time_to_next,
        notes: step.notes.clone().filter(|n| !n.trim().is_empty()),
      })
    })
    .collect()
}

/// 滞在時間と移動時間の合計。i32 に収まらなければエラー
pub fn total_duration(steps: &[NewRouteStep]) -> Result<i32, String> {
  steps
    .iter()
    .try_fold(0i32, |total, step| {
      total
        .checked_add(step.duration_minutes)?
        .checked_add(step.travel_time_to_next)
    })
    .ok_or_else(|| "ルートの合計時間が大きすぎます".to_string())
}

pub struct RouteServiceImpl<R, E> {
  routes: R,
  experiences: E,
}

impl<R, E> RouteServiceImpl<R, E>
where
  R: RouteRepository,
  E: ExperienceRepository,
{
  pub fn new(routes: R, experiences: E) -> Self {
    Self { routes, experiences }
  }

  fn attach_experiences(route: &mut Route, experiences: &HashMap<i32, Experience>) {
    for step in &mut route.steps {
      step.experience = experiences.get(&step.experience_id).cloned();
    }
  }

  async fn experience_index(&self) -> Result<HashMap<i32, Experience>, RouteServiceError> {
    Ok(
      self
        .experiences
        .find_all()
        .await?
        .into_iter()
        .map(|experience| (experience.id, experience))
        .collect(),
    )
  }
}

#[async_trait]
impl<R, E> RouteService for RouteServiceImpl<R, E>
where
  R: RouteRepository,
  E: ExperienceRepository,
{
  async fn create_route(&self, user_id: Option<i32>, req: CreateRouteRequest) -> Result<Route, RouteServiceError> {
    req
      .validate()
      .map_err(|e| RouteServiceError::BadRequest(format!("Validation failed: {}", e)))?;
    let steps = plan_steps(&req.steps).map_err(RouteServiceError::BadRequest)?;
    let total_duration = total_duration(&steps).map_err(RouteServiceError::BadRequest)?;

    let mut experiences = HashMap::new();
    for step in &steps {
      let experience = self
        .experiences
        .find_by_id(step.experience_id)
        .await?
        .ok_or_else(|| RouteServiceError::BadRequest(format!("体験が見つかりません: {}", step.experience_id)))?;
      experiences.insert(experience.id, experience);
    }

    let mut route = self
      .routes
      .create(NewRoute {
        user_id,
        title: req.title.trim().to_string(),
        description: req.description.filter(|d| !d.trim().is_empty()),
        age_group: req.age_group,
        gender: req.gender,
        overall_rating: req.overall_rating,
        total_duration,
        steps,
      })
      .await?;

    Self::attach_experiences(&mut route, &experiences);
    tracing::info!(
      "Route {} created with {} steps ({} min)",
      route.id,
      route.steps.len(),
      route.total_duration
    );
    Ok(route)
  }

  async fn list_routes(&self) -> Result<Vec<Route>, RouteServiceError> {
    let mut routes = self.routes.list().await?;
    let experiences = self.experience_index().await?;
    for route in &mut routes {
      Self::attach_experiences(route, &experiences);
    }
    Ok(routes)
  }

  async fn get_route(&self, id: i32) -> Result<Route, RouteServiceError> {
    let mut route = self
      .routes
      .find_by_id(id)
      .await?
      .ok_or_else(|| RouteServiceError::NotFound(format!("ルートが見つかりません: {}", id)))?;
    let experiences = self.experience_index().await?;
    Self::attach_experiences(&mut route, &experiences);
    Ok(route)
  }

  async fn route_candidates(&self, query: CandidateQuery) -> Result<Vec<RankedExperience>, RouteServiceError> {
    let reference = reference_point(query.lat, query.lng).map_err(RouteServiceError::BadRequest)?;
    let experiences = self.experiences.find_all().await?;
    Ok(sort_by_distance(&experiences, reference))
  }
}
