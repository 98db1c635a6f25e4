use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::domains::experience::model::{AgeGroup, Experience, Gender};

pub const DEFAULT_STAY_MINUTES: i32 = 60;
pub const DEFAULT_TRAVEL_MINUTES: i32 = 15;
pub const MIN_ROUTE_STEPS: usize = 2;
/// 1ステップの滞在・移動時間の上限（分）
pub const MAX_STEP_MINUTES: i32 = 1440;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Route {
  pub id: i32,
  pub user_id: Option<i32>,
  pub title: String,
  pub description: Option<String>,
  /// 滞在時間と移動時間の合計（分）
  pub total_duration: i32,
  pub age_group: AgeGroup,
  pub gender: Gender,
  pub overall_rating: u8,
  pub created_at: DateTime<Utc>,
  pub steps: Vec<RouteStep>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RouteStep {
  pub id: i32,
  pub experience_id: i32,
  pub step_order: i32,
  pub duration_minutes: i32,
  pub travel_time_to_next: i32,
  pub notes: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub experience: Option<Experience>,
}

#[derive(Debug, Clone, FromRow)]
pub struct RouteRow {
  pub id: i32,
  pub user_id: Option<i32>,
  pub title: String,
  pub description: Option<String>,
  pub total_duration: i32,
  pub age_group: String,
  pub gender: String,
  pub overall_rating: i16,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct RouteStepRow {
  pub id: i32,
  pub route_id: i32,
  pub experience_id: i32,
  pub step_order: i32,
  pub duration_minutes: i32,
  pub travel_time_to_next: i32,
  pub notes: Option<String>,
}

impl RouteRow {
  pub fn into_route(self, steps: Vec<RouteStepRow>) -> Result<Route, String> {
    if !(1..=5).contains(&self.overall_rating) {
      return Err(format!("route {}: rating out of range: {}", self.id, self.overall_rating));
    }

    let mut steps: Vec<RouteStep> = steps
      .into_iter()
      .filter(|step| step.route_id == self.id)
      .map(RouteStep::from)
      .collect();
    steps.sort_by_key(|step| step.step_order);

    Ok(Route {
      id: self.id,
      user_id: self.user_id,
      title: self.title,
      description: self.description,
      total_duration: self.total_duration,
      age_group: self.age_group.parse()?,
      gender: self.gender.parse()?,
      overall_rating: self.overall_rating as u8,
      created_at: self.created_at,
      steps,
    })
  }
}

impl From<RouteStepRow> for RouteStep {
  fn from(row: RouteStepRow) -> Self {
    Self {
      id: row.id,
      experience_id: row.experience_id,
      step_order: row.step_order,
      duration_minutes: row.duration_minutes,
      travel_time_to_next: row.travel_time_to_next,
      notes: row.notes,
      experience: None,
    }
  }
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct RouteStepInput {
  pub experience_id: i32,
  #[validate(range(min = 0, max = 1440, message = "滞在時間は0分以上1440分以内である必要があります"))]
  pub duration_minutes: Option<i32>,
  #[validate(range(min = 0, max = 1440, message = "移動時間は0分以上1440分以内である必要があります"))]
  pub travel_time_to_next: Option<i32>,
  #[validate(length(max = 500, message = "メモは500文字以内である必要があります"))]
  pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct CreateRouteRequest {
  #[validate(
    length(min = 1, max = 100, message = "タイトルは1文字以上100文字以内である必要があります"),
    custom(function = "crate::utils::validate_not_blank")
  )]
  pub title: String,
  #[validate(length(max = 1000, message = "説明は1000文字以内である必要があります"))]
  pub description: Option<String>,
  pub age_group: AgeGroup,
  pub gender: Gender,
  #[validate(range(min = 1, max = 5, message = "評価は1から5の範囲である必要があります"))]
  pub overall_rating: u8,
  #[validate(length(min = 2, message = "ルートには2つ以上の体験が必要です"), nested)]
  pub steps: Vec<RouteStepInput>,
}

/// 既定値を埋めた保存用のステップ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRouteStep {
  pub experience_id: i32,
  pub step_order: i32,
  pub duration_minutes: i32,
  pub travel_time_to_next: i32,
  pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewRoute {
  pub user_id: Option<i32>,
  pub title: String,
  pub description: Option<String>,
  pub age_group: AgeGroup,
  pub gender: Gender,
  pub overall_rating: u8,
  pub total_duration: i32,
  pub steps: Vec<NewRouteStep>,
}

/// ルート作成画面の候補一覧用クエリ
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CandidateQuery {
  pub lat: Option<f64>,
  pub lng: Option<f64>,
}
