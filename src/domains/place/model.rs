use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::quota::{QuotaDecision, QuotaUsage};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct PlaceInfo {
  pub place_id: Option<String>,
  pub place_name: Option<String>,
  pub website: Option<String>,
  pub google_url: Option<String>,
  pub phone: Option<String>,
}

impl PlaceInfo {
  pub fn is_empty(&self) -> bool {
    self.place_id.is_none()
      && self.place_name.is_none()
      && self.website.is_none()
      && self.google_url.is_none()
      && self.phone.is_none()
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupSource {
  Cache,
  Api,
  Fallback,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PlaceLookup {
  pub place: Option<PlaceInfo>,
  pub source: LookupSource,
  pub quota: Option<QuotaDecision>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct PlaceLookupRequest {
  #[validate(range(min = -90.0, max = 90.0, message = "緯度は-90から90の範囲である必要があります"))]
  pub latitude: f64,
  #[validate(range(min = -180.0, max = 180.0, message = "経度は-180から180の範囲である必要があります"))]
  pub longitude: f64,
  #[validate(length(max = 255, message = "住所は255文字以内である必要があります"))]
  pub address: Option<String>,
  #[serde(default)]
  pub consent: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct UsageResponse {
  #[serde(flatten)]
  pub usage: QuotaUsage,
  pub cached_places: usize,
}
