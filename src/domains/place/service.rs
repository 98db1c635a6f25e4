use async_trait::async_trait;
use std::error::Error;
use validator::Validate;

use super::model::{PlaceLookup, PlaceLookupRequest, UsageResponse};
use crate::{
  places::{OptimizedPlacesLookup, PlacesError},
  utils::geo::Coordinate,
};

#[derive(Debug)]
pub enum PlaceServiceError {
  BadRequest(String),
  Upstream(PlacesError),
}

impl Error for PlaceServiceError {}

impl std::fmt::Display for PlaceServiceError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      PlaceServiceError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
      PlaceServiceError::Upstream(e) => write!(f, "Upstream Error: {}", e),
    }
  }
}

impl From<PlacesError> for PlaceServiceError {
  fn from(err: PlacesError) -> Self {
    PlaceServiceError::Upstream(err)
  }
}

#[async_trait]
pub trait PlaceService: Send + Sync {
  async fn lookup_place(&self, req: PlaceLookupRequest) -> Result<PlaceLookup, PlaceServiceError>;
  fn usage(&self) -> UsageResponse;
}

pub struct PlaceServiceImpl {
  lookup: OptimizedPlacesLookup,
}

impl PlaceServiceImpl {
  pub fn new(lookup: OptimizedPlacesLookup) -> Self {
    Self { lookup }
  }
}

#[async_trait]
impl PlaceService for PlaceServiceImpl {
  async fn lookup_place(&self, req: PlaceLookupRequest) -> Result<PlaceLookup, PlaceServiceError> {
    req
      .validate()
      .map_err(|e| PlaceServiceError::BadRequest(format!("Validation failed: {}", e)))?;

    let coordinate = Coordinate::new(req.latitude, req.longitude);
    let result = self
      .lookup
      .lookup(req.address.as_deref(), coordinate, req.consent)
      .await?;

    if let Some(decision) = result.quota.filter(|q| !q.allowed) {
      tracing::warn!(
        "Places quota exhausted ({}/{}), served fallback for {}",
        decision.count,
        decision.limit,
        coordinate.key()
      );
    }
    Ok(result)
  }

  fn usage(&self) -> UsageResponse {
    UsageResponse {
      usage: self.lookup.quota().usage(),
      cached_places: self.lookup.cached_places(),
    }
  }
}
