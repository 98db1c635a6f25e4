//! 座標から近くの店舗情報を取得する外部サービスと、その呼び出しを節約するラッパー。

mod google;
mod lookup;

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
  config::Config,
  domains::place::model::PlaceInfo,
  quota::{FileQuotaStore, MemoryQuotaStore, QuotaCounter, QuotaStore},
  utils::geo::Coordinate,
};

pub use google::{GooglePlacesClient, DEFAULT_BASE_URL};
pub use lookup::{fallback_maps_url, OptimizedPlacesLookup};

#[derive(Debug)]
pub enum PlacesError {
  Request(String),
  Upstream { status: String, message: Option<String> },
}

impl std::error::Error for PlacesError {}

impl std::fmt::Display for PlacesError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      PlacesError::Request(msg) => write!(f, "Places request failed: {}", msg),
      PlacesError::Upstream { status, message } => match message {
        Some(message) => write!(f, "Places API returned {}: {}", status, message),
        None => write!(f, "Places API returned {}", status),
      },
    }
  }
}

impl From<reqwest::Error> for PlacesError {
  fn from(err: reqwest::Error) -> Self {
    PlacesError::Request(err.to_string())
  }
}

#[async_trait]
pub trait PlacesLookupService: Send + Sync {
  /// 座標付近（50m 以内）の店舗を1件探し、詳細情報を返す。見つからなければ `None`
  async fn find_nearby(&self, coordinate: Coordinate) -> Result<Option<PlaceInfo>, PlacesError>;
}

/// 設定から検索ラッパーを組み立てる。API キーがなければリンクのみを返す
pub fn build_lookup(config: &Config) -> OptimizedPlacesLookup {
  let store: Arc<dyn QuotaStore> = match &config.quota_store_dir {
    Some(dir) => Arc::new(FileQuotaStore::new(dir.clone())),
    None => Arc::new(MemoryQuotaStore::new()),
  };
  let quota = QuotaCounter::new(store, config.places_monthly_limit);

  let service = config.google_places_api_key.clone().map(|api_key| {
    Arc::new(GooglePlacesClient::new(api_key, config.google_places_base_url.clone())) as Arc<dyn PlacesLookupService>
  });
  if service.is_none() {
    tracing::warn!("GOOGLE_PLACES_API_KEY not set, place lookups return map links only");
  }

  OptimizedPlacesLookup::new(service, quota)
}
