use std::{
  collections::{HashMap, VecDeque},
  sync::{Arc, Mutex},
};

use reqwest::Url;

use super::{PlacesError, PlacesLookupService};
use crate::{
  domains::place::model::{LookupSource, PlaceInfo, PlaceLookup},
  quota::QuotaCounter,
  utils::geo::Coordinate,
};

const MAPS_PLACE_BASE: &str = "https://www.google.com/maps/place/";
const DEFAULT_LABEL: &str = "選択した場所";
/// キャッシュする場所の上限。超えたら古いものから捨てる
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

/// API を使わずに作れる Google マップへのリンク
pub fn fallback_maps_url(address: Option<&str>, coordinate: Coordinate) -> Option<String> {
  let label = address.filter(|a| !a.trim().is_empty()).unwrap_or(DEFAULT_LABEL);

  let mut url = Url::parse(MAPS_PLACE_BASE).ok()?;
  url
    .path_segments_mut()
    .ok()?
    .pop_if_empty()
    .push(label)
    .push(&format!("@{},{},17z", coordinate.lat, coordinate.lng));
  Some(url.to_string())
}

/// API から取得した場所情報だけを保持する、件数上限つきのキャッシュ
#[derive(Debug, Default)]
struct PlaceCache {
  entries: HashMap<String, PlaceInfo>,
  order: VecDeque<String>,
}

impl PlaceCache {
  fn insert(&mut self, key: String, place: PlaceInfo, capacity: usize) {
    if self.entries.insert(key.clone(), place).is_none() {
      self.order.push_back(key);
    }
    while self.entries.len() > capacity {
      match self.order.pop_front() {
        Some(oldest) => {
          self.entries.remove(&oldest);
        }
        None => break,
      }
    }
  }
}

/// 座標ごとのキャッシュと月間上限、利用者の同意で外部 API の呼び出しを絞る
pub struct OptimizedPlacesLookup {
  service: Option<Arc<dyn PlacesLookupService>>,
  quota: QuotaCounter,
  cache: Mutex<PlaceCache>,
  cache_capacity: usize,
}

impl OptimizedPlacesLookup {
  pub fn new(service: Option<Arc<dyn PlacesLookupService>>, quota: QuotaCounter) -> Self {
    Self {
      service,
      quota,
      cache: Mutex::new(PlaceCache::default()),
      cache_capacity: DEFAULT_CACHE_CAPACITY,
    }
  }

  pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
    self.cache_capacity = capacity.max(1);
    self
  }

  pub fn quota(&self) -> &QuotaCounter {
    &self.quota
  }

  pub fn cached_places(&self) -> usize {
    self.cache.lock().map(|cache| cache.entries.len()).unwrap_or(0)
  }

  pub async fn lookup(
    &self,
    address: Option<&str>,
    coordinate: Coordinate,
    consent: bool,
  ) -> Result<PlaceLookup, PlacesError> {
    let key = coordinate.key();

    if let Some(place) = self.cached(&key) {
      tracing::debug!("Place info served from cache: {}", key);
      return Ok(PlaceLookup {
        place: Some(place),
        source: LookupSource::Cache,
        quota: None,
      });
    }

    let Some(service) = self.service.as_ref() else {
      return Ok(Self::fallback(address, coordinate, None));
    };

    let decision = self.quota.check_and_maybe_consume(consent);
    if !decision.allowed || !consent {
      return Ok(Self::fallback(address, coordinate, Some(decision)));
    }

    let place = service.find_nearby(coordinate).await?;
    if let Some(place) = &place {
      self.remember(key, place.clone());
    }

    Ok(PlaceLookup {
      place,
      source: LookupSource::Api,
      quota: Some(decision),
    })
  }

  /// リンクだけの情報。後で同意した利用者が API に届くようキャッシュしない
  fn fallback(address: Option<&str>, coordinate: Coordinate, decision: Option<crate::quota::QuotaDecision>) -> PlaceLookup {
    let place = PlaceInfo {
      google_url: fallback_maps_url(address, coordinate),
      ..Default::default()
    };

    PlaceLookup {
      place: Some(place),
      source: LookupSource::Fallback,
      quota: decision,
    }
  }

  fn cached(&self, key: &str) -> Option<PlaceInfo> {
    self.cache.lock().ok().and_then(|cache| cache.entries.get(key).cloned())
  }

  fn remember(&self, key: String, place: PlaceInfo) {
    if let Ok(mut cache) = self.cache.lock() {
      cache.insert(key, place, self.cache_capacity);
    }
  }
}
