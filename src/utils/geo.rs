use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// WGS84 の座標（度）
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Coordinate {
  pub lat: f64,
  pub lng: f64,
}

impl Coordinate {
  pub fn new(lat: f64, lng: f64) -> Self {
    Self { lat, lng }
  }

  pub fn is_valid(&self) -> bool {
    (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
  }

  /// キャッシュキーなどに使う `"lat,lng"` 形式
  pub fn key(&self) -> String {
    format!("{},{}", self.lat, self.lng)
  }
}

/// ハヴァサイン公式を使用して2地点間の距離を計算（キロメートル単位で返す）
///
/// 範囲外や NaN の入力はエラーにせず、そのまま NaN として伝播する。
pub fn haversine_distance(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
  let lat1_rad = lat1 * PI / 180.0;
  let lat2_rad = lat2 * PI / 180.0;
  let delta_lat = (lat2 - lat1) * PI / 180.0;
  let delta_lng = (lng2 - lng1) * PI / 180.0;

  let a = (delta_lat / 2.0).sin().powi(2) + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);

  let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

  EARTH_RADIUS_KM * c
}

pub fn distance_between(a: Coordinate, b: Coordinate) -> f64 {
  haversine_distance(a.lat, a.lng, b.lat, b.lng)
}

/// 1km 未満はメートル、それ以上は小数1桁の km で表示する
pub fn format_distance(distance_km: f64) -> String {
  if distance_km < 1.0 {
    format!("{}m", (distance_km * 1000.0).round())
  } else {
    format!("{:.1}km", distance_km)
  }
}
