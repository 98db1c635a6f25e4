use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::{
  domains::place::model::PlaceInfo,
  ranking::{FilterCriteria, SortKey, SortOrder},
  utils::geo::Coordinate,
};

/// 日本語ラベルで保存・送受信される列挙型を定義する
macro_rules! labeled_enum {
  ($(#[$meta:meta])* $name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
    $(#[$meta])*
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
    pub enum $name {
      $(
        #[serde(rename = $label)]
        $variant,
      )+
    }

    impl $name {
      pub const ALL: &'static [$name] = &[$($name::$variant),+];

      pub fn as_str(&self) -> &'static str {
        match self {
          $($name::$variant => $label,)+
        }
      }
    }

    impl fmt::Display for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
      }
    }

    impl FromStr for $name {
      type Err = String;

      fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
          $($label => Ok($name::$variant),)+
          other => Err(format!("{}: 不明な値です: {}", stringify!($name), other)),
        }
      }
    }
  };
}

labeled_enum!(Category {
  Izakaya => "居酒屋",
  Cafe => "カフェ",
  Restaurant => "レストラン",
  Ramen => "ラーメン",
  Sento => "銭湯",
  Sauna => "サウナ",
  Park => "公園",
  Museum => "美術館",
  Shopping => "ショッピング",
  Other => "その他",
});

labeled_enum!(AgeGroup {
  Teens => "10代",
  Twenties => "20代",
  Thirties => "30代",
  Forties => "40代",
  Fifties => "50代",
  SixtiesPlus => "60代以上",
});

labeled_enum!(Gender {
  Male => "男性",
  Female => "女性",
  Other => "その他",
});

labeled_enum!(TimeOfDay {
  Morning => "朝",
  Noon => "昼",
  Night => "夜",
  LateNight => "深夜",
});

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Experience {
  pub id: i32,
  pub user_id: Option<i32>,
  pub latitude: f64,
  pub longitude: f64,
  pub category: Category,
  pub rating: u8,
  pub address: Option<String>,
  pub age_group: AgeGroup,
  pub gender: Gender,
  pub time_of_day: TimeOfDay,
  pub place: Option<PlaceInfo>,
  pub created_at: DateTime<Utc>,
}

impl Experience {
  pub fn coordinate(&self) -> Coordinate {
    Coordinate::new(self.latitude, self.longitude)
  }
}

/// experiences テーブルの1行。ドメイン型への変換時に値を検証する
#[derive(Debug, Clone, FromRow)]
pub struct ExperienceRow {
  pub id: i32,
  pub user_id: Option<i32>,
  pub latitude: f64,
  pub longitude: f64,
  pub category: String,
  pub rating: i16,
  pub address: Option<String>,
  pub age_group: String,
  pub gender: String,
  pub time_of_day: String,
  pub place_id: Option<String>,
  pub place_name: Option<String>,
  pub website: Option<String>,
  pub google_url: Option<String>,
  pub phone: Option<String>,
  pub created_at: DateTime<Utc>,
}

impl TryFrom<ExperienceRow> for Experience {
  type Error = String;

  fn try_from(row: ExperienceRow) -> Result<Self, Self::Error> {
    if !(1..=5).contains(&row.rating) {
      return Err(format!("experience {}: rating out of range: {}", row.id, row.rating));
    }
    if !Coordinate::new(row.latitude, row.longitude).is_valid() {
      return Err(format!(
        "experience {}: coordinate out of range: {}, {}",
        row.id, row.latitude, row.longitude
      ));
    }

    let place = PlaceInfo {
      place_id: row.place_id,
      place_name: row.place_name,
      website: row.website,
      google_url: row.google_url,
      phone: row.phone,
    };

    Ok(Experience {
      id: row.id,
      user_id: row.user_id,
      latitude: row.latitude,
      longitude: row.longitude,
      category: row.category.parse()?,
      rating: row.rating as u8,
      address: row.address,
      age_group: row.age_group.parse()?,
      gender: row.gender.parse()?,
      time_of_day: row.time_of_day.parse()?,
      place: (!place.is_empty()).then_some(place),
      created_at: row.created_at,
    })
  }
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct CreateExperienceRequest {
  #[validate(range(min = -90.0, max = 90.0, message = "緯度は-90から90の範囲である必要があります"))]
  pub latitude: f64,
  #[validate(range(min = -180.0, max = 180.0, message = "経度は-180から180の範囲である必要があります"))]
  pub longitude: f64,
  pub category: Category,
  #[validate(range(min = 1, max = 5, message = "評価は1から5の範囲である必要があります"))]
  pub rating: u8,
  #[validate(length(max = 255, message = "住所は255文字以内である必要があります"))]
  pub address: Option<String>,
  pub age_group: AgeGroup,
  pub gender: Gender,
  pub time_of_day: TimeOfDay,
  #[serde(default)]
  pub place: Option<PlaceInfo>,
}

/// `GET /experiences` のクエリ。複数選択の項目はカンマ区切りで受け取る
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExperienceListQuery {
  pub categories: Option<String>,
  pub age_groups: Option<String>,
  pub genders: Option<String>,
  pub time_of_day: Option<String>,
  pub min_rating: Option<u8>,
  pub max_distance: Option<f64>,
  pub sort_by: Option<SortKey>,
  pub sort_order: Option<SortOrder>,
  pub lat: Option<f64>,
  pub lng: Option<f64>,
  pub page: Option<usize>,
}

fn parse_list<T>(raw: &Option<String>) -> Result<std::collections::BTreeSet<T>, String>
where
  T: FromStr<Err = String> + Ord,
{
  match raw {
    Some(raw) => raw
      .split(',')
      .map(str::trim)
      .filter(|s| !s.is_empty())
      .map(str::parse)
      .collect(),
    None => Ok(Default::default()),
  }
}

impl ExperienceListQuery {
  pub fn criteria(&self) -> Result<FilterCriteria, String> {
    let defaults = FilterCriteria::default();

    let min_rating = self.min_rating.unwrap_or(defaults.min_rating);
    if !(1..=5).contains(&min_rating) {
      return Err("min_rating は1から5の範囲である必要があります".to_string());
    }
    if let Some(max_distance) = self.max_distance {
      if max_distance.is_nan() || max_distance < 0.0 {
        return Err("max_distance は0以上である必要があります".to_string());
      }
    }

    Ok(FilterCriteria {
      categories: parse_list(&self.categories)?,
      age_groups: parse_list(&self.age_groups)?,
      genders: parse_list(&self.genders)?,
      time_of_day: parse_list(&self.time_of_day)?,
      min_rating,
      max_distance: self.max_distance,
      sort_by: self.sort_by.unwrap_or(defaults.sort_by),
      sort_order: self.sort_order.unwrap_or(defaults.sort_order),
    })
  }

  pub fn reference_point(&self) -> Result<Option<Coordinate>, String> {
    reference_point(self.lat, self.lng)
  }
}

/// lat/lng は両方そろった場合のみ基準地点として扱う
pub fn reference_point(lat: Option<f64>, lng: Option<f64>) -> Result<Option<Coordinate>, String> {
  match (lat, lng) {
    (Some(lat), Some(lng)) => {
      let point = Coordinate::new(lat, lng);
      if point.is_valid() {
        Ok(Some(point))
      } else {
        Err("緯度または経度が範囲外です".to_string())
      }
    }
    (None, None) => Ok(None),
    _ => Err("lat と lng は両方指定する必要があります".to_string()),
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NearbyQuery {
  pub lat: f64,
  pub lng: f64,
  pub radius_km: Option<f64>,
}
