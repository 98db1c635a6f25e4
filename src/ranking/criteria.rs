use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domains::experience::model::{AgeGroup, Category, Experience, Gender, TimeOfDay};

/// 距離フィルタが「制限なし」とみなされる上限（km）
pub const UNLIMITED_DISTANCE_KM: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
  Rating,
  Distance,
  #[default]
  CreatedAt,
  AgeGroup,
  Gender,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
  Asc,
  #[default]
  Desc,
}

/// 体験一覧の絞り込み・並び替え条件。空の集合はその項目を制限しない
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FilterCriteria {
  pub categories: BTreeSet<Category>,
  pub age_groups: BTreeSet<AgeGroup>,
  pub genders: BTreeSet<Gender>,
  pub time_of_day: BTreeSet<TimeOfDay>,
  pub min_rating: u8,
  pub max_distance: Option<f64>,
  pub sort_by: SortKey,
  pub sort_order: SortOrder,
}

impl Default for FilterCriteria {
  fn default() -> Self {
    Self {
      categories: BTreeSet::new(),
      age_groups: BTreeSet::new(),
      genders: BTreeSet::new(),
      time_of_day: BTreeSet::new(),
      min_rating: 1,
      max_distance: None,
      sort_by: SortKey::default(),
      sort_order: SortOrder::default(),
    }
  }
}

fn accepts<T: Ord>(set: &BTreeSet<T>, value: &T) -> bool {
  set.is_empty() || set.contains(value)
}

impl FilterCriteria {
  /// カテゴリ・年代・性別・時間帯の条件をすべて満たすか
  pub fn matches_attributes(&self, experience: &Experience) -> bool {
    accepts(&self.categories, &experience.category)
      && accepts(&self.age_groups, &experience.age_group)
      && accepts(&self.genders, &experience.gender)
      && accepts(&self.time_of_day, &experience.time_of_day)
  }

  pub fn meets_rating(&self, experience: &Experience) -> bool {
    experience.rating >= self.min_rating
  }

  pub fn active_filter_count(&self) -> usize {
    let distance_active = self
      .max_distance
      .map(|max| max < UNLIMITED_DISTANCE_KM)
      .unwrap_or(false);

    self.categories.len()
      + self.age_groups.len()
      + self.genders.len()
      + self.time_of_day.len()
      + usize::from(self.min_rating > 1)
      + usize::from(distance_active)
  }
}
