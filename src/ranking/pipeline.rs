use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::criteria::{FilterCriteria, SortKey, SortOrder};
use crate::{
  domains::experience::model::Experience,
  utils::geo::{distance_between, Coordinate},
};

pub const PAGE_SIZE: usize = 10;

/// 基準地点からの距離を付与した体験。基準地点がない場合 `distance_km` は `None`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RankedExperience {
  #[serde(flatten)]
  pub experience: Experience,
  pub distance_km: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RankedPage {
  pub items: Vec<RankedExperience>,
  pub current_page: usize,
  pub total_pages: usize,
  pub total_count: usize,
  pub page_size: usize,
}

fn attach_distance(experience: &Experience, reference: Option<Coordinate>) -> RankedExperience {
  RankedExperience {
    distance_km: reference.map(|point| distance_between(point, experience.coordinate())),
    experience: experience.clone(),
  }
}

fn within(distance_km: Option<f64>, max_distance: Option<f64>) -> bool {
  match (distance_km, max_distance) {
    (Some(distance), Some(max)) => distance <= max,
    _ => true,
  }
}

fn compare(a: &RankedExperience, b: &RankedExperience, key: SortKey) -> Ordering {
  match key {
    SortKey::Rating => a.experience.rating.cmp(&b.experience.rating),
    SortKey::CreatedAt => a.experience.created_at.cmp(&b.experience.created_at),
    SortKey::AgeGroup => a.experience.age_group.as_str().cmp(b.experience.age_group.as_str()),
    SortKey::Gender => a.experience.gender.as_str().cmp(b.experience.gender.as_str()),
    // 基準地点がなければ並び替えない
    SortKey::Distance => match (a.distance_km, b.distance_km) {
      (Some(da), Some(db)) => da.partial_cmp(&db).unwrap_or(Ordering::Equal),
      _ => Ordering::Equal,
    },
  }
}

/// 安定ソート。同順位は元の並び（通常は作成日時の降順）を保つ
pub fn sort_ranked(ranked: &mut [RankedExperience], key: SortKey, order: SortOrder) {
  ranked.sort_by(|a, b| {
    let ordering = compare(a, b, key);
    match order {
      SortOrder::Asc => ordering,
      SortOrder::Desc => ordering.reverse(),
    }
  });
}

/// 属性フィルタ → 評価下限 → 距離付与と距離上限 → ソート の順に適用する
pub fn rank(source: &[Experience], criteria: &FilterCriteria, reference: Option<Coordinate>) -> Vec<RankedExperience> {
  let max_distance = reference.and(criteria.max_distance);

  let mut ranked: Vec<RankedExperience> = source
    .iter()
    .filter(|experience| criteria.matches_attributes(experience))
    .filter(|experience| criteria.meets_rating(experience))
    .map(|experience| attach_distance(experience, reference))
    .filter(|ranked| within(ranked.distance_km, max_distance))
    .collect();

  sort_ranked(&mut ranked, criteria.sort_by, criteria.sort_order);
  ranked
}

/// ルート作成画面用。絞り込みはせず、基準地点があれば近い順に並べる
pub fn sort_by_distance(source: &[Experience], reference: Option<Coordinate>) -> Vec<RankedExperience> {
  let mut ranked: Vec<RankedExperience> = source
    .iter()
    .map(|experience| attach_distance(experience, reference))
    .collect();

  sort_ranked(&mut ranked, SortKey::Distance, SortOrder::Asc);
  ranked
}

pub fn total_pages(total_count: usize, page_size: usize) -> usize {
  total_count.div_ceil(page_size.max(1))
}

/// ページ番号は 1 始まり。範囲外は 1..=total_pages に丸める
pub fn paginate(ranked: Vec<RankedExperience>, page: usize, page_size: usize) -> RankedPage {
  let page_size = page_size.max(1);
  let total_count = ranked.len();
  let total_pages = total_pages(total_count, page_size);
  let current_page = page.clamp(1, total_pages.max(1));

  let items = ranked
    .into_iter()
    .skip((current_page - 1) * page_size)
    .take(page_size)
    .collect();

  RankedPage {
    items,
    current_page,
    total_pages,
    total_count,
    page_size,
  }
}
