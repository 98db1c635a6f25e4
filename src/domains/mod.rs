use serde::Deserialize;

pub mod comment;
pub mod experience;
pub mod photo;
pub mod place;
pub mod route;

pub const DEFAULT_USER_LIST_LIMIT: i64 = 20;
const MAX_USER_LIST_LIMIT: i64 = 100;

/// ユーザー別一覧の `limit` クエリ
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct LimitQuery {
  pub limit: Option<i64>,
}

impl LimitQuery {
  pub fn resolved(&self) -> i64 {
    self
      .limit
      .unwrap_or(DEFAULT_USER_LIST_LIMIT)
      .clamp(1, MAX_USER_LIST_LIMIT)
  }
}
