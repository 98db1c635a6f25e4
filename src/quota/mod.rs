//! 外部の場所詳細 API 呼び出しを月ごとの上限で制限するカウンター。
//!
//! 記録は `{"month": "YYYY-MM", "count": n, "limit": n}` の JSON として `QuotaStore` に保存する。
//! 読み込めない・壊れている記録は新しい月の記録として扱う。
//! 同一プロセス内の読み書きは直列化するが、同じファイルを共有する複数プロセス間の整合性は保証しない。

mod store;

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub use store::{FileQuotaStore, MemoryQuotaStore, QuotaStore};

pub const STORAGE_KEY: &str = "places_api_usage";
pub const DEFAULT_MONTHLY_LIMIT: u32 = 100;
const WARNING_RATIO: f64 = 0.8;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct QuotaRecord {
  pub month: String,
  pub count: u32,
  pub limit: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct QuotaDecision {
  pub allowed: bool,
  pub count: u32,
  pub limit: u32,
  pub remaining: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct QuotaUsage {
  pub month: String,
  pub count: u32,
  pub limit: u32,
  pub remaining: u32,
  pub percentage: u32,
  pub next_reset: NaiveDate,
}

pub fn month_of(now: DateTime<Utc>) -> String {
  now.format("%Y-%m").to_string()
}

/// 翌月1日
pub fn next_reset_date(now: DateTime<Utc>) -> NaiveDate {
  let (year, month) = if now.month() == 12 {
    (now.year() + 1, 1)
  } else {
    (now.year(), now.month() + 1)
  };
  NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MAX)
}

pub struct QuotaCounter {
  store: Arc<dyn QuotaStore>,
  key: String,
  limit: u32,
  lock: Mutex<()>,
}

impl QuotaCounter {
  pub fn new(store: Arc<dyn QuotaStore>, limit: u32) -> Self {
    Self {
      store,
      key: STORAGE_KEY.to_string(),
      limit,
      lock: Mutex::new(()),
    }
  }

  pub fn limit(&self) -> u32 {
    self.limit
  }

  pub fn check_and_maybe_consume(&self, consume: bool) -> QuotaDecision {
    self.check_and_maybe_consume_at(Utc::now(), consume)
  }

  /// 上限内なら許可し、`consume` が true のときだけ使用回数を 1 増やす
  pub fn check_and_maybe_consume_at(&self, now: DateTime<Utc>, consume: bool) -> QuotaDecision {
    let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let mut record = self.load(now);

    if record.count >= record.limit {
      tracing::warn!(
        "Places API monthly limit reached: {}/{} ({})",
        record.count,
        record.limit,
        record.month
      );
      return QuotaDecision {
        allowed: false,
        count: record.count,
        limit: record.limit,
        remaining: 0,
      };
    }

    if consume {
      record.count += 1;
      self.save(&record);
      tracing::info!("Places API usage: {}/{} ({})", record.count, record.limit, record.month);
    }

    QuotaDecision {
      allowed: true,
      count: record.count,
      limit: record.limit,
      remaining: record.limit.saturating_sub(record.count),
    }
  }

  pub fn usage(&self) -> QuotaUsage {
    self.usage_at(Utc::now())
  }

  pub fn usage_at(&self, now: DateTime<Utc>) -> QuotaUsage {
    let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let record = self.load(now);

    let percentage = if record.limit == 0 {
      100
    } else {
      ((record.count as f64 / record.limit as f64) * 100.0).round() as u32
    };
    if record.count as f64 >= record.limit as f64 * WARNING_RATIO {
      tracing::warn!("Places API usage is above 80%: {}/{}", record.count, record.limit);
    }

    QuotaUsage {
      remaining: record.limit.saturating_sub(record.count),
      month: record.month,
      count: record.count,
      limit: record.limit,
      percentage,
      next_reset: next_reset_date(now),
    }
  }

  fn fresh(&self, month: String) -> QuotaRecord {
    QuotaRecord {
      month,
      count: 0,
      limit: self.limit,
    }
  }

  /// 月が変わっていれば使用回数を 0 に戻して保存する（繰り越しなし）
  fn load(&self, now: DateTime<Utc>) -> QuotaRecord {
    let current_month = month_of(now);

    let stored = match self.store.read(&self.key) {
      Ok(Some(raw)) => match serde_json::from_str::<QuotaRecord>(&raw) {
        Ok(record) => Some(record),
        Err(e) => {
          tracing::warn!("Discarding unreadable quota record: {}", e);
          None
        }
      },
      Ok(None) => None,
      Err(e) => {
        tracing::warn!("Failed to read quota record: {}", e);
        None
      }
    };

    match stored {
      Some(record) if record.month == current_month => record,
      Some(record) => {
        tracing::info!("Quota month rolled over from {} to {}", record.month, current_month);
        let fresh = self.fresh(current_month);
        self.save(&fresh);
        fresh
      }
      None => {
        let fresh = self.fresh(current_month);
        self.save(&fresh);
        fresh
      }
    }
  }

  fn save(&self, record: &QuotaRecord) {
    let result = serde_json::to_string(record)
      .map_err(std::io::Error::other)
      .and_then(|raw| self.store.write(&self.key, &raw));

    if let Err(e) = result {
      tracing::warn!("Failed to persist quota record: {}", e);
    }
  }
}
