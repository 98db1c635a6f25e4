use std::{fmt::Display, future::Future, time::Duration};

pub const MAX_ATTEMPTS: u32 = 3;
pub const RETRY_DELAY: Duration = Duration::from_millis(500);

/// 失敗時は `delay × 試行回数` 待って再試行する。最後の失敗はそのまま返す
pub async fn with_retry<T, E, F, Fut>(label: &str, max_attempts: u32, delay: Duration, mut operation: F) -> Result<T, E>
where
  E: Display,
  F: FnMut() -> Fut,
  Fut: Future<Output = Result<T, E>>,
{
  let max_attempts = max_attempts.max(1);
  let mut attempt = 1;

  loop {
    match operation().await {
      Ok(value) => return Ok(value),
      Err(e) if attempt < max_attempts => {
        tracing::warn!("{} failed (attempt {}/{}): {}", label, attempt, max_attempts, e);
        tokio::time::sleep(delay * attempt).await;
        attempt += 1;
      }
      Err(e) => {
        tracing::error!("{} failed after {} attempts: {}", label, attempt, e);
        return Err(e);
      }
    }
  }
}
