pub mod pool;

use std::error::Error;

#[derive(Debug)]
pub enum RepositoryError {
  DatabaseError(sqlx::Error),
  NotFound(String),
  /// 保存済みの行がドメインの制約を満たしていない
  InvalidRow(String),
}

impl Error for RepositoryError {}

impl std::fmt::Display for RepositoryError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      RepositoryError::DatabaseError(e) => write!(f, "Database error: {}", e),
      RepositoryError::NotFound(msg) => write!(f, "Not found: {}", msg),
      RepositoryError::InvalidRow(msg) => write!(f, "Invalid row: {}", msg),
    }
  }
}

impl From<sqlx::Error> for RepositoryError {
  fn from(err: sqlx::Error) -> Self {
    match err {
      sqlx::Error::RowNotFound => RepositoryError::NotFound("Row not found".to_string()),
      other => RepositoryError::DatabaseError(other),
    }
  }
}
