use async_trait::async_trait;
use sqlx::PgPool;

use super::model::{Comment, CreateCommentRequest};
use crate::db::RepositoryError;

const COMMENT_COLUMNS: &str =
  "id, experience_id, user_id, parent_comment_id, content, rating, is_edited, created_at, updated_at";

#[async_trait]
pub trait CommentRepository: Send + Sync {
  /// トップレベルのみ、新しい順
  async fn list_top_level(&self, experience_id: i32) -> Result<Vec<Comment>, RepositoryError>;
  /// 指定した親への返信、古い順
  async fn list_replies(&self, parent_ids: &[i32]) -> Result<Vec<Comment>, RepositoryError>;
  async fn count_for_experience(&self, experience_id: i32) -> Result<i64, RepositoryError>;
  async fn find_by_id(&self, id: i32) -> Result<Option<Comment>, RepositoryError>;
  async fn create(
    &self,
    experience_id: i32,
    user_id: i32,
    req: &CreateCommentRequest,
  ) -> Result<Comment, RepositoryError>;
  /// 編集済みフラグと更新日時も更新する
  async fn update(&self, id: i32, content: Option<String>, rating: Option<i16>) -> Result<Comment, RepositoryError>;
  async fn delete(&self, id: i32) -> Result<(), RepositoryError>;
  async fn list_by_user(&self, user_id: i32, limit: i64) -> Result<Vec<Comment>, RepositoryError>;
}

#[derive(Clone)]
pub struct SqlxCommentRepository {
  pool: PgPool,
}

impl SqlxCommentRepository {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
  async fn list_top_level(&self, experience_id: i32) -> Result<Vec<Comment>, RepositoryError> {
    let comments = sqlx::query_as::<_, Comment>(&format!(
      "SELECT {COMMENT_COLUMNS} FROM experience_comments \
       WHERE experience_id = $1 AND parent_comment_id IS NULL ORDER BY created_at DESC, id DESC"
    ))
    .bind(experience_id)
    .fetch_all(&self.pool)
    .await?;
    Ok(comments)
  }

  async fn list_replies(&self, parent_ids: &[i32]) -> Result<Vec<Comment>, RepositoryError> {
    if parent_ids.is_empty() {
      return Ok(Vec::new());
    }

    let replies = sqlx::query_as::<_, Comment>(&format!(
      "SELECT {COMMENT_COLUMNS} FROM experience_comments \
       WHERE parent_comment_id = ANY($1) ORDER BY created_at ASC, id ASC"
    ))
    .bind(parent_ids)
    .fetch_all(&self.pool)
    .await?;
    Ok(replies)
  }

  async fn count_for_experience(&self, experience_id: i32) -> Result<i64, RepositoryError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM experience_comments WHERE experience_id = $1")
      .bind(experience_id)
      .fetch_one(&self.pool)
      .await?;
    Ok(count)
  }

  async fn find_by_id(&self, id: i32) -> Result<Option<Comment>, RepositoryError> {
    let comment = sqlx::query_as::<_, Comment>(&format!("SELECT {COMMENT_COLUMNS} FROM experience_comments WHERE id = $1"))
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(comment)
  }

  async fn create(
    &self,
    experience_id: i32,
    user_id: i32,
    req: &CreateCommentRequest,
  ) -> Result<Comment, RepositoryError> {
    let comment = sqlx::query_as::<_, Comment>(&format!(
      r#"
        INSERT INTO experience_comments (experience_id, user_id, parent_comment_id, content, rating)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {COMMENT_COLUMNS}
      "#
    ))
    .bind(experience_id)
    .bind(user_id)
    .bind(req.parent_comment_id)
    .bind(req.content.trim())
    .bind(req.rating)
    .fetch_one(&self.pool)
    .await?;
    Ok(comment)
  }

  async fn update(&self, id: i32, content: Option<String>, rating: Option<i16>) -> Result<Comment, RepositoryError> {
    let comment = sqlx::query_as::<_, Comment>(&format!(
      r#"
        UPDATE experience_comments
        SET content = COALESCE($2, content), rating = COALESCE($3, rating), is_edited = TRUE, updated_at = NOW()
        WHERE id = $1
        RETURNING {COMMENT_COLUMNS}
      "#
    ))
    .bind(id)
    .bind(content.as_deref().map(str::trim))
    .bind(rating)
    .fetch_optional(&self.pool)
    .await?
    .ok_or_else(|| RepositoryError::NotFound(format!("comment {}", id)))?;
    Ok(comment)
  }

  async fn delete(&self, id: i32) -> Result<(), RepositoryError> {
    let result = sqlx::query("DELETE FROM experience_comments WHERE id = $1")
      .bind(id)
      .execute(&self.pool)
      .await?;

    if result.rows_affected() == 0 {
      return Err(RepositoryError::NotFound(format!("comment {}", id)));
    }
    Ok(())
  }

  async fn list_by_user(&self, user_id: i32, limit: i64) -> Result<Vec<Comment>, RepositoryError> {
    let comments = sqlx::query_as::<_, Comment>(&format!(
      "SELECT {COMMENT_COLUMNS} FROM experience_comments \
       WHERE user_id = $1 AND parent_comment_id IS NULL ORDER BY created_at DESC, id DESC LIMIT $2"
    ))
    .bind(user_id)
    .bind(limit)
    .fetch_all(&self.pool)
    .await?;
    Ok(comments)
  }
}
