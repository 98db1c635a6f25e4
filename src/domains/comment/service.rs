use async_trait::async_trait;
use std::{collections::HashMap, error::Error};
use validator::Validate;

use super::{
  model::{Comment, CommentThread, CommentsResponse, CreateCommentRequest, UpdateCommentRequest},
  repository::CommentRepository,
};
use crate::{domains::experience::repository::ExperienceRepository, impl_service_error_conversions};

#[derive(Debug)]
pub enum CommentServiceError {
  BadRequest(String),
  NotFound(String),
  Forbidden(String),
  InternalServerError(String),
}

impl Error for CommentServiceError {}

impl std::fmt::Display for CommentServiceError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      CommentServiceError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
      CommentServiceError::NotFound(msg) => write!(f, "Not Found: {}", msg),
      CommentServiceError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
      CommentServiceError::InternalServerError(msg) => write!(f, "Internal Server Error: {}", msg),
    }
  }
}

impl_service_error_conversions!(CommentServiceError, InternalServerError, NotFound);

#[async_trait]
pub trait CommentService: Send + Sync {
  async fn list_comments(&self, experience_id: i32) -> Result<CommentsResponse, CommentServiceError>;
  async fn create_comment(
    &self,
    experience_id: i32,
    user_id: i32,
    req: CreateCommentRequest,
  ) -> Result<Comment, CommentServiceError>;
  async fn update_comment(
    &self,
    comment_id: i32,
    user_id: i32,
    req: UpdateCommentRequest,
  ) -> Result<Comment, CommentServiceError>;
  async fn delete_comment(&self, comment_id: i32, user_id: i32) -> Result<(), CommentServiceError>;
  async fn list_user_comments(&self, user_id: i32, limit: i64) -> Result<Vec<Comment>, CommentServiceError>;
}

pub struct CommentServiceImpl<C, E> {
  comments: C,
  experiences: E,
}

impl<C, E> CommentServiceImpl<C, E>
where
  C: CommentRepository,
  E: ExperienceRepository,
{
  pub fn new(comments: C, experiences: E) -> Self {
    Self { comments, experiences }
  }

  async fn ensure_experience(&self, experience_id: i32) -> Result<(), CommentServiceError> {
    match self.experiences.find_by_id(experience_id).await? {
      Some(_) => Ok(()),
      None => Err(CommentServiceError::NotFound(format!("体験が見つかりません: {}", experience_id))),
    }
  }

  async fn owned_comment(&self, comment_id: i32, user_id: i32) -> Result<Comment, CommentServiceError> {
    let comment = self
      .comments
      .find_by_id(comment_id)
      .await?
      .ok_or_else(|| CommentServiceError::NotFound(format!("コメントが見つかりません: {}", comment_id)))?;

    if comment.user_id != user_id {
      return Err(CommentServiceError::Forbidden(
        "他のユーザーのコメントは変更できません".to_string(),
      ));
    }
    Ok(comment)
  }
}

/// 返信を親ごとにまとめる。返信の並び順はそのまま保つ
fn build_threads(top_level: Vec<Comment>, replies: Vec<Comment>) -> Vec<CommentThread> {
  let mut by_parent: HashMap<i32, Vec<Comment>> = HashMap::new();
  for reply in replies {
    if let Some(parent_id) = reply.parent_comment_id {
      by_parent.entry(parent_id).or_default().push(reply);
    }
  }

  top_level
    .into_iter()
    .map(|comment| CommentThread {
      replies: by_parent.remove(&comment.id).unwrap_or_default(),
      comment,
    })
    .collect()
}

#[async_trait]
impl<C, E> CommentService for CommentServiceImpl<C, E>
where
  C: CommentRepository,
  E: ExperienceRepository,
{
  async fn list_comments(&self, experience_id: i32) -> Result<CommentsResponse, CommentServiceError> {
    self.ensure_experience(experience_id).await?;

    let top_level = self.comments.list_top_level(experience_id).await?;
    let parent_ids: Vec<i32> = top_level.iter().map(|c| c.id).collect();
    let replies = self.comments.list_replies(&parent_ids).await?;
    let count = self.comments.count_for_experience(experience_id).await?;

    Ok(CommentsResponse {
      comments: build_threads(top_level, replies),
      count,
    })
  }

  async fn create_comment(
    &self,
    experience_id: i32,
    user_id: i32,
    req: CreateCommentRequest,
  ) -> Result<Comment, CommentServiceError> {
    req
      .validate()
      .map_err(|e| CommentServiceError::BadRequest(format!("Validation failed: {}", e)))?;
    self.ensure_experience(experience_id).await?;

    if let Some(parent_id) = req.parent_comment_id {
      let parent = self
        .comments
        .find_by_id(parent_id)
        .await?
        .ok_or_else(|| CommentServiceError::NotFound(format!("返信先のコメントが見つかりません: {}", parent_id)))?;

      if parent.experience_id != experience_id {
        return Err(CommentServiceError::BadRequest(
          "返信先のコメントは同じ体験のものである必要があります".to_string(),
        ));
      }
      if !parent.is_top_level() {
        return Err(CommentServiceError::BadRequest("返信に返信することはできません".to_string()));
      }
    }

    let comment = self.comments.create(experience_id, user_id, &req).await?;
    tracing::info!("Comment {} posted to experience {} by user {}", comment.id, experience_id, user_id);
    Ok(comment)
  }

  async fn update_comment(
    &self,
    comment_id: i32,
    user_id: i32,
    req: UpdateCommentRequest,
  ) -> Result<Comment, CommentServiceError> {
    req
      .validate()
      .map_err(|e| CommentServiceError::BadRequest(format!("Validation failed: {}", e)))?;
    if req.content.is_none() && req.rating.is_none() {
      return Err(CommentServiceError::BadRequest("更新する項目がありません".to_string()));
    }
    self.owned_comment(comment_id, user_id).await?;

    Ok(self.comments.update(comment_id, req.content, req.rating).await?)
  }

  async fn delete_comment(&self, comment_id: i32, user_id: i32) -> Result<(), CommentServiceError> {
    self.owned_comment(comment_id, user_id).await?;
    self.comments.delete(comment_id).await?;
    tracing::info!("Comment {} deleted by user {}", comment_id, user_id);
    Ok(())
  }

  async fn list_user_comments(&self, user_id: i32, limit: i64) -> Result<Vec<Comment>, CommentServiceError> {
    Ok(self.comments.list_by_user(user_id, limit).await?)
  }
}
