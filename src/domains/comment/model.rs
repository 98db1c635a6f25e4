use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, FromRow, Deserialize, Serialize)]
pub struct Comment {
  pub id: i32,
  pub experience_id: i32,
  pub user_id: i32,
  pub parent_comment_id: Option<i32>,
  pub content: String,
  pub rating: Option<i16>,
  pub is_edited: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Comment {
  pub fn is_top_level(&self) -> bool {
    self.parent_comment_id.is_none()
  }
}

/// トップレベルのコメントと、その返信（古い順）
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CommentThread {
  #[serde(flatten)]
  pub comment: Comment,
  pub replies: Vec<Comment>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CommentsResponse {
  pub comments: Vec<CommentThread>,
  /// 返信を含む総数
  pub count: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct CreateCommentRequest {
  #[validate(
    length(min = 1, max = 1000, message = "コメントは1文字以上1000文字以内である必要があります"),
    custom(function = "crate::utils::validate_not_blank")
  )]
  pub content: String,
  #[validate(range(min = 1, max = 5, message = "評価は1から5の範囲である必要があります"))]
  pub rating: Option<i16>,
  pub parent_comment_id: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct UpdateCommentRequest {
  #[validate(
    length(min = 1, max = 1000, message = "コメントは1文字以上1000文字以内である必要があります"),
    custom(function = "crate::utils::validate_not_blank")
  )]
  pub content: Option<String>,
  #[validate(range(min = 1, max = 5, message = "評価は1から5の範囲である必要があります"))]
  pub rating: Option<i16>,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn create(content: &str, rating: Option<i16>) -> CreateCommentRequest {
    CreateCommentRequest {
      content: content.to_string(),
      rating,
      parent_comment_id: None,
    }
  }

  #[test]
  fn content_must_have_text() {
    assert!(create("また行きたい", Some(5)).validate().is_ok());
    assert!(create("", None).validate().is_err());
    assert!(create("   ", None).validate().is_err());
    assert!(create(&"あ".repeat(1001), None).validate().is_err());
    assert!(create(&"あ".repeat(1000), None).validate().is_ok());
  }

  #[test]
  fn rating_is_optional_but_bounded() {
    assert!(create("良い", None).validate().is_ok());
    assert!(create("良い", Some(0)).validate().is_err());
    assert!(create("良い", Some(6)).validate().is_err());
  }

  #[test]
  fn update_validates_present_fields_only() {
    assert!(UpdateCommentRequest::default().validate().is_ok());
    let blank = UpdateCommentRequest {
      content: Some(" ".to_string()),
      rating: None,
    };
    assert!(blank.validate().is_err());
  }

  #[test]
  fn thread_serializes_flat_with_replies() {
    let comment = Comment {
      id: 1,
      experience_id: 2,
      user_id: 3,
      parent_comment_id: None,
      content: "静かで良い".to_string(),
      rating: Some(4),
      is_edited: false,
      created_at: Utc::now(),
      updated_at: Utc::now(),
    };
    let value = serde_json::to_value(CommentThread {
      comment,
      replies: vec![],
    })
    .expect("serialize");
    assert_eq!(value["id"], 1);
    assert_eq!(value["replies"], serde_json::json!([]));
  }
}
