use axum::{
  extract::{Json, Path, Query, State},
  http::StatusCode,
  response::Json as JsonResponse,
  routing::{get, patch},
  Router,
};

use super::model::{Comment, CommentsResponse, CreateCommentRequest, UpdateCommentRequest};
use crate::{domains::LimitQuery, middleware::auth::AuthUser, state::SharedAppState, AppError};

pub fn comment_routes() -> Router<SharedAppState> {
  Router::new()
    .route(
      "/experiences/{id}/comments",
      get(list_comments_handler).post(create_comment_handler),
    )
    .route("/comments/{id}", patch(update_comment_handler).delete(delete_comment_handler))
    .route("/users/{id}/comments", get(list_user_comments_handler))
}

async fn list_comments_handler(
  State(state): State<SharedAppState>,
  Path(experience_id): Path<i32>,
) -> Result<JsonResponse<CommentsResponse>, AppError> {
  state
    .comment_service
    .list_comments(experience_id)
    .await
    .map(JsonResponse)
    .map_err(Into::into)
}

async fn create_comment_handler(
  State(state): State<SharedAppState>,
  Path(experience_id): Path<i32>,
  AuthUser(user_id): AuthUser,
  Json(payload): Json<CreateCommentRequest>,
) -> Result<(StatusCode, JsonResponse<Comment>), AppError> {
  let comment = state
    .comment_service
    .create_comment(experience_id, user_id, payload)
    .await?;
  Ok((StatusCode::CREATED, JsonResponse(comment)))
}

async fn update_comment_handler(
  State(state): State<SharedAppState>,
  Path(comment_id): Path<i32>,
  AuthUser(user_id): AuthUser,
  Json(payload): Json<UpdateCommentRequest>,
) -> Result<JsonResponse<Comment>, AppError> {
  state
    .comment_service
    .update_comment(comment_id, user_id, payload)
    .await
    .map(JsonResponse)
    .map_err(Into::into)
}

async fn delete_comment_handler(
  State(state): State<SharedAppState>,
  Path(comment_id): Path<i32>,
  AuthUser(user_id): AuthUser,
) -> Result<StatusCode, AppError> {
  state.comment_service.delete_comment(comment_id, user_id).await?;
  Ok(StatusCode::NO_CONTENT)
}

async fn list_user_comments_handler(
  State(state): State<SharedAppState>,
  Path(user_id): Path<i32>,
  Query(query): Query<LimitQuery>,
) -> Result<JsonResponse<Vec<Comment>>, AppError> {
  state
    .comment_service
    .list_user_comments(user_id, query.resolved())
    .await
    .map(JsonResponse)
    .map_err(Into::into)
}

#[cfg(test)]
mod tests {
  use crate::{
    domains::{
      comment::model::{Comment, CommentsResponse},
      experience::model::Category,
    },
    test_support::{bearer_token, experience, get, post_json, send, TestApp},
  };
  use axum::http::StatusCode;
  use serde_json::json;

  fn app() -> TestApp {
    let app = TestApp::new();
    app.experiences.insert(experience(1, Category::Sento, 5, 35.0, 139.0));
    app
  }

  #[tokio::test]
  async fn posting_requires_token() {
    let (status, _) = post_json(app().router(), "/api/v1/experiences/1/comments", &json!({"content": "熱い湯"}), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn post_reply_and_list_thread() {
    let app = app();
    let token = bearer_token(&app, 21);

    let (status, body) = post_json(
      app.router(),
      "/api/v1/experiences/1/comments",
      &json!({"content": "熱い湯", "rating": 5}),
      Some(&token),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let parent: Comment = serde_json::from_slice(&body).expect("deserialize response");

    let (status, _) = post_json(
      app.router(),
      "/api/v1/experiences/1/comments",
      &json!({"content": "水風呂も良い", "parent_comment_id": parent.id}),
      Some(&token),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = get(app.router(), "/api/v1/experiences/1/comments").await;
    assert_eq!(status, StatusCode::OK);
    let response: CommentsResponse = serde_json::from_slice(&body).expect("deserialize response");
    assert_eq!(response.count, 2);
    assert_eq!(response.comments.len(), 1);
    assert_eq!(response.comments[0].replies.len(), 1);

    let (status, body) = get(app.router(), "/api/v1/users/21/comments").await;
    assert_eq!(status, StatusCode::OK);
    let mine: Vec<Comment> = serde_json::from_slice(&body).expect("deserialize response");
    assert_eq!(mine.len(), 1);
  }

  #[tokio::test]
  async fn edit_and_delete_are_owner_only() {
    let app = app();
    let owner = bearer_token(&app, 21);
    let stranger = bearer_token(&app, 22);
    let (_, body) = post_json(
      app.router(),
      "/api/v1/experiences/1/comments",
      &json!({"content": "混んでた"}),
      Some(&owner),
    )
    .await;
    let comment: Comment = serde_json::from_slice(&body).expect("deserialize response");
    let uri = format!("/api/v1/comments/{}", comment.id);

    let (status, _) = send(app.router(), "PATCH", &uri, Some(json!({"content": "空いてた"})), Some(&stranger)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(app.router(), "PATCH", &uri, Some(json!({"content": "空いてた"})), Some(&owner)).await;
    assert_eq!(status, StatusCode::OK);
    let edited: Comment = serde_json::from_slice(&body).expect("deserialize response");
    assert!(edited.is_edited);

    let (status, _) = send(app.router(), "DELETE", &uri, None, Some(&owner)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(app.router(), "DELETE", &uri, None, Some(&owner)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn comments_of_missing_experience_are_404() {
    let (status, _) = get(app().router(), "/api/v1/experiences/77/comments").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }
}
