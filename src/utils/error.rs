use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use serde_json::json;

#[derive(Debug)]
pub struct AppError {
  pub status_code: StatusCode,
  pub message: String,
}

impl AppError {
  pub fn new(status_code: StatusCode, message: impl Into<String>) -> Self {
    Self {
      status_code,
      message: message.into(),
    }
  }

  pub fn bad_request(message: impl Into<String>) -> Self {
    Self::new(StatusCode::BAD_REQUEST, message)
  }

  pub fn unauthorized(message: impl Into<String>) -> Self {
    Self::new(StatusCode::UNAUTHORIZED, message)
  }

  pub fn not_found(message: impl Into<String>) -> Self {
    Self::new(StatusCode::NOT_FOUND, message)
  }

  pub fn forbidden(message: impl Into<String>) -> Self {
    Self::new(StatusCode::FORBIDDEN, message)
  }

  pub fn bad_gateway(message: impl Into<String>) -> Self {
    Self::new(StatusCode::BAD_GATEWAY, message)
  }

  pub fn internal_server_error(message: impl Into<String>) -> Self {
    Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
  }

  /// 内部エラーの詳細はログにだけ残し、レスポンスには含めない
  fn internal(detail: impl std::fmt::Display) -> Self {
    tracing::error!("Internal error: {}", detail);
    AppError::internal_server_error("Internal server error occurred")
  }
}

impl IntoResponse for AppError {
  fn into_response(self) -> Response {
    let body = Json(json!({
      "error": self.message,
      "status_code": self.status_code.as_u16(),
    }));

    (self.status_code, body).into_response()
  }
}

impl From<AppError> for StatusCode {
  fn from(err: AppError) -> Self {
    err.status_code
  }
}

impl From<sqlx::Error> for AppError {
  fn from(error: sqlx::Error) -> Self {
    tracing::error!("Database error: {:?}", error);
    AppError::internal_server_error("Internal server error occurred")
  }
}

impl From<serde_json::Error> for AppError {
  fn from(error: serde_json::Error) -> Self {
    tracing::error!("JSON error: {:?}", error);
    AppError::bad_request("Invalid JSON format")
  }
}

impl From<validator::ValidationErrors> for AppError {
  fn from(errors: validator::ValidationErrors) -> Self {
    AppError::bad_request(format!("Validation failed: {}", errors))
  }
}

impl From<crate::domains::experience::service::ExperienceServiceError> for AppError {
  fn from(error: crate::domains::experience::service::ExperienceServiceError) -> Self {
    use crate::domains::experience::service::ExperienceServiceError;
    match error {
      ExperienceServiceError::BadRequest(msg) => AppError::bad_request(msg),
      ExperienceServiceError::NotFound(msg) => AppError::not_found(msg),
      ExperienceServiceError::InternalServerError(msg) => AppError::internal(msg),
    }
  }
}

impl From<crate::domains::photo::service::PhotoServiceError> for AppError {
  fn from(error: crate::domains::photo::service::PhotoServiceError) -> Self {
    use crate::domains::photo::service::PhotoServiceError;
    match error {
      PhotoServiceError::BadRequest(msg) => AppError::bad_request(msg),
      PhotoServiceError::NotFound(msg) => AppError::not_found(msg),
      PhotoServiceError::Forbidden(msg) => AppError::forbidden(msg),
      PhotoServiceError::InternalServerError(msg) => AppError::internal(msg),
    }
  }
}

impl From<crate::domains::comment::service::CommentServiceError> for AppError {
  fn from(error: crate::domains::comment::service::CommentServiceError) -> Self {
    use crate::domains::comment::service::CommentServiceError;
    match error {
      CommentServiceError::BadRequest(msg) => AppError::bad_request(msg),
      CommentServiceError::NotFound(msg) => AppError::not_found(msg),
      CommentServiceError::Forbidden(msg) => AppError::forbidden(msg),
      CommentServiceError::InternalServerError(msg) => AppError::internal(msg),
    }
  }
}

impl From<crate::domains::route::service::RouteServiceError> for AppError {
  fn from(error: crate::domains::route::service::RouteServiceError) -> Self {
    use crate::domains::route::service::RouteServiceError;
    match error {
      RouteServiceError::BadRequest(msg) => AppError::bad_request(msg),
      RouteServiceError::NotFound(msg) => AppError::not_found(msg),
      RouteServiceError::InternalServerError(msg) => AppError::internal(msg),
    }
  }
}

impl From<crate::domains::place::service::PlaceServiceError> for AppError {
  fn from(error: crate::domains::place::service::PlaceServiceError) -> Self {
    use crate::domains::place::service::PlaceServiceError;
    match error {
      PlaceServiceError::BadRequest(msg) => AppError::bad_request(msg),
      PlaceServiceError::Upstream(e) => {
        tracing::error!("Places lookup failed: {}", e);
        AppError::bad_gateway("場所情報の取得に失敗しました")
      }
    }
  }
}
