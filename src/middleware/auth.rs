use axum::{
  extract::FromRequestParts,
  http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};

use crate::{
  state::SharedAppState,
  utils::{error::AppError, jwt::decode_jwt},
};

/// `Authorization: Bearer <token>` を検証してユーザー ID を取り出す
pub fn authenticate(headers: &HeaderMap, secret: &str) -> Result<i32, AppError> {
  let auth_header = headers
    .get(AUTHORIZATION)
    .ok_or_else(|| AppError::unauthorized("Authorization header missing"))?
    .to_str()
    .map_err(|_| AppError::unauthorized("Invalid authorization header"))?;

  let token = auth_header
    .strip_prefix("Bearer ")
    .ok_or_else(|| AppError::unauthorized("Invalid authorization format"))?;

  let claims = decode_jwt(token, secret).map_err(|_| AppError::unauthorized("Invalid token"))?;

  Ok(claims.user_id)
}

/// ヘッダーがなければ匿名として扱う。ヘッダーがあって不正な場合は拒否する
pub fn authenticate_optional(headers: &HeaderMap, secret: &str) -> Result<Option<i32>, AppError> {
  if headers.contains_key(AUTHORIZATION) {
    authenticate(headers, secret).map(Some)
  } else {
    Ok(None)
  }
}

/// 認証必須のハンドラー用
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub i32);

/// 匿名投稿を許すハンドラー用
#[derive(Debug, Clone, Copy)]
pub struct MaybeAuthUser(pub Option<i32>);

impl FromRequestParts<SharedAppState> for AuthUser {
  type Rejection = AppError;

  async fn from_request_parts(parts: &mut Parts, state: &SharedAppState) -> Result<Self, Self::Rejection> {
    authenticate(&parts.headers, &state.jwt_secret).map(AuthUser)
  }
}

impl FromRequestParts<SharedAppState> for MaybeAuthUser {
  type Rejection = AppError;

  async fn from_request_parts(parts: &mut Parts, state: &SharedAppState) -> Result<Self, Self::Rejection> {
    authenticate_optional(&parts.headers, &state.jwt_secret).map(MaybeAuthUser)
  }
}
