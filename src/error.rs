/// サービス層のエラー型に共通の From 実装を生成する
///
/// Usage:
/// ```ignore
/// impl_service_error_conversions!(RouteServiceError, InternalServerError, NotFound);
/// ```
#[macro_export]
macro_rules! impl_service_error_conversions {
  ($error_type:ty, $internal_variant:ident) => {
    impl From<sqlx::Error> for $error_type {
      fn from(err: sqlx::Error) -> Self {
        <$error_type>::$internal_variant(format!("Database error: {}", err))
      }
    }
  };

  ($error_type:ty, $internal_variant:ident, $not_found_variant:ident) => {
    $crate::impl_service_error_conversions!($error_type, $internal_variant);

    impl From<$crate::db::RepositoryError> for $error_type {
      fn from(err: $crate::db::RepositoryError) -> Self {
        use $crate::db::RepositoryError;
        match err {
          RepositoryError::DatabaseError(e) => <$error_type>::$internal_variant(format!("Database error: {}", e)),
          RepositoryError::NotFound(msg) => <$error_type>::$not_found_variant(msg),
          RepositoryError::InvalidRow(msg) => <$error_type>::$internal_variant(format!("Invalid row: {}", msg)),
        }
      }
    }
  };
}
