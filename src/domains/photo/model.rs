use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, FromRow, Deserialize, Serialize)]
pub struct Photo {
  pub id: i32,
  pub experience_id: i32,
  pub user_id: i32,
  pub photo_url: String,
  pub photo_thumbnail_url: Option<String>,
  pub caption: Option<String>,
  pub file_size: Option<i64>,
  pub mime_type: Option<String>,
  pub is_primary: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// multipart で受け取ったアップロード内容
#[derive(Debug, Clone)]
pub struct PhotoUpload {
  pub file_name: String,
  pub content_type: String,
  pub data: Vec<u8>,
  pub caption: Option<String>,
  pub is_primary: bool,
}

impl PhotoUpload {
  pub fn is_image(&self) -> bool {
    self.content_type.starts_with("image/")
  }

  /// ファイル名の拡張子。なければ MIME タイプから決める
  pub fn extension(&self) -> String {
    let from_name = self
      .file_name
      .rsplit_once('.')
      .map(|(_, ext)| ext.to_ascii_lowercase())
      .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()));

    from_name.unwrap_or_else(|| match self.content_type.trim_start_matches("image/") {
      "jpeg" => "jpg".to_string(),
      subtype if !subtype.is_empty() && subtype.chars().all(|c| c.is_ascii_alphanumeric()) => subtype.to_string(),
      _ => "bin".to_string(),
    })
  }
}

#[derive(Debug, Clone)]
pub struct NewPhoto {
  pub experience_id: i32,
  pub user_id: i32,
  pub photo_url: String,
  pub caption: Option<String>,
  pub file_size: i64,
  pub mime_type: String,
  pub is_primary: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct UpdatePhotoRequest {
  #[validate(length(max = 200, message = "キャプションは200文字以内である必要があります"))]
  pub caption: Option<String>,
  pub is_primary: Option<bool>,
}
