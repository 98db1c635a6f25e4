use validator::ValidationError;

pub mod error;
pub mod geo;
pub mod jwt;
pub mod retry;

/// 空白だけの文字列を拒否する
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
  if value.trim().is_empty() {
    return Err(ValidationError::new("空白のみの内容は投稿できません"));
  }

  Ok(())
}
