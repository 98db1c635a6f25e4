use std::{env, fmt::Display, net::SocketAddr, path::PathBuf, str::FromStr};

use anyhow::{anyhow, Context, Result};
use tracing::info;

use crate::{places::DEFAULT_BASE_URL, quota::DEFAULT_MONTHLY_LIMIT};

pub const DEFAULT_MAX_PHOTO_SIZE_MB: usize = 5;

#[derive(Debug, Clone)]
pub struct Config {
  pub database_url: String,
  pub database_max_connections: u32,
  pub bind_addr: SocketAddr,
  pub jwt_secret: String,
  pub google_places_api_key: Option<String>,
  pub google_places_base_url: String,
  pub places_monthly_limit: u32,
  pub quota_store_dir: Option<PathBuf>,
  pub max_photo_size_bytes: usize,
}

impl Config {
  pub fn from_env() -> Result<Self> {
    let max_photo_size_mb: usize = try_load("MAX_PHOTO_SIZE_MB", &DEFAULT_MAX_PHOTO_SIZE_MB.to_string())?;
    let max_photo_size_bytes = max_photo_size_mb
      .checked_mul(1024 * 1024)
      .ok_or_else(|| anyhow!("Invalid MAX_PHOTO_SIZE_MB value {max_photo_size_mb:?}: too large"))?;

    Ok(Self {
      database_url: required("DATABASE_URL")?,
      database_max_connections: try_load("DATABASE_MAX_CONNECTIONS", "10")?,
      bind_addr: try_load("BIND_ADDR", "0.0.0.0:8000")?,
      jwt_secret: required("JWT_SECRET")?,
      google_places_api_key: optional("GOOGLE_PLACES_API_KEY"),
      google_places_base_url: optional("GOOGLE_PLACES_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
      places_monthly_limit: try_load("PLACES_MONTHLY_LIMIT", &DEFAULT_MONTHLY_LIMIT.to_string())?,
      quota_store_dir: optional("QUOTA_STORE_DIR").map(PathBuf::from),
      max_photo_size_bytes,
    })
  }
}

fn optional(key: &str) -> Option<String> {
  env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn required(key: &str) -> Result<String> {
  optional(key).with_context(|| format!("{key} not set"))
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
  T::Err: Display,
{
  let raw = optional(key).unwrap_or_else(|| {
    info!("{key} not set, using default: {default}");
    default.to_string()
  });

  raw.parse().map_err(|e| anyhow!("Invalid {key} value {raw:?}: {e}"))
}
