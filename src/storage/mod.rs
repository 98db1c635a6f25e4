use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::{
  config::{Credentials, SharedCredentialsProvider},
  primitives::ByteStream,
  Client as S3Client,
};
use std::env;

/// 写真ファイルの保存先
#[async_trait]
pub trait PhotoStorage: Send + Sync {
  /// 保存して公開 URL を返す
  async fn upload_file(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<String>;
  async fn delete_file(&self, key: &str) -> Result<()>;
  fn extract_key_from_url(&self, url: &str) -> Option<String>;
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
  pub endpoint: Option<String>,
  pub public_endpoint: Option<String>,
  pub access_key: String,
  pub secret_key: String,
  pub region: String,
  pub bucket: String,
}

impl StorageConfig {
  pub fn from_env() -> Result<Self> {
    Ok(Self {
      endpoint: env::var("S3_ENDPOINT").ok(),
      public_endpoint: env::var("S3_PUBLIC_ENDPOINT").ok(),
      access_key: env::var("S3_ACCESS_KEY").context("S3_ACCESS_KEY not set")?,
      secret_key: env::var("S3_SECRET_KEY").context("S3_SECRET_KEY not set")?,
      region: env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
      bucket: env::var("S3_BUCKET").context("S3_BUCKET not set")?,
    })
  }

  /// supabase 以外の S3 互換ストレージはパス形式でアクセスする
  fn force_path_style(&self) -> bool {
    !self.endpoint.as_deref().is_some_and(|e| e.contains("supabase"))
  }
}

#[derive(Clone)]
pub struct S3Storage {
  client: S3Client,
  bucket: String,
  public_base: String,
}

impl S3Storage {
  pub async fn new(config: StorageConfig) -> Result<Self> {
    let credentials = Credentials::new(&config.access_key, &config.secret_key, None, None, "my-road");

    let mut loader = aws_config::defaults(BehaviorVersion::latest())
      .region(Region::new(config.region.clone()))
      .credentials_provider(SharedCredentialsProvider::new(credentials));
    if let Some(endpoint) = &config.endpoint {
      loader = loader.endpoint_url(endpoint);
    }
    let sdk_config = loader.load().await;

    let mut s3_config = aws_sdk_s3::config::Builder::from(&sdk_config).force_path_style(config.force_path_style());
    if let Some(endpoint) = &config.endpoint {
      s3_config = s3_config.endpoint_url(endpoint);
    }

    Ok(Self::with_client(S3Client::from_conf(s3_config.build()), &config))
  }

  fn with_client(client: S3Client, config: &StorageConfig) -> Self {
    let public_base = match config.public_endpoint.as_ref().or(config.endpoint.as_ref()) {
      Some(endpoint) => format!("{}/{}/", endpoint.trim_end_matches('/'), config.bucket),
      None => format!("https://{}.s3.amazonaws.com/", config.bucket),
    };

    Self {
      client,
      bucket: config.bucket.clone(),
      public_base,
    }
  }

  pub fn public_url(&self, key: &str) -> String {
    format!("{}{}", self.public_base, key)
  }
}

#[async_trait]
impl PhotoStorage for S3Storage {
  async fn upload_file(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<String> {
    self
      .client
      .put_object()
      .bucket(&self.bucket)
      .key(key)
      .body(ByteStream::from(data))
      .content_type(content_type)
      .cache_control("max-age=3600")
      .send()
      .await
      .map_err(|e| anyhow::anyhow!("Failed to upload photo to S3: {:?}", e))?;

    Ok(self.public_url(key))
  }

  async fn delete_file(&self, key: &str) -> Result<()> {
    self
      .client
      .delete_object()
      .bucket(&self.bucket)
      .key(key)
      .send()
      .await
      .map_err(|e| anyhow::anyhow!("Failed to delete photo from S3: {:?}", e))?;

    Ok(())
  }

  fn extract_key_from_url(&self, url: &str) -> Option<String> {
    url
      .strip_prefix(&self.public_base)
      .filter(|key| !key.is_empty())
      .map(str::to_string)
  }
}
