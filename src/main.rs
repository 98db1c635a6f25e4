use std::sync::Arc;

use anyhow::Context;
use dotenvy::dotenv;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use my_road_api::app::create_app;
use my_road_api::config::Config;
use my_road_api::db::pool::create_pool;
use my_road_api::places::build_lookup;
use my_road_api::state::SharedAppState;
use my_road_api::storage::{S3Storage, StorageConfig};

const DEFAULT_LOG_FILTER: &str = "my_road_api=info,tower_http=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  dotenv().ok();

  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)))
    .init();

  let config = Config::from_env()?;

  let pool = create_pool(&config.database_url, config.database_max_connections)
    .await
    .context("Failed to create database pool")?;

  sqlx::migrate!("./migrations").run(&pool).await?;

  info!("Database migrations applied successfully");

  let storage = S3Storage::new(StorageConfig::from_env()?).await?;
  let places = build_lookup(&config);
  let app_state = SharedAppState::new(pool, Arc::new(storage), places, &config);
  let app = create_app(app_state);

  let listener = tokio::net::TcpListener::bind(config.bind_addr)
    .await
    .with_context(|| format!("Failed to bind {}", config.bind_addr))?;

  info!("Server running on http://{}", config.bind_addr);

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;

  Ok(())
}

async fn shutdown_signal() {
  let ctrl_c = async {
    signal::ctrl_c().await.expect("Failed to install Ctrl+C handler");
  };

  #[cfg(unix)]
  let terminate = async {
    signal::unix::signal(signal::unix::SignalKind::terminate())
      .expect("Failed to install signal handler")
      .recv()
      .await;
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
      _ = ctrl_c => {},
      _ = terminate => {},
  }

  info!("Received termination signal, shutting down gracefully...");
}
