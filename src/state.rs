use std::sync::Arc;

use sqlx::PgPool;

use crate::{
  config::Config,
  domains::{
    comment::{
      repository::SqlxCommentRepository,
      service::{CommentService, CommentServiceImpl},
    },
    experience::{
      repository::SqlxExperienceRepository,
      service::{ExperienceService, ExperienceServiceImpl},
    },
    photo::{
      repository::SqlxPhotoRepository,
      service::{PhotoService, PhotoServiceImpl},
    },
    place::service::{PlaceService, PlaceServiceImpl},
    route::{
      repository::SqlxRouteRepository,
      service::{RouteService, RouteServiceImpl},
    },
  },
  places::OptimizedPlacesLookup,
  storage::PhotoStorage,
};

/// ハンドラーから参照するサービス群
#[derive(Clone)]
pub struct SharedAppState {
  pub experience_service: Arc<dyn ExperienceService>,
  pub photo_service: Arc<dyn PhotoService>,
  pub comment_service: Arc<dyn CommentService>,
  pub route_service: Arc<dyn RouteService>,
  pub place_service: Arc<dyn PlaceService>,
  pub jwt_secret: Arc<str>,
  pub max_photo_size: usize,
}

impl SharedAppState {
  pub fn new(pool: PgPool, storage: Arc<dyn PhotoStorage>, places: OptimizedPlacesLookup, config: &Config) -> Self {
    let experiences = SqlxExperienceRepository::new(pool.clone());

    Self {
      experience_service: Arc::new(ExperienceServiceImpl::new(experiences.clone())),
      photo_service: Arc::new(PhotoServiceImpl::new(
        SqlxPhotoRepository::new(pool.clone()),
        experiences.clone(),
        storage,
        config.max_photo_size_bytes,
      )),
      comment_service: Arc::new(CommentServiceImpl::new(
        SqlxCommentRepository::new(pool.clone()),
        experiences.clone(),
      )),
      route_service: Arc::new(RouteServiceImpl::new(SqlxRouteRepository::new(pool), experiences)),
      place_service: Arc::new(PlaceServiceImpl::new(places)),
      jwt_secret: Arc::from(config.jwt_secret.as_str()),
      max_photo_size: config.max_photo_size_bytes,
    }
  }
}
