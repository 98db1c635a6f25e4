use std::{
  collections::HashMap,
  sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
  },
  time::Duration,
};

use async_trait::async_trait;
use axum::{
  body::{Body, Bytes},
  http::{header, Request, StatusCode},
  Router,
};
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use tower::ServiceExt;

use crate::{
  app::create_app,
  db::RepositoryError,
  domains::{
    comment::{
      model::{Comment, CreateCommentRequest},
      repository::CommentRepository,
      service::CommentServiceImpl,
    },
    experience::{
      model::{AgeGroup, Category, CreateExperienceRequest, Experience, Gender, TimeOfDay},
      repository::ExperienceRepository,
      service::ExperienceServiceImpl,
    },
    photo::{
      model::{NewPhoto, Photo},
      repository::PhotoRepository,
      service::PhotoServiceImpl,
    },
    place::service::PlaceServiceImpl,
    route::{
      model::{NewRoute, Route, RouteStep},
      repository::RouteRepository,
      service::RouteServiceImpl,
    },
  },
  places::{OptimizedPlacesLookup, PlacesLookupService},
  quota::{MemoryQuotaStore, QuotaCounter, DEFAULT_MONTHLY_LIMIT},
  state::SharedAppState,
  storage::PhotoStorage,
  utils::jwt::{encode_jwt, Claims},
};

pub const TEST_JWT_SECRET: &str = "test-secret";
pub const TEST_MAX_PHOTO_SIZE: usize = 5 * 1024 * 1024;
const STORAGE_BASE: &str = "memory://experience-photos/";
const BOUNDARY: &str = "my-road-test-boundary";

fn base_time() -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).single().expect("valid timestamp")
}

/// id が大きいほど新しい体験
pub fn experience(id: i32, category: Category, rating: u8, latitude: f64, longitude: f64) -> Experience {
  Experience {
    id,
    user_id: None,
    latitude,
    longitude,
    category,
    rating,
    address: None,
    age_group: AgeGroup::Twenties,
    gender: Gender::Female,
    time_of_day: TimeOfDay::Noon,
    place: None,
    created_at: base_time() + chrono::Duration::minutes(i64::from(id)),
  }
}

#[derive(Clone, Default)]
pub struct InMemoryExperienceRepository {
  rows: Arc<Mutex<Vec<Experience>>>,
}

impl InMemoryExperienceRepository {
  pub fn insert(&self, experience: Experience) {
    self.rows.lock().expect("lock").push(experience);
  }

  pub fn len(&self) -> usize {
    self.rows.lock().expect("lock").len()
  }
}

#[async_trait]
impl ExperienceRepository for InMemoryExperienceRepository {
  async fn find_all(&self) -> Result<Vec<Experience>, RepositoryError> {
    let mut rows = self.rows.lock().expect("lock").clone();
    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    Ok(rows)
  }

  async fn find_by_id(&self, id: i32) -> Result<Option<Experience>, RepositoryError> {
    Ok(self.rows.lock().expect("lock").iter().find(|e| e.id == id).cloned())
  }

  async fn create(&self, user_id: Option<i32>, req: &CreateExperienceRequest) -> Result<Experience, RepositoryError> {
    let mut rows = self.rows.lock().expect("lock");
    let id = rows.iter().map(|e| e.id).max().unwrap_or(0) + 1;
    let experience = Experience {
      user_id,
      address: req.address.clone(),
      age_group: req.age_group,
      gender: req.gender,
      time_of_day: req.time_of_day,
      place: req.place.clone(),
      ..experience(id, req.category, req.rating, req.latitude, req.longitude)
    };
    rows.push(experience.clone());
    Ok(experience)
  }
}

#[derive(Clone, Default)]
pub struct InMemoryPhotoRepository {
  rows: Arc<Mutex<Vec<Photo>>>,
}

fn newest_first<T>(rows: &mut [T], key: impl Fn(&T) -> (DateTime<Utc>, i32)) {
  rows.sort_by(|a, b| key(b).cmp(&key(a)));
}

#[async_trait]
impl PhotoRepository for InMemoryPhotoRepository {
  async fn list_by_experience(&self, experience_id: i32) -> Result<Vec<Photo>, RepositoryError> {
    let mut photos: Vec<Photo> = self
      .rows
      .lock()
      .expect("lock")
      .iter()
      .filter(|p| p.experience_id == experience_id)
      .cloned()
      .collect();
    newest_first(&mut photos, |p| (p.created_at, p.id));
    Ok(photos)
  }

  async fn list_by_user(&self, user_id: i32, limit: i64) -> Result<Vec<Photo>, RepositoryError> {
    let mut photos: Vec<Photo> = self
      .rows
      .lock()
      .expect("lock")
      .iter()
      .filter(|p| p.user_id == user_id)
      .cloned()
      .collect();
    newest_first(&mut photos, |p| (p.created_at, p.id));
    photos.truncate(limit as usize);
    Ok(photos)
  }

  async fn find_by_id(&self, id: i32) -> Result<Option<Photo>, RepositoryError> {
    Ok(self.rows.lock().expect("lock").iter().find(|p| p.id == id).cloned())
  }

  async fn create(&self, photo: NewPhoto) -> Result<Photo, RepositoryError> {
    let mut rows = self.rows.lock().expect("lock");
    if photo.is_primary {
      for row in rows.iter_mut().filter(|p| p.experience_id == photo.experience_id) {
        row.is_primary = false;
      }
    }

    let id = rows.iter().map(|p| p.id).max().unwrap_or(0) + 1;
    let created_at = base_time() + chrono::Duration::seconds(i64::from(id));
    let created = Photo {
      id,
      experience_id: photo.experience_id,
      user_id: photo.user_id,
      photo_url: photo.photo_url,
      photo_thumbnail_url: None,
      caption: photo.caption,
      file_size: Some(photo.file_size),
      mime_type: Some(photo.mime_type),
      is_primary: photo.is_primary,
      created_at,
      updated_at: created_at,
    };
    rows.push(created.clone());
    Ok(created)
  }

  async fn update(&self, id: i32, caption: Option<String>, is_primary: Option<bool>) -> Result<Photo, RepositoryError> {
    let mut rows = self.rows.lock().expect("lock");
    let experience_id = rows
      .iter()
      .find(|p| p.id == id)
      .map(|p| p.experience_id)
      .ok_or_else(|| RepositoryError::NotFound(format!("photo {}", id)))?;

    if is_primary == Some(true) {
      for row in rows.iter_mut().filter(|p| p.experience_id == experience_id) {
        row.is_primary = false;
      }
    }

    let photo = rows
      .iter_mut()
      .find(|p| p.id == id)
      .ok_or_else(|| RepositoryError::NotFound(format!("photo {}", id)))?;
    if let Some(caption) = caption {
      photo.caption = Some(caption);
    }
    if let Some(is_primary) = is_primary {
      photo.is_primary = is_primary;
    }
    photo.updated_at = Utc::now();
    Ok(photo.clone())
  }

  async fn set_primary(&self, experience_id: i32, photo_id: i32) -> Result<Photo, RepositoryError> {
    let mut rows = self.rows.lock().expect("lock");
    if !rows.iter().any(|p| p.id == photo_id && p.experience_id == experience_id) {
      return Err(RepositoryError::NotFound(format!("photo {}", photo_id)));
    }

    let mut primary = None;
    for row in rows.iter_mut().filter(|p| p.experience_id == experience_id) {
      row.is_primary = row.id == photo_id;
      if row.is_primary {
        primary = Some(row.clone());
      }
    }
    primary.ok_or_else(|| RepositoryError::NotFound(format!("photo {}", photo_id)))
  }

  async fn delete(&self, id: i32) -> Result<(), RepositoryError> {
    let mut rows = self.rows.lock().expect("lock");
    let before = rows.len();
    rows.retain(|p| p.id != id);
    if rows.len() == before {
      return Err(RepositoryError::NotFound(format!("photo {}", id)));
    }
    Ok(())
  }
}

#[derive(Clone, Default)]
pub struct InMemoryCommentRepository {
  rows: Arc<Mutex<Vec<Comment>>>,
}

#[async_trait]
impl CommentRepository for InMemoryCommentRepository {
  async fn list_top_level(&self, experience_id: i32) -> Result<Vec<Comment>, RepositoryError> {
    let mut comments: Vec<Comment> = self
      .rows
      .lock()
      .expect("lock")
      .iter()
      .filter(|c| c.experience_id == experience_id && c.is_top_level())
      .cloned()
      .collect();
    newest_first(&mut comments, |c| (c.created_at, c.id));
    Ok(comments)
  }

  async fn list_replies(&self, parent_ids: &[i32]) -> Result<Vec<Comment>, RepositoryError> {
    let mut replies: Vec<Comment> = self
      .rows
      .lock()
      .expect("lock")
      .iter()
      .filter(|c| c.parent_comment_id.is_some_and(|parent| parent_ids.contains(&parent)))
      .cloned()
      .collect();
    replies.sort_by_key(|c| (c.created_at, c.id));
    Ok(replies)
  }

  async fn count_for_experience(&self, experience_id: i32) -> Result<i64, RepositoryError> {
    let rows = self.rows.lock().expect("lock");
    Ok(rows.iter().filter(|c| c.experience_id == experience_id).count() as i64)
  }

  async fn find_by_id(&self, id: i32) -> Result<Option<Comment>, RepositoryError> {
    Ok(self.rows.lock().expect("lock").iter().find(|c| c.id == id).cloned())
  }

  async fn create(
    &self,
    experience_id: i32,
    user_id: i32,
    req: &CreateCommentRequest,
  ) -> Result<Comment, RepositoryError> {
    let mut rows = self.rows.lock().expect("lock");
    let id = rows.iter().map(|c| c.id).max().unwrap_or(0) + 1;
    let created_at = base_time() + chrono::Duration::seconds(i64::from(id));
    let comment = Comment {
      id,
      experience_id,
      user_id,
      parent_comment_id: req.parent_comment_id,
      content: req.content.trim().to_string(),
      rating: req.rating,
      is_edited: false,
      created_at,
      updated_at: created_at,
    };
    rows.push(comment.clone());
    Ok(comment)
  }

  async fn update(&self, id: i32, content: Option<String>, rating: Option<i16>) -> Result<Comment, RepositoryError> {
    let mut rows = self.rows.lock().expect("lock");
    let comment = rows
      .iter_mut()
      .find(|c| c.id == id)
      .ok_or_else(|| RepositoryError::NotFound(format!("comment {}", id)))?;

    if let Some(content) = content {
      comment.content = content.trim().to_string();
    }
    if rating.is_some() {
      comment.rating = rating;
    }
    comment.is_edited = true;
    comment.updated_at = Utc::now();
    Ok(comment.clone())
  }

  async fn delete(&self, id: i32) -> Result<(), RepositoryError> {
    let mut rows = self.rows.lock().expect("lock");
    if !rows.iter().any(|c| c.id == id) {
      return Err(RepositoryError::NotFound(format!("comment {}", id)));
    }
    rows.retain(|c| c.id != id && c.parent_comment_id != Some(id));
    Ok(())
  }

  async fn list_by_user(&self, user_id: i32, limit: i64) -> Result<Vec<Comment>, RepositoryError> {
    let mut comments: Vec<Comment> = self
      .rows
      .lock()
      .expect("lock")
      .iter()
      .filter(|c| c.user_id == user_id && c.is_top_level())
      .cloned()
      .collect();
    newest_first(&mut comments, |c| (c.created_at, c.id));
    comments.truncate(limit as usize);
    Ok(comments)
  }
}

#[derive(Clone, Default)]
pub struct InMemoryRouteRepository {
  rows: Arc<Mutex<Vec<Route>>>,
}

#[async_trait]
impl RouteRepository for InMemoryRouteRepository {
  async fn create(&self, route: NewRoute) -> Result<Route, RepositoryError> {
    let mut rows = self.rows.lock().expect("lock");
    let id = rows.iter().map(|r| r.id).max().unwrap_or(0) + 1;
    let created = Route {
      id,
      user_id: route.user_id,
      title: route.title,
      description: route.description,
      total_duration: route.total_duration,
      age_group: route.age_group,
      gender: route.gender,
      overall_rating: route.overall_rating,
      created_at: base_time() + chrono::Duration::minutes(i64::from(id)),
      steps: route
        .steps
        .into_iter()
        .map(|step| RouteStep {
          id: id * 100 + step.step_order,
          experience_id: step.experience_id,
          step_order: step.step_order,
          duration_minutes: step.duration_minutes,
          travel_time_to_next: step.travel_time_to_next,
          notes: step.notes,
          experience: None,
        })
        .collect(),
    };
    rows.push(created.clone());
    Ok(created)
  }

  async fn list(&self) -> Result<Vec<Route>, RepositoryError> {
    let mut routes = self.rows.lock().expect("lock").clone();
    newest_first(&mut routes, |r| (r.created_at, r.id));
    Ok(routes)
  }

  async fn find_by_id(&self, id: i32) -> Result<Option<Route>, RepositoryError> {
    Ok(self.rows.lock().expect("lock").iter().find(|r| r.id == id).cloned())
  }
}

#[derive(Default)]
pub struct InMemoryStorage {
  files: Mutex<HashMap<String, usize>>,
  fail_deletes: AtomicBool,
}

impl InMemoryStorage {
  pub fn len(&self) -> usize {
    self.files.lock().expect("lock").len()
  }

  pub fn fail_deletes(&self) {
    self.fail_deletes.store(true, Ordering::SeqCst);
  }
}

#[async_trait]
impl PhotoStorage for InMemoryStorage {
  async fn upload_file(&self, key: &str, data: Vec<u8>, _content_type: &str) -> anyhow::Result<String> {
    self.files.lock().expect("lock").insert(key.to_string(), data.len());
    Ok(format!("{}{}", STORAGE_BASE, key))
  }

  async fn delete_file(&self, key: &str) -> anyhow::Result<()> {
    if self.fail_deletes.load(Ordering::SeqCst) {
      anyhow::bail!("storage unavailable");
    }
    self.files.lock().expect("lock").remove(key);
    Ok(())
  }

  fn extract_key_from_url(&self, url: &str) -> Option<String> {
    url.strip_prefix(STORAGE_BASE).map(str::to_string)
  }
}

/// インメモリのリポジトリで組み立てたアプリ
pub struct TestApp {
  pub experiences: InMemoryExperienceRepository,
  pub photos: InMemoryPhotoRepository,
  pub comments: InMemoryCommentRepository,
  pub routes: InMemoryRouteRepository,
  pub storage: Arc<InMemoryStorage>,
  state: SharedAppState,
}

impl TestApp {
  pub fn new() -> Self {
    Self::with_places(None)
  }

  pub fn with_places(places: Option<Arc<dyn PlacesLookupService>>) -> Self {
    let experiences = InMemoryExperienceRepository::default();
    let photos = InMemoryPhotoRepository::default();
    let comments = InMemoryCommentRepository::default();
    let routes = InMemoryRouteRepository::default();
    let storage = Arc::new(InMemoryStorage::default());
    let quota = QuotaCounter::new(Arc::new(MemoryQuotaStore::new()), DEFAULT_MONTHLY_LIMIT);

    let state = SharedAppState {
      experience_service: Arc::new(
        ExperienceServiceImpl::new(experiences.clone()).with_retry_delay(Duration::from_millis(1)),
      ),
      photo_service: Arc::new(PhotoServiceImpl::new(
        photos.clone(),
        experiences.clone(),
        storage.clone(),
        TEST_MAX_PHOTO_SIZE,
      )),
      comment_service: Arc::new(CommentServiceImpl::new(comments.clone(), experiences.clone())),
      route_service: Arc::new(RouteServiceImpl::new(routes.clone(), experiences.clone())),
      place_service: Arc::new(PlaceServiceImpl::new(OptimizedPlacesLookup::new(places, quota))),
      jwt_secret: Arc::from(TEST_JWT_SECRET),
      max_photo_size: TEST_MAX_PHOTO_SIZE,
    };

    Self {
      experiences,
      photos,
      comments,
      routes,
      storage,
      state,
    }
  }

  pub fn router(&self) -> Router {
    create_app(self.state.clone())
  }
}

pub fn bearer_token(app: &TestApp, user_id: i32) -> String {
  let claims = Claims {
    sub: format!("user-{}", user_id),
    exp: (Utc::now().timestamp() + 3600) as usize,
    user_id,
  };
  encode_jwt(&claims, &app.state.jwt_secret).expect("encode token")
}

async fn call(app: Router, request: Request<Body>) -> (StatusCode, Bytes) {
  let response = app.oneshot(request).await.expect("handle request");
  let status = response.status();
  let body = axum::body::to_bytes(response.into_body(), usize::MAX)
    .await
    .expect("read response body");
  (status, body)
}

fn with_token(builder: axum::http::request::Builder, token: Option<&str>) -> axum::http::request::Builder {
  match token {
    Some(token) => builder.header(header::AUTHORIZATION, format!("Bearer {}", token)),
    None => builder,
  }
}

pub async fn get(app: Router, uri: &str) -> (StatusCode, Bytes) {
  let request = Request::builder()
    .method("GET")
    .uri(uri)
    .body(Body::empty())
    .expect("build request");
  call(app, request).await
}

pub async fn post_json<T: Serialize>(app: Router, uri: &str, body: &T, token: Option<&str>) -> (StatusCode, Bytes) {
  let request = with_token(Request::builder().method("POST").uri(uri), token)
    .header(header::CONTENT_TYPE, "application/json")
    .body(Body::from(serde_json::to_vec(body).expect("serialize request body")))
    .expect("build request");
  call(app, request).await
}

pub async fn send(
  app: Router,
  method: &str,
  uri: &str,
  body: Option<serde_json::Value>,
  token: Option<&str>,
) -> (StatusCode, Bytes) {
  let builder = with_token(Request::builder().method(method).uri(uri), token);
  let request = match body {
    Some(body) => builder
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(serde_json::to_vec(&body).expect("serialize request body"))),
    None => builder.body(Body::empty()),
  }
  .expect("build request");
  call(app, request).await
}

/// キャプション「展示室」、代表写真として1枚アップロードする
pub async fn multipart_upload(
  app: Router,
  uri: &str,
  token: Option<&str>,
  content_type: &str,
  data: &[u8],
) -> (StatusCode, Bytes) {
  let mut body = Vec::new();
  for (name, value) in [("caption", "展示室"), ("is_primary", "true")] {
    body.extend_from_slice(
      format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
      )
      .as_bytes(),
    );
  }
  body.extend_from_slice(
    format!(
      "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"photo.png\"\r\nContent-Type: {content_type}\r\n\r\n"
    )
    .as_bytes(),
  );
  body.extend_from_slice(data);
  body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

  let request = with_token(Request::builder().method("POST").uri(uri), token)
    .header(
      header::CONTENT_TYPE,
      format!("multipart/form-data; boundary={BOUNDARY}"),
    )
    .body(Body::from(body))
    .expect("build request");
  call(app, request).await
}
