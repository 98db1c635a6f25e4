use async_trait::async_trait;
use sqlx::PgPool;

use super::model::{NewRoute, Route, RouteRow, RouteStepRow};
use crate::db::RepositoryError;

const ROUTE_COLUMNS: &str =
  "id, user_id, title, description, total_duration, age_group, gender, overall_rating, created_at";
const STEP_COLUMNS: &str = "id, route_id, experience_id, step_order, duration_minutes, travel_time_to_next, notes";

#[async_trait]
pub trait RouteRepository: Send + Sync {
  /// ルートとステップを1つのトランザクションで保存する
  async fn create(&self, route: NewRoute) -> Result<Route, RepositoryError>;
  /// 新しい順、ステップは順番通り
  async fn list(&self) -> Result<Vec<Route>, RepositoryError>;
  async fn find_by_id(&self, id: i32) -> Result<Option<Route>, RepositoryError>;
}

#[derive(Clone)]
pub struct SqlxRouteRepository {
  pool: PgPool,
}

impl SqlxRouteRepository {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  async fn steps_for(&self, route_ids: &[i32]) -> Result<Vec<RouteStepRow>, sqlx::Error> {
    sqlx::query_as::<_, RouteStepRow>(&format!(
      "SELECT {STEP_COLUMNS} FROM route_steps WHERE route_id = ANY($1) ORDER BY route_id, step_order"
    ))
    .bind(route_ids)
    .fetch_all(&self.pool)
    .await
  }
}

fn assemble(row: RouteRow, steps: &[RouteStepRow]) -> Result<Route, RepositoryError> {
  let own_steps = steps.iter().filter(|s| s.route_id == row.id).cloned().collect();
  row.into_route(own_steps).map_err(RepositoryError::InvalidRow)
}

#[async_trait]
impl RouteRepository for SqlxRouteRepository {
  async fn create(&self, route: NewRoute) -> Result<Route, RepositoryError> {
    let mut tx = self.pool.begin().await?;

    let row = sqlx::query_as::<_, RouteRow>(&format!(
      r#"
        INSERT INTO routes (user_id, title, description, total_duration, age_group, gender, overall_rating)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {ROUTE_COLUMNS}
      "#
    ))
    .bind(route.user_id)
    .bind(&route.title)
    .bind(&route.description)
    .bind(route.total_duration)
    .bind(route.age_group.as_str())
    .bind(route.gender.as_str())
    .bind(i16::from(route.overall_rating))
    .fetch_one(&mut *tx)
    .await?;

    let mut steps = Vec::with_capacity(route.steps.len());
    for step in &route.steps {
      let step_row = sqlx::query_as::<_, RouteStepRow>(&format!(
        r#"
          INSERT INTO route_steps (route_id, experience_id, step_order, duration_minutes, travel_time_to_next, notes)
          VALUES ($1, $2, $3, $4, $5, $6)
          RETURNING {STEP_COLUMNS}
        "#
      ))
      .bind(row.id)
      .bind(step.experience_id)
      .bind(step.step_order)
      .bind(step.duration_minutes)
      .bind(step.travel_time_to_next)
      .bind(&step.notes)
      .fetch_one(&mut *tx)
      .await?;
      steps.push(step_row);
    }

    tx.commit().await?;
    assemble(row, &steps)
  }

  async fn list(&self) -> Result<Vec<Route>, RepositoryError> {
    let rows = sqlx::query_as::<_, RouteRow>(&format!(
      "SELECT {ROUTE_COLUMNS} FROM routes ORDER BY created_at DESC, id DESC"
    ))
    .fetch_all(&self.pool)
    .await?;

    let ids: Vec<i32> = rows.iter().map(|row| row.id).collect();
    let steps = self.steps_for(&ids).await?;

    rows.into_iter().map(|row| assemble(row, &steps)).collect()
  }

  async fn find_by_id(&self, id: i32) -> Result<Option<Route>, RepositoryError> {
    let row = sqlx::query_as::<_, RouteRow>(&format!("SELECT {ROUTE_COLUMNS} FROM routes WHERE id = $1"))
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;

    match row {
      Some(row) => {
        let steps = self.steps_for(&[id]).await?;
        assemble(row, &steps).map(Some)
      }
      None => Ok(None),
    }
  }
}
