//! Handlers for `/metrics` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET` | `/metrics/userCount` | total registered users |
//! | `GET` | `/metrics/resourceCount/:resourceType` | by coarse type filter |
//! | `GET` | `/metrics/createdCount/:resourceType` | first write in window |
//! | `GET` | `/metrics/editedCount/:resourceType` | any write in window |
//!
//! The created/edited counts take required `startDate`/`endDate` query
//! parameters (exclusive bounds) and an optional `group` filter. Every
//! endpoint answers `{"count": n}`.

use axum::{
  Json,
  extract::{Path, Query, State},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use stele_core::metrics::{Count, MetricsWindow, TypeFilter};
use stele_core::store::Storage;

use crate::{AppState, error::ApiError};

/// `GET /metrics/userCount`
pub async fn user_count<S>(
  State(state): State<AppState<S>>,
) -> Result<Json<Count>, ApiError>
where
  S: Storage + Clone + Send + Sync + 'static,
{
  Ok(Json(state.repo.user_count().await?))
}

/// `GET /metrics/resourceCount/:resourceType`
pub async fn resource_count<S>(
  State(state): State<AppState<S>>,
  Path(resource_type): Path<String>,
) -> Result<Json<Count>, ApiError>
where
  S: Storage + Clone + Send + Sync + 'static,
{
  let filter = TypeFilter::parse(&resource_type)?;
  Ok(Json(state.repo.resource_count(filter).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowQuery {
  pub start_date: Option<String>,
  pub end_date:   Option<String>,
  pub group:      Option<String>,
}

impl WindowQuery {
  fn into_window(self) -> Result<MetricsWindow, ApiError> {
    Ok(MetricsWindow {
      start: parse_window_date(self.start_date.as_deref(), "startDate")?,
      end:   parse_window_date(self.end_date.as_deref(), "endDate")?,
      group: self.group,
    })
  }
}

fn parse_window_date(
  raw: Option<&str>,
  field: &str,
) -> Result<DateTime<Utc>, ApiError> {
  let Some(raw) = raw else {
    return Err(ApiError::BadRequest(format!(
      "must have required property '{field}' at .query"
    )));
  };
  DateTime::parse_from_rfc3339(raw)
    .map(|parsed| parsed.with_timezone(&Utc))
    .map_err(|_| {
      ApiError::BadRequest(format!(
        "should match format \"date-time\" at .query.{field}"
      ))
    })
}

/// `GET /metrics/createdCount/:resourceType`
pub async fn created_count<S>(
  State(state): State<AppState<S>>,
  Path(resource_type): Path<String>,
  Query(query): Query<WindowQuery>,
) -> Result<Json<Count>, ApiError>
where
  S: Storage + Clone + Send + Sync + 'static,
{
  let filter = TypeFilter::parse(&resource_type)?;
  let window = query.into_window()?;
  Ok(Json(state.repo.created_count(filter, &window).await?))
}

/// `GET /metrics/editedCount/:resourceType`
pub async fn edited_count<S>(
  State(state): State<AppState<S>>,
  Path(resource_type): Path<String>,
  Query(query): Query<WindowQuery>,
) -> Result<Json<Count>, ApiError>
where
  S: Storage + Clone + Send + Sync + 'static,
{
  let filter = TypeFilter::parse(&resource_type)?;
  let window = query.into_window()?;
  Ok(Json(state.repo.edited_count(filter, &window).await?))
}
