//! Handlers for `/resource` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/resource/:id` | 201 + Location; 409 on duplicate id |
//! | `PUT`    | `/resource/:id` | ownership checked against the last version |
//! | `DELETE` | `/resource/:id` | cascades to versions and metadata |
//! | `GET`    | `/resource/:id` | content-negotiated |
//! | `GET`    | `/resource/:id/versions` | the audit trail |
//! | `GET`    | `/resource/:id/version/:timestamp` | one exact snapshot |
//! | `GET`    | `/resource/:id/relationships` | declared + inferred refs |
//! | `GET`    | `/resource` | paged, filterable list |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::{HeaderMap, StatusCode, header},
  response::{Html, IntoResponse, Response},
};
use serde::Deserialize;

use stele_core::query::{DEFAULT_LIMIT, ListParams};
use stele_core::relationships::Relationships;
use stele_core::resource::{Resource, ResourceMetadata, SavedResource};
use stele_core::store::Storage;

use crate::{
  AppState,
  auth::MaybeAgent,
  error::{ApiError, ApiJson},
};

// ─── Create ──────────────────────────────────────────────────────────────────

/// `POST /resource/:id`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
  agent: MaybeAgent,
  ApiJson(body): ApiJson<Resource>,
) -> Result<impl IntoResponse, ApiError>
where
  S: Storage + Clone + Send + Sync + 'static,
{
  let saved = state.repo.create(&id, body, agent.as_agent()).await?;
  Ok((
    StatusCode::CREATED,
    [(header::LOCATION, saved.uri.clone())],
    Json(saved),
  ))
}

// ─── Update ──────────────────────────────────────────────────────────────────

/// `PUT /resource/:id`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
  agent: MaybeAgent,
  ApiJson(body): ApiJson<Resource>,
) -> Result<Json<SavedResource>, ApiError>
where
  S: Storage + Clone + Send + Sync + 'static,
{
  let saved = state.repo.update(&id, body, agent.as_agent()).await?;
  Ok(Json(saved))
}

// ─── Delete ──────────────────────────────────────────────────────────────────

/// `DELETE /resource/:id`
pub async fn delete<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
  agent: MaybeAgent,
) -> Result<StatusCode, ApiError>
where
  S: Storage + Clone + Send + Sync + 'static,
{
  state.repo.delete(&id, agent.as_agent()).await?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Read (negotiated) ───────────────────────────────────────────────────────

/// `GET /resource/:id`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
  headers: HeaderMap,
) -> Result<Response, ApiError>
where
  S: Storage + Clone + Send + Sync + 'static,
{
  let saved = state.repo.read(&id).await?;
  negotiated(&saved, &headers)
}

/// Render `saved` per the request's Accept header. First acceptable media
/// type in header order wins; absent or `*/*` means JSON.
fn negotiated(
  saved: &SavedResource,
  headers: &HeaderMap,
) -> Result<Response, ApiError> {
  let accept = headers
    .get(header::ACCEPT)
    .and_then(|v| v.to_str().ok())
    .unwrap_or("*/*");

  for media_type in accept.split(',') {
    let media_type = media_type.split(';').next().unwrap_or("").trim();
    match media_type {
      "" => continue,
      "*/*" | "application/json" | "application/*" => {
        return Ok(Json(saved).into_response());
      }
      "application/ld+json" => {
        // The statement list only, not the denormalized wrapper.
        let body = serde_json::to_string(&saved.data)
          .map_err(|e| ApiError::Store(Box::new(e)))?;
        return Ok(
          ([(header::CONTENT_TYPE, "application/ld+json")], body)
            .into_response(),
        );
      }
      "text/plain" => {
        let pretty = serde_json::to_string_pretty(saved)
          .map_err(|e| ApiError::Store(Box::new(e)))?;
        return Ok(pretty.into_response());
      }
      "text/html" => {
        let pretty = serde_json::to_string_pretty(saved)
          .map_err(|e| ApiError::Store(Box::new(e)))?;
        return Ok(Html(format!("<pre>{pretty}</pre>")).into_response());
      }
      "text/n3" => {
        let n3 = stele_rdf::to_ntriples(&saved.data)
          .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        return Ok(([(header::CONTENT_TYPE, "text/n3")], n3).into_response());
      }
      "text/turtle" => {
        let ttl = stele_rdf::to_turtle(&saved.data)
          .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        return Ok(
          ([(header::CONTENT_TYPE, "text/turtle")], ttl).into_response(),
        );
      }
      _ => continue,
    }
  }
  Err(ApiError::NotAcceptable)
}

// ─── Versions ────────────────────────────────────────────────────────────────

/// `GET /resource/:id/versions`
pub async fn versions<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
) -> Result<Json<ResourceMetadata>, ApiError>
where
  S: Storage + Clone + Send + Sync + 'static,
{
  Ok(Json(state.repo.read_versions(&id).await?))
}

/// `GET /resource/:id/version/:timestamp`
pub async fn version<S>(
  State(state): State<AppState<S>>,
  Path((id, timestamp)): Path<(String, String)>,
) -> Result<Json<SavedResource>, ApiError>
where
  S: Storage + Clone + Send + Sync + 'static,
{
  let timestamp = chrono::DateTime::parse_from_rfc3339(&timestamp)
    .map_err(|_| {
      ApiError::BadRequest(
        "should match format \"date-time\" at .path.timestamp".to_owned(),
      )
    })?
    .with_timezone(&chrono::Utc);
  Ok(Json(state.repo.read_version(&id, timestamp).await?))
}

// ─── Relationships ───────────────────────────────────────────────────────────

/// `GET /resource/:id/relationships`
pub async fn relationships<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
) -> Result<Json<Relationships>, ApiError>
where
  S: Storage + Clone + Send + Sync + 'static,
{
  Ok(Json(state.repo.relationships(&id).await?))
}

// ─── List ────────────────────────────────────────────────────────────────────

fn default_limit() -> u64 { DEFAULT_LIMIT }
fn default_start() -> u64 { 1 }

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
  #[serde(default = "default_limit")]
  pub limit:          u64,
  #[serde(default = "default_start")]
  pub start:          u64,
  pub group:          Option<String>,
  #[serde(rename = "type")]
  pub resource_type:  Option<String>,
  pub updated_after:  Option<String>,
  pub updated_before: Option<String>,
}

/// `GET /resource` — `{data, links}` page envelope.
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError>
where
  S: Storage + Clone + Send + Sync + 'static,
{
  // Zero is falsy upstream of us: `limit=0` and `start=0` (the form the
  // `first` link emits) mean the defaults, not an empty window.
  let params = ListParams {
    limit:          if query.limit == 0 { DEFAULT_LIMIT } else { query.limit },
    start:          if query.start == 0 { 1 } else { query.start },
    group:          query.group,
    resource_type:  query.resource_type,
    updated_after:  query.updated_after,
    updated_before: query.updated_before,
  };
  Ok(Json(state.repo.list(&params).await?))
}
