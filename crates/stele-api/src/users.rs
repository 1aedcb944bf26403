//! Handlers for `/user` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/user/:id` | 201 + Location; 409 on duplicate id |
//! | `GET`  | `/user/:id` | 404 if not found |
//! | `PUT`  | `/user/:id/history/:type/:itemId` | body: `{"payload": …}` |

use axum::{
  Json,
  extract::{Path, State},
  http::{StatusCode, header},
  response::IntoResponse,
};
use serde::Deserialize;
use serde_json::Value;

use stele_core::store::Storage;
use stele_core::user::{HistoryType, User};

use crate::{
  AppState,
  error::{ApiError, ApiJson},
};

/// `POST /user/:id`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
  S: Storage + Clone + Send + Sync + 'static,
{
  let user = state.repo.create_user(&id).await?;
  Ok((
    StatusCode::CREATED,
    [(header::LOCATION, state.repo.user_uri(&id))],
    Json(user),
  ))
}

/// `GET /user/:id`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
) -> Result<Json<User>, ApiError>
where
  S: Storage + Clone + Send + Sync + 'static,
{
  Ok(Json(state.repo.read_user(&id).await?))
}

#[derive(Debug, Deserialize)]
pub struct HistoryBody {
  pub payload: Value,
}

/// `PUT /user/:id/history/:type/:itemId`
pub async fn put_history<S>(
  State(state): State<AppState<S>>,
  Path((id, history_type, item_id)): Path<(String, HistoryType, String)>,
  ApiJson(body): ApiJson<HistoryBody>,
) -> Result<Json<User>, ApiError>
where
  S: Storage + Clone + Send + Sync + 'static,
{
  let user = state
    .repo
    .update_user_history(&id, history_type, &item_id, body.payload)
    .await?;
  Ok(Json(user))
}
