//! Handlers for `/transfer` — fire-and-forget export jobs.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/transfer/:id/:group/:system` | 204; queued, not awaited |
//! | `POST` | `/transfer/:id/:group/:system/:targetId` | as above |
//!
//! Jobs go onto an in-process channel; the binary spawns the worker that
//! drains it. The handler answers as soon as the job is accepted.

use axum::{
  extract::{Path, State},
  http::StatusCode,
};
use serde::Serialize;

use stele_core::permissions::can_transfer;
use stele_core::store::Storage;

use crate::{AppState, auth::MaybeAgent, error::ApiError};

/// One queued transfer request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferJob {
  pub resource_uri:       String,
  pub username:           String,
  pub group:              String,
  pub target:             String,
  pub target_resource_id: Option<String>,
}

/// `POST /transfer/:id/:group/:system`
pub async fn post<S>(
  State(state): State<AppState<S>>,
  Path((id, group, system)): Path<(String, String, String)>,
  agent: MaybeAgent,
) -> Result<StatusCode, ApiError>
where
  S: Storage + Clone + Send + Sync + 'static,
{
  enqueue(&state, id, group, system, None, agent).await
}

/// `POST /transfer/:id/:group/:system/:targetId`
pub async fn post_with_target<S>(
  State(state): State<AppState<S>>,
  Path((id, group, system, target_id)): Path<(String, String, String, String)>,
  agent: MaybeAgent,
) -> Result<StatusCode, ApiError>
where
  S: Storage + Clone + Send + Sync + 'static,
{
  enqueue(&state, id, group, system, Some(target_id), agent).await
}

async fn enqueue<S>(
  state: &AppState<S>,
  id: String,
  group: String,
  system: String,
  target_resource_id: Option<String>,
  agent: MaybeAgent,
) -> Result<StatusCode, ApiError>
where
  S: Storage + Clone + Send + Sync + 'static,
{
  can_transfer(state.repo.policy(), agent.as_agent(), &group)?;

  let job = TransferJob {
    resource_uri: state.repo.resource_uri(&id),
    username: agent
      .as_agent()
      .map(|a| a.username.clone())
      .unwrap_or_default(),
    group,
    target: system,
    target_resource_id,
  };

  state
    .transfer
    .send(job)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(StatusCode::NO_CONTENT)
}
