//! Bearer-token identity extractor.
//!
//! The fronting gateway terminates authentication and forwards the JWT; this
//! service only reads the claims segment (no signature verification here).
//! Claims looked at: `username` / `cognito:username` / `sub` for the
//! username, `groups` / `cognito:groups` for group membership.

use axum::{extract::FromRequestParts, http::request::Parts};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::Value;

use stele_core::permissions::Agent;
use stele_core::store::Storage;

use crate::{AppState, error::ApiError};

/// The caller's identity, when a bearer token was presented.
///
/// Absent credentials yield `MaybeAgent(None)` rather than a rejection:
/// read endpoints are public, and the permission evaluator decides the rest.
pub struct MaybeAgent(pub Option<Agent>);

impl MaybeAgent {
  pub fn as_agent(&self) -> Option<&Agent> { self.0.as_ref() }
}

/// Decode the claims segment of a JWT without verifying the signature.
fn decode_claims(token: &str) -> Option<Value> {
  let claims_b64 = token.split('.').nth(1)?;
  let bytes = URL_SAFE_NO_PAD.decode(claims_b64).ok()?;
  serde_json::from_slice(&bytes).ok()
}

fn agent_from_claims(claims: &Value) -> Agent {
  let username = ["username", "cognito:username", "sub"]
    .iter()
    .find_map(|key| claims.get(key).and_then(Value::as_str))
    .unwrap_or_default()
    .to_owned();

  let groups = ["groups", "cognito:groups"]
    .iter()
    .find_map(|key| claims.get(key).and_then(Value::as_array))
    .map(|values| {
      values
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_owned)
        .collect()
    })
    .unwrap_or_default();

  Agent { username, groups }
}

impl<S> FromRequestParts<AppState<S>> for MaybeAgent
where
  S: Storage + Clone + Send + Sync + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    _state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let Some(header) = parts
      .headers
      .get(axum::http::header::AUTHORIZATION)
      .and_then(|v| v.to_str().ok())
    else {
      return Ok(MaybeAgent(None));
    };

    let token = header
      .strip_prefix("Bearer ")
      .ok_or_else(|| ApiError::Unauthorized("Invalid bearer token".to_owned()))?;
    let claims = decode_claims(token)
      .ok_or_else(|| ApiError::Unauthorized("Invalid bearer token".to_owned()))?;

    Ok(MaybeAgent(Some(agent_from_claims(&claims))))
  }
}
