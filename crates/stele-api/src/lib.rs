//! JSON REST API for Stele, a versioned, group-owned linked-data resource
//! repository.
//!
//! Exposes an axum [`Router`] backed by any [`stele_core::store::Storage`].
//! TLS and token signature verification are the fronting gateway's
//! responsibility; this service reads bearer claims and enforces
//! group-ownership rules.
//!
//! # Routes
//!
//! | Method   | Path |
//! |----------|------|
//! | `GET`    | `/` (health) |
//! | `POST/PUT/DELETE/GET` | `/resource/{id}` |
//! | `GET`    | `/resource` |
//! | `GET`    | `/resource/{id}/versions`, `/version/{ts}`, `/relationships` |
//! | `POST/GET` | `/user/{id}` |
//! | `PUT`    | `/user/{id}/history/{type}/{itemId}` |
//! | `GET`    | `/groups` |
//! | `GET`    | `/metrics/userCount`, `/resourceCount/{t}`, `/createdCount/{t}`, `/editedCount/{t}` |
//! | `POST`   | `/transfer/{id}/{group}/{system}[/{targetId}]` |

pub mod auth;
pub mod error;
pub mod groups;
pub mod metrics;
pub mod resources;
pub mod transfer;
pub mod users;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Json,
  Router,
  routing::{get, post, put},
};
use serde::Deserialize;
use tokio::sync::mpsc;
use tower_http::trace::TraceLayer;

use stele_core::Repository;
use stele_core::permissions::AccessPolicy;
use stele_core::store::Storage;
use stele_core::user::HistorySizes;

pub use error::ApiError;
pub use transfer::TransferJob;

// ─── Configuration ───────────────────────────────────────────────────────────

fn default_host() -> String { "0.0.0.0".to_owned() }
fn default_port() -> u16 { 3000 }

/// Runtime server configuration, deserialised from `config.toml` with
/// `STELE_`-prefixed environment overrides.
#[derive(Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:       String,
  #[serde(default = "default_port")]
  pub port:       u16,
  /// External base URL used to mint resource and user URIs.
  pub base_url:   String,
  pub store_path: PathBuf,
  #[serde(flatten)]
  pub policy:     AccessPolicy,
  #[serde(default)]
  pub history:    HistorySizes,
}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S: Storage> {
  pub repo:     Arc<Repository<S>>,
  /// Producer side of the transfer-job queue.
  pub transfer: mpsc::Sender<TransferJob>,
}

impl<S: Storage> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self { repo: Arc::clone(&self.repo), transfer: self.transfer.clone() }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build an axum [`Router`] for the repository API.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: Storage + Clone + Send + Sync + 'static,
{
  Router::new()
    .route("/", get(health))
    // Resources
    .route(
      "/resource/{id}",
      post(resources::create::<S>)
        .put(resources::update::<S>)
        .delete(resources::delete::<S>)
        .get(resources::get_one::<S>),
    )
    .route("/resource", get(resources::list::<S>))
    .route("/resource/{id}/versions", get(resources::versions::<S>))
    .route(
      "/resource/{id}/version/{timestamp}",
      get(resources::version::<S>),
    )
    .route(
      "/resource/{id}/relationships",
      get(resources::relationships::<S>),
    )
    // Users
    .route(
      "/user/{id}",
      post(users::create::<S>).get(users::get_one::<S>),
    )
    .route(
      "/user/{id}/history/{type}/{item_id}",
      put(users::put_history::<S>),
    )
    // Groups
    .route("/groups", get(groups::list))
    // Metrics
    .route("/metrics/userCount", get(metrics::user_count::<S>))
    .route(
      "/metrics/resourceCount/{resource_type}",
      get(metrics::resource_count::<S>),
    )
    .route(
      "/metrics/createdCount/{resource_type}",
      get(metrics::created_count::<S>),
    )
    .route(
      "/metrics/editedCount/{resource_type}",
      get(metrics::edited_count::<S>),
    )
    // Transfers
    .route(
      "/transfer/{id}/{group}/{system}",
      post(transfer::post::<S>),
    )
    .route(
      "/transfer/{id}/{group}/{system}/{target_id}",
      post(transfer::post_with_target::<S>),
    )
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
  Json(serde_json::json!({ "all": "good" }))
}

// ─── Integration tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  use axum::body::Body;
  use axum::http::{Request, StatusCode, header};
  use base64::Engine as _;
  use base64::engine::general_purpose::URL_SAFE_NO_PAD;
  use serde_json::{Value, json};
  use stele_store_sqlite::SqliteStorage;
  use tower::ServiceExt as _;

  const BASE_URL: &str = "https://api.stele.example";

  async fn make_state(policy: AccessPolicy) -> AppState<SqliteStorage> {
    let storage = SqliteStorage::open_in_memory().await.unwrap();
    let (tx, mut rx) = mpsc::channel(16);
    // Drain quietly; individual tests that care grab their own receiver.
    tokio::spawn(async move { while rx.recv().await.is_some() {} });
    AppState {
      repo: Arc::new(Repository::new(
        storage,
        BASE_URL,
        policy,
        HistorySizes::default(),
      )),
      transfer: tx,
    }
  }

  async fn state() -> AppState<SqliteStorage> {
    make_state(AccessPolicy::default()).await
  }

  /// Unsigned bearer token whose claims segment decodes to `claims`.
  fn token_for(claims: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string().as_bytes());
    format!("Bearer {header}.{payload}.")
  }

  fn bearer(groups: &[&str]) -> String {
    token_for(&json!({ "username": "tester", "groups": groups }))
  }

  async fn send(
    state: AppState<SqliteStorage>,
    method: &str,
    uri: &str,
    headers: Vec<(header::HeaderName, &str)>,
    body: &str,
  ) -> axum::response::Response {
    let mut builder = Request::builder().method(method).uri(uri);
    for (k, v) in headers {
      builder = builder.header(k, v);
    }
    let req = builder.body(Body::from(body.to_string())).unwrap();
    router(state).oneshot(req).await.unwrap()
  }

  async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  async fn body_text(resp: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
  }

  fn resource_body(group: &str) -> String {
    json!({
      "data": [{
        "@id": format!("{BASE_URL}/resource/n"),
        "@type": ["http://id.loc.gov/ontologies/bibframe/Instance"],
        "http://www.w3.org/2000/01/rdf-schema#label": "a label",
      }],
      "group": group,
      "types": ["http://id.loc.gov/ontologies/bibframe/Instance"],
      "user":  "tester",
    })
    .to_string()
  }

  async fn create_resource(
    state: &AppState<SqliteStorage>,
    id: &str,
    group: &str,
    member_of: &[&str],
  ) -> axum::response::Response {
    let auth = bearer(member_of);
    send(
      state.clone(),
      "POST",
      &format!("/resource/{id}"),
      vec![
        (header::AUTHORIZATION, auth.as_str()),
        (header::CONTENT_TYPE, "application/json"),
      ],
      &resource_body(group),
    )
    .await
  }

  // ── Create ──────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn post_resource_returns_201_with_location() {
    let state = state().await;
    let resp = create_resource(&state, "abc", "stanford", &["stanford"]).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(
      resp.headers().get(header::LOCATION).unwrap(),
      &format!("{BASE_URL}/resource/abc")
    );
    let body = body_json(resp).await;
    assert_eq!(body["id"], "abc");
    assert_eq!(body["uri"], format!("{BASE_URL}/resource/abc"));
    assert_eq!(body["group"], "stanford");
  }

  #[tokio::test]
  async fn post_duplicate_resource_returns_409() {
    let state = state().await;
    create_resource(&state, "dup", "stanford", &["stanford"]).await;
    let resp = create_resource(&state, "dup", "stanford", &["stanford"]).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(
      body_json(resp).await,
      json!([{
        "title":   "Conflict",
        "details": "ID is already in use. Please choose a unique ID.",
        "status":  "409",
      }])
    );
  }

  #[tokio::test]
  async fn post_resource_outside_group_returns_401() {
    let state = state().await;
    let resp = create_resource(&state, "abc", "stanford", &["cornell"]).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
      body_json(resp).await,
      json!([{
        "title":   "Unauthorized",
        "details": "User must a member of the resource's group",
        "status":  "401",
      }])
    );
  }

  #[tokio::test]
  async fn post_resource_with_empty_data_returns_400() {
    let state = state().await;
    let auth = bearer(&["stanford"]);
    let resp = send(
      state,
      "POST",
      "/resource/abc",
      vec![
        (header::AUTHORIZATION, auth.as_str()),
        (header::CONTENT_TYPE, "application/json"),
      ],
      &json!({ "data": [], "group": "stanford" }).to_string(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn post_resource_with_malformed_body_returns_400_envelope() {
    let state = state().await;
    let auth = bearer(&["stanford"]);
    // No `group` field at all; the failure must use the JSON error
    // envelope, not a plain-text body.
    let resp = send(
      state,
      "POST",
      "/resource/abc",
      vec![
        (header::AUTHORIZATION, auth.as_str()),
        (header::CONTENT_TYPE, "application/json"),
      ],
      &json!({ "data": [{ "@id": "n", "label": "x" }] }).to_string(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(body[0]["title"], "Bad Request");
    assert_eq!(body[0]["status"], "400");
    assert!(body[0]["details"].as_str().unwrap().contains("group"));
  }

  #[tokio::test]
  async fn admin_group_bypasses_create_check() {
    let state = state().await;
    let resp = create_resource(&state, "abc", "stanford", &["admin"]).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
  }

  #[tokio::test]
  async fn no_auth_mode_admits_anonymous_writes() {
    let state = make_state(AccessPolicy {
      no_auth: true,
      ..AccessPolicy::default()
    })
    .await;
    let resp = send(
      state,
      "POST",
      "/resource/abc",
      vec![(header::CONTENT_TYPE, "application/json")],
      &resource_body("stanford"),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
  }

  // ── Update ──────────────────────────────────────────────────────────────

  async fn put_resource(
    state: &AppState<SqliteStorage>,
    id: &str,
    body: &str,
    member_of: &[&str],
  ) -> axum::response::Response {
    let auth = bearer(member_of);
    send(
      state.clone(),
      "PUT",
      &format!("/resource/{id}"),
      vec![
        (header::AUTHORIZATION, auth.as_str()),
        (header::CONTENT_TYPE, "application/json"),
      ],
      body,
    )
    .await
  }

  #[tokio::test]
  async fn put_by_edit_group_member_returns_200() {
    let state = state().await;
    let auth = bearer(&["stanford"]);
    send(
      state.clone(),
      "POST",
      "/resource/e1",
      vec![
        (header::AUTHORIZATION, auth.as_str()),
        (header::CONTENT_TYPE, "application/json"),
      ],
      &json!({
        "data": [{ "@id": "n", "label": "x" }],
        "group": "stanford",
        "editGroups": ["cornell"],
      })
      .to_string(),
    )
    .await;

    // Same ownership fields, submitted by an editGroups member.
    let resp = put_resource(
      &state,
      "e1",
      &json!({
        "data": [{ "@id": "n", "label": "changed" }],
        "group": "stanford",
        "editGroups": ["cornell"],
      })
      .to_string(),
      &["cornell"],
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
  }

  #[tokio::test]
  async fn put_ownership_change_by_non_owner_returns_401() {
    let state = state().await;
    create_resource(&state, "e2", "stanford", &["stanford"]).await;

    let resp = put_resource(
      &state,
      "e2",
      &json!({
        "data": [{ "@id": "n", "label": "x" }],
        "group": "stanford",
        "editGroups": ["cornell"],
      })
      .to_string(),
      &["cornell"],
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
      body_json(resp).await,
      json!([{
        "title":   "Unauthorized",
        "details": "User must a member of the resource's group",
        "status":  "401",
      }])
    );
  }

  #[tokio::test]
  async fn put_group_change_outside_new_group_returns_401() {
    let state = state().await;
    create_resource(&state, "e3", "stanford", &["stanford"]).await;

    let resp =
      put_resource(&state, "e3", &resource_body("cornell"), &["stanford"])
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
      body_json(resp).await,
      json!([{
        "title":   "Unauthorized",
        "details": "User must a member of the new group",
        "status":  "401",
      }])
    );
  }

  #[tokio::test]
  async fn put_by_outsider_returns_401_with_edit_groups_message() {
    let state = state().await;
    create_resource(&state, "e4", "stanford", &["stanford"]).await;

    let resp =
      put_resource(&state, "e4", &resource_body("stanford"), &["cornell"])
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
      body_json(resp).await,
      json!([{
        "title":   "Unauthorized",
        "details": "User must a member of the resource's group or editGroups",
        "status":  "401",
      }])
    );
  }

  #[tokio::test]
  async fn put_missing_resource_returns_404() {
    let state = state().await;
    let resp =
      put_resource(&state, "ghost", &resource_body("stanford"), &["stanford"])
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(
      body_json(resp).await,
      json!([{ "title": "Not Found", "status": "404" }])
    );
  }

  // ── Read / negotiate ────────────────────────────────────────────────────

  #[tokio::test]
  async fn get_resource_defaults_to_json() {
    let state = state().await;
    create_resource(&state, "r1", "stanford", &["stanford"]).await;

    let resp = send(state, "GET", "/resource/r1", vec![], "").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["id"], "r1");
    assert!(body["timestamp"].is_string());
  }

  #[tokio::test]
  async fn get_resource_as_jsonld_returns_data_only() {
    let state = state().await;
    create_resource(&state, "r2", "stanford", &["stanford"]).await;

    let resp = send(
      state,
      "GET",
      "/resource/r2",
      vec![(header::ACCEPT, "application/ld+json")],
      "",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
      resp.headers().get(header::CONTENT_TYPE).unwrap(),
      "application/ld+json"
    );
    let body = body_json(resp).await;
    assert!(body.is_array());
    assert_eq!(body[0]["@id"], format!("{BASE_URL}/resource/n"));
  }

  #[tokio::test]
  async fn get_resource_as_ntriples() {
    let state = state().await;
    create_resource(&state, "r3", "stanford", &["stanford"]).await;

    let resp = send(
      state,
      "GET",
      "/resource/r3",
      vec![(header::ACCEPT, "text/n3")],
      "",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let text = body_text(resp).await;
    assert!(text.contains("<http://www.w3.org/2000/01/rdf-schema#label> \"a label\""));
    assert!(text.ends_with(" .\n"));
  }

  #[tokio::test]
  async fn get_resource_as_html_wraps_in_pre() {
    let state = state().await;
    create_resource(&state, "r4", "stanford", &["stanford"]).await;

    let resp = send(
      state,
      "GET",
      "/resource/r4",
      vec![(header::ACCEPT, "text/html")],
      "",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let text = body_text(resp).await;
    assert!(text.starts_with("<pre>"));
    assert!(text.ends_with("</pre>"));
  }

  #[tokio::test]
  async fn get_resource_with_unsupported_accept_returns_406() {
    let state = state().await;
    create_resource(&state, "r5", "stanford", &["stanford"]).await;

    let resp = send(
      state,
      "GET",
      "/resource/r5",
      vec![(header::ACCEPT, "application/xml")],
      "",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_ACCEPTABLE);
  }

  #[tokio::test]
  async fn get_missing_resource_returns_404() {
    let state = state().await;
    let resp = send(state, "GET", "/resource/nope", vec![], "").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  // ── Versions ────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn versions_accumulate_in_write_order() {
    let state = state().await;
    create_resource(&state, "v1", "stanford", &["stanford"]).await;
    put_resource(&state, "v1", &resource_body("stanford"), &["stanford"])
      .await;

    let resp = send(state.clone(), "GET", "/resource/v1/versions", vec![], "")
      .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["id"], "v1");
    let versions = body["versions"].as_array().unwrap();
    assert_eq!(versions.len(), 2);
    assert_eq!(versions[0]["group"], "stanford");
    assert_eq!(versions[0]["user"], "tester");

    // The recorded timestamp fetches that exact snapshot.
    let ts = versions[0]["timestamp"].as_str().unwrap().to_owned();
    let resp = send(
      state,
      "GET",
      &format!("/resource/v1/version/{ts}"),
      vec![],
      "",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
  }

  #[tokio::test]
  async fn version_with_bad_timestamp_returns_400() {
    let state = state().await;
    create_resource(&state, "v2", "stanford", &["stanford"]).await;
    let resp = send(
      state,
      "GET",
      "/resource/v2/version/yesterday",
      vec![],
      "",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  // ── Delete ──────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn delete_returns_204_and_resource_is_gone() {
    let state = state().await;
    create_resource(&state, "d1", "stanford", &["stanford"]).await;

    let auth = bearer(&["stanford"]);
    let resp = send(
      state.clone(),
      "DELETE",
      "/resource/d1",
      vec![(header::AUTHORIZATION, auth.as_str())],
      "",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = send(state, "GET", "/resource/d1", vec![], "").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn delete_by_non_member_returns_401() {
    let state = state().await;
    create_resource(&state, "d2", "stanford", &["stanford"]).await;

    let auth = bearer(&["cornell"]);
    let resp = send(
      state,
      "DELETE",
      "/resource/d2",
      vec![(header::AUTHORIZATION, auth.as_str())],
      "",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }

  // ── List ────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn list_second_page_has_prev_and_next_links() {
    let state = state().await;
    for id in ["l1", "l2", "l3"] {
      create_resource(&state, id, "stanford", &["stanford"]).await;
    }

    let resp =
      send(state, "GET", "/resource?limit=1&start=2", vec![], "").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["id"], "l2");
    assert_eq!(
      body["links"]["first"],
      format!("{BASE_URL}/resource?limit=0&start=1")
    );
    assert_eq!(
      body["links"]["prev"],
      format!("{BASE_URL}/resource?limit=1&start=1")
    );
    assert_eq!(
      body["links"]["next"],
      format!("{BASE_URL}/resource?limit=1&start=3")
    );
  }

  #[tokio::test]
  async fn list_with_zero_paging_params_falls_back_to_defaults() {
    let state = state().await;
    for id in ["z1", "z2"] {
      create_resource(&state, id, "stanford", &["stanford"]).await;
    }

    // The `first` link emits exactly this URL; zero means the defaults.
    let resp =
      send(state, "GET", "/resource?limit=0&start=1", vec![], "").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["links"]["next"], Value::Null);
  }

  #[tokio::test]
  async fn list_with_zero_start_begins_at_the_first_row() {
    let state = state().await;
    create_resource(&state, "z3", "stanford", &["stanford"]).await;

    let resp =
      send(state, "GET", "/resource?limit=25&start=0", vec![], "").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["data"][0]["id"], "z3");
  }

  #[tokio::test]
  async fn list_with_invalid_date_returns_400() {
    let state = state().await;
    let resp = send(
      state,
      "GET",
      "/resource?updatedBefore=2019-11-08",
      vec![],
      "",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
      body_json(resp).await,
      json!([{
        "title":   "Bad Request",
        "details": "should match format \"date-time\" at .query.updatedBefore",
        "status":  "400",
      }])
    );
  }

  // ── Relationships ───────────────────────────────────────────────────────

  #[tokio::test]
  async fn relationships_include_inferred_refs() {
    let state = state().await;
    create_resource(&state, "root", "stanford", &["stanford"]).await;

    let auth = bearer(&["stanford"]);
    send(
      state.clone(),
      "POST",
      "/resource/inbound",
      vec![
        (header::AUTHORIZATION, auth.as_str()),
        (header::CONTENT_TYPE, "application/json"),
      ],
      &json!({
        "data": [{ "@id": "n", "label": "x" }],
        "group": "stanford",
        "types": ["http://id.loc.gov/ontologies/bibframe/Instance"],
        "bfInstanceRefs": [format!("{BASE_URL}/resource/root")],
      })
      .to_string(),
    )
    .await;

    let resp = send(
      state,
      "GET",
      "/resource/root/relationships",
      vec![],
      "",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(
      body["bfInstanceInferredRefs"],
      json!([format!("{BASE_URL}/resource/inbound")])
    );
  }

  // ── Users ───────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn post_user_returns_201_then_409_on_duplicate() {
    let state = state().await;

    let resp = send(state.clone(), "POST", "/user/jdoe", vec![], "").await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(
      resp.headers().get(header::LOCATION).unwrap(),
      &format!("{BASE_URL}/user/jdoe")
    );
    let body = body_json(resp).await;
    assert_eq!(body["id"], "jdoe");
    assert_eq!(body["data"]["history"]["resource"], json!([]));

    let resp = send(state, "POST", "/user/jdoe", vec![], "").await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
  }

  #[tokio::test]
  async fn put_user_history_prepends_entry() {
    let state = state().await;
    send(state.clone(), "POST", "/user/jdoe", vec![], "").await;

    for item in ["a", "b"] {
      let resp = send(
        state.clone(),
        "PUT",
        &format!("/user/jdoe/history/template/{item}"),
        vec![(header::CONTENT_TYPE, "application/json")],
        &json!({ "payload": item }).to_string(),
      )
      .await;
      assert_eq!(resp.status(), StatusCode::OK);
    }

    let resp = send(state, "GET", "/user/jdoe", vec![], "").await;
    let body = body_json(resp).await;
    let entries = body["data"]["history"]["template"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["id"], "b");
    assert_eq!(entries[1]["id"], "a");
  }

  #[tokio::test]
  async fn put_history_for_missing_user_returns_404() {
    let state = state().await;
    let resp = send(
      state,
      "PUT",
      "/user/ghost/history/search/q",
      vec![(header::CONTENT_TYPE, "application/json")],
      &json!({ "payload": "q" }).to_string(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  // ── Groups ──────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn groups_directory_lists_known_groups() {
    let state = state().await;
    let resp = send(state, "GET", "/groups", vec![], "").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    let data = body["data"].as_array().unwrap();
    assert!(data.iter().any(|g| g["id"] == "stanford"));
    assert!(data.iter().all(|g| g["label"].is_string()));
  }

  // ── Metrics ─────────────────────────────────────────────────────────────

  const WIDE_WINDOW: &str = "startDate=2000-01-01T00:00:00Z&endDate=2100-01-01T00:00:00Z";

  async fn create_template(
    state: &AppState<SqliteStorage>,
    id: &str,
    group: &str,
  ) -> axum::response::Response {
    let auth = bearer(&[group]);
    send(
      state.clone(),
      "POST",
      &format!("/resource/{id}"),
      vec![
        (header::AUTHORIZATION, auth.as_str()),
        (header::CONTENT_TYPE, "application/json"),
      ],
      &json!({
        "data": [{ "@id": "n", "label": "a template" }],
        "group": group,
        "types": [stele_core::metrics::TEMPLATE_TYPE],
      })
      .to_string(),
    )
    .await
  }

  #[tokio::test]
  async fn user_count_counts_registered_users() {
    let state = state().await;
    send(state.clone(), "POST", "/user/jdoe", vec![], "").await;
    send(state.clone(), "POST", "/user/asmith", vec![], "").await;

    let resp = send(state, "GET", "/metrics/userCount", vec![], "").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!({ "count": 2 }));
  }

  #[tokio::test]
  async fn resource_count_splits_templates_from_resources() {
    let state = state().await;
    create_resource(&state, "m1", "stanford", &["stanford"]).await;
    create_template(&state, "m2", "stanford").await;

    for (filter, expected) in [("template", 1), ("resource", 1), ("all", 2)] {
      let resp = send(
        state.clone(),
        "GET",
        &format!("/metrics/resourceCount/{filter}"),
        vec![],
        "",
      )
      .await;
      assert_eq!(resp.status(), StatusCode::OK);
      assert_eq!(body_json(resp).await, json!({ "count": expected }));
    }
  }

  #[tokio::test]
  async fn resource_count_with_unknown_filter_returns_400() {
    let state = state().await;
    let resp =
      send(state, "GET", "/metrics/resourceCount/everything", vec![], "")
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn created_count_respects_window_and_group() {
    let state = state().await;
    create_resource(&state, "c1", "stanford", &["stanford"]).await;

    let resp = send(
      state.clone(),
      "GET",
      &format!("/metrics/createdCount/all?{WIDE_WINDOW}"),
      vec![],
      "",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!({ "count": 1 }));

    // A window entirely in the past misses it.
    let resp = send(
      state.clone(),
      "GET",
      "/metrics/createdCount/all?startDate=2000-01-01T00:00:00Z&endDate=2001-01-01T00:00:00Z",
      vec![],
      "",
    )
    .await;
    assert_eq!(body_json(resp).await, json!({ "count": 0 }));

    // The group filter excludes other owners.
    let resp = send(
      state,
      "GET",
      &format!("/metrics/createdCount/all?{WIDE_WINDOW}&group=cornell"),
      vec![],
      "",
    )
    .await;
    assert_eq!(body_json(resp).await, json!({ "count": 0 }));
  }

  #[tokio::test]
  async fn edited_count_counts_each_resource_once() {
    let state = state().await;
    create_resource(&state, "c2", "stanford", &["stanford"]).await;
    put_resource(&state, "c2", &resource_body("stanford"), &["stanford"])
      .await;
    put_resource(&state, "c2", &resource_body("stanford"), &["stanford"])
      .await;

    let resp = send(
      state,
      "GET",
      &format!("/metrics/editedCount/all?{WIDE_WINDOW}"),
      vec![],
      "",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!({ "count": 1 }));
  }

  #[tokio::test]
  async fn created_count_without_dates_returns_400() {
    let state = state().await;
    let resp = send(state, "GET", "/metrics/createdCount/all", vec![], "")
      .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
      body_json(resp).await,
      json!([{
        "title":   "Bad Request",
        "details": "must have required property 'startDate' at .query",
        "status":  "400",
      }])
    );
  }

  // ── Transfers ───────────────────────────────────────────────────────────

  #[tokio::test]
  async fn transfer_queues_job_and_returns_204() {
    let storage = SqliteStorage::open_in_memory().await.unwrap();
    let (tx, mut rx) = mpsc::channel(16);
    let state = AppState {
      repo: Arc::new(Repository::new(
        storage,
        BASE_URL,
        AccessPolicy::default(),
        HistorySizes::default(),
      )),
      transfer: tx,
    };

    let auth = bearer(&["ils"]);
    let resp = send(
      state,
      "POST",
      "/transfer/abc/ils/folio/target-1",
      vec![(header::AUTHORIZATION, auth.as_str())],
      "",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let job = rx.recv().await.unwrap();
    assert_eq!(job.resource_uri, format!("{BASE_URL}/resource/abc"));
    assert_eq!(job.group, "ils");
    assert_eq!(job.target, "folio");
    assert_eq!(job.target_resource_id.as_deref(), Some("target-1"));
    assert_eq!(job.username, "tester");
  }

  #[tokio::test]
  async fn transfer_by_non_member_returns_401() {
    let state = state().await;
    let auth = bearer(&["stanford"]);
    let resp = send(
      state,
      "POST",
      "/transfer/abc/ils/folio",
      vec![(header::AUTHORIZATION, auth.as_str())],
      "",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
      body_json(resp).await,
      json!([{
        "title":   "Unauthorized",
        "details": "User must a member of the group to which the resource is being transferred",
        "status":  "401",
      }])
    );
  }
}
