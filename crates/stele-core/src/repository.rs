//! The resource store protocol.
//!
//! [`Repository`] sequences every multi-collection write: primary copy,
//! version copy, metadata audit trail, in that order. Each step's success
//! gates the next; a failure aborts the remaining steps and surfaces the
//! triggering error. There is no automatic retry and no compensating
//! rollback — a mid-sequence storage failure leaves partial state for the
//! operator to reconcile. Validation and permission failures are raised
//! before any mutation.
//!
//! Concurrent writers to the same id can interleave; the last writer's
//! metadata append wins. No optimistic concurrency token is checked.

use serde_json::Value;

use crate::error::{Error, Result};
use crate::metrics::{Count, MetricsWindow, TypeFilter};
use crate::permissions::{
  AccessPolicy, Agent, can_create, can_delete, can_edit,
};
use crate::query::{Links, ListParams};
use crate::relationships::{Relationships, resolve};
use crate::resource::{
  Resource, ResourceMetadata, SavedResource, now_millis, version_entry,
};
use crate::store::Storage;
use crate::user::{HistoryEntry, HistorySizes, HistoryType, User};

/// One page of a resource listing.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ResourcePage {
  pub data:  Vec<SavedResource>,
  pub links: Links,
}

/// The repository protocol over a storage backend. All consistency across
/// the three resource collections flows through here; nothing else writes
/// them.
#[derive(Clone)]
pub struct Repository<S> {
  storage:       S,
  base_url:      String,
  policy:        AccessPolicy,
  history_sizes: HistorySizes,
}

impl<S: Storage> Repository<S> {
  pub fn new(
    storage: S,
    base_url: impl Into<String>,
    policy: AccessPolicy,
    history_sizes: HistorySizes,
  ) -> Self {
    Self {
      storage,
      base_url: base_url.into(),
      policy,
      history_sizes,
    }
  }

  pub fn policy(&self) -> &AccessPolicy { &self.policy }

  /// The stable URI for a resource id.
  pub fn resource_uri(&self, id: &str) -> String {
    format!("{}/resource/{id}", self.base_url)
  }

  pub fn user_uri(&self, id: &str) -> String {
    format!("{}/user/{id}", self.base_url)
  }

  // ── Writes ────────────────────────────────────────────────────────────────

  /// Create a resource: validate, authorize, then insert into the primary,
  /// version, and metadata collections in order.
  pub async fn create(
    &self,
    id: &str,
    body: Resource,
    agent: Option<&Agent>,
  ) -> Result<SavedResource> {
    validate(&body)?;
    can_create(&self.policy, agent, &body.group)?;

    let saved = body.into_saved(id, &self.resource_uri(id), now_millis());

    self
      .storage
      .insert_resource(&saved)
      .await
      .map_err(Error::from_storage)?;
    self
      .storage
      .insert_version(&saved)
      .await
      .map_err(Error::from_storage)?;
    let metadata = ResourceMetadata {
      id:       saved.id.clone(),
      versions: vec![version_entry(&saved)],
    };
    self
      .storage
      .insert_metadata(&metadata)
      .await
      .map_err(Error::from_storage)?;

    Ok(saved)
  }

  /// Update a resource: validate, authorize against the last version entry
  /// (fetched fresh, never trusted from the body), replace the primary copy,
  /// append a version row, and push the new audit entry.
  pub async fn update(
    &self,
    id: &str,
    body: Resource,
    agent: Option<&Agent>,
  ) -> Result<SavedResource> {
    validate(&body)?;

    let last = self
      .storage
      .last_version_entry(id)
      .await
      .map_err(Error::from_storage)?
      .ok_or_else(|| Error::NotFound("resource".to_owned()))?;
    can_edit(&self.policy, agent, &last, &body.group, &body.edit_groups)?;

    let saved = body.into_saved(id, &self.resource_uri(id), now_millis());

    let matched = self
      .storage
      .replace_resource(&saved)
      .await
      .map_err(Error::from_storage)?;
    if matched != 1 {
      return Err(Error::NotFound("resource".to_owned()));
    }
    self
      .storage
      .insert_version(&saved)
      .await
      .map_err(Error::from_storage)?;
    self
      .storage
      .append_version_entry(id, &version_entry(&saved))
      .await
      .map_err(Error::from_storage)?;

    Ok(saved)
  }

  /// Delete a resource and cascade to its versions and metadata.
  pub async fn delete(&self, id: &str, agent: Option<&Agent>) -> Result<()> {
    let current = self
      .storage
      .find_resource(id)
      .await
      .map_err(Error::from_storage)?
      .ok_or_else(|| Error::NotFound("resource".to_owned()))?;
    can_delete(&self.policy, agent, &current.group)?;

    let deleted = self
      .storage
      .remove_resource(id)
      .await
      .map_err(Error::from_storage)?;
    if deleted != 1 {
      return Err(Error::NotFound("resource".to_owned()));
    }
    self
      .storage
      .remove_versions(id)
      .await
      .map_err(Error::from_storage)?;
    self
      .storage
      .remove_metadata(id)
      .await
      .map_err(Error::from_storage)?;
    Ok(())
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  pub async fn read(&self, id: &str) -> Result<SavedResource> {
    self
      .storage
      .find_resource(id)
      .await
      .map_err(Error::from_storage)?
      .ok_or_else(|| Error::NotFound("resource".to_owned()))
  }

  pub async fn read_version(
    &self,
    id: &str,
    timestamp: chrono::DateTime<chrono::Utc>,
  ) -> Result<SavedResource> {
    self
      .storage
      .find_version(id, timestamp)
      .await
      .map_err(Error::from_storage)?
      .ok_or_else(|| Error::NotFound("version".to_owned()))
  }

  /// The full, write-ordered audit trail for a resource.
  pub async fn read_versions(&self, id: &str) -> Result<ResourceMetadata> {
    self
      .storage
      .find_metadata(id)
      .await
      .map_err(Error::from_storage)?
      .ok_or_else(|| Error::NotFound("resource".to_owned()))
  }

  /// One page of filtered resources with navigation links.
  pub async fn list(&self, params: &ListParams) -> Result<ResourcePage> {
    let query = params.build_query()?;
    let mut rows = self
      .storage
      .list_resources(&query, params.skip(), params.fetch_limit())
      .await
      .map_err(Error::from_storage)?;

    let next_page = rows.len() as u64 > params.limit;
    rows.truncate(params.limit as usize);

    let links =
      params.links(&format!("{}/resource", self.base_url), next_page);
    Ok(ResourcePage { data: rows, links })
  }

  /// The declared + inferred reference graph for a resource.
  pub async fn relationships(&self, id: &str) -> Result<Relationships> {
    let root = self.read(id).await?;
    let referencing = self
      .storage
      .find_resources_referencing(&root.uri)
      .await
      .map_err(Error::from_storage)?;
    Ok(resolve(&root, &referencing))
  }

  // ── Users ─────────────────────────────────────────────────────────────────

  pub async fn create_user(&self, id: &str) -> Result<User> {
    let user = User::new(id);
    self
      .storage
      .insert_user(&user)
      .await
      .map_err(Error::from_storage)?;
    Ok(user)
  }

  pub async fn read_user(&self, id: &str) -> Result<User> {
    self
      .storage
      .find_user(id)
      .await
      .map_err(Error::from_storage)?
      .ok_or_else(|| Error::NotFound("user".to_owned()))
  }

  /// Push one history entry: deduplicate by item id, prepend, truncate to
  /// the configured cap. The write is skipped when the list is unchanged.
  pub async fn update_user_history(
    &self,
    user_id: &str,
    history_type: HistoryType,
    item_id: &str,
    payload: Value,
  ) -> Result<User> {
    let mut user = self.read_user(user_id).await?;

    let entry = HistoryEntry { id: item_id.to_owned(), payload };
    let list = user.data.history.list_mut(history_type);
    let mut updated: Vec<HistoryEntry> = Vec::with_capacity(list.len() + 1);
    updated.push(entry);
    updated.extend(list.iter().filter(|e| e.id != item_id).cloned());
    updated.truncate(self.history_sizes.cap(history_type));

    if *list == updated {
      return Ok(user);
    }
    *list = updated;

    let matched = self
      .storage
      .replace_user(&user)
      .await
      .map_err(Error::from_storage)?;
    if matched != 1 {
      return Err(Error::NotFound("user".to_owned()));
    }
    Ok(user)
  }

  // ── Metrics ───────────────────────────────────────────────────────────────

  pub async fn user_count(&self) -> Result<Count> {
    let count =
      self.storage.count_users().await.map_err(Error::from_storage)?;
    Ok(Count { count })
  }

  pub async fn resource_count(&self, filter: TypeFilter) -> Result<Count> {
    let count = self
      .storage
      .count_resources(filter)
      .await
      .map_err(Error::from_storage)?;
    Ok(Count { count })
  }

  /// Resources first written strictly inside the window.
  pub async fn created_count(
    &self,
    filter: TypeFilter,
    window: &MetricsWindow,
  ) -> Result<Count> {
    let count = self
      .storage
      .count_created(filter, window)
      .await
      .map_err(Error::from_storage)?;
    Ok(Count { count })
  }

  /// Resources written at least once strictly inside the window.
  pub async fn edited_count(
    &self,
    filter: TypeFilter,
    window: &MetricsWindow,
  ) -> Result<Count> {
    let count = self
      .storage
      .count_edited(filter, window)
      .await
      .map_err(Error::from_storage)?;
    Ok(Count { count })
  }
}

/// Payload validation: the statement list must be non-empty with no vacuous
/// entries. Runs before authorization, which runs before any mutation.
fn validate(body: &Resource) -> Result<()> {
  stele_rdf::check_statements(&body.data)
    .map_err(|e| Error::BadRequest(e.to_string()))
}
