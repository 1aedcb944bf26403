//! The `Storage` trait — the document-store contract the repository writes
//! through.
//!
//! One method per logical-collection operation. The trait is implemented by
//! storage backends (e.g. `stele-store-sqlite`); the repository sequences
//! these calls and owns the cross-collection invariants, so no other
//! component may touch the collections directly.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::metrics::{MetricsWindow, TypeFilter};
use crate::resource::{ResourceMetadata, SavedResource, VersionEntry};
use crate::user::User;

// ─── Query type ──────────────────────────────────────────────────────────────

/// Storage filter built by [`crate::query`] for resource listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceQuery {
  /// Exact match on the owning group.
  pub group:          Option<String>,
  /// Exact match against the multi-valued `types` field.
  pub resource_type:  Option<String>,
  /// Inclusive lower bound on `timestamp`.
  pub updated_after:  Option<DateTime<Utc>>,
  /// Inclusive upper bound on `timestamp`.
  pub updated_before: Option<DateTime<Utc>>,
}

// ─── Backend error contract ──────────────────────────────────────────────────

/// Backend errors must make unique-key violations distinguishable so the
/// repository can surface them as Conflict rather than a server error.
pub trait StorageError: std::error::Error {
  fn is_duplicate_key(&self) -> bool;
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the three resource collections plus users.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (tokio with axum).
pub trait Storage: Send + Sync {
  type Error: StorageError + Send + Sync + 'static;

  // ── Primary collection ────────────────────────────────────────────────

  /// Insert into the primary collection. A duplicate `id` surfaces as an
  /// error whose `is_duplicate_key()` is true.
  fn insert_resource<'a>(
    &'a self,
    resource: &'a SavedResource,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn find_resource<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<Option<SavedResource>, Self::Error>> + Send + 'a;

  /// Replace-one by `id`; returns the matched count.
  fn replace_resource<'a>(
    &'a self,
    resource: &'a SavedResource,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;

  /// Remove by `id`; returns the deleted count.
  fn remove_resource<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;

  /// Filtered scan in insertion order with skip/limit paging.
  fn list_resources<'a>(
    &'a self,
    query: &'a ResourceQuery,
    skip: u64,
    limit: u64,
  ) -> impl Future<Output = Result<Vec<SavedResource>, Self::Error>> + Send + 'a;

  /// Reverse reference scan: every resource whose declared reference lists
  /// contain `uri`, in any category.
  fn find_resources_referencing<'a>(
    &'a self,
    uri: &'a str,
  ) -> impl Future<Output = Result<Vec<SavedResource>, Self::Error>> + Send + 'a;

  // ── Version collection ────────────────────────────────────────────────

  /// Append-only insert; version rows are never mutated.
  fn insert_version<'a>(
    &'a self,
    resource: &'a SavedResource,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn find_version<'a>(
    &'a self,
    id: &'a str,
    timestamp: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<SavedResource>, Self::Error>> + Send + 'a;

  /// Cascade delete of every version row for `id`.
  fn remove_versions<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  // ── Metadata collection ───────────────────────────────────────────────

  fn insert_metadata<'a>(
    &'a self,
    metadata: &'a ResourceMetadata,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn find_metadata<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<Option<ResourceMetadata>, Self::Error>> + Send + 'a;

  /// Projection of the final entry only — the authoritative ownership for
  /// the next edit.
  fn last_version_entry<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<Option<VersionEntry>, Self::Error>> + Send + 'a;

  /// Push (never replace) onto the `versions` sequence.
  fn append_version_entry<'a>(
    &'a self,
    id: &'a str,
    entry: &'a VersionEntry,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn remove_metadata<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  // ── Users ─────────────────────────────────────────────────────────────

  fn insert_user<'a>(
    &'a self,
    user: &'a User,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn find_user<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  /// Replace-one by `id`; returns the matched count.
  fn replace_user<'a>(
    &'a self,
    user: &'a User,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;

  // ── Metrics ───────────────────────────────────────────────────────────

  fn count_users<'a>(
    &'a self,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;

  fn count_resources<'a>(
    &'a self,
    filter: TypeFilter,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;

  /// Resources whose *first* version entry falls strictly inside the
  /// window.
  fn count_created<'a>(
    &'a self,
    filter: TypeFilter,
    window: &'a MetricsWindow,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;

  /// Resources with *any* version entry strictly inside the window, each
  /// resource counted once.
  fn count_edited<'a>(
    &'a self,
    filter: TypeFilter,
    window: &'a MetricsWindow,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;
}
