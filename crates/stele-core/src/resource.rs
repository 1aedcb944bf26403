//! Resource types — the versioned linked-data entities the repository manages.
//!
//! A resource's payload is an open-schema collection of linked-data
//! statements; only the fields the repository itself reasons about (ownership,
//! classification, references) are typed. Everything else rides along in
//! `extra` so a stored resource round-trips byte-for-byte.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ─── Incoming body ───────────────────────────────────────────────────────────

/// A resource as submitted by a client. The server attaches `id`, a default
/// `uri`, and the write timestamp to produce a [`SavedResource`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
  /// Linked-data statements (JSON-LD node objects).
  #[serde(default)]
  pub data:                    Vec<Value>,
  /// The owning group.
  pub group:                   String,
  /// Additional groups permitted to edit (not to transfer ownership).
  #[serde(default)]
  pub edit_groups:             Vec<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub template_id:             Option<String>,
  /// Declared RDF classes of this resource.
  #[serde(default)]
  pub types:                   Vec<String>,
  /// Username of the editor, carried into the version audit trail.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub user:                    Option<String>,
  /// Kept when supplied; supports migrated resources with foreign URIs.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub uri:                     Option<String>,
  #[serde(default)]
  pub bf_admin_metadata_refs:  Vec<String>,
  #[serde(default)]
  pub bf_item_refs:            Vec<String>,
  #[serde(default)]
  pub bf_instance_refs:        Vec<String>,
  #[serde(default)]
  pub bf_work_refs:            Vec<String>,
  /// Open-schema passthrough for everything the repository does not type.
  #[serde(flatten)]
  pub extra:                   Map<String, Value>,
}

impl Resource {
  /// Attach server-controlled fields, producing the stored form.
  /// A client-supplied `uri` wins over `default_uri` (migration support).
  pub fn into_saved(
    self,
    id: &str,
    default_uri: &str,
    timestamp: DateTime<Utc>,
  ) -> SavedResource {
    let uri = self
      .uri
      .clone()
      .unwrap_or_else(|| default_uri.to_owned());
    SavedResource {
      id: id.to_owned(),
      uri,
      timestamp,
      data: self.data,
      group: self.group,
      edit_groups: self.edit_groups,
      template_id: self.template_id,
      types: self.types,
      user: self.user,
      bf_admin_metadata_refs: self.bf_admin_metadata_refs,
      bf_item_refs: self.bf_item_refs,
      bf_instance_refs: self.bf_instance_refs,
      bf_work_refs: self.bf_work_refs,
      extra: self.extra,
    }
  }
}

// ─── Stored form ─────────────────────────────────────────────────────────────

/// The authoritative stored state of a resource. The same shape is written to
/// the primary and version collections; versions differ only by `timestamp`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedResource {
  pub id:                      String,
  pub uri:                     String,
  /// Server-assigned write time; the version key.
  pub timestamp:               DateTime<Utc>,
  #[serde(default)]
  pub data:                    Vec<Value>,
  pub group:                   String,
  #[serde(default)]
  pub edit_groups:             Vec<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub template_id:             Option<String>,
  #[serde(default)]
  pub types:                   Vec<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub user:                    Option<String>,
  #[serde(default)]
  pub bf_admin_metadata_refs:  Vec<String>,
  #[serde(default)]
  pub bf_item_refs:            Vec<String>,
  #[serde(default)]
  pub bf_instance_refs:        Vec<String>,
  #[serde(default)]
  pub bf_work_refs:            Vec<String>,
  #[serde(flatten)]
  pub extra:                   Map<String, Value>,
}

// ─── Version audit trail ─────────────────────────────────────────────────────

/// One audit-trail record: who wrote, when, and under what ownership.
/// The last entry's `group`/`editGroups` govern the next edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionEntry {
  pub timestamp:   DateTime<Utc>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub user:        Option<String>,
  pub group:       String,
  #[serde(default)]
  pub edit_groups: Vec<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub template_id: Option<String>,
}

/// Derive the audit record for a saved resource state. Pure and total; used
/// identically on the create and update paths so the trail has one shape.
pub fn version_entry(resource: &SavedResource) -> VersionEntry {
  VersionEntry {
    timestamp:   resource.timestamp,
    user:        resource.user.clone(),
    group:       resource.group.clone(),
    edit_groups: resource.edit_groups.clone(),
    template_id: resource.template_id.clone(),
  }
}

/// One record per resource id: the ordered, append-only write history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceMetadata {
  pub id:       String,
  pub versions: Vec<VersionEntry>,
}

/// Current time truncated to millisecond precision — the storage and wire
/// resolution for version timestamps.
pub fn now_millis() -> DateTime<Utc> { Utc::now().trunc_subsecs(3) }
