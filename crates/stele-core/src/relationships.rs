//! Bidirectional reference graphs between resources.
//!
//! A resource declares outbound references per BIBFRAME category
//! (`bf*Refs`). Inbound ("inferred") references are discovered by a reverse
//! scan over resources whose declared lists mention this resource's URI;
//! each hit is categorized by the *referencing* resource's declared types.

use serde::Serialize;

use crate::resource::SavedResource;

/// BIBFRAME class IRIs used to categorize inbound references.
pub const BF_ADMIN_METADATA: &str =
  "http://id.loc.gov/ontologies/bibframe/AdminMetadata";
pub const BF_ITEM: &str = "http://id.loc.gov/ontologies/bibframe/Item";
pub const BF_INSTANCE: &str = "http://id.loc.gov/ontologies/bibframe/Instance";
pub const BF_WORK: &str = "http://id.loc.gov/ontologies/bibframe/Work";

/// The computed reference graph for one resource: declared, inferred, and
/// merged reference lists per category.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Relationships {
  pub id:  String,
  pub uri: String,

  pub bf_admin_metadata_refs:          Vec<String>,
  pub bf_admin_metadata_inferred_refs: Vec<String>,
  pub bf_admin_metadata_all_refs:      Vec<String>,

  pub bf_item_refs:          Vec<String>,
  pub bf_item_inferred_refs: Vec<String>,
  pub bf_item_all_refs:      Vec<String>,

  pub bf_instance_refs:          Vec<String>,
  pub bf_instance_inferred_refs: Vec<String>,
  pub bf_instance_all_refs:      Vec<String>,

  pub bf_work_refs:          Vec<String>,
  pub bf_work_inferred_refs: Vec<String>,
  pub bf_work_all_refs:      Vec<String>,
}

/// Merge a resource's declared references with the inbound resources found
/// by the reverse scan. All-refs lists are declared ∪ inferred,
/// de-duplicated, declaration order first.
pub fn resolve(
  resource: &SavedResource,
  referencing: &[SavedResource],
) -> Relationships {
  let mut admin_metadata_inferred = Vec::new();
  let mut item_inferred = Vec::new();
  let mut instance_inferred = Vec::new();
  let mut work_inferred = Vec::new();

  for other in referencing {
    // A resource may declare several classes; it lands in each matching
    // category.
    if has_type(other, BF_ADMIN_METADATA) {
      admin_metadata_inferred.push(other.uri.clone());
    }
    if has_type(other, BF_ITEM) {
      item_inferred.push(other.uri.clone());
    }
    if has_type(other, BF_INSTANCE) {
      instance_inferred.push(other.uri.clone());
    }
    if has_type(other, BF_WORK) {
      work_inferred.push(other.uri.clone());
    }
  }

  Relationships {
    id:  resource.id.clone(),
    uri: resource.uri.clone(),

    bf_admin_metadata_all_refs: merged(
      &resource.bf_admin_metadata_refs,
      &admin_metadata_inferred,
    ),
    bf_admin_metadata_refs: resource.bf_admin_metadata_refs.clone(),
    bf_admin_metadata_inferred_refs: admin_metadata_inferred,

    bf_item_all_refs: merged(&resource.bf_item_refs, &item_inferred),
    bf_item_refs: resource.bf_item_refs.clone(),
    bf_item_inferred_refs: item_inferred,

    bf_instance_all_refs: merged(&resource.bf_instance_refs, &instance_inferred),
    bf_instance_refs: resource.bf_instance_refs.clone(),
    bf_instance_inferred_refs: instance_inferred,

    bf_work_all_refs: merged(&resource.bf_work_refs, &work_inferred),
    bf_work_refs: resource.bf_work_refs.clone(),
    bf_work_inferred_refs: work_inferred,
  }
}

fn has_type(resource: &SavedResource, class_iri: &str) -> bool {
  resource.types.iter().any(|t| t == class_iri)
}

fn merged(declared: &[String], inferred: &[String]) -> Vec<String> {
  let mut all: Vec<String> = Vec::with_capacity(declared.len() + inferred.len());
  for uri in declared.iter().chain(inferred) {
    if !all.contains(uri) {
      all.push(uri.clone());
    }
  }
  all
}
