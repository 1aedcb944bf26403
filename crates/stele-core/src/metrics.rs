//! Usage-metrics queries: user and resource counts, and counts of
//! resources created or edited inside a date window.
//!
//! Counts are split by a coarse type filter: templates (resources typed
//! [`TEMPLATE_TYPE`]), everything else, or all.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Error, Result};

/// The type IRI marking a resource as a structural template.
pub const TEMPLATE_TYPE: &str = "http://stele.io/vocabulary/ResourceTemplate";

/// Coarse resource-type filter for count queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeFilter {
  /// Only resources typed [`TEMPLATE_TYPE`].
  Template,
  /// Only resources not typed [`TEMPLATE_TYPE`].
  Resource,
  All,
}

impl TypeFilter {
  /// Parse the path segment; anything outside the enum is a BadRequest.
  pub fn parse(raw: &str) -> Result<Self> {
    match raw {
      "template" => Ok(Self::Template),
      "resource" => Ok(Self::Resource),
      "all" => Ok(Self::All),
      _ => Err(Error::BadRequest(format!(
        "should be equal to one of the allowed values: all, template, \
         resource at .path.resourceType ({raw})"
      ))),
    }
  }
}

/// Exclusive date window for created/edited counts, with an optional
/// owning-group filter.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsWindow {
  pub start: DateTime<Utc>,
  pub end:   DateTime<Utc>,
  pub group: Option<String>,
}

/// The `{"count": n}` body every metrics endpoint returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Count {
  pub count: u64,
}
