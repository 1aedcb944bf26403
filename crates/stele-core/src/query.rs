//! Pagination and query building for resource listing.
//!
//! Translates list-query parameters into a storage filter plus an
//! RFC-5988-style link set. `start` is 1-based. The window fetches one row
//! beyond `limit`; the extra row's presence drives the `next` link.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::store::ResourceQuery;

pub const DEFAULT_LIMIT: u64 = 25;

// ─── Parameters ──────────────────────────────────────────────────────────────

/// Raw list parameters as received from the query string. Date bounds stay
/// as strings here so link URLs carry them through verbatim; parsing happens
/// in [`ListParams::build_query`].
#[derive(Debug, Clone)]
pub struct ListParams {
  pub limit:          u64,
  /// 1-based index of the first row in the page.
  pub start:          u64,
  pub group:          Option<String>,
  pub resource_type:  Option<String>,
  pub updated_after:  Option<String>,
  pub updated_before: Option<String>,
}

impl Default for ListParams {
  fn default() -> Self {
    Self {
      limit:          DEFAULT_LIMIT,
      start:          1,
      group:          None,
      resource_type:  None,
      updated_after:  None,
      updated_before: None,
    }
  }
}

impl ListParams {
  /// Build the storage filter. Invalid date-time strings fail with a
  /// BadRequest citing the offending field.
  pub fn build_query(&self) -> Result<ResourceQuery> {
    Ok(ResourceQuery {
      group:          self.group.clone(),
      resource_type:  self.resource_type.clone(),
      updated_after:  parse_date(self.updated_after.as_deref(), "updatedAfter")?,
      updated_before: parse_date(self.updated_before.as_deref(), "updatedBefore")?,
    })
  }

  /// Rows to skip: the window starts at `start - 1`.
  pub fn skip(&self) -> u64 { self.start.saturating_sub(1) }

  /// Rows to fetch: one beyond the page so `next` can be decided.
  pub fn fetch_limit(&self) -> u64 { self.limit.saturating_add(1) }

  /// The link set for one result page. `next_page` is whether the
  /// `limit + 1`-th row existed.
  pub fn links(&self, base_url: &str, next_page: bool) -> Links {
    let first = self.page_url(base_url, 0, self.limit);
    let prev = (self.start != 1).then(|| {
      self.page_url(base_url, self.limit, self.start.saturating_sub(self.limit))
    });
    let next = next_page.then(|| {
      self.page_url(base_url, self.limit, self.start.saturating_add(self.limit))
    });
    Links { first, prev, next }
  }

  fn page_url(&self, base_url: &str, limit: u64, start: u64) -> String {
    let mut params: Vec<(&str, String)> = vec![
      ("limit", limit.to_string()),
      ("start", start.to_string()),
    ];
    if let Some(group) = &self.group {
      params.push(("group", group.clone()));
    }
    if let Some(resource_type) = &self.resource_type {
      params.push(("type", resource_type.clone()));
    }
    if let Some(after) = &self.updated_after {
      params.push(("updatedAfter", after.clone()));
    }
    if let Some(before) = &self.updated_before {
      params.push(("updatedBefore", before.clone()));
    }
    // Vec-of-pairs keeps the limit/start-then-filters ordering stable.
    let query_string =
      serde_urlencoded::to_string(&params).unwrap_or_default();
    format!("{base_url}?{query_string}")
  }
}

fn parse_date(
  raw: Option<&str>,
  field: &str,
) -> Result<Option<DateTime<Utc>>> {
  let Some(raw) = raw else { return Ok(None) };
  DateTime::parse_from_rfc3339(raw)
    .map(|parsed| Some(parsed.with_timezone(&Utc)))
    .map_err(|_| {
      Error::BadRequest(format!(
        "should match format \"date-time\" at .query.{field}"
      ))
    })
}

// ─── Links ───────────────────────────────────────────────────────────────────

/// Page navigation links. `first` is always present; `prev` and `next` only
/// when applicable.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Links {
  pub first: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub prev:  Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub next:  Option<String>,
}
