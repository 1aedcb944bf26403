//! Encoding and decoding helpers between domain types and the JSON text
//! stored in SQLite columns.
//!
//! Documents pass through the storage-safe key codec
//! ([`stele_core::keys`]) in both directions, so property IRIs used as
//! mapping keys survive the document store. Timestamps are stored as
//! RFC 3339 strings at millisecond precision, which keeps lexicographic
//! and chronological order in agreement for range filters.

use chrono::{DateTime, SecondsFormat, Utc};
use stele_core::keys::{decode_keys, encode_keys};
use stele_core::resource::{SavedResource, VersionEntry};
use stele_core::user::User;

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Resource documents ──────────────────────────────────────────────────────

pub fn encode_resource(resource: &SavedResource) -> Result<String> {
  let value = serde_json::to_value(resource)?;
  Ok(encode_keys(value).to_string())
}

pub fn decode_resource(doc: &str) -> Result<SavedResource> {
  let value: serde_json::Value = serde_json::from_str(doc)?;
  Ok(serde_json::from_value(decode_keys(value))?)
}

// ─── Version entries ─────────────────────────────────────────────────────────

pub fn encode_version_entries(entries: &[VersionEntry]) -> Result<String> {
  Ok(serde_json::to_string(entries)?)
}

pub fn decode_version_entries(doc: &str) -> Result<Vec<VersionEntry>> {
  Ok(serde_json::from_str(doc)?)
}

pub fn encode_version_entry(entry: &VersionEntry) -> Result<String> {
  Ok(serde_json::to_string(entry)?)
}

// ─── Users ───────────────────────────────────────────────────────────────────

pub fn encode_user(user: &User) -> Result<String> {
  Ok(serde_json::to_string(user)?)
}

pub fn decode_user(doc: &str) -> Result<User> {
  Ok(serde_json::from_str(doc)?)
}
