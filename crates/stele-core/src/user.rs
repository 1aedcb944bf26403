//! User records and their bounded activity histories.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which history list a [`HistoryEntry`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryType {
  Resource,
  Template,
  Search,
}

/// One remembered item: the id it deduplicates on plus an opaque payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
  pub id:      String,
  pub payload: Value,
}

/// Most-recent-first, deduplicated by entry id, capped by configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct History {
  #[serde(default)]
  pub resource: Vec<HistoryEntry>,
  #[serde(default)]
  pub template: Vec<HistoryEntry>,
  #[serde(default)]
  pub search:   Vec<HistoryEntry>,
}

impl History {
  pub fn list(&self, history_type: HistoryType) -> &Vec<HistoryEntry> {
    match history_type {
      HistoryType::Resource => &self.resource,
      HistoryType::Template => &self.template,
      HistoryType::Search => &self.search,
    }
  }

  pub fn list_mut(&mut self, history_type: HistoryType) -> &mut Vec<HistoryEntry> {
    match history_type {
      HistoryType::Resource => &mut self.resource,
      HistoryType::Template => &mut self.template,
      HistoryType::Search => &mut self.search,
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserData {
  #[serde(default)]
  pub history: History,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
  pub id:   String,
  #[serde(default)]
  pub data: UserData,
}

impl User {
  /// A fresh user with empty histories.
  pub fn new(id: &str) -> Self {
    Self { id: id.to_owned(), data: UserData::default() }
  }
}

/// Per-list caps, threaded in from configuration.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct HistorySizes {
  #[serde(default = "default_history_size")]
  pub resource: usize,
  #[serde(default = "default_history_size")]
  pub template: usize,
  #[serde(default = "default_history_size")]
  pub search:   usize,
}

fn default_history_size() -> usize { 10 }

impl Default for HistorySizes {
  fn default() -> Self {
    Self { resource: 10, template: 10, search: 10 }
  }
}

impl HistorySizes {
  pub fn cap(&self, history_type: HistoryType) -> usize {
    match history_type {
      HistoryType::Resource => self.resource,
      HistoryType::Template => self.template,
      HistoryType::Search => self.search,
    }
  }
}
