//! Error type for `stele-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),
}

impl stele_core::store::StorageError for Error {
  /// Unique-key violations (duplicate resource/user id) must stay
  /// distinguishable so the repository can answer Conflict.
  fn is_duplicate_key(&self) -> bool {
    let Error::Database(tokio_rusqlite::Error::Rusqlite(
      rusqlite::Error::SqliteFailure(failure, _),
    )) = self
    else {
      return false;
    };
    failure.code == rusqlite::ErrorCode::ConstraintViolation
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
