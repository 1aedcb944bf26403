//! Error taxonomy for the repository protocol.
//!
//! Validation and permission failures are raised before any storage mutation.
//! A storage failure mid-sequence surfaces here as [`Error::Storage`] with no
//! compensation of already-committed steps; the operator reconciles manually.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Malformed payload or invalid query parameter.
  #[error("{0}")]
  BadRequest(String),

  /// Identity or permission failure. The message is one of four fixed,
  /// human-readable reasons produced by the permission evaluator.
  #[error("{0}")]
  Unauthorized(String),

  /// Missing resource, version, or metadata record.
  #[error("{0} not found")]
  NotFound(String),

  /// Duplicate id on create.
  #[error("ID is already in use. Please choose a unique ID.")]
  Conflict,

  #[error("storage error: {0}")]
  Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a backend error, promoting unique-key violations to [`Error::Conflict`].
  pub fn from_storage<E>(err: E) -> Self
  where
    E: crate::store::StorageError + Send + Sync + 'static,
  {
    if err.is_duplicate_key() {
      Error::Conflict
    } else {
      Error::Storage(Box::new(err))
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
