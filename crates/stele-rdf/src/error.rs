//! Error type for `stele-rdf`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The statement sequence is empty or contains a vacuous entry.
  #[error("invalid statements: {0}")]
  InvalidStatements(String),

  /// A node object could not be interpreted as linked data.
  #[error("unparseable jsonld: {0}")]
  Unparseable(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
