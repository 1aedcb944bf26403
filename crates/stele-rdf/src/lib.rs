//! RDF serialization over the JSON-LD node-object statement model.
//!
//! A resource's `data` field is a sequence of expanded node objects: each has
//! an `@id`, optionally `@type`, and predicate IRIs mapping to arrays of
//! `{"@value": ...}` literals or `{"@id": ...}` references. This crate turns
//! that model into N-Triples and Turtle text. Blank input yields blank
//! output.

pub mod error;
mod model;
mod serialize;

pub use error::{Error, Result};
pub use model::{Object, Triple, check_statements, triples_from_statements};
pub use serialize::{to_ntriples, to_turtle};
