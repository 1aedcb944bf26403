//! Core types and protocol definitions for the Stele resource repository.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends only on `stele-rdf` for
//! statement validation.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod keys;
pub mod metrics;
pub mod permissions;
pub mod query;
pub mod relationships;
pub mod repository;
pub mod resource;
pub mod store;
pub mod user;

pub use error::{Error, Result};
pub use repository::Repository;
