//! acp-catalog
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! Per-tenant tool catalog: entries, JSON Schema argument validation, and
//! the `CatalogService` contract the enqueue path and worker resolve
//! against.

/// `CatalogEntry` and its argument-schema validation.
pub mod entry;
/// Catalog-specific error taxonomy.
pub mod error;
/// `CatalogService` trait and the in-memory implementation.
pub mod service;

pub use entry::CatalogEntry;
pub use error::CatalogError;
pub use service::{CatalogService, InMemoryCatalogService};
