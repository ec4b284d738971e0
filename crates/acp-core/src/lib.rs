//! acp-core
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! Envelope model, identifiers, and the shared error taxonomy for the
//! action control plane. Every other `acp-*` crate depends on this one.

/// Envelope type and the `from_payload` builder contract.
pub mod envelope;
/// Crate-wide error taxonomy.
pub mod error;

pub use envelope::{humanize_slug, Envelope, Risk};
pub use error::CoreError;
