//! acp-guardrail
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! The ordered, fail-on-first-block guardrail pipeline evaluated
//! synchronously in the before-model phase: quiet hours, trust threshold,
//! scope validation, evidence requirement.

/// Evidence requirement guardrail and the `Proposal` shape it inspects.
pub mod evidence;
/// Ordered pipeline composition.
pub mod pipeline;
/// Quiet hours guardrail.
pub mod quiet_hours;
/// Guardrail result and name types.
pub mod result;
/// Scope validation guardrail.
pub mod scopes;
/// Shared quiet-hours window primitives.
pub mod shared;
/// Trust threshold guardrail.
pub mod trust;

pub use evidence::{EvidenceValue, Proposal};
pub use pipeline::{blocking, evaluate, GuardrailConfig, GuardrailError, GuardrailInput, GuardrailResults};
pub use result::{GuardrailName, GuardrailResult};
pub use trust::TrustConfigError;
