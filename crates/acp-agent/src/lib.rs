//! acp-agent
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! Callback glue binding the guardrail pipeline, catalog, and outbox to a
//! host agent framework's before-agent / before-model / after-model
//! lifecycle, plus the single write-path tool (`enqueue_envelope`) the LLM
//! is allowed to call.

/// Before-agent / before-model / after-model lifecycle phases.
pub mod callbacks;
/// The `enqueue_envelope` tool.
pub mod enqueue;
/// Tenant objectives surfaced in the system prompt.
pub mod objectives;

pub use callbacks::{after_model, before_agent, before_model, BeforeModelOutcome, CallbackError};
pub use enqueue::{enqueue_envelope, Proposal};
pub use objectives::{default_objectives, InMemoryObjectivesService, Objective, ObjectivesService};
