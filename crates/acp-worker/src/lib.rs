//! acp-worker
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! The outbox drain loop: claims due envelopes, executes them against a
//! remote tool-execution provider with bounded retries, conflict
//! detection, rate-bucket deferral, and dead-letter queueing.

/// Actions-history projection collaborator.
pub mod actions;
/// `ToolExecutionProvider` contract and test doubles.
pub mod provider;
/// `OutboxWorker` and its loop/operator surface.
pub mod worker;

pub use actions::{ActionsError, ActionsService, FailingActionsService, InMemoryActionsService};
pub use provider::{ProviderError, StubProvider, ToolExecutionProvider};
pub use worker::{OutboxWorker, WorkerConfig, DEFAULT_STUCK_CLAIM_TIMEOUT};
