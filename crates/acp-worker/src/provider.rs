//! The remote tool-execution provider contract. Spec.md treats this as a
//! collaborator, not something this workspace redesigns; [`StubProvider`]
//! gives tests and local demos a scriptable in-process double instead of
//! the real HTTP-backed SaaS binding.
use std::collections::VecDeque;

use acp_core::Envelope;
use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::Mutex;

/// An error raised by a provider call, carrying enough shape for the
/// retry harness to tell conflicts from transient failures.
#[derive(Debug, Clone)]
pub struct ProviderError {
    pub status: Option<u16>,
    pub message: String,
}

impl ProviderError {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(Some(409), message)
    }
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "{status}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for ProviderError {}

/// Executes one envelope against the remote SaaS provider. Implementations
/// must treat retries carrying the same `external_id` as idempotent on
/// their side — the control plane preserves `external_id` across retries
/// but does not itself deduplicate provider-side effects.
#[async_trait]
pub trait ToolExecutionProvider: Send + Sync {
    /// Executes `envelope`, returning a result payload merged into the
    /// outbox record's metadata on success.
    async fn execute(&self, envelope: &Envelope) -> Result<Map<String, Value>, ProviderError>;
}

/// A scriptable in-process provider double: each call pops the next
/// response off a pre-programmed queue, falling back to a single
/// configured default once exhausted.
pub struct StubProvider {
    responses: Mutex<VecDeque<Result<Map<String, Value>, ProviderError>>>,
    default: Result<Map<String, Value>, ProviderError>,
}

impl StubProvider {
    /// A provider that always succeeds with an empty result payload.
    pub fn always_ok() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            default: Ok(Map::new()),
        }
    }

    /// A provider that always fails with `error`.
    pub fn always_err(error: ProviderError) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            default: Err(error),
        }
    }

    /// A provider that replays `responses` in order, then repeats the
    /// last one for any further calls.
    pub fn scripted(responses: Vec<Result<Map<String, Value>, ProviderError>>) -> Self {
        let mut queue: VecDeque<_> = responses.into();
        let default = queue
            .back()
            .cloned()
            .unwrap_or_else(|| Ok(Map::new()));
        Self {
            responses: Mutex::new(queue),
            default,
        }
    }
}

#[async_trait]
impl ToolExecutionProvider for StubProvider {
    async fn execute(&self, _envelope: &Envelope) -> Result<Map<String, Value>, ProviderError> {
        let mut guard = self.responses.lock().await;
        match guard.pop_front() {
            Some(response) => response,
            None => self.default.clone(),
        }
    }
}
