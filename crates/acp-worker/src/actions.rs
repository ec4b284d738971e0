//! Post-success projection of executed envelopes into an analytics-facing
//! actions-history store. Grounded on the original's
//! `agent/services/actions.py::ActionsService` — a best-effort collaborator
//! whose failures must never override a successful outbox transition.
use acp_outbox::OutboxRecord;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// Records a successfully executed envelope for analytics/history views.
#[async_trait]
pub trait ActionsService: Send + Sync {
    /// Upserts one row keyed on `record.envelope.external_id`.
    async fn record_success(
        &self,
        record: &OutboxRecord,
        result: &Map<String, Value>,
    ) -> Result<(), ActionsError>;
}

/// Error raised while projecting a successful execution. The worker logs
/// this as a warning and otherwise ignores it — the outbox `success`
/// transition already happened and stands regardless.
#[derive(Debug, thiserror::Error)]
#[error("failed to record action history: {0}")]
pub struct ActionsError(pub String);

/// In-memory actions-history double for tests, keyed by `external_id`.
#[derive(Default)]
pub struct InMemoryActionsService {
    recorded: tokio::sync::Mutex<Vec<(String, Map<String, Value>)>>,
}

impl InMemoryActionsService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every row recorded so far, in insertion order.
    pub async fn recorded(&self) -> Vec<(String, Map<String, Value>)> {
        self.recorded.lock().await.clone()
    }
}

#[async_trait]
impl ActionsService for InMemoryActionsService {
    async fn record_success(
        &self,
        record: &OutboxRecord,
        result: &Map<String, Value>,
    ) -> Result<(), ActionsError> {
        self.recorded
            .lock()
            .await
            .push((record.envelope.external_id.clone(), result.clone()));
        Ok(())
    }
}

/// An `ActionsService` that always fails, used to exercise the worker's
/// failure-tolerant call site in tests.
pub struct FailingActionsService;

#[async_trait]
impl ActionsService for FailingActionsService {
    async fn record_success(
        &self,
        _record: &OutboxRecord,
        _result: &Map<String, Value>,
    ) -> Result<(), ActionsError> {
        Err(ActionsError("projection store unreachable".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acp_core::{Envelope, Risk};
    use serde_json::json;

    fn record() -> OutboxRecord {
        let envelope = Envelope::from_payload(
            &json!({"tool_slug": "slack__chat.postMessage", "arguments": {}}),
            "tenant-a",
            Risk::Low,
        )
        .unwrap();
        OutboxRecord::new(envelope, Map::new())
    }

    #[tokio::test]
    async fn in_memory_service_records_upserts_in_order() {
        let service = InMemoryActionsService::new();
        let record = record();
        service.record_success(&record, &Map::new()).await.unwrap();
        let recorded = service.recorded().await;
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].0, record.envelope.external_id);
    }
}
