use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use tracing::info;
use uuid::Uuid;

use crate::entry::{AuditEntry, AuditEvent};

/// Surfaces audit events for guardrail decisions and envelope changes.
#[async_trait]
pub trait AuditLogger: Send + Sync {
    async fn log_guardrail(&self, tenant_id: &str, name: &str, allowed: bool, reason: Option<&str>);

    async fn log_envelope(
        &self,
        tenant_id: &str,
        envelope_id: Uuid,
        tool_slug: &str,
        status: &str,
        metadata: Map<String, Value>,
    );
}

/// Logs every audit event as a structured `tracing` record. The system
/// of record for tenants that need durable audit history is expected to
/// consume these events from the log pipeline, not this process.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditLogger;

#[async_trait]
impl AuditLogger for TracingAuditLogger {
    async fn log_guardrail(
        &self,
        tenant_id: &str,
        name: &str,
        allowed: bool,
        reason: Option<&str>,
    ) {
        info!(
            target: "audit",
            tenant_id,
            guardrail = name,
            allowed,
            reason,
            "guardrail.evaluated"
        );
    }

    async fn log_envelope(
        &self,
        tenant_id: &str,
        envelope_id: Uuid,
        tool_slug: &str,
        status: &str,
        metadata: Map<String, Value>,
    ) {
        info!(
            target: "audit",
            tenant_id,
            %envelope_id,
            tool_slug,
            status,
            metadata = %Value::Object(metadata),
            "outbox.envelope"
        );
    }
}

/// In-memory audit logger, primarily for tests and local demos that want
/// to assert on what was recorded rather than scrape log output.
#[derive(Default)]
pub struct RecordingAuditLogger {
    entries: tokio::sync::Mutex<Vec<AuditEntry>>,
}

impl RecordingAuditLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().await.clone()
    }
}

#[async_trait]
impl AuditLogger for RecordingAuditLogger {
    async fn log_guardrail(
        &self,
        tenant_id: &str,
        name: &str,
        allowed: bool,
        reason: Option<&str>,
    ) {
        self.entries.lock().await.push(AuditEntry {
            tenant_id: tenant_id.to_string(),
            timestamp: Utc::now(),
            event: AuditEvent::Guardrail {
                name: name.to_string(),
                allowed,
                reason: reason.map(str::to_string),
            },
        });
    }

    async fn log_envelope(
        &self,
        tenant_id: &str,
        envelope_id: Uuid,
        tool_slug: &str,
        status: &str,
        metadata: Map<String, Value>,
    ) {
        self.entries.lock().await.push(AuditEntry {
            tenant_id: tenant_id.to_string(),
            timestamp: Utc::now(),
            event: AuditEvent::Envelope {
                envelope_id,
                tool_slug: tool_slug.to_string(),
                status: status.to_string(),
                metadata,
            },
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recording_logger_captures_guardrail_events_in_order() {
        let logger = RecordingAuditLogger::new();
        logger
            .log_guardrail("tenant-a", "quiet_hours", true, None)
            .await;
        logger
            .log_guardrail("tenant-a", "trust_threshold", false, Some("too low"))
            .await;
        let entries = logger.entries().await;
        assert_eq!(entries.len(), 2);
        match &entries[1].event {
            AuditEvent::Guardrail { name, allowed, .. } => {
                assert_eq!(name, "trust_threshold");
                assert!(!allowed);
            }
            _ => panic!("expected guardrail event"),
        }
    }

    #[tokio::test]
    async fn recording_logger_captures_envelope_events() {
        let logger = RecordingAuditLogger::new();
        let id = Uuid::new_v4();
        logger
            .log_envelope("tenant-a", id, "slack__chat.postMessage", "success", Map::new())
            .await;
        let entries = logger.entries().await;
        match &entries[0].event {
            AuditEvent::Envelope {
                envelope_id,
                status,
                ..
            } => {
                assert_eq!(*envelope_id, id);
                assert_eq!(status, "success");
            }
            _ => panic!("expected envelope event"),
        }
    }
}
