use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// A single recorded audit event: either a guardrail evaluation or an
/// envelope lifecycle transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditEvent {
    Guardrail {
        name: String,
        allowed: bool,
        reason: Option<String>,
    },
    Envelope {
        envelope_id: Uuid,
        tool_slug: String,
        status: String,
        #[serde(default)]
        metadata: Map<String, Value>,
    },
}

/// An audit event plus its tenant and timestamp, as recorded by an
/// [`AuditLogger`](crate::logger::AuditLogger).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub tenant_id: String,
    pub timestamp: DateTime<Utc>,
    pub event: AuditEvent,
}
