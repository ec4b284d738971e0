use acp_core::{humanize_slug, Envelope};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Lifecycle state of an `OutboxRecord`. See the crate-level state machine
/// diagram for valid transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboxStatus {
    Pending,
    InProgress,
    Success,
    Failed,
    Conflict,
    Dlq,
}

impl OutboxStatus {
    /// `true` for the two terminal states reached without going through
    /// the DLQ (`success`, `conflict`).
    pub fn is_terminal(self) -> bool {
        matches!(self, OutboxStatus::Success | OutboxStatus::Conflict)
    }
}

impl std::fmt::Display for OutboxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OutboxStatus::Pending => "pending",
            OutboxStatus::InProgress => "in_progress",
            OutboxStatus::Success => "success",
            OutboxStatus::Failed => "failed",
            OutboxStatus::Conflict => "conflict",
            OutboxStatus::Dlq => "dlq",
        };
        f.write_str(s)
    }
}

/// An envelope plus its outbox queue state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxRecord {
    pub envelope: Envelope,
    pub status: OutboxStatus,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub queued_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub next_run_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// Fast-index mirror of `status == dlq`.
    pub dlq: bool,
}

impl OutboxRecord {
    /// A freshly queued record: `pending`, zero attempts, no schedule.
    pub fn new(envelope: Envelope, metadata: Map<String, Value>) -> Self {
        let now = Utc::now();
        Self {
            envelope,
            status: OutboxStatus::Pending,
            attempts: 0,
            last_error: None,
            queued_at: now,
            updated_at: now,
            next_run_at: None,
            metadata,
            dlq: false,
        }
    }

    /// Envelope id, re-exported for callers indexing by id.
    pub fn id(&self) -> Uuid {
        self.envelope.envelope_id
    }

    /// Tenant id, delegated to the wrapped envelope.
    pub fn tenant_id(&self) -> &str {
        &self.envelope.tenant_id
    }

    /// Projects this record into the desk-queue item shape consumed by the
    /// agent UI surface: `{ id, title, status, evidence }`.
    ///
    /// `status` mapping: `success -> approved`, `{failed, dlq, conflict}
    /// -> rejected`, else `pending`. Ported from the original's
    /// `OutboxRecord.to_shared_state` / `_map_outbox_status`.
    pub fn to_shared_state(&self) -> DeskQueueItem {
        let mut evidence = vec![
            format!("Tool: {}", self.envelope.tool_slug),
            format!("Risk: {}", self.envelope.risk),
            format!("Queued: {}", self.queued_at.to_rfc3339()),
        ];
        if self.attempts > 0 {
            evidence.push(format!("Attempts: {}", self.attempts));
        }
        if let Some(error) = &self.last_error {
            evidence.push(format!("Error: {error}"));
        }

        let status = match self.status {
            OutboxStatus::Success => DeskQueueStatus::Approved,
            OutboxStatus::Failed | OutboxStatus::Dlq | OutboxStatus::Conflict => {
                DeskQueueStatus::Rejected
            }
            OutboxStatus::Pending | OutboxStatus::InProgress => DeskQueueStatus::Pending,
        };

        let title = self
            .metadata
            .get("title")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| humanize_slug(&self.envelope.tool_slug));

        DeskQueueItem {
            id: self.envelope.envelope_id,
            title,
            status,
            evidence,
        }
    }
}

/// One item in the agent desk's visible queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeskQueueItem {
    pub id: Uuid,
    pub title: String,
    pub status: DeskQueueStatus,
    pub evidence: Vec<String>,
}

/// UI-facing tri-state the agent desk renders, distinct from the richer
/// `OutboxStatus` state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeskQueueStatus {
    Pending,
    Approved,
    Rejected,
}
