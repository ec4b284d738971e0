use std::time::Duration;

use acp_core::Envelope;
use async_trait::async_trait;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::OutboxError;
use crate::record::OutboxRecord;

/// Durable outbox + DLQ contract. Implementations MUST make the
/// `pending -> in_progress` transition atomic so that concurrent workers
/// sharing a backing store never double-claim a record.
#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// Persists a new record: `pending`, zero attempts, queued now.
    async fn enqueue(
        &self,
        envelope: Envelope,
        metadata: Option<Map<String, Value>>,
    ) -> Result<OutboxRecord, OutboxError>;

    /// Fetches a record by id.
    async fn get(&self, envelope_id: Uuid) -> Result<Option<OutboxRecord>, OutboxError>;

    /// `pending` records due now, ordered `next_run_at NULLS FIRST, queued_at
    /// ASC`, bounded by `limit`.
    async fn list_pending(
        &self,
        tenant_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<OutboxRecord>, OutboxError>;

    /// `dlq` records, newest first, bounded by `limit`.
    async fn list_dlq(
        &self,
        tenant_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<OutboxRecord>, OutboxError>;

    /// Atomic `pending -> in_progress` transition.
    async fn mark_in_progress(&self, envelope_id: Uuid) -> Result<(), OutboxError>;

    /// Transition to `success`; merges `result` into metadata, clears
    /// `next_run_at`. Does not increment `attempts`.
    async fn mark_success(
        &self,
        envelope_id: Uuid,
        result: Map<String, Value>,
    ) -> Result<(), OutboxError>;

    /// Increments `attempts` and records `error`. Moves to `dlq` (mirrored
    /// into the DLQ table) when `move_to_dlq`, else to `failed` with
    /// `next_run_at` set from `retry_in` (or cleared, making the record
    /// immediately eligible again — see DESIGN.md's open-question
    /// decision).
    async fn mark_failure(
        &self,
        envelope_id: Uuid,
        error: String,
        retry_in: Option<Duration>,
        move_to_dlq: bool,
    ) -> Result<(), OutboxError>;

    /// Terminal `conflict` transition; never retried.
    async fn mark_conflict(&self, envelope_id: Uuid, reason: String) -> Result<(), OutboxError>;

    /// Keeps `status = pending`, sets `next_run_at = now + retry_in`.
    /// Does not increment `attempts`.
    async fn defer(&self, envelope_id: Uuid, retry_in: Duration) -> Result<(), OutboxError>;

    /// Resets a DLQ record to `pending`, zero attempts, clears
    /// `last_error`/`next_run_at`, and removes its DLQ mirror row.
    async fn requeue_from_dlq(
        &self,
        envelope_id: Uuid,
    ) -> Result<Option<OutboxRecord>, OutboxError>;

    /// Moves records stuck `in_progress` for longer than `older_than` back
    /// to `pending`, so a crashed worker's claim doesn't orphan them
    /// forever. Returns the number reaped. See DESIGN.md open-question
    /// decision #2.
    async fn reap_stuck(&self, older_than: Duration) -> Result<usize, OutboxError>;
}
