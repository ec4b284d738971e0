use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use acp_core::Envelope;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::OutboxError;
use crate::record::{OutboxRecord, OutboxStatus};
use crate::store::OutboxStore;

/// Mutex-guarded in-memory outbox, used by agent/worker tests and local
/// demos. A single mutex per instance trivially satisfies the claim
/// atomicity invariant for single-process use.
#[derive(Default)]
pub struct InMemoryOutboxStore {
    records: Mutex<HashMap<Uuid, OutboxRecord>>,
}

impl InMemoryOutboxStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn require<'a>(
        guard: &'a mut HashMap<Uuid, OutboxRecord>,
        id: Uuid,
    ) -> Result<&'a mut OutboxRecord, OutboxError> {
        guard.get_mut(&id).ok_or(OutboxError::NotFound(id))
    }
}

#[async_trait]
impl OutboxStore for InMemoryOutboxStore {
    async fn enqueue(
        &self,
        envelope: Envelope,
        metadata: Option<Map<String, Value>>,
    ) -> Result<OutboxRecord, OutboxError> {
        let record = OutboxRecord::new(envelope, metadata.unwrap_or_default());
        let mut guard = self.records.lock().unwrap();
        guard.insert(record.id(), record.clone());
        Ok(record)
    }

    async fn get(&self, envelope_id: Uuid) -> Result<Option<OutboxRecord>, OutboxError> {
        Ok(self.records.lock().unwrap().get(&envelope_id).cloned())
    }

    async fn list_pending(
        &self,
        tenant_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<OutboxRecord>, OutboxError> {
        let now = Utc::now();
        let guard = self.records.lock().unwrap();
        let mut items: Vec<OutboxRecord> = guard
            .values()
            .filter(|r| r.status == OutboxStatus::Pending)
            .filter(|r| r.next_run_at.is_none_or(|t| t <= now))
            .filter(|r| tenant_id.is_none_or(|t| r.tenant_id() == t))
            .cloned()
            .collect();
        items.sort_by_key(|r| (r.next_run_at.is_some(), r.next_run_at, r.queued_at));
        items.truncate(limit);
        Ok(items)
    }

    async fn list_dlq(
        &self,
        tenant_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<OutboxRecord>, OutboxError> {
        let guard = self.records.lock().unwrap();
        let mut items: Vec<OutboxRecord> = guard
            .values()
            .filter(|r| r.dlq)
            .filter(|r| tenant_id.is_none_or(|t| r.tenant_id() == t))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        items.truncate(limit);
        Ok(items)
    }

    async fn mark_in_progress(&self, envelope_id: Uuid) -> Result<(), OutboxError> {
        let mut guard = self.records.lock().unwrap();
        let record = Self::require(&mut guard, envelope_id)?;
        record.status = OutboxStatus::InProgress;
        record.updated_at = Utc::now();
        Ok(())
    }

    async fn mark_success(
        &self,
        envelope_id: Uuid,
        result: Map<String, Value>,
    ) -> Result<(), OutboxError> {
        let mut guard = self.records.lock().unwrap();
        let record = Self::require(&mut guard, envelope_id)?;
        record.status = OutboxStatus::Success;
        record.metadata.extend(result);
        record.next_run_at = None;
        record.updated_at = Utc::now();
        Ok(())
    }

    async fn mark_failure(
        &self,
        envelope_id: Uuid,
        error: String,
        retry_in: Option<Duration>,
        move_to_dlq: bool,
    ) -> Result<(), OutboxError> {
        let mut guard = self.records.lock().unwrap();
        let record = Self::require(&mut guard, envelope_id)?;
        record.attempts += 1;
        record.last_error = Some(error);
        record.updated_at = Utc::now();
        if move_to_dlq {
            record.status = OutboxStatus::Dlq;
            record.dlq = true;
            record.next_run_at = None;
        } else {
            record.status = OutboxStatus::Failed;
            record.next_run_at = retry_in.map(|d| Utc::now() + chrono::Duration::from_std(d).unwrap_or_default());
        }
        Ok(())
    }

    async fn mark_conflict(&self, envelope_id: Uuid, reason: String) -> Result<(), OutboxError> {
        let mut guard = self.records.lock().unwrap();
        let record = Self::require(&mut guard, envelope_id)?;
        record.status = OutboxStatus::Conflict;
        record.attempts += 1;
        record.last_error = Some(reason);
        record.updated_at = Utc::now();
        Ok(())
    }

    async fn defer(&self, envelope_id: Uuid, retry_in: Duration) -> Result<(), OutboxError> {
        let mut guard = self.records.lock().unwrap();
        let record = Self::require(&mut guard, envelope_id)?;
        record.next_run_at =
            Some(Utc::now() + chrono::Duration::from_std(retry_in).unwrap_or_default());
        record.updated_at = Utc::now();
        Ok(())
    }

    async fn requeue_from_dlq(
        &self,
        envelope_id: Uuid,
    ) -> Result<Option<OutboxRecord>, OutboxError> {
        let mut guard = self.records.lock().unwrap();
        let Some(record) = guard.get_mut(&envelope_id) else {
            return Ok(None);
        };
        record.status = OutboxStatus::Pending;
        record.dlq = false;
        record.attempts = 0;
        record.last_error = None;
        record.next_run_at = None;
        record.updated_at = Utc::now();
        Ok(Some(record.clone()))
    }

    async fn reap_stuck(&self, older_than: Duration) -> Result<usize, OutboxError> {
        let cutoff = Utc::now() - chrono::Duration::from_std(older_than).unwrap_or_default();
        let mut guard = self.records.lock().unwrap();
        let mut reaped = 0;
        for record in guard.values_mut() {
            if record.status == OutboxStatus::InProgress && record.updated_at <= cutoff {
                record.status = OutboxStatus::Pending;
                record.updated_at = Utc::now();
                reaped += 1;
            }
        }
        Ok(reaped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acp_core::Risk;
    use serde_json::json;
    use std::time::Duration as StdDuration;

    fn envelope(tenant: &str) -> Envelope {
        Envelope::from_payload(
            &json!({"tool_slug": "slack__chat.postMessage", "arguments": {}}),
            tenant,
            Risk::Low,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn enqueue_then_get_round_trips() {
        let store = InMemoryOutboxStore::new();
        let record = store.enqueue(envelope("t1"), None).await.unwrap();
        let fetched = store.get(record.id()).await.unwrap().unwrap();
        assert_eq!(fetched.status, OutboxStatus::Pending);
        assert_eq!(fetched.attempts, 0);
    }

    #[tokio::test]
    async fn list_pending_excludes_future_next_run_at() {
        let store = InMemoryOutboxStore::new();
        let record = store.enqueue(envelope("t1"), None).await.unwrap();
        store
            .defer(record.id(), StdDuration::from_secs(3600))
            .await
            .unwrap();
        assert!(store.list_pending(None, 50).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn mark_success_clears_next_run_at_and_leaves_attempts() {
        let store = InMemoryOutboxStore::new();
        let record = store.enqueue(envelope("t1"), None).await.unwrap();
        store.mark_in_progress(record.id()).await.unwrap();
        store
            .mark_success(record.id(), Map::new())
            .await
            .unwrap();
        let fetched = store.get(record.id()).await.unwrap().unwrap();
        assert_eq!(fetched.status, OutboxStatus::Success);
        assert_eq!(fetched.attempts, 0);
        assert!(fetched.next_run_at.is_none());
    }

    #[tokio::test]
    async fn mark_failure_increments_attempts_by_exactly_one() {
        let store = InMemoryOutboxStore::new();
        let record = store.enqueue(envelope("t1"), None).await.unwrap();
        store.mark_in_progress(record.id()).await.unwrap();
        store
            .mark_failure(record.id(), "boom".into(), None, false)
            .await
            .unwrap();
        let fetched = store.get(record.id()).await.unwrap().unwrap();
        assert_eq!(fetched.attempts, 1);
        assert_eq!(fetched.status, OutboxStatus::Failed);
    }

    #[tokio::test]
    async fn mark_failure_with_dlq_sets_dlq_mirror_flag() {
        let store = InMemoryOutboxStore::new();
        let record = store.enqueue(envelope("t1"), None).await.unwrap();
        store.mark_in_progress(record.id()).await.unwrap();
        store
            .mark_failure(record.id(), "boom".into(), None, true)
            .await
            .unwrap();
        let fetched = store.get(record.id()).await.unwrap().unwrap();
        assert_eq!(fetched.status, OutboxStatus::Dlq);
        assert!(fetched.dlq);
        assert_eq!(store.list_dlq(None, 50).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn requeue_from_dlq_resets_record_and_clears_dlq_listing() {
        let store = InMemoryOutboxStore::new();
        let record = store.enqueue(envelope("t1"), None).await.unwrap();
        store.mark_in_progress(record.id()).await.unwrap();
        store
            .mark_failure(record.id(), "boom".into(), None, true)
            .await
            .unwrap();
        let requeued = store.requeue_from_dlq(record.id()).await.unwrap().unwrap();
        assert_eq!(requeued.status, OutboxStatus::Pending);
        assert_eq!(requeued.attempts, 0);
        assert!(requeued.last_error.is_none());
        assert!(requeued.next_run_at.is_none());
        assert!(store.list_dlq(None, 50).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn defer_does_not_increment_attempts() {
        let store = InMemoryOutboxStore::new();
        let record = store.enqueue(envelope("t1"), None).await.unwrap();
        store
            .defer(record.id(), StdDuration::from_secs(5))
            .await
            .unwrap();
        let fetched = store.get(record.id()).await.unwrap().unwrap();
        assert_eq!(fetched.attempts, 0);
        assert_eq!(fetched.status, OutboxStatus::Pending);
        assert!(fetched.next_run_at.is_some());
    }

    #[tokio::test]
    async fn list_pending_orders_next_run_at_nulls_first_then_queued_at() {
        let store = InMemoryOutboxStore::new();
        let first = store.enqueue(envelope("t1"), None).await.unwrap();
        let second = store.enqueue(envelope("t1"), None).await.unwrap();
        store
            .defer(second.id(), StdDuration::from_millis(1))
            .await
            .unwrap();
        tokio::time::sleep(StdDuration::from_millis(5)).await;
        let pending = store.list_pending(None, 50).await.unwrap();
        assert_eq!(pending[0].id(), first.id());
    }

    #[tokio::test]
    async fn reap_stuck_requeues_old_in_progress_records() {
        let store = InMemoryOutboxStore::new();
        let record = store.enqueue(envelope("t1"), None).await.unwrap();
        store.mark_in_progress(record.id()).await.unwrap();
        let reaped = store.reap_stuck(StdDuration::from_secs(0)).await.unwrap();
        assert_eq!(reaped, 1);
        let fetched = store.get(record.id()).await.unwrap().unwrap();
        assert_eq!(fetched.status, OutboxStatus::Pending);
    }
}
