//! The outbox drain loop: claims due envelopes, executes them against a
//! [`ToolExecutionProvider`], and drives status transitions back into the
//! outbox store. Ported from `original_source/worker/outbox.py`'s
//! `OutboxWorker`.
use std::sync::Arc;
use std::time::Duration;

use acp_audit::AuditLogger;
use acp_outbox::{OutboxRecord, OutboxStore};
use acp_policy::PolicyResolver;
use acp_ratelimit::{RateDecision, RateLimitConfig, RateLimiter};
use acp_retry::BackoffPolicy;
use serde_json::{json, Map, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::actions::ActionsService;
use crate::provider::{ProviderError, ToolExecutionProvider};

/// Default staleness threshold past which an `in_progress` record is
/// considered orphaned by a crashed claim. See DESIGN.md's open-question
/// decision on `reap_stuck`.
pub const DEFAULT_STUCK_CLAIM_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Tunables the worker loop needs beyond its collaborators.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// How long to sleep after a batch comes back empty.
    pub poll_interval: Duration,
    /// Max records claimed per poll.
    pub batch_size: usize,
    /// Max provider-call attempts (including the first) before a record
    /// moves to the DLQ.
    pub max_attempts: u32,
    /// Exponential backoff schedule between retry attempts.
    pub backoff: BackoffPolicy,
    /// Per-bucket minimum dispatch gaps.
    pub rate_limits: RateLimitConfig,
    /// Staleness threshold for `reap_stuck`.
    pub stuck_claim_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            batch_size: 25,
            max_attempts: 3,
            backoff: BackoffPolicy::default(),
            rate_limits: RateLimitConfig::default(),
            stuck_claim_timeout: DEFAULT_STUCK_CLAIM_TIMEOUT,
        }
    }
}

/// Final outcome of a single provider dispatch, after retries.
enum DispatchOutcome {
    Success(Map<String, Value>),
    Conflict(ProviderError),
    Exhausted(ProviderError),
}

/// Drains the pending outbox queue with bounded concurrency-free,
/// sequential processing (per spec.md §4.5 — the implementation MAY fan
/// out with a worker pool provided claim atomicity holds; this one
/// processes its claimed batch sequentially).
pub struct OutboxWorker {
    store: Arc<dyn OutboxStore>,
    policy: Arc<dyn PolicyResolver>,
    provider: Arc<dyn ToolExecutionProvider>,
    audit: Arc<dyn AuditLogger>,
    actions: Option<Arc<dyn ActionsService>>,
    rate_limiter: RateLimiter,
    config: WorkerConfig,
}

impl OutboxWorker {
    /// Builds a worker over its four collaborators plus tunable config.
    pub fn new(
        store: Arc<dyn OutboxStore>,
        policy: Arc<dyn PolicyResolver>,
        provider: Arc<dyn ToolExecutionProvider>,
        audit: Arc<dyn AuditLogger>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            store,
            policy,
            provider,
            audit,
            actions: None,
            rate_limiter: RateLimiter::new(config.rate_limits.clone()),
            config,
        }
    }

    /// Attaches the optional actions-history projection collaborator.
    pub fn with_actions(mut self, actions: Arc<dyn ActionsService>) -> Self {
        self.actions = Some(actions);
        self
    }

    /// Runs until a shutdown signal arrives, sleeping `poll_interval`
    /// whenever a batch comes back empty. Finishes the in-flight record
    /// before exiting on SIGINT/SIGTERM.
    pub async fn run_forever(&self) {
        info!(poll_interval = ?self.config.poll_interval, "worker.start");
        loop {
            let processed = tokio::select! {
                biased;
                _ = shutdown_signal() => {
                    info!("worker.stop_requested");
                    break;
                }
                processed = self.process_once() => processed,
            };
            if processed == 0 {
                tokio::select! {
                    biased;
                    _ = shutdown_signal() => {
                        info!("worker.stop_requested");
                        break;
                    }
                    _ = tokio::time::sleep(self.config.poll_interval) => {}
                }
            }
        }
        info!("worker.stopped");
    }

    /// Claims and processes one batch of due records; returns how many
    /// were processed (including records that failed or deferred).
    pub async fn process_once(&self) -> usize {
        if let Ok(reaped) = self.store.reap_stuck(self.config.stuck_claim_timeout).await {
            if reaped > 0 {
                warn!(reaped, "worker.reaped_stuck_records");
            }
        }

        let records = match self.store.list_pending(None, self.config.batch_size).await {
            Ok(records) => records,
            Err(err) => {
                warn!(error = %err, "worker.list_pending_failed");
                return 0;
            }
        };

        let mut processed = 0;
        for record in &records {
            self.process_record(record).await;
            processed += 1;
        }
        processed
    }

    /// Queue depth statistics for the operator surface.
    pub async fn status(&self, tenant_id: Option<&str>) -> (usize, usize) {
        let pending = self
            .store
            .list_pending(tenant_id, usize::MAX)
            .await
            .map(|r| r.len())
            .unwrap_or(0);
        let dlq = self
            .store
            .list_dlq(tenant_id, usize::MAX)
            .await
            .map(|r| r.len())
            .unwrap_or(0);
        (pending, dlq)
    }

    /// Requeues up to `limit` DLQ entries back to `pending`.
    pub async fn drain_dlq(&self, tenant_id: Option<&str>, limit: usize) -> usize {
        let records = self.store.list_dlq(tenant_id, limit).await.unwrap_or_default();
        let mut drained = 0;
        for record in records {
            if self.store.requeue_from_dlq(record.id()).await.ok().flatten().is_some() {
                drained += 1;
            }
        }
        drained
    }

    /// Requeues a single DLQ envelope. `false` if it wasn't in the DLQ.
    pub async fn retry_dlq(&self, envelope_id: Uuid) -> bool {
        matches!(self.store.requeue_from_dlq(envelope_id).await, Ok(Some(_)))
    }

    async fn process_record(&self, record: &OutboxRecord) {
        let tenant = record.tenant_id();
        let envelope_id = record.id();
        let slug = record.envelope.tool_slug.clone();

        let policy = self.policy.get_effective_policy(tenant, &slug);
        let write_allowed = policy.as_ref().is_none_or(|p| p.write_allowed);

        if !write_allowed {
            let _ = self
                .store
                .mark_failure(envelope_id, "writes_disabled_by_policy".to_string(), None, false)
                .await;
            self.audit
                .log_envelope(
                    tenant,
                    envelope_id,
                    &slug,
                    "failed",
                    json_meta("reason", "writes_disabled_by_policy"),
                )
                .await;
            return;
        }

        if let Some(bucket) = policy.as_ref().and_then(|p| p.rate_bucket.clone()) {
            if let RateDecision::Deferred(wait) = self.rate_limiter.check(&bucket).await {
                let _ = self.store.defer(envelope_id, wait).await;
                return;
            }
        }

        if self.store.mark_in_progress(envelope_id).await.is_err() {
            return;
        }

        match self.dispatch_with_retry(record).await {
            DispatchOutcome::Success(result) => {
                let _ = self.store.mark_success(envelope_id, result.clone()).await;
                self.audit
                    .log_envelope(tenant, envelope_id, &slug, "success", result.clone())
                    .await;
                if let Some(actions) = &self.actions {
                    if let Err(err) = actions.record_success(record, &result).await {
                        warn!(%envelope_id, error = %err, "worker.actions_projection_failed");
                    }
                }
                info!(%envelope_id, "worker.success");
            }
            DispatchOutcome::Conflict(err) => {
                let reason = err.to_string();
                let _ = self.store.mark_conflict(envelope_id, reason.clone()).await;
                self.audit
                    .log_envelope(tenant, envelope_id, &slug, "conflict", json_meta("reason", &reason))
                    .await;
                warn!(%envelope_id, reason, "worker.conflict");
            }
            DispatchOutcome::Exhausted(err) => {
                let reason = err.to_string();
                let _ = self
                    .store
                    .mark_failure(envelope_id, reason.clone(), None, true)
                    .await;
                self.audit
                    .log_envelope(tenant, envelope_id, &slug, "dlq", json_meta("error", &reason))
                    .await;
                warn!(%envelope_id, reason, "worker.failure");
            }
        }
    }

    async fn dispatch_with_retry(&self, record: &OutboxRecord) -> DispatchOutcome {
        let mut attempts_made = 0u32;
        loop {
            attempts_made += 1;
            match self.provider.execute(&record.envelope).await {
                Ok(result) => return DispatchOutcome::Success(result),
                Err(err) => {
                    if !acp_retry::is_retryable(err.status, &err.message, attempts_made, self.config.max_attempts) {
                        if acp_retry::is_conflict(err.status, &err.message) {
                            return DispatchOutcome::Conflict(err);
                        }
                        return DispatchOutcome::Exhausted(err);
                    }
                    tokio::time::sleep(self.config.backoff.delay(attempts_made - 1)).await;
                }
            }
        }
    }
}

fn json_meta(key: &str, value: &str) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(key.to_string(), json!(value));
    map
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigint = signal(SignalKind::interrupt()).expect("install SIGINT handler");
    let mut sigterm = signal(SignalKind::terminate()).expect("install SIGTERM handler");
    tokio::select! {
        _ = sigint.recv() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
