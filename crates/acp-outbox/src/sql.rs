//! Postgres-backed `OutboxStore`, gated behind the `sql` feature.
//!
//! Queries use sqlx's runtime query builder (`sqlx::query`/`query_as`)
//! rather than the compile-time `query!` macros: the macros need either a
//! live database connection or a checked-in offline query cache at build
//! time, neither of which this workspace produces. See DESIGN.md.
use std::time::Duration;

use acp_core::Envelope;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::OutboxError;
use crate::record::{OutboxRecord, OutboxStatus};
use crate::store::OutboxStore;

/// Logical schema (see spec §6):
/// ```sql
/// CREATE TABLE outbox (
///     envelope_id   UUID PRIMARY KEY,
///     tenant_id     TEXT NOT NULL,
///     envelope      JSONB NOT NULL,
///     status        TEXT NOT NULL,
///     attempts      INTEGER NOT NULL DEFAULT 0,
///     last_error    TEXT,
///     queued_at     TIMESTAMPTZ NOT NULL,
///     updated_at    TIMESTAMPTZ NOT NULL,
///     next_run_at   TIMESTAMPTZ,
///     metadata      JSONB NOT NULL DEFAULT '{}',
///     dlq           BOOLEAN NOT NULL DEFAULT FALSE
/// );
/// CREATE TABLE outbox_dlq (
///     envelope_id UUID PRIMARY KEY REFERENCES outbox(envelope_id),
///     moved_at    TIMESTAMPTZ NOT NULL
/// );
/// ```
pub struct SqlOutboxStore {
    pool: PgPool,
}

impl SqlOutboxStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_record(row: &sqlx::postgres::PgRow) -> Result<OutboxRecord, OutboxError> {
        let envelope_json: Value = row.try_get("envelope").map_err(sql_err)?;
        let envelope: Envelope = serde_json::from_value(envelope_json)
            .map_err(|e| OutboxError::StoreUnavailable(e.to_string()))?;
        let status: String = row.try_get("status").map_err(sql_err)?;
        let status = match status.as_str() {
            "pending" => OutboxStatus::Pending,
            "in_progress" => OutboxStatus::InProgress,
            "success" => OutboxStatus::Success,
            "failed" => OutboxStatus::Failed,
            "conflict" => OutboxStatus::Conflict,
            "dlq" => OutboxStatus::Dlq,
            other => {
                return Err(OutboxError::StoreUnavailable(format!(
                    "unknown outbox status `{other}`"
                )))
            }
        };
        let metadata_json: Value = row.try_get("metadata").map_err(sql_err)?;
        let metadata = match metadata_json {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Ok(OutboxRecord {
            envelope,
            status,
            attempts: row.try_get::<i32, _>("attempts").map_err(sql_err)? as u32,
            last_error: row.try_get("last_error").map_err(sql_err)?,
            queued_at: row.try_get("queued_at").map_err(sql_err)?,
            updated_at: row.try_get("updated_at").map_err(sql_err)?,
            next_run_at: row.try_get("next_run_at").map_err(sql_err)?,
            metadata,
            dlq: row.try_get("dlq").map_err(sql_err)?,
        })
    }
}

fn sql_err(err: sqlx::Error) -> OutboxError {
    OutboxError::StoreUnavailable(err.to_string())
}

#[async_trait]
impl OutboxStore for SqlOutboxStore {
    async fn enqueue(
        &self,
        envelope: Envelope,
        metadata: Option<Map<String, Value>>,
    ) -> Result<OutboxRecord, OutboxError> {
        let record = OutboxRecord::new(envelope, metadata.unwrap_or_default());
        let envelope_json = serde_json::to_value(&record.envelope)
            .map_err(|e| OutboxError::StoreUnavailable(e.to_string()))?;
        let metadata_json = Value::Object(record.metadata.clone());
        sqlx::query(
            "INSERT INTO outbox
                (envelope_id, tenant_id, envelope, status, attempts, last_error,
                 queued_at, updated_at, next_run_at, metadata, dlq)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(record.id())
        .bind(record.tenant_id())
        .bind(envelope_json)
        .bind(record.status.to_string())
        .bind(record.attempts as i32)
        .bind(&record.last_error)
        .bind(record.queued_at)
        .bind(record.updated_at)
        .bind(record.next_run_at)
        .bind(metadata_json)
        .bind(record.dlq)
        .execute(&self.pool)
        .await
        .map_err(sql_err)?;
        Ok(record)
    }

    async fn get(&self, envelope_id: Uuid) -> Result<Option<OutboxRecord>, OutboxError> {
        let row = sqlx::query("SELECT * FROM outbox WHERE envelope_id = $1")
            .bind(envelope_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(sql_err)?;
        row.as_ref().map(Self::row_to_record).transpose()
    }

    async fn list_pending(
        &self,
        tenant_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<OutboxRecord>, OutboxError> {
        let rows = sqlx::query(
            "SELECT * FROM outbox
             WHERE status = 'pending'
               AND (next_run_at IS NULL OR next_run_at <= now())
               AND ($1::text IS NULL OR tenant_id = $1)
             ORDER BY next_run_at NULLS FIRST, queued_at ASC
             LIMIT $2",
        )
        .bind(tenant_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(sql_err)?;
        rows.iter().map(Self::row_to_record).collect()
    }

    async fn list_dlq(
        &self,
        tenant_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<OutboxRecord>, OutboxError> {
        let rows = sqlx::query(
            "SELECT * FROM outbox
             WHERE dlq = TRUE
               AND ($1::text IS NULL OR tenant_id = $1)
             ORDER BY updated_at DESC
             LIMIT $2",
        )
        .bind(tenant_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(sql_err)?;
        rows.iter().map(Self::row_to_record).collect()
    }

    async fn mark_in_progress(&self, envelope_id: Uuid) -> Result<(), OutboxError> {
        let result = sqlx::query(
            "UPDATE outbox SET status = 'in_progress', updated_at = now()
             WHERE envelope_id = $1 AND status = 'pending'",
        )
        .bind(envelope_id)
        .execute(&self.pool)
        .await
        .map_err(sql_err)?;
        if result.rows_affected() == 0 {
            return Err(OutboxError::NotFound(envelope_id));
        }
        Ok(())
    }

    async fn mark_success(
        &self,
        envelope_id: Uuid,
        result: Map<String, Value>,
    ) -> Result<(), OutboxError> {
        let rows = sqlx::query(
            "UPDATE outbox
             SET status = 'success',
                 metadata = metadata || $2::jsonb,
                 next_run_at = NULL,
                 updated_at = now()
             WHERE envelope_id = $1",
        )
        .bind(envelope_id)
        .bind(Value::Object(result))
        .execute(&self.pool)
        .await
        .map_err(sql_err)?;
        if rows.rows_affected() == 0 {
            return Err(OutboxError::NotFound(envelope_id));
        }
        Ok(())
    }

    async fn mark_failure(
        &self,
        envelope_id: Uuid,
        error: String,
        retry_in: Option<Duration>,
        move_to_dlq: bool,
    ) -> Result<(), OutboxError> {
        let mut tx = self.pool.begin().await.map_err(sql_err)?;
        let next_run_at: Option<DateTime<Utc>> =
            retry_in.map(|d| Utc::now() + chrono::Duration::from_std(d).unwrap_or_default());
        let status = if move_to_dlq { "dlq" } else { "failed" };
        let rows = sqlx::query(
            "UPDATE outbox
             SET status = $2,
                 attempts = attempts + 1,
                 last_error = $3,
                 next_run_at = $4,
                 dlq = $5,
                 updated_at = now()
             WHERE envelope_id = $1",
        )
        .bind(envelope_id)
        .bind(status)
        .bind(&error)
        .bind(next_run_at)
        .bind(move_to_dlq)
        .execute(&mut *tx)
        .await
        .map_err(sql_err)?;
        if rows.rows_affected() == 0 {
            return Err(OutboxError::NotFound(envelope_id));
        }
        if move_to_dlq {
            sqlx::query(
                "INSERT INTO outbox_dlq (envelope_id, moved_at) VALUES ($1, now())
                 ON CONFLICT (envelope_id) DO UPDATE SET moved_at = now()",
            )
            .bind(envelope_id)
            .execute(&mut *tx)
            .await
            .map_err(sql_err)?;
        }
        tx.commit().await.map_err(sql_err)?;
        Ok(())
    }

    async fn mark_conflict(&self, envelope_id: Uuid, reason: String) -> Result<(), OutboxError> {
        let rows = sqlx::query(
            "UPDATE outbox SET status = 'conflict', attempts = attempts + 1, last_error = $2,
             updated_at = now()
             WHERE envelope_id = $1",
        )
        .bind(envelope_id)
        .bind(reason)
        .execute(&self.pool)
        .await
        .map_err(sql_err)?;
        if rows.rows_affected() == 0 {
            return Err(OutboxError::NotFound(envelope_id));
        }
        Ok(())
    }

    async fn defer(&self, envelope_id: Uuid, retry_in: Duration) -> Result<(), OutboxError> {
        let next_run_at = Utc::now() + chrono::Duration::from_std(retry_in).unwrap_or_default();
        let rows = sqlx::query(
            "UPDATE outbox SET next_run_at = $2, updated_at = now() WHERE envelope_id = $1",
        )
        .bind(envelope_id)
        .bind(next_run_at)
        .execute(&self.pool)
        .await
        .map_err(sql_err)?;
        if rows.rows_affected() == 0 {
            return Err(OutboxError::NotFound(envelope_id));
        }
        Ok(())
    }

    async fn requeue_from_dlq(
        &self,
        envelope_id: Uuid,
    ) -> Result<Option<OutboxRecord>, OutboxError> {
        let mut tx = self.pool.begin().await.map_err(sql_err)?;
        let row = sqlx::query(
            "UPDATE outbox
             SET status = 'pending', dlq = FALSE, attempts = 0,
                 last_error = NULL, next_run_at = NULL, updated_at = now()
             WHERE envelope_id = $1 AND dlq = TRUE
             RETURNING *",
        )
        .bind(envelope_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(sql_err)?;
        let Some(row) = row else {
            return Ok(None);
        };
        sqlx::query("DELETE FROM outbox_dlq WHERE envelope_id = $1")
            .bind(envelope_id)
            .execute(&mut *tx)
            .await
            .map_err(sql_err)?;
        let record = Self::row_to_record(&row)?;
        tx.commit().await.map_err(sql_err)?;
        Ok(Some(record))
    }

    async fn reap_stuck(&self, older_than: Duration) -> Result<usize, OutboxError> {
        let cutoff = Utc::now() - chrono::Duration::from_std(older_than).unwrap_or_default();
        let rows = sqlx::query(
            "UPDATE outbox SET status = 'pending', updated_at = now()
             WHERE status = 'in_progress' AND updated_at <= $1",
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .map_err(sql_err)?;
        Ok(rows.rows_affected() as usize)
    }
}
