//! Before-agent, before-model, and after-model phases the host agent
//! framework invokes around every LLM turn. Ported from
//! `original_source/agent/agents/blueprints/desk.py::DeskBlueprint` and
//! `original_source/agent/agents/control_plane.py`'s callback wiring.
use std::collections::HashSet;

use acp_audit::{state as shared_state, AuditLogger};
use acp_catalog::CatalogEntry;
use acp_guardrail::{GuardrailConfig, GuardrailError, GuardrailInput};
use acp_outbox::OutboxStore;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::objectives::Objective;

/// Errors surfaced by the callback phases. Unlike the enqueue tool, a
/// callback failure is not swallowed into a status payload — it is the
/// host framework's job to decide how to surface a broken turn.
#[derive(Debug, Error)]
pub enum CallbackError {
    #[error(transparent)]
    Outbox(#[from] acp_outbox::OutboxError),
    #[error(transparent)]
    Guardrail(#[from] GuardrailError),
}

/// Runs once per fresh agent invocation, before any model call: seeds the
/// desk/guardrail/approval-modal state slices and hydrates the desk queue
/// with this tenant's currently pending outbox records, deduplicated by
/// envelope id so a record already present in a carried-over queue is not
/// listed twice.
pub async fn before_agent(
    outbox: &dyn OutboxStore,
    tenant_id: &str,
    state: &mut Map<String, Value>,
) -> Result<(), CallbackError> {
    shared_state::ensure_desk_state(state);
    shared_state::ensure_guardrail_state(state);
    shared_state::ensure_approval_modal(state);

    let pending = outbox.list_pending(Some(tenant_id), 100).await?;
    let mut seen = HashSet::with_capacity(pending.len());
    let queue: Vec<Value> = pending
        .into_iter()
        .filter(|record| seen.insert(record.id()))
        .map(|record| serde_json::to_value(record.to_shared_state()).expect("DeskQueueItem serializes"))
        .collect();
    shared_state::seed_queue(state, queue);

    Ok(())
}

/// Result of running the before-model phase: either the turn is blocked by
/// a guardrail (with a synthetic message to return instead of calling the
/// model) or it may proceed, optionally carrying a system-prompt prefix to
/// prepend ahead of the model's own instructions.
#[derive(Debug, Clone)]
pub struct BeforeModelOutcome {
    pub blocked: bool,
    pub message: Option<String>,
    pub system_prompt_prefix: Option<String>,
}

/// Runs the guardrail pipeline, projects its results into shared state and
/// the audit log, and either short-circuits the turn with a block message
/// or composes the system-prompt prefix (tenant objectives plus catalog
/// tool descriptions) the model should see next.
pub async fn before_model(
    guardrail_config: &GuardrailConfig,
    guardrail_input: &GuardrailInput,
    objectives: &[Objective],
    catalog: &[CatalogEntry],
    audit: &dyn AuditLogger,
    tenant_id: &str,
    state: &mut Map<String, Value>,
    now: DateTime<Utc>,
) -> Result<BeforeModelOutcome, CallbackError> {
    let results = acp_guardrail::evaluate(guardrail_config, guardrail_input, now)?;
    shared_state::write_guardrail_results(state, &results);

    for result in &results {
        audit
            .log_guardrail(
                tenant_id,
                &result.name.to_string(),
                result.allowed,
                result.reason.as_deref(),
            )
            .await;
    }

    if let Some(block) = acp_guardrail::blocking(&results) {
        let reason = block.reason.clone().unwrap_or_else(|| "No reason given.".to_string());
        let message = format!(
            "Guardrail prevented this action. {reason} Resolve the blocking condition before retrying."
        );
        return Ok(BeforeModelOutcome {
            blocked: true,
            message: Some(message),
            system_prompt_prefix: None,
        });
    }

    Ok(BeforeModelOutcome {
        blocked: false,
        message: None,
        system_prompt_prefix: Some(compose_system_prompt_prefix(objectives, catalog)),
    })
}

fn compose_system_prompt_prefix(objectives: &[Objective], catalog: &[CatalogEntry]) -> String {
    let mut sections = Vec::new();

    if !objectives.is_empty() {
        let mut section = String::from("Tenant objectives:\n");
        for objective in objectives {
            section.push_str(&format!(
                "- {} ({}): target {} by {}. {}\n",
                objective.title, objective.metric, objective.target, objective.horizon, objective.summary
            ));
        }
        sections.push(section);
    }

    if !catalog.is_empty() {
        let mut section = String::from("Available tools:\n");
        for entry in catalog {
            section.push_str(&entry.prompt_snippet());
        }
        sections.push(section);
    }

    sections.join("\n")
}

/// Runs once after every model turn: detects whether `enqueue_envelope`
/// stashed a fresh envelope this turn. The host framework uses the result
/// to decide whether the invocation is complete (no more tool calls should
/// follow a successful enqueue in the same turn).
pub fn after_model(state: &Map<String, Value>) -> bool {
    shared_state::last_envelope_id(state).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use acp_audit::RecordingAuditLogger;
    use acp_core::{Envelope, Risk};
    use acp_outbox::InMemoryOutboxStore;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn before_agent_hydrates_pending_queue_without_duplicates() {
        let outbox = InMemoryOutboxStore::new();
        let envelope = Envelope::from_payload(
            &json!({"tool_slug": "slack__chat.postMessage", "arguments": {}}),
            "tenant-a",
            Risk::Low,
        )
        .unwrap();
        outbox.enqueue(envelope, None).await.unwrap();

        let mut state = Map::new();
        before_agent(&outbox, "tenant-a", &mut state).await.unwrap();
        before_agent(&outbox, "tenant-a", &mut state).await.unwrap();

        let queue = state
            .get("desk")
            .unwrap()
            .as_object()
            .unwrap()
            .get("queue")
            .unwrap()
            .as_array()
            .unwrap();
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn before_model_allows_turn_and_composes_prefix_when_unblocked() {
        let config = GuardrailConfig::default();
        let input = GuardrailInput {
            trust_score: Some(0.95),
            ..Default::default()
        };
        let audit = RecordingAuditLogger::new();
        let mut state = Map::new();

        let outcome = before_model(
            &config,
            &input,
            &crate::objectives::default_objectives(),
            &[],
            &audit,
            "tenant-a",
            &mut state,
            now(),
        )
        .await
        .unwrap();

        assert!(!outcome.blocked);
        assert!(outcome.system_prompt_prefix.unwrap().contains("Increase renewal rate"));
        assert_eq!(audit.entries().await.len(), 4);
    }

    #[tokio::test]
    async fn before_model_blocks_turn_when_trust_score_is_below_threshold() {
        let config = GuardrailConfig {
            trust_threshold: 0.8,
            ..Default::default()
        };
        let input = GuardrailInput {
            trust_score: Some(0.5),
            ..Default::default()
        };
        let audit = RecordingAuditLogger::new();
        let mut state = Map::new();

        let outcome = before_model(&config, &input, &[], &[], &audit, "tenant-a", &mut state, now())
            .await
            .unwrap();

        assert!(outcome.blocked);
        assert!(outcome.message.unwrap().starts_with("Guardrail prevented this action."));
        let guardrails = state.get("guardrails").unwrap().as_object().unwrap();
        assert_eq!(guardrails.get("trust").unwrap().get("allowed"), Some(&json!(false)));
    }

    #[test]
    fn after_model_is_false_until_an_envelope_is_stashed() {
        let mut state = Map::new();
        assert!(!after_model(&state));

        let envelope = Envelope::from_payload(
            &json!({"tool_slug": "slack__chat.postMessage", "arguments": {}}),
            "tenant-a",
            Risk::Low,
        )
        .unwrap();
        shared_state::stash_last_envelope(&mut state, &envelope);
        assert!(after_model(&state));
    }
}
