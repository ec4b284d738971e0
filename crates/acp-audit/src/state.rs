//! Shared-state projection consumed by the agent desk UI surface.
//!
//! Three independent slices live under fixed top-level keys in whatever
//! mutable key/value bag the host agent framework exposes as
//! conversation-scoped shared state: the desk queue, the last guardrail
//! outcomes, and the pending approval modal.
use acp_core::Envelope;
use acp_guardrail::{GuardrailName, GuardrailResult};
use chrono::Utc;
use serde_json::{json, Map, Value};
use uuid::Uuid;

pub const DESK_STATE_KEY: &str = "desk";
pub const GUARDRAIL_STATE_KEY: &str = "guardrails";
pub const APPROVAL_MODAL_KEY: &str = "approvalModal";
pub const OUTBOX_STATE_KEY: &str = "outbox";

/// Ensures `state[DESK_STATE_KEY]` is a `{ queue: [...], lastUpdated }`
/// object, creating or repairing it in place, and returns it.
pub fn ensure_desk_state(state: &mut Map<String, Value>) -> &mut Map<String, Value> {
    let needs_init = !matches!(state.get(DESK_STATE_KEY), Some(Value::Object(_)));
    if needs_init {
        state.insert(
            DESK_STATE_KEY.to_string(),
            json!({ "queue": [], "lastUpdated": now_iso() }),
        );
    } else if let Some(Value::Object(desk)) = state.get_mut(DESK_STATE_KEY) {
        desk.entry("queue").or_insert_with(|| json!([]));
        desk.entry("lastUpdated").or_insert_with(|| json!(now_iso()));
    }
    state
        .get_mut(DESK_STATE_KEY)
        .and_then(Value::as_object_mut)
        .expect("just ensured")
}

/// Replaces the desk queue wholesale.
pub fn seed_queue(state: &mut Map<String, Value>, queue: Vec<Value>) {
    let desk = ensure_desk_state(state);
    desk.insert("queue".to_string(), Value::Array(queue));
    desk.insert("lastUpdated".to_string(), json!(now_iso()));
}

/// Appends a single item to the desk queue.
pub fn append_queue_item(state: &mut Map<String, Value>, item: Value) {
    let desk = ensure_desk_state(state);
    if let Some(Value::Array(queue)) = desk.get_mut("queue") {
        queue.push(item);
    }
    desk.insert("lastUpdated".to_string(), json!(now_iso()));
}

/// Ensures `state[GUARDRAIL_STATE_KEY]` exists as an object and returns it.
pub fn ensure_guardrail_state(state: &mut Map<String, Value>) -> &mut Map<String, Value> {
    if !matches!(state.get(GUARDRAIL_STATE_KEY), Some(Value::Object(_))) {
        state.insert(GUARDRAIL_STATE_KEY.to_string(), json!({}));
    }
    state
        .get_mut(GUARDRAIL_STATE_KEY)
        .and_then(Value::as_object_mut)
        .expect("just ensured")
}

/// Persists guardrail evaluations into shared state for UI consumption,
/// one camelCase-keyed payload per guardrail.
pub fn write_guardrail_results<'a>(
    state: &mut Map<String, Value>,
    evaluations: impl IntoIterator<Item = &'a GuardrailResult>,
) {
    let guardrails = ensure_guardrail_state(state);
    for evaluation in evaluations {
        let (key, payload) = normalise_guardrail_result(evaluation);
        guardrails.insert(key.to_string(), payload);
    }
}

fn normalise_guardrail_result(result: &GuardrailResult) -> (&'static str, Value) {
    let metadata = &result.metadata;
    match result.name {
        GuardrailName::QuietHours => {
            let mut payload = Map::new();
            payload.insert("allowed".into(), json!(result.allowed));
            payload.insert(
                "message".into(),
                json!(result.reason.clone().unwrap_or_default()),
            );
            if let Some(window) = metadata.get("window") {
                payload.insert("window".into(), window.clone());
            }
            if let Some(current_time) = metadata.get("currentTime") {
                payload.insert("currentTime".into(), current_time.clone());
            }
            if let Some(configured) = metadata.get("configured") {
                payload.insert("configured".into(), json!(configured.as_bool().unwrap_or(false)));
            }
            ("quietHours", Value::Object(payload))
        }
        GuardrailName::TrustThreshold => {
            let mut payload = Map::new();
            payload.insert("allowed".into(), json!(result.allowed));
            payload.insert("score".into(), metadata.get("score").cloned().unwrap_or(Value::Null));
            payload.insert(
                "threshold".into(),
                metadata.get("threshold").cloned().unwrap_or(Value::Null),
            );
            if let Some(source) = metadata.get("source").filter(|v| !v.is_null()) {
                payload.insert("source".into(), source.clone());
            }
            if let Some(reason) = &result.reason {
                payload.insert("message".into(), json!(reason));
            }
            if let Some(missing) = metadata.get("missingSignal") {
                payload.insert("missingSignal".into(), json!(missing.as_bool().unwrap_or(false)));
            }
            ("trust", Value::Object(payload))
        }
        GuardrailName::ScopeValidation => {
            let mut payload = Map::new();
            payload.insert("allowed".into(), json!(result.allowed));
            payload.insert(
                "missingScopes".into(),
                metadata.get("missingScopes").cloned().unwrap_or_else(|| json!([])),
            );
            payload.insert(
                "requestedScopes".into(),
                metadata
                    .get("requestedScopes")
                    .cloned()
                    .unwrap_or_else(|| json!([])),
            );
            payload.insert(
                "enabledScopes".into(),
                metadata.get("enabledScopes").cloned().unwrap_or_else(|| json!([])),
            );
            if let Some(reason) = &result.reason {
                payload.insert("message".into(), json!(reason));
            }
            ("scopeValidation", Value::Object(payload))
        }
        GuardrailName::EvidenceRequirement => {
            let mut payload = Map::new();
            payload.insert(
                "required".into(),
                json!(metadata
                    .get("required")
                    .and_then(Value::as_bool)
                    .unwrap_or(true)),
            );
            payload.insert("allowed".into(), json!(result.allowed));
            payload.insert(
                "missingEvidence".into(),
                metadata
                    .get("missingEvidence")
                    .cloned()
                    .unwrap_or_else(|| json!([])),
            );
            if let Some(reason) = &result.reason {
                payload.insert("message".into(), json!(reason));
            }
            ("evidence", Value::Object(payload))
        }
    }
}

/// Ensures `state[APPROVAL_MODAL_KEY]` exists with the pending-scaffold
/// shape and returns it.
pub fn ensure_approval_modal(state: &mut Map<String, Value>) -> &mut Map<String, Value> {
    if !matches!(state.get(APPROVAL_MODAL_KEY), Some(Value::Object(_))) {
        state.insert(
            APPROVAL_MODAL_KEY.to_string(),
            json!({
                "envelopeId": Value::Null,
                "proposal": Value::Null,
                "requiredScopes": [],
                "approvalState": "pending",
            }),
        );
    }
    state
        .get_mut(APPROVAL_MODAL_KEY)
        .and_then(Value::as_object_mut)
        .expect("just ensured")
}

/// Populates the approval modal with a pending request for `envelope`.
pub fn set_approval_modal(
    state: &mut Map<String, Value>,
    envelope: &Envelope,
    required_scopes: &[String],
    proposal: Value,
) {
    let modal = ensure_approval_modal(state);
    modal.insert("envelopeId".into(), json!(envelope.envelope_id));
    modal.insert("proposal".into(), proposal);
    modal.insert("requiredScopes".into(), json!(required_scopes));
    modal.insert("approvalState".into(), json!("pending"));
}

/// Looks up the envelope id currently parked in the approval modal, if any.
pub fn pending_approval_envelope_id(state: &Map<String, Value>) -> Option<Uuid> {
    state
        .get(APPROVAL_MODAL_KEY)?
        .as_object()?
        .get("envelopeId")?
        .as_str()
        .and_then(|s| Uuid::parse_str(s).ok())
}

/// Persists metadata about the most recently enqueued envelope, so the
/// after-model phase can detect that an enqueue happened this turn and
/// short-circuit further tool calls.
pub fn stash_last_envelope(state: &mut Map<String, Value>, envelope: &Envelope) {
    let outbox = state
        .entry(OUTBOX_STATE_KEY.to_string())
        .or_insert_with(|| json!({}));
    if let Some(outbox) = outbox.as_object_mut() {
        outbox.insert("lastEnvelopeId".into(), json!(envelope.envelope_id));
        outbox.insert("lastEnvelopeSlug".into(), json!(envelope.tool_slug));
        outbox.insert(
            "lastEnvelopeCreatedAt".into(),
            json!(envelope.created_at.to_rfc3339()),
        );
    }
}

/// The envelope id stashed by [`stash_last_envelope`] during this turn, if
/// any — the after-model phase's signal that an enqueue occurred.
pub fn last_envelope_id(state: &Map<String, Value>) -> Option<Uuid> {
    state
        .get(OUTBOX_STATE_KEY)?
        .as_object()?
        .get("lastEnvelopeId")?
        .as_str()
        .and_then(|s| Uuid::parse_str(s).ok())
}

fn now_iso() -> String {
    Utc::now().to_rfc3339()
}
