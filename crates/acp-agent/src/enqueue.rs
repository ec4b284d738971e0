//! The enqueue tool: the only write-path tool exposed to the LLM. Ported
//! from `original_source/agent/agents/control_plane.py::enqueue_envelope`
//! and `agent/agents/blueprints/desk.py::DeskBlueprint.register_envelope`.
use acp_audit::{state as shared_state, AuditLogger};
use acp_catalog::CatalogService;
use acp_core::Envelope;
use acp_outbox::OutboxStore;
use serde_json::{json, Map, Value};

/// A proposal payload (`{summary, evidence}`) accompanying an enqueue
/// request, passed through verbatim into the approval modal.
pub type Proposal = Value;

/// Runs the enqueue tool's full sequence — slug extraction, catalog
/// lookup, argument validation, envelope construction, outbox insert,
/// audit emission, and shared-state projection — atomically from the
/// caller's perspective. Any failure surfaces as `{"status": "error",
/// "message": ...}` with no partial commit: audit is written only after
/// the outbox insert succeeds, and shared state is only touched once both
/// have succeeded.
pub async fn enqueue_envelope(
    catalog: &dyn CatalogService,
    outbox: &dyn OutboxStore,
    audit: &dyn AuditLogger,
    tenant_id: &str,
    state: &mut Map<String, Value>,
    payload: &Value,
    required_scopes: Option<Vec<String>>,
    proposal: Option<Proposal>,
) -> Value {
    match try_enqueue(catalog, outbox, audit, tenant_id, state, payload, required_scopes, proposal)
        .await
    {
        Ok(success) => success,
        Err(message) => json!({ "status": "error", "message": message }),
    }
}

async fn try_enqueue(
    catalog: &dyn CatalogService,
    outbox: &dyn OutboxStore,
    audit: &dyn AuditLogger,
    tenant_id: &str,
    state: &mut Map<String, Value>,
    payload: &Value,
    required_scopes: Option<Vec<String>>,
    proposal: Option<Proposal>,
) -> Result<Value, String> {
    let slug = extract_slug(payload)?;

    let catalog_entry = catalog
        .get_tool(tenant_id, &slug)
        .ok_or_else(|| format!("Tool \"{slug}\" not found in catalog"))?;

    let arguments = payload.get("arguments").cloned().unwrap_or(json!({}));
    catalog_entry
        .validate(&arguments)
        .map_err(|e| e.to_string())?;

    let envelope = Envelope::from_payload(payload, tenant_id, catalog_entry.risk)
        .map_err(|e| e.to_string())?;

    let record = outbox
        .enqueue(envelope.clone(), None)
        .await
        .map_err(|e| e.to_string())?;

    audit
        .log_envelope(
            tenant_id,
            record.id(),
            &record.envelope.tool_slug,
            "pending",
            Map::new(),
        )
        .await;

    let scopes = merge_scopes(&catalog_entry.required_scopes, required_scopes.as_deref());
    shared_state::append_queue_item(state, serde_json::to_value(record.to_shared_state()).unwrap());
    let proposal_value = proposal.unwrap_or_else(|| {
        json!({
            "summary": "Autonomous envelope queued",
            "evidence": ["No additional evidence provided"],
        })
    });
    shared_state::set_approval_modal(state, &record.envelope, &scopes, proposal_value);
    shared_state::stash_last_envelope(state, &record.envelope);

    Ok(json!({
        "status": "queued",
        "envelopeId": record.envelope.envelope_id,
        "risk": record.envelope.risk,
    }))
}

fn extract_slug(payload: &Value) -> Result<String, String> {
    payload
        .get("tool_slug")
        .or_else(|| payload.get("slug"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| "tool_slug is required to enqueue an envelope".to_string())
}

fn merge_scopes(catalog_scopes: &[String], explicit: Option<&[String]>) -> Vec<String> {
    let mut merged: Vec<String> = catalog_scopes.to_vec();
    for scope in explicit.unwrap_or_default() {
        if !merged.contains(scope) {
            merged.push(scope.clone());
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use acp_audit::RecordingAuditLogger;
    use acp_catalog::{CatalogEntry, InMemoryCatalogService};
    use acp_core::Risk;
    use acp_outbox::InMemoryOutboxStore;

    fn entry() -> CatalogEntry {
        CatalogEntry {
            slug: "GMAIL__drafts.create".into(),
            display_name: "Create Gmail Draft".into(),
            description: String::new(),
            version: "1.0".into(),
            risk: Risk::Medium,
            schema: json!({
                "type": "object",
                "required": ["to", "subject", "body"],
                "properties": {"to": {"type": "string"}, "subject": {"type": "string"}, "body": {"type": "string"}},
            }),
            required_scopes: vec!["GMAIL.SMTP".into()],
        }
    }

    #[tokio::test]
    async fn happy_path_enqueues_and_stashes_last_envelope() {
        let catalog = InMemoryCatalogService::seeded("tenant-demo", vec![entry()]);
        let outbox = InMemoryOutboxStore::new();
        let audit = RecordingAuditLogger::new();
        let mut state = Map::new();

        let payload = json!({
            "tool_slug": "GMAIL__drafts.create",
            "arguments": {"to": "c@e.com", "subject": "Renewal", "body": "Hi"},
        });
        let proposal = json!({"summary": "draft", "evidence": ["ticket#123"]});

        let result = enqueue_envelope(
            &catalog,
            &outbox,
            &audit,
            "tenant-demo",
            &mut state,
            &payload,
            None,
            Some(proposal),
        )
        .await;

        assert_eq!(result.get("status"), Some(&json!("queued")));
        assert_eq!(result.get("risk"), Some(&json!("medium")));

        let pending = outbox.list_pending(Some("tenant-demo"), 10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].envelope.tool_slug, "GMAIL__drafts.create");

        let envelope_id = result.get("envelopeId").and_then(Value::as_str).unwrap();
        let stashed = acp_audit::state::last_envelope_id(&state).unwrap().to_string();
        assert_eq!(stashed, envelope_id);
    }

    #[tokio::test]
    async fn unknown_tool_surfaces_an_error_without_writing_to_outbox() {
        let catalog = InMemoryCatalogService::new();
        let outbox = InMemoryOutboxStore::new();
        let audit = RecordingAuditLogger::new();
        let mut state = Map::new();

        let payload = json!({"tool_slug": "unknown__thing", "arguments": {}});
        let result = enqueue_envelope(&catalog, &outbox, &audit, "tenant-demo", &mut state, &payload, None, None)
            .await;

        assert_eq!(result.get("status"), Some(&json!("error")));
        assert!(outbox.list_pending(None, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn schema_violation_surfaces_an_error_without_writing_to_outbox() {
        let catalog = InMemoryCatalogService::seeded("tenant-demo", vec![entry()]);
        let outbox = InMemoryOutboxStore::new();
        let audit = RecordingAuditLogger::new();
        let mut state = Map::new();

        let payload = json!({"tool_slug": "GMAIL__drafts.create", "arguments": {"to": "c@e.com"}});
        let result = enqueue_envelope(&catalog, &outbox, &audit, "tenant-demo", &mut state, &payload, None, None)
            .await;

        assert_eq!(result.get("status"), Some(&json!("error")));
        assert!(outbox.list_pending(None, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn explicit_required_scopes_merge_with_catalog_defaults() {
        let catalog = InMemoryCatalogService::seeded("tenant-demo", vec![entry()]);
        let outbox = InMemoryOutboxStore::new();
        let audit = RecordingAuditLogger::new();
        let mut state = Map::new();

        let payload = json!({
            "tool_slug": "GMAIL__drafts.create",
            "arguments": {"to": "c@e.com", "subject": "s", "body": "b"},
        });
        enqueue_envelope(
            &catalog,
            &outbox,
            &audit,
            "tenant-demo",
            &mut state,
            &payload,
            Some(vec!["EXTRA.SCOPE".into()]),
            None,
        )
        .await;

        let modal = state.get("approvalModal").unwrap();
        let scopes = modal.get("requiredScopes").unwrap().as_array().unwrap();
        assert!(scopes.iter().any(|s| s == "GMAIL.SMTP"));
        assert!(scopes.iter().any(|s| s == "EXTRA.SCOPE"));
    }
}
