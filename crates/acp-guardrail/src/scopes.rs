//! Scope validation guardrail: diffs requested vs enabled scopes,
//! case-insensitively and whitespace-trimmed.

use std::collections::BTreeSet;

use serde_json::{json, Map};

use crate::result::{GuardrailName, GuardrailResult};

/// Evaluates the scope validation guardrail. `enforce = false`
/// short-circuits to allow without touching `requested`/`enabled`.
pub fn check(requested: &[String], enabled: &[String], enforce: bool) -> GuardrailResult {
    if !enforce {
        let mut metadata = Map::new();
        metadata.insert("missingScopes".into(), json!(Vec::<String>::new()));
        metadata.insert("requestedScopes".into(), json!(Vec::<String>::new()));
        metadata.insert("enabledScopes".into(), json!(Vec::<String>::new()));
        return GuardrailResult::new(
            GuardrailName::ScopeValidation,
            true,
            "scope validation disabled via configuration; allowing",
            metadata,
        );
    }

    let requested_set = normalise(requested);
    let enabled_set = normalise(enabled);

    let mut metadata = Map::new();
    metadata.insert(
        "requestedScopes".into(),
        json!(requested_set.iter().cloned().collect::<Vec<_>>()),
    );
    metadata.insert(
        "enabledScopes".into(),
        json!(enabled_set.iter().cloned().collect::<Vec<_>>()),
    );

    if requested_set.is_empty() {
        metadata.insert("missingScopes".into(), json!(Vec::<String>::new()));
        return GuardrailResult::new(
            GuardrailName::ScopeValidation,
            true,
            "no scopes requested; allowing",
            metadata,
        );
    }

    let missing: Vec<String> = requested_set.difference(&enabled_set).cloned().collect();
    metadata.insert("missingScopes".into(), json!(missing));

    if missing.is_empty() {
        GuardrailResult::new(
            GuardrailName::ScopeValidation,
            true,
            "requested scopes satisfied",
            metadata,
        )
    } else {
        let reason = format!("missing scopes: {}", missing.join(", "));
        GuardrailResult::new(GuardrailName::ScopeValidation, false, reason, metadata)
    }
}

fn normalise(scopes: &[String]) -> BTreeSet<String> {
    scopes
        .iter()
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
