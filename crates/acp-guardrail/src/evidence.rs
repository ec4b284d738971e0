//! Evidence requirement guardrail: a proposed action must carry usable
//! supporting evidence.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map};

use crate::result::{GuardrailName, GuardrailResult};

/// `proposal.evidence` as the agent submits it: a single string, or a list
/// of strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EvidenceValue {
    Single(String),
    Many(Vec<String>),
}

/// The proposal payload accompanying an enqueue request.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Proposal {
    pub summary: Option<String>,
    pub evidence: Option<EvidenceValue>,
}

/// Evaluates the evidence requirement guardrail. `required = false`
/// short-circuits to allow.
pub fn check(proposal: Option<&Proposal>, required: bool) -> GuardrailResult {
    if !required {
        return GuardrailResult::new(
            GuardrailName::EvidenceRequirement,
            true,
            "evidence requirement disabled via configuration; allowing",
            metadata(false, Vec::new()),
        );
    }

    match proposal {
        None => GuardrailResult::new(
            GuardrailName::EvidenceRequirement,
            true,
            "no proposal supplied; allowing",
            metadata(true, Vec::new()),
        ),
        Some(proposal) if has_evidence(proposal) => GuardrailResult::new(
            GuardrailName::EvidenceRequirement,
            true,
            "supporting evidence present",
            metadata(true, Vec::new()),
        ),
        Some(_) => GuardrailResult::new(
            GuardrailName::EvidenceRequirement,
            false,
            "missing supporting evidence",
            metadata(true, vec!["evidence".to_string()]),
        ),
    }
}

fn metadata(required: bool, missing: Vec<String>) -> Map<String, serde_json::Value> {
    let mut metadata = Map::new();
    metadata.insert("required".into(), json!(required));
    metadata.insert("missingEvidence".into(), json!(missing));
    metadata
}

fn has_evidence(proposal: &Proposal) -> bool {
    match &proposal.evidence {
        None => false,
        Some(EvidenceValue::Single(s)) => !s.trim().is_empty(),
        Some(EvidenceValue::Many(items)) => items.iter().any(|s| !s.trim().is_empty()),
    }
}
