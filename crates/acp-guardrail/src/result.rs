use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The four guardrails evaluated, always in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardrailName {
    QuietHours,
    TrustThreshold,
    ScopeValidation,
    EvidenceRequirement,
}

impl std::fmt::Display for GuardrailName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GuardrailName::QuietHours => "quiet_hours",
            GuardrailName::TrustThreshold => "trust_threshold",
            GuardrailName::ScopeValidation => "scope_validation",
            GuardrailName::EvidenceRequirement => "evidence_requirement",
        };
        f.write_str(s)
    }
}

/// The outcome of evaluating a single guardrail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardrailResult {
    pub name: GuardrailName,
    pub allowed: bool,
    pub reason: Option<String>,
    /// Structured details (window, scores, missing items) consumed by the
    /// shared-state projection.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl GuardrailResult {
    pub(crate) fn new(
        name: GuardrailName,
        allowed: bool,
        reason: impl Into<String>,
        metadata: Map<String, Value>,
    ) -> Self {
        Self {
            name,
            allowed,
            reason: Some(reason.into()),
            metadata,
        }
    }
}
