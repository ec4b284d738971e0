//! Composes the four guardrails into the fail-on-first-block pipeline the
//! before-model phase runs synchronously on every turn.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::evidence::{self, Proposal};
use crate::quiet_hours;
use crate::result::GuardrailResult;
use crate::scopes;
use crate::trust::{self, TrustConfigError};

/// Static configuration driving every guardrail evaluation.
#[derive(Debug, Clone)]
pub struct GuardrailConfig {
    pub quiet_hours_start_hour: Option<u32>,
    pub quiet_hours_end_hour: Option<u32>,
    pub trust_threshold: f64,
    pub enforce_scope_validation: bool,
    pub require_evidence: bool,
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self {
            quiet_hours_start_hour: None,
            quiet_hours_end_hour: None,
            trust_threshold: 0.8,
            enforce_scope_validation: true,
            require_evidence: true,
        }
    }
}

/// Per-invocation inputs the static config alone can't supply.
#[derive(Debug, Clone, Default)]
pub struct GuardrailInput {
    pub trust_score: Option<f64>,
    pub trust_source: Option<String>,
    pub requested_scopes: Vec<String>,
    pub enabled_scopes: Vec<String>,
    pub proposal: Option<Proposal>,
}

/// Error surfaced when a guardrail's own configuration is invalid — never
/// silently treated as an allow.
#[derive(Debug, Error)]
pub enum GuardrailError {
    #[error(transparent)]
    TrustConfig(#[from] TrustConfigError),
}

/// The four guardrail results, always in `(quiet_hours, trust_threshold,
/// scope_validation, evidence_requirement)` order.
pub type GuardrailResults = [GuardrailResult; 4];

/// Runs every guardrail in order and returns the full tuple.
pub fn evaluate(
    config: &GuardrailConfig,
    input: &GuardrailInput,
    now: DateTime<Utc>,
) -> Result<GuardrailResults, GuardrailError> {
    let quiet = quiet_hours::check(config.quiet_hours_start_hour, config.quiet_hours_end_hour, now);
    let trust = trust::check(
        input.trust_score,
        config.trust_threshold,
        input.trust_source.as_deref(),
    )?;
    let scope = scopes::check(
        &input.requested_scopes,
        &input.enabled_scopes,
        config.enforce_scope_validation,
    );
    let evidence = evidence::check(input.proposal.as_ref(), config.require_evidence);

    Ok([quiet, trust, scope, evidence])
}

/// The first result with `allowed == false`, if any — the result that
/// should short-circuit the LLM turn.
pub fn blocking(results: &GuardrailResults) -> Option<&GuardrailResult> {
    results.iter().find(|r| !r.allowed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn returns_exactly_four_results_in_order() {
        let results = evaluate(&GuardrailConfig::default(), &GuardrailInput::default(), now()).unwrap();
        assert_eq!(results.len(), 4);
        use crate::result::GuardrailName::*;
        let names: Vec<_> = results.iter().map(|r| r.name).collect();
        assert_eq!(
            names,
            vec![QuietHours, TrustThreshold, ScopeValidation, EvidenceRequirement]
        );
    }

    #[test]
    fn all_allow_when_unconfigured_and_trust_meets_default_threshold() {
        let input = GuardrailInput {
            trust_score: Some(0.9),
            ..Default::default()
        };
        let results = evaluate(&GuardrailConfig::default(), &input, now()).unwrap();
        assert!(results.iter().all(|r| r.allowed));
        assert!(blocking(&results).is_none());
    }

    #[test]
    fn blocking_surfaces_first_failure() {
        let config = GuardrailConfig {
            trust_threshold: 0.9,
            ..Default::default()
        };
        let input = GuardrailInput {
            trust_score: Some(0.1),
            ..Default::default()
        };
        let results = evaluate(&config, &input, now()).unwrap();
        let block = blocking(&results).unwrap();
        assert_eq!(block.name, crate::result::GuardrailName::TrustThreshold);
    }

    #[test]
    fn invalid_trust_threshold_errors_out() {
        let config = GuardrailConfig {
            trust_threshold: 1.5,
            ..Default::default()
        };
        assert!(evaluate(&config, &GuardrailInput::default(), now()).is_err());
    }
}
