//! Trust threshold guardrail: compares a historical approval ratio against
//! a configured minimum before letting an action run unattended.

use serde_json::{json, Map};
use thiserror::Error;

use crate::result::{GuardrailName, GuardrailResult};

/// Raised when the configured threshold itself is out of range — this is a
/// configuration defect, never surfaced as a silent allow.
#[derive(Debug, Error, PartialEq)]
pub enum TrustConfigError {
    #[error("trust threshold must be between 0.0 and 1.0 inclusive, got {0}")]
    ThresholdOutOfRange(f64),
}

/// Evaluates the trust threshold guardrail.
///
/// `score` is the historical approval ratio (0..1); `None` is treated as
/// `0.0` (fail-closed) and flagged via `metadata.missingSignal`.
pub fn check(
    score: Option<f64>,
    threshold: f64,
    source: Option<&str>,
) -> Result<GuardrailResult, TrustConfigError> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(TrustConfigError::ThresholdOutOfRange(threshold));
    }

    let missing_signal = score.is_none();
    let ratio = score.unwrap_or(0.0).clamp(0.0, 1.0);

    let mut metadata = Map::new();
    metadata.insert("score".into(), json!(ratio));
    metadata.insert("threshold".into(), json!(threshold));
    if let Some(source) = source {
        metadata.insert("source".into(), json!(source));
    }
    if missing_signal {
        metadata.insert("missingSignal".into(), json!(true));
    }

    let allowed = ratio >= threshold;
    let mut reason = if allowed {
        format!("Trust score {ratio:.4} meets threshold {threshold:.4}")
    } else {
        format!("Trust score {ratio:.4} below threshold {threshold:.4}")
    };

    let mut suffixes = Vec::new();
    if missing_signal {
        suffixes.push("original score missing; treated as 0.0".to_string());
    }
    if let Some(source) = source {
        suffixes.push(format!("source={source}"));
    }
    if !suffixes.is_empty() {
        reason = format!("{reason} ({})", suffixes.join("; "));
    }

    Ok(GuardrailResult::new(
        GuardrailName::TrustThreshold,
        allowed,
        reason,
        metadata,
    ))
}
