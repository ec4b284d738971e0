//! Conflict detection and exponential backoff for the outbox worker's
//! provider dispatch retry harness.
use std::time::Duration;

/// Backoff schedule: `delay(attempt) = clamp(min * multiplier^attempt, min, max)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    pub multiplier: f64,
    pub min: Duration,
    pub max: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            multiplier: 1.0,
            min: Duration::from_secs(1),
            max: Duration::from_secs(30),
        }
    }
}

impl BackoffPolicy {
    /// Delay before the `attempt`-th retry (0-indexed: the delay before
    /// the first retry after the initial attempt).
    pub fn delay(&self, attempt: u32) -> Duration {
        let scaled = self.min.as_secs_f64() * self.multiplier.powi(attempt as i32);
        let clamped = scaled.clamp(self.min.as_secs_f64(), self.max.as_secs_f64());
        Duration::from_secs_f64(clamped)
    }
}

/// `true` when a provider error is a conflict rather than a transient
/// failure: HTTP status 409, or a message containing `"conflict"` or
/// `"409"` case-insensitively.
pub fn is_conflict(status: Option<u16>, message: &str) -> bool {
    if status == Some(409) {
        return true;
    }
    let lower = message.to_lowercase();
    lower.contains("conflict") || lower.contains("409")
}

/// Whether a provider call is eligible for another retry attempt: any
/// error other than a conflict, and only while under `max_attempts`.
pub fn is_retryable(status: Option<u16>, message: &str, attempts: u32, max_attempts: u32) -> bool {
    !is_conflict(status, message) && attempts < max_attempts
}
