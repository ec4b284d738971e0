//! Quiet hours guardrail: blocks actions during a configured overnight or
//! intraday window, UTC.

use chrono::{DateTime, Timelike, Utc};
use serde_json::{json, Map};

use crate::result::{GuardrailName, GuardrailResult};
use crate::shared::{format_quiet_window, in_quiet_window, resolve_quiet_hours_window};

/// Evaluates the quiet hours guardrail at `now`.
pub fn check(start_hour: Option<u32>, end_hour: Option<u32>, now: DateTime<Utc>) -> GuardrailResult {
    let current_time = now.format("%H:%M UTC").to_string();

    let window = match resolve_quiet_hours_window(start_hour, end_hour) {
        Ok(window) => window,
        Err(reason) => {
            let mut metadata = Map::new();
            metadata.insert("configured".into(), json!(false));
            metadata.insert("window".into(), serde_json::Value::Null);
            metadata.insert("currentTime".into(), json!(current_time));
            return GuardrailResult::new(GuardrailName::QuietHours, true, reason, metadata);
        }
    };

    let window_label = format_quiet_window(window);
    let hour = now.hour();

    let mut metadata = Map::new();
    metadata.insert("configured".into(), json!(true));
    metadata.insert("window".into(), json!(window_label));
    metadata.insert("currentTime".into(), json!(current_time));

    if in_quiet_window(hour, window) {
        let reason = format!("Quiet hours active ({window_label}); current time {current_time}");
        GuardrailResult::new(GuardrailName::QuietHours, false, reason, metadata)
    } else {
        let reason = format!("Outside quiet hours ({window_label}); current time {current_time}");
        GuardrailResult::new(GuardrailName::QuietHours, true, reason, metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn unconfigured_allows() {
        let r = check(None, None, at(23));
        assert!(r.allowed);
        assert_eq!(r.metadata["configured"], json!(false));
    }

    #[test]
    fn overnight_boundaries() {
        assert!(!check(Some(22), Some(6), at(23)).allowed);
        assert!(check(Some(22), Some(6), at(6)).allowed);
        assert!(check(Some(22), Some(6), at(21)).allowed);
    }

    #[test]
    fn start_edge_is_inclusive() {
        assert!(!check(Some(22), Some(6), at(22)).allowed);
    }

    #[test]
    fn invalid_configuration_allows() {
        let r = check(Some(30), Some(6), at(23));
        assert!(r.allowed);
    }

    #[test]
    fn equal_bounds_allow() {
        let r = check(Some(9), Some(9), at(9));
        assert!(r.allowed);
    }
}
