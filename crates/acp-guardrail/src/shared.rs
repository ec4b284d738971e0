//! Primitives shared by more than one guardrail implementation.

/// A resolved, valid quiet-hours window (`start`, `end`), both 0..=23.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuietWindow {
    pub start_hour: u32,
    pub end_hour: u32,
}

/// Normalises raw configuration into a window, or a reason to allow
/// unconditionally (missing, invalid, or degenerate configuration never
/// blocks — it only ever widens the allow path).
pub fn resolve_quiet_hours_window(
    start_hour: Option<u32>,
    end_hour: Option<u32>,
) -> Result<QuietWindow, &'static str> {
    let (start, end) = match (start_hour, end_hour) {
        (Some(s), Some(e)) => (s, e),
        _ => return Err("quiet hours not configured; allowing"),
    };

    if !valid_hour(start) || !valid_hour(end) {
        return Err("invalid quiet hours configuration; allowing");
    }

    if start == end {
        return Err("quiet hours start and end match; allowing");
    }

    Ok(QuietWindow {
        start_hour: start,
        end_hour: end,
    })
}

fn valid_hour(hour: u32) -> bool {
    hour <= 23
}

/// `"22:00-06:00 UTC (overnight)"` or `"09:00-17:00 UTC"`.
pub fn format_quiet_window(window: QuietWindow) -> String {
    let label = format!("{:02}:00-{:02}:00 UTC", window.start_hour, window.end_hour);
    if window.start_hour > window.end_hour {
        format!("{label} (overnight)")
    } else {
        label
    }
}

/// `[start, end)` if `start < end`, otherwise overnight wraparound
/// (`hour >= start || hour < end`).
pub fn in_quiet_window(hour: u32, window: QuietWindow) -> bool {
    if window.start_hour < window.end_hour {
        window.start_hour <= hour && hour < window.end_hour
    } else {
        hour >= window.start_hour || hour < window.end_hour
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_bounds_allow() {
        assert!(resolve_quiet_hours_window(None, Some(6)).is_err());
        assert!(resolve_quiet_hours_window(Some(22), None).is_err());
    }

    #[test]
    fn invalid_hour_allows() {
        assert!(resolve_quiet_hours_window(Some(24), Some(6)).is_err());
    }

    #[test]
    fn equal_bounds_allow() {
        assert!(resolve_quiet_hours_window(Some(9), Some(9)).is_err());
    }

    #[test]
    fn overnight_window_wraps() {
        let w = resolve_quiet_hours_window(Some(22), Some(6)).unwrap();
        assert!(in_quiet_window(23, w));
        assert!(in_quiet_window(0, w));
        assert!(!in_quiet_window(6, w));
        assert!(!in_quiet_window(21, w));
    }

    #[test]
    fn same_day_window_does_not_wrap() {
        let w = resolve_quiet_hours_window(Some(9), Some(17)).unwrap();
        assert!(in_quiet_window(9, w));
        assert!(in_quiet_window(16, w));
        assert!(!in_quiet_window(17, w));
        assert!(!in_quiet_window(8, w));
    }
}
