// Wall-clock helpers shared by the aggregator, repo and routes.

/// Milliseconds since the Unix epoch. Falls back to 0 (with a warning) if the clock is before 1970.
pub fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, operation = "get_timestamp", "system time error");
            0
        })
}

/// Human-readable duration for dashboards: `"4m 05s"`, `"42s"`, or `"—"` when missing/negative.
pub fn format_duration(ms: Option<f64>) -> String {
    let Some(ms) = ms.filter(|v| !v.is_nan() && *v >= 0.0) else {
        return "—".to_string();
    };
    let secs = (ms / 1000.0).round() as u64;
    let m = secs / 60;
    let s = secs % 60;
    if m > 0 {
        format!("{}m {:02}s", m, s)
    } else {
        format!("{}s", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_duration_missing_or_negative() {
        assert_eq!(format_duration(None), "—");
        assert_eq!(format_duration(Some(-1.0)), "—");
        assert_eq!(format_duration(Some(f64::NAN)), "—");
    }

    #[test]
    fn format_duration_minutes_and_seconds() {
        assert_eq!(format_duration(Some(245_000.0)), "4m 05s");
        assert_eq!(format_duration(Some(42_400.0)), "42s");
        assert_eq!(format_duration(Some(0.0)), "0s");
        assert_eq!(format_duration(Some(60_000.0)), "1m 00s");
    }
}
