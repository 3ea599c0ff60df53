// Trailing-window trend over a metric series.

use crate::models::{MetricsSnapshot, mean_present};

pub const MS_PER_MINUTE: f64 = 60_000.0;

/// Average of the latest window and its change against the window before it.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Trend {
    pub recent: Option<f64>,
    pub delta: Option<f64>,
}

/// Milliseconds to minutes; NaN counts as missing.
pub fn minutes(ms: Option<f64>) -> Option<f64> {
    ms.filter(|v| !v.is_nan()).map(|v| v / MS_PER_MINUTE)
}

/// `recent` = mean of the last `window` rows, `delta` = `recent` minus the mean of the
/// `window` rows before those. Either side without data makes `delta` `None`.
pub fn metric_trend<F>(rows: &[MetricsSnapshot], window: usize, get: F) -> Trend
where
    F: Fn(&MetricsSnapshot) -> Option<f64>,
{
    if rows.is_empty() {
        return Trend::default();
    }
    let n = rows.len();
    let recent_start = n.saturating_sub(window);
    let previous_start = n.saturating_sub(window * 2);
    let recent = mean_present(rows[recent_start..].iter().map(&get));
    let previous = mean_present(rows[previous_start..recent_start].iter().map(&get));
    Trend {
        recent,
        delta: recent.zip(previous).map(|(r, p)| r - p),
    }
}

/// `"+3.0m vs prev"`; empty when there is no delta or it is below `min_display` minutes.
pub fn format_delta(delta: Option<f64>, min_display: f64) -> String {
    match delta {
        Some(d) if d.abs() >= min_display => {
            let sign = if d > 0.0 { "+" } else { "" };
            format!("{}{}m vs prev", sign, to_fixed(d, 1))
        }
        _ => String::new(),
    }
}

/// Fixed-point text with ties rounded away from zero (7.25 -> "7.3", 12.5 -> "13").
pub fn to_fixed(value: f64, digits: usize) -> String {
    let scale = 10f64.powi(digits as i32);
    format!("{:.*}", digits, (value * scale).round() / scale)
}
