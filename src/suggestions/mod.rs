// Rule-based operational suggestions from the latest snapshot and trailing history.
// Pure: no I/O, no clock, same input -> same output.

pub mod trend;

use std::collections::HashMap;

use serde::Deserialize;

use crate::config::SuggestionThresholds;
use crate::models::{
    MetricsSnapshot, Severity, Suggestion, SuggestionBoard, SuggestionPref, compute_averages,
    mean_present,
};
use trend::{format_delta, metric_trend, minutes, to_fixed};

pub const QUEUE_TIME: &str = "queue-time";
pub const COOK_LINE: &str = "cook-line";
pub const ABANDON_RATE: &str = "abandon-rate";
pub const PREP_AHEAD: &str = "prep-ahead";
pub const HEALTHY_LINE: &str = "healthy-line";

/// Body of POST /api/suggestions/evaluate. Both fields may be null or omitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SuggestionInput {
    pub latest: Option<MetricsSnapshot>,
    pub history: Option<Vec<MetricsSnapshot>>,
}

impl SuggestionInput {
    pub fn evaluate(&self, thresholds: &SuggestionThresholds) -> Vec<Suggestion> {
        generate_suggestions(
            self.latest.as_ref(),
            self.history.as_deref().unwrap_or_default(),
            thresholds,
        )
    }
}

/// Evaluates the rules in fixed order (queue, cook, abandon, prep-ahead, healthy fallback).
/// `history` is oldest first. Without `latest` the last history row stands in for it.
pub fn generate_suggestions(
    latest: Option<&MetricsSnapshot>,
    history: &[MetricsSnapshot],
    t: &SuggestionThresholds,
) -> Vec<Suggestion> {
    let Some(snapshot) = latest.or(history.last()) else {
        return Vec::new();
    };

    let baselines = compute_averages(history);
    let orders_baseline = mean_present(history.iter().map(|r| r.orders_last_hour));

    // Missing queue/cook fall back to the history average, then to 0 for threshold checks.
    let queue_minutes = minutes(snapshot.queue_p50_wait_ms)
        .or_else(|| minutes(baselines.queue_p50_wait_ms))
        .unwrap_or(0.0);
    let cook_minutes = minutes(snapshot.cook_p50_ms)
        .or_else(|| minutes(baselines.cook_p50_ms))
        .unwrap_or(0.0);
    let abandon_rate = snapshot.abandon_rate_pct.or(baselines.abandon_rate_pct);
    let queue_count = snapshot
        .queue_current_count
        .or(baselines.queue_current_count)
        .unwrap_or(0.0);
    let orders_per_hour = snapshot.orders_last_hour.or(orders_baseline);

    let queue_trend = metric_trend(history, t.window_size, |r| minutes(r.queue_p50_wait_ms));
    let cook_trend = metric_trend(history, t.window_size, |r| minutes(r.cook_p50_ms));

    let mut out = Vec::new();

    if queue_minutes >= t.queue_warning_min
        || queue_trend.delta.unwrap_or(0.0) > t.queue_trend_delta_min
    {
        let severity = if queue_minutes >= t.queue_critical_min {
            Severity::Critical
        } else {
            Severity::Warning
        };
        let title = match severity {
            Severity::Critical => "Queue wait exceeds promise",
            _ => "Queue wait trending up",
        };
        let description = format!(
            "Median wait is {}m for {} guests. Shift a runner to take drinks/mobile hand-offs and open a second pickup point to bleed the line. {}",
            to_fixed(queue_minutes, 1),
            queue_count,
            format_delta(queue_trend.delta, t.trend_display_min)
        );
        out.push(suggestion(
            QUEUE_TIME,
            severity,
            title,
            description.trim_end().to_string(),
            format!("{}m median wait", to_fixed(queue_minutes, 1)),
        ));
    }

    if cook_minutes >= t.cook_warning_min {
        let severity = if cook_minutes >= t.cook_critical_min {
            Severity::Critical
        } else {
            Severity::Warning
        };
        let title = match severity {
            Severity::Critical => "Cook line is bottlenecked",
            _ => "Stage hot items earlier",
        };
        let delta = format_delta(cook_trend.delta, t.trend_display_min);
        let recover = if delta.is_empty() { "1-2m" } else { delta.as_str() };
        out.push(suggestion(
            COOK_LINE,
            severity,
            title,
            format!(
                "Cook time sits at {}m. Batch top sellers or drop proteins ahead to recover {}.",
                to_fixed(cook_minutes, 1),
                recover
            ),
            format!("{}m cook time", to_fixed(cook_minutes, 1)),
        ));
    }

    if let Some(rate) = abandon_rate {
        let elevated_with_long_queue =
            rate >= t.abandon_elevated_pct && queue_minutes >= t.queue_warning_min;
        if rate >= t.abandon_warning_pct || elevated_with_long_queue {
            let severity = if rate >= t.abandon_critical_pct {
                Severity::Critical
            } else {
                Severity::Warning
            };
            out.push(suggestion(
                ABANDON_RATE,
                severity,
                "Guests are bailing in line",
                format!(
                    "Abandon rate is {}%. Have a floor lead walk the queue with updated ETAs and offer drink samples to keep guests engaged.",
                    to_fixed(rate, 1)
                ),
                format!("{}% abandon", to_fixed(rate, 1)),
            ));
        }
    }

    let slack_threshold = orders_baseline
        .map(|b| t.prep_ahead_baseline_ratio * b)
        .unwrap_or(t.prep_ahead_default_orders);
    if let Some(orders) = orders_per_hour
        && orders <= slack_threshold
        && queue_minutes < t.prep_ahead_max_queue_min
    {
        out.push(suggestion(
            PREP_AHEAD,
            Severity::Info,
            "Use lull to prep ahead",
            format!(
                "Throughput is {} orders/hr with low waits. Restock sauces and pre-portion fries so you are ready for the next push.",
                to_fixed(orders, 0)
            ),
            format!("{} orders/hr", to_fixed(orders, 0)),
        ));
    }

    if out.is_empty() {
        out.push(suggestion(
            HEALTHY_LINE,
            Severity::Info,
            "Line is flowing",
            format!(
                "Wait ({}m) and cook ({}m) are under targets. Keep staging mobile orders to maintain the pace.",
                to_fixed(queue_minutes, 1),
                to_fixed(cook_minutes, 1)
            ),
            format!(
                "{}m / {}m",
                to_fixed(queue_minutes, 1),
                to_fixed(cook_minutes, 1)
            ),
        ));
    }

    out
}

fn suggestion(
    id: &str,
    severity: Severity,
    title: &str,
    description: String,
    metric_summary: String,
) -> Suggestion {
    Suggestion {
        id: id.to_string(),
        severity,
        title: title.to_string(),
        description,
        metric_summary,
    }
}

/// Splits suggestions into visible and dismissed by their stored prefs, keeping rule order.
pub fn partition_suggestions(
    suggestions: Vec<Suggestion>,
    prefs: &HashMap<String, SuggestionPref>,
) -> SuggestionBoard {
    let (dismissed, visible) = suggestions
        .into_iter()
        .partition(|s| prefs.get(&s.id).is_some_and(|p| p.dismissed));
    SuggestionBoard { visible, dismissed }
}
