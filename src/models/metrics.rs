// Restaurant-operations metrics snapshot (one row of analytics_realtime)

use serde::{Deserialize, Serialize};

/// Point-in-time measurement of line operations. Durations are milliseconds.
/// Every measurement is optional so partial rows from the edge devices still load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsSnapshot {
    /// Row id, assigned by the repo on insert.
    pub id: Option<i64>,
    /// Capture time in epoch milliseconds; the repo stamps "now" when absent.
    pub ts: Option<i64>,
    #[serde(alias = "jetson_id")]
    pub camera_id: Option<i64>,
    pub queue_p50_wait_ms: Option<f64>,
    pub queue_p90_wait_ms: Option<f64>,
    pub cook_p50_ms: Option<f64>,
    pub assembly_p50_ms: Option<f64>,
    pub total_customer_wait_p50_ms: Option<f64>,
    pub after_order_avg_ms: Option<f64>,
    pub avg_queue_dwell_ms: Option<f64>,
    pub abandon_rate_pct: Option<f64>,
    pub queue_current_count: Option<f64>,
    pub orders_last_hour: Option<f64>,
    pub sessions_active: Option<f64>,
}

/// History averages per metric; `None` when no row carried a value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricAverages {
    pub queue_p50_wait_ms: Option<f64>,
    pub queue_p90_wait_ms: Option<f64>,
    pub cook_p50_ms: Option<f64>,
    pub assembly_p50_ms: Option<f64>,
    pub total_customer_wait_p50_ms: Option<f64>,
    pub after_order_avg_ms: Option<f64>,
    pub avg_queue_dwell_ms: Option<f64>,
    pub abandon_rate_pct: Option<f64>,
    pub queue_current_count: Option<f64>,
    pub orders_last_hour: Option<f64>,
}

/// Mean of the present, non-NaN values. Zero counts as a value.
pub fn mean_present<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let (sum, count) = values
        .into_iter()
        .flatten()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Per-metric averages over `rows`, skipping missing values.
pub fn compute_averages(rows: &[MetricsSnapshot]) -> MetricAverages {
    let mean = |get: fn(&MetricsSnapshot) -> Option<f64>| mean_present(rows.iter().map(get));
    MetricAverages {
        queue_p50_wait_ms: mean(|r| r.queue_p50_wait_ms),
        queue_p90_wait_ms: mean(|r| r.queue_p90_wait_ms),
        cook_p50_ms: mean(|r| r.cook_p50_ms),
        assembly_p50_ms: mean(|r| r.assembly_p50_ms),
        total_customer_wait_p50_ms: mean(|r| r.total_customer_wait_p50_ms),
        after_order_avg_ms: mean(|r| r.after_order_avg_ms),
        avg_queue_dwell_ms: mean(|r| r.avg_queue_dwell_ms),
        abandon_rate_pct: mean(|r| r.abandon_rate_pct),
        queue_current_count: mean(|r| r.queue_current_count),
        orders_last_hour: mean(|r| r.orders_last_hour),
    }
}
