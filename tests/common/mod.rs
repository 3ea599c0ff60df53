// Shared test helpers

#![allow(dead_code)]

use swiftserve::config::AppConfig;
use swiftserve::models::MetricsSnapshot;

pub const MS_PER_MINUTE: f64 = 60_000.0;

pub const TEST_CONFIG: &str = r#"
[server]
port = 8081
host = "0.0.0.0"

[database]
path = "data/test.db"

[heatmap]
rows = 8
cols = 8
interval_ms = 20

[monitoring]
stats_log_interval_secs = 60
"#;

pub fn test_config_with_db(db_path: &str) -> AppConfig {
    let mut config = AppConfig::load_from_str(TEST_CONFIG).unwrap();
    config.database.path = db_path.to_string();
    config
}

/// Snapshot with queue/cook in minutes; everything else unset.
pub fn snapshot_minutes(queue_min: Option<f64>, cook_min: Option<f64>) -> MetricsSnapshot {
    MetricsSnapshot {
        queue_p50_wait_ms: queue_min.map(|m| m * MS_PER_MINUTE),
        cook_p50_ms: cook_min.map(|m| m * MS_PER_MINUTE),
        ..Default::default()
    }
}

pub fn snapshot_at(ts: i64, queue_min: f64) -> MetricsSnapshot {
    MetricsSnapshot {
        ts: Some(ts),
        ..snapshot_minutes(Some(queue_min), Some(3.0))
    }
}
