use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub heatmap: HeatmapConfig,
    #[serde(default)]
    pub suggestions: SuggestionThresholds,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    /// How many recent snapshots feed the suggestion engine as history.
    #[serde(default = "default_max_history")]
    pub max_history: u32,
}

fn default_retention_days() -> u32 {
    7
}

fn default_max_history() -> u32 {
    288
}

/// Heatmap aggregator settings. Without `endpoint` the aggregator stays idle with an all-zero grid.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HeatmapConfig {
    pub endpoint: Option<String>,
    pub rows: usize,
    pub cols: usize,
    /// How long a received point stays eligible for binning.
    pub window_ms: u64,
    /// Tick period.
    pub interval_ms: u64,
    /// Per-tick multiplicative decay, strictly between 0 and 1.
    pub decay: f64,
    /// Max frames queued per /ws/heatmap client (slow clients may lag).
    pub broadcast_capacity: usize,
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            rows: 32,
            cols: 32,
            window_ms: 30_000,
            interval_ms: 300,
            decay: 0.92,
            broadcast_capacity: 16,
        }
    }
}

/// Rule thresholds for the suggestion engine. Minutes unless the name says otherwise.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SuggestionThresholds {
    /// Trailing window (samples) for trend deltas.
    pub window_size: usize,
    pub queue_warning_min: f64,
    pub queue_critical_min: f64,
    /// Queue rule also fires when the trailing delta exceeds this.
    pub queue_trend_delta_min: f64,
    pub cook_warning_min: f64,
    pub cook_critical_min: f64,
    pub abandon_warning_pct: f64,
    pub abandon_critical_pct: f64,
    /// Lower abandon bar that fires only while the queue is at warning level.
    pub abandon_elevated_pct: f64,
    /// Prep-ahead fires when orders/hr <= this fraction of the history average.
    pub prep_ahead_baseline_ratio: f64,
    /// Orders/hr bar used when there is no history average.
    pub prep_ahead_default_orders: f64,
    pub prep_ahead_max_queue_min: f64,
    /// Trend deltas smaller than this (absolute) are left out of descriptions.
    pub trend_display_min: f64,
}

impl Default for SuggestionThresholds {
    fn default() -> Self {
        Self {
            window_size: 6,
            queue_warning_min: 7.0,
            queue_critical_min: 11.0,
            queue_trend_delta_min: 1.25,
            cook_warning_min: 6.0,
            cook_critical_min: 8.0,
            abandon_warning_pct: 6.0,
            abandon_critical_pct: 7.0,
            abandon_elevated_pct: 4.0,
            prep_ahead_baseline_ratio: 0.6,
            prep_ahead_default_orders: 20.0,
            prep_ahead_max_queue_min: 5.0,
            trend_display_min: 0.25,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    /// How often to log app stats (ws_heatmap clients, ingest counters) at INFO level.
    pub stats_log_interval_secs: u64,
    /// How often to prune metrics older than database.retention_days.
    #[serde(default = "default_prune_interval_secs")]
    pub prune_interval_secs: u64,
}

fn default_prune_interval_secs() -> u64 {
    3600
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(
            self.database.retention_days > 0,
            "database.retention_days must be > 0, got {}",
            self.database.retention_days
        );
        anyhow::ensure!(
            self.database.max_history > 0,
            "database.max_history must be > 0, got {}",
            self.database.max_history
        );
        self.heatmap.validate()?;
        self.suggestions.validate()?;
        anyhow::ensure!(
            self.monitoring.stats_log_interval_secs > 0,
            "monitoring.stats_log_interval_secs must be > 0, got {}",
            self.monitoring.stats_log_interval_secs
        );
        anyhow::ensure!(
            self.monitoring.prune_interval_secs > 0,
            "monitoring.prune_interval_secs must be > 0, got {}",
            self.monitoring.prune_interval_secs
        );
        Ok(())
    }
}

impl HeatmapConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(endpoint) = &self.endpoint {
            anyhow::ensure!(
                endpoint.starts_with("ws://") || endpoint.starts_with("wss://"),
                "heatmap.endpoint must be a ws:// or wss:// URL, got {}",
                endpoint
            );
        }
        anyhow::ensure!(
            self.rows > 0,
            "heatmap.rows must be > 0, got {}",
            self.rows
        );
        anyhow::ensure!(
            self.cols > 0,
            "heatmap.cols must be > 0, got {}",
            self.cols
        );
        anyhow::ensure!(
            self.window_ms > 0,
            "heatmap.window_ms must be > 0, got {}",
            self.window_ms
        );
        anyhow::ensure!(
            self.interval_ms > 0,
            "heatmap.interval_ms must be > 0, got {}",
            self.interval_ms
        );
        anyhow::ensure!(
            self.decay > 0.0 && self.decay < 1.0,
            "heatmap.decay must be in (0, 1), got {}",
            self.decay
        );
        anyhow::ensure!(
            self.broadcast_capacity > 0,
            "heatmap.broadcast_capacity must be > 0, got {}",
            self.broadcast_capacity
        );
        Ok(())
    }
}

impl SuggestionThresholds {
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.window_size > 0,
            "suggestions.window_size must be > 0, got {}",
            self.window_size
        );
        anyhow::ensure!(
            self.queue_critical_min >= self.queue_warning_min,
            "suggestions.queue_critical_min ({}) must be >= queue_warning_min ({})",
            self.queue_critical_min,
            self.queue_warning_min
        );
        anyhow::ensure!(
            self.cook_critical_min >= self.cook_warning_min,
            "suggestions.cook_critical_min ({}) must be >= cook_warning_min ({})",
            self.cook_critical_min,
            self.cook_warning_min
        );
        anyhow::ensure!(
            self.abandon_critical_pct >= self.abandon_warning_pct,
            "suggestions.abandon_critical_pct ({}) must be >= abandon_warning_pct ({})",
            self.abandon_critical_pct,
            self.abandon_warning_pct
        );
        anyhow::ensure!(
            self.prep_ahead_baseline_ratio > 0.0,
            "suggestions.prep_ahead_baseline_ratio must be > 0, got {}",
            self.prep_ahead_baseline_ratio
        );
        Ok(())
    }
}
