// Background maintenance worker: prunes old metrics and logs app stats.
// Heatmap ticking lives in heatmap::HeatmapService; this loop never touches the grid.

use crate::clock::format_duration;
use crate::heatmap::HeatmapAggregator;
use crate::metrics_repo::MetricsRepo;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::time::{Duration, interval};

/// Repos, shared counters, and shutdown for the worker.
pub struct WorkerDeps {
    pub metrics_repo: Arc<MetricsRepo>,
    pub heatmap: Arc<HeatmapAggregator>,
    pub ws_heatmap_connections: Arc<AtomicUsize>,
    pub shutdown_rx: tokio::sync::oneshot::Receiver<()>,
}

/// Real-time intervals for the worker's two jobs.
pub struct WorkerConfig {
    /// How often to log app stats (real seconds).
    pub stats_log_interval_secs: u64,
    /// How often to prune old metrics (real seconds).
    pub prune_interval_secs: u64,
}

pub fn spawn(deps: WorkerDeps, config: WorkerConfig) -> tokio::task::JoinHandle<()> {
    let WorkerDeps {
        metrics_repo,
        heatmap,
        ws_heatmap_connections,
        mut shutdown_rx,
    } = deps;
    let WorkerConfig {
        stats_log_interval_secs,
        prune_interval_secs,
    } = config;

    tokio::spawn(async move {
        let mut stats_log_tick = interval(Duration::from_secs(stats_log_interval_secs));
        stats_log_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut prune_tick = interval(Duration::from_secs(prune_interval_secs));
        prune_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let mut snapshots_pruned_total: u64 = 0;

        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    tracing::debug!("Worker shutting down");
                    break;
                }
                _ = stats_log_tick.tick() => {
                    let stats = heatmap.stats();
                    let latest_queue_wait = match metrics_repo.get_latest().await {
                        Ok(latest) => format_duration(latest.and_then(|s| s.queue_p50_wait_ms)),
                        Err(e) => {
                            tracing::warn!(error = %e, operation = "get_latest", "Failed to read latest metrics");
                            format_duration(None)
                        }
                    };
                    tracing::info!(
                        ws_heatmap_clients = ws_heatmap_connections.load(Ordering::Relaxed),
                        heatmap_connected = stats.connected,
                        messages_accepted = stats.messages_accepted,
                        messages_rejected = stats.messages_rejected,
                        points_buffered = stats.points_buffered,
                        latest_queue_wait = %latest_queue_wait,
                        snapshots_pruned_total,
                        "app stats"
                    );
                }
                _ = prune_tick.tick() => {
                    match metrics_repo.prune_old_data().await {
                        Ok(n) => {
                            tracing::debug!(operation = "prune_old_data", pruned = n, "Old metrics pruned");
                            snapshots_pruned_total += n;
                        }
                        Err(e) => {
                            tracing::warn!(
                                error = %e,
                                operation = "prune_old_data",
                                "Failed to prune old metrics"
                            );
                        }
                    }
                }
            }
        }
    })
}
