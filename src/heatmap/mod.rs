// Live traffic heatmap: aggregator state, grid math, and the two background tasks
// (stream reader + tick timer) that drive it.

pub mod aggregator;
pub mod grid;
mod stream;

pub use aggregator::{HeatmapAggregator, MessageError, parse_message};
pub use grid::IntensityGrid;

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{Duration, interval};

use crate::clock::now_ms;
use crate::config::HeatmapConfig;
use crate::models::HeatmapFrame;

/// Running aggregator with its background tasks. Dropping the service closes the shutdown
/// channel so the tasks exit on their own; [`HeatmapService::stop`] also waits for them.
pub struct HeatmapService {
    aggregator: Arc<HeatmapAggregator>,
    frames_tx: broadcast::Sender<HeatmapFrame>,
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl HeatmapService {
    /// Spawns the stream and tick tasks. With no endpoint nothing is spawned and the grid stays zero.
    pub fn start(config: &HeatmapConfig) -> Self {
        let aggregator = Arc::new(HeatmapAggregator::new(config));
        let (frames_tx, _) = broadcast::channel(config.broadcast_capacity);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut tasks = Vec::new();

        match &config.endpoint {
            Some(endpoint) => {
                tasks.push(tokio::spawn(stream::run_stream(
                    endpoint.clone(),
                    aggregator.clone(),
                    shutdown_rx.clone(),
                )));
                tasks.push(tokio::spawn(run_ticks(
                    aggregator.clone(),
                    frames_tx.clone(),
                    config.interval_ms,
                    shutdown_rx,
                )));
            }
            None => {
                tracing::info!("heatmap.endpoint not set; serving an all-zero grid");
            }
        }

        Self {
            aggregator,
            frames_tx,
            shutdown_tx,
            tasks,
        }
    }

    pub fn aggregator(&self) -> Arc<HeatmapAggregator> {
        self.aggregator.clone()
    }

    /// Sender side of the frame broadcast; WS handlers subscribe through it.
    pub fn frames(&self) -> broadcast::Sender<HeatmapFrame> {
        self.frames_tx.clone()
    }

    /// Closes the upstream socket, cancels the tick timer and waits for both tasks.
    pub async fn stop(self) {
        self.aggregator.shutdown();
        let _ = self.shutdown_tx.send(true);
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "heatmap task ended abnormally");
            }
        }
        tracing::debug!("heatmap service stopped");
    }
}

async fn run_ticks(
    aggregator: Arc<HeatmapAggregator>,
    frames_tx: broadcast::Sender<HeatmapFrame>,
    interval_ms: u64,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut tick = interval(Duration::from_millis(interval_ms));
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = tick.tick() => {
                let Some(frame) = aggregator.tick(now_ms()) else {
                    break;
                };
                // No receivers just means no /ws/heatmap clients right now.
                let _ = frames_tx.send(frame);
            }
            _ = shutdown_rx.changed() => break,
        }
    }
}
