// Maintenance worker: prunes on its first tick and stops on shutdown

mod common;

use common::snapshot_at;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use swiftserve::config::HeatmapConfig;
use swiftserve::heatmap::HeatmapAggregator;
use swiftserve::metrics_repo::MetricsRepo;
use swiftserve::worker::{self, WorkerConfig, WorkerDeps};
use tempfile::TempDir;

#[tokio::test]
async fn worker_prunes_expired_snapshots_and_shuts_down() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("worker.db");
    let repo = Arc::new(MetricsRepo::connect(path.to_str().unwrap(), 1).await.unwrap());
    repo.init().await.unwrap();

    let now = swiftserve::clock::now_ms();
    let two_days = 2 * 24 * 60 * 60 * 1000;
    repo.save_snapshot(&snapshot_at(now - two_days, 4.0))
        .await
        .unwrap();
    repo.save_snapshot(&snapshot_at(now, 5.0)).await.unwrap();

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let handle = worker::spawn(
        WorkerDeps {
            metrics_repo: repo.clone(),
            heatmap: Arc::new(HeatmapAggregator::new(&HeatmapConfig::default())),
            ws_heatmap_connections: Arc::new(AtomicUsize::new(0)),
            shutdown_rx,
        },
        WorkerConfig {
            stats_log_interval_secs: 60,
            prune_interval_secs: 60,
        },
    );

    let deadline = tokio::time::Instant::now() + tokio::time::Duration::from_secs(3);
    loop {
        if repo.get_recent(10).await.unwrap().len() == 1 {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "worker did not prune in time"
        );
        tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
    }

    shutdown_tx.send(()).unwrap();
    tokio::time::timeout(tokio::time::Duration::from_secs(2), handle)
        .await
        .expect("worker should stop after shutdown")
        .unwrap();
}
