// Integration tests: HTTP and WebSocket endpoints

mod common;

use axum_test::TestServer;
use common::{MS_PER_MINUTE, snapshot_at, test_config_with_db};
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use swiftserve::heatmap::HeatmapAggregator;
use swiftserve::metrics_repo::MetricsRepo;
use swiftserve::models::{HeatmapFrame, HeatmapStats, MetricsSnapshot, Suggestion, SuggestionBoard};
use swiftserve::routes;
use tempfile::TempDir;
use tokio::sync::broadcast;

struct TestApp {
    app: axum::Router,
    heatmap: Arc<HeatmapAggregator>,
    frames_tx: broadcast::Sender<HeatmapFrame>,
    repo: Arc<MetricsRepo>,
    _dir: TempDir,
}

async fn test_app() -> TestApp {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("test.db");
    let config = test_config_with_db(db_path.to_str().unwrap());
    let repo = Arc::new(
        MetricsRepo::connect(&config.database.path, config.database.retention_days)
            .await
            .unwrap(),
    );
    repo.init().await.unwrap();
    let heatmap = Arc::new(HeatmapAggregator::new(&config.heatmap));
    let (frames_tx, _) = broadcast::channel(config.heatmap.broadcast_capacity);
    let app = routes::app(
        heatmap.clone(),
        frames_tx.clone(),
        repo.clone(),
        Arc::new(AtomicUsize::new(0)),
        config,
    );
    TestApp {
        app,
        heatmap,
        frames_tx,
        repo,
        _dir: dir,
    }
}

#[tokio::test]
async fn test_root_endpoint() {
    let t = test_app().await;
    let server = TestServer::new(t.app);
    let response = server.get("/").await;
    response.assert_status_ok();
    response.assert_text("SwiftServe line analytics");
}

#[tokio::test]
async fn test_version_endpoint() {
    let t = test_app().await;
    let server = TestServer::new(t.app);
    let response = server.get("/version").await;
    response.assert_status_ok();
    let json: serde_json::Value = response.json();
    assert_eq!(
        json.get("name").and_then(|v| v.as_str()),
        Some("swiftserve")
    );
    assert!(json.get("version").and_then(|v| v.as_str()).is_some());
}

#[tokio::test]
async fn test_heatmap_endpoint_returns_current_grid() {
    let t = test_app().await;
    t.heatmap
        .ingest_text(r#"{"points":[{"x":0.5,"y":0.5,"value":9}]}"#, 0)
        .unwrap();
    t.heatmap.tick(1);
    let server = TestServer::new(t.app);

    let frame: HeatmapFrame = server.get("/api/heatmap").await.json();
    assert!(!frame.connected);
    assert_eq!((frame.rows, frame.cols), (8, 8));
    // 8x8 grid: round(0.5 * 7) = 4
    assert_eq!(frame.grid[4][4], 9.0);
    assert_eq!(frame.updated_at, 1);

    let blurred: HeatmapFrame = server
        .get("/api/heatmap")
        .add_query_param("blur", 1)
        .await
        .json();
    assert_eq!(blurred.grid[4][4], 1.0);
    assert_eq!(blurred.grid[3][3], 1.0);
    assert_eq!(blurred.grid[0][0], 0.0);

    let response = server.get("/api/heatmap").add_query_param("blur", 99).await;
    response.assert_status_bad_request();
}

#[tokio::test]
async fn test_heatmap_stats_endpoint() {
    let t = test_app().await;
    let _ = t.heatmap.ingest_text("nope", 0);
    let server = TestServer::new(t.app);
    let stats: HeatmapStats = server.get("/api/heatmap/stats").await.json();
    assert_eq!(stats.messages_rejected, 1);
    assert!(!stats.connected);
}

#[tokio::test]
async fn test_metrics_post_then_list() {
    let t = test_app().await;
    let server = TestServer::new(t.app);
    let now = swiftserve::clock::now_ms();
    for (i, q) in [2.0, 4.0, 6.0].into_iter().enumerate() {
        let response = server
            .post("/api/metrics")
            .json(&snapshot_at(now + i as i64, q))
            .await;
        response.assert_status_ok();
        let json: serde_json::Value = response.json();
        assert!(json["id"].as_i64().is_some());
    }
    let all: Vec<MetricsSnapshot> = server.get("/api/metrics").await.json();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].queue_p50_wait_ms, Some(2.0 * MS_PER_MINUTE));

    let last: Vec<MetricsSnapshot> = server
        .get("/api/metrics")
        .add_query_param("limit", 1)
        .await
        .json();
    assert_eq!(last.len(), 1);
    assert_eq!(last[0].queue_p50_wait_ms, Some(6.0 * MS_PER_MINUTE));
}

#[tokio::test]
async fn test_evaluate_endpoint_is_pure() {
    let t = test_app().await;
    let server = TestServer::new(t.app);
    let body = serde_json::json!({
        "latest": { "queue_p50_wait_ms": 720000, "queue_current_count": 15 },
        "history": []
    });
    let out: Vec<Suggestion> = server
        .post("/api/suggestions/evaluate")
        .json(&body)
        .await
        .json();
    assert_eq!(out[0].id, "queue-time");

    let empty: Vec<Suggestion> = server
        .post("/api/suggestions/evaluate")
        .json(&serde_json::json!({ "latest": null, "history": null }))
        .await
        .json();
    assert!(empty.is_empty());
}

#[tokio::test]
async fn test_suggestion_board_uses_stored_metrics_and_prefs() {
    let t = test_app().await;
    let now = swiftserve::clock::now_ms();
    t.repo
        .save_snapshot(&MetricsSnapshot {
            abandon_rate_pct: Some(8.0),
            ..snapshot_at(now, 12.0)
        })
        .await
        .unwrap();
    let server = TestServer::new(t.app);

    let board: SuggestionBoard = server.get("/api/suggestions").await.json();
    let visible: Vec<&str> = board.visible.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(visible, vec!["queue-time", "abandon-rate"]);
    assert!(board.dismissed.is_empty());

    server
        .post("/api/suggestions/queue-time/dismiss")
        .await
        .assert_status_ok();
    let response = server
        .put("/api/suggestions/queue-time/note")
        .json(&serde_json::json!({ "note": "second register opened" }))
        .await;
    response.assert_status_ok();
    let pref: serde_json::Value = response.json();
    assert_eq!(pref["dismissed"], true);
    assert_eq!(pref["note"], "second register opened");

    let board: SuggestionBoard = server.get("/api/suggestions").await.json();
    assert_eq!(board.visible.len(), 1);
    assert_eq!(board.dismissed[0].id, "queue-time");

    server
        .post("/api/suggestions/queue-time/restore")
        .await
        .assert_status_ok();
    let board: SuggestionBoard = server.get("/api/suggestions").await.json();
    assert_eq!(board.visible.len(), 2);
}

#[tokio::test]
async fn test_suggestion_pref_rejects_bad_id() {
    let t = test_app().await;
    let server = TestServer::new(t.app);
    server
        .post("/api/suggestions/bad%20id/dismiss")
        .await
        .assert_status_bad_request();
}

// --- WebSocket message tests (require http_transport + ws feature) ---
// Receive until we get valid JSON (server may send Ping first).

async fn receive_first_json_text<T: serde::de::DeserializeOwned>(
    ws: &mut axum_test::TestWebSocket,
) -> T {
    let deadline = tokio::time::Instant::now() + tokio::time::Duration::from_secs(3);
    loop {
        let text = ws.receive_text().await;
        if let Ok(v) = serde_json::from_str::<T>(&text) {
            return v;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for JSON"
        );
    }
}

#[tokio::test]
async fn test_ws_heatmap_sends_current_then_broadcast_frames() {
    let t = test_app().await;
    let frames_tx = t.frames_tx.clone();
    let server = TestServer::builder().http_transport().build(t.app);
    let mut ws = server
        .get_websocket("/ws/heatmap")
        .await
        .into_websocket()
        .await;

    let first: HeatmapFrame = receive_first_json_text(&mut ws).await;
    assert_eq!(first.updated_at, 0);
    assert!(first.grid.iter().flatten().all(|&v| v == 0.0));

    let pushed = HeatmapFrame {
        connected: true,
        rows: 1,
        cols: 2,
        grid: vec![vec![0.5, 2.0]],
        updated_at: 42,
    };
    let pushed_clone = pushed.clone();
    tokio::spawn(async move {
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
        let _ = frames_tx.send(pushed_clone);
    });
    let received: HeatmapFrame = receive_first_json_text(&mut ws).await;
    assert_eq!(received, pushed);
}
