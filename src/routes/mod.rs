// HTTP + WebSocket routes

mod error;
mod http;
mod suggestions;
mod ws;

use axum::{
    Router,
    routing::{get, post, put},
};
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};

use crate::config::AppConfig;
use crate::heatmap::HeatmapAggregator;
use crate::metrics_repo::MetricsRepo;
use crate::models::HeatmapFrame;

pub use error::ApiError;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) heatmap: Arc<HeatmapAggregator>,
    pub(crate) frames_tx: broadcast::Sender<HeatmapFrame>,
    pub(crate) metrics_repo: Arc<MetricsRepo>,
    pub(crate) ws_heatmap_connections: Arc<AtomicUsize>,
    pub(crate) config: AppConfig,
}

pub fn app(
    heatmap: Arc<HeatmapAggregator>,
    frames_tx: broadcast::Sender<HeatmapFrame>,
    metrics_repo: Arc<MetricsRepo>,
    ws_heatmap_connections: Arc<AtomicUsize>,
    config: AppConfig,
) -> Router {
    let state = AppState {
        heatmap,
        frames_tx,
        metrics_repo,
        ws_heatmap_connections,
        config,
    };
    Router::new()
        .route("/", get(|| async { "SwiftServe line analytics" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/heatmap", get(http::heatmap_handler)) // GET /api/heatmap?blur=N
        .route("/api/heatmap/stats", get(http::heatmap_stats_handler)) // GET /api/heatmap/stats
        .route(
            "/api/metrics",
            get(http::list_metrics_handler).post(http::save_metrics_handler),
        ) // GET|POST /api/metrics
        .route("/api/suggestions", get(suggestions::board_handler)) // GET /api/suggestions
        .route(
            "/api/suggestions/evaluate",
            post(suggestions::evaluate_handler),
        ) // POST /api/suggestions/evaluate
        .route(
            "/api/suggestions/{id}/dismiss",
            post(suggestions::dismiss_handler),
        )
        .route(
            "/api/suggestions/{id}/restore",
            post(suggestions::restore_handler),
        )
        .route("/api/suggestions/{id}/note", put(suggestions::note_handler))
        .route("/ws/heatmap", get(ws::ws_heatmap)) // WS /ws/heatmap
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
