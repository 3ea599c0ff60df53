// GET/POST handlers: version, heatmap, metrics

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;

use super::{AppState, ApiError};
use crate::models::{HeatmapFrame, MetricsSnapshot};
use crate::version::{NAME, VERSION};

/// Blur passes beyond this stop changing a 32x32 grid meaningfully.
const MAX_BLUR_PASSES: usize = 8;

/// GET /version — returns service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

#[derive(Debug, Deserialize)]
pub(super) struct HeatmapQuery {
    #[serde(default)]
    blur: usize,
}

/// GET /api/heatmap — current frame; `?blur=N` smooths the grid with N box-blur passes.
pub(super) async fn heatmap_handler(
    State(state): State<AppState>,
    Query(q): Query<HeatmapQuery>,
) -> Result<Json<HeatmapFrame>, ApiError> {
    if q.blur > MAX_BLUR_PASSES {
        return Err(ApiError::BadRequest(format!(
            "blur must be <= {}, got {}",
            MAX_BLUR_PASSES, q.blur
        )));
    }
    let mut frame = state.heatmap.frame();
    if q.blur > 0 {
        frame.grid = state.heatmap.grid().box_blur(q.blur).to_rows();
    }
    Ok(Json(frame))
}

/// GET /api/heatmap/stats — ingest counters and connection flag.
pub(super) async fn heatmap_stats_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.heatmap.stats())
}

#[derive(Debug, Deserialize)]
pub(super) struct MetricsQuery {
    limit: Option<u32>,
}

/// GET /api/metrics — recent snapshots, oldest first.
pub(super) async fn list_metrics_handler(
    State(state): State<AppState>,
    Query(q): Query<MetricsQuery>,
) -> Result<Json<Vec<MetricsSnapshot>>, ApiError> {
    let max = state.config.database.max_history;
    let limit = q.limit.unwrap_or(max).min(max);
    Ok(Json(state.metrics_repo.get_recent(limit).await?))
}

/// POST /api/metrics — stores one snapshot, returns `{ "id": ... }`.
pub(super) async fn save_metrics_handler(
    State(state): State<AppState>,
    Json(snapshot): Json<MetricsSnapshot>,
) -> Result<impl IntoResponse, ApiError> {
    let id = state.metrics_repo.save_snapshot(&snapshot).await?;
    tracing::debug!(id, "metrics snapshot saved");
    Ok(Json(serde_json::json!({ "id": id })))
}
