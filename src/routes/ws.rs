// WebSocket handler: push heatmap frames to dashboard clients

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use bytes::Bytes;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use tokio::sync::broadcast;
use tokio::time::{Duration, timeout};

use super::AppState;
use crate::heatmap::HeatmapAggregator;
use crate::models::HeatmapFrame;

pub(super) const WS_PING_INTERVAL: Duration = Duration::from_secs(30);
pub(super) const WS_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Decrements ws_heatmap connection count on drop (connect = +1, drop = -1).
struct WsHeatmapGuard(Arc<AtomicUsize>);

impl Drop for WsHeatmapGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, std::sync::atomic::Ordering::Relaxed);
    }
}

pub(super) async fn ws_heatmap(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let tx = state.frames_tx.clone();
    let conn_count = state.ws_heatmap_connections.clone();
    let heatmap = state.heatmap.clone();
    ws.on_upgrade(move |socket| async move {
        let mut rx = tx.subscribe();
        if let Err(e) = stream_heatmap(socket, &mut rx, conn_count, heatmap).await {
            tracing::info!("Heatmap stream error: {}", e);
        }
    })
}

async fn send_frame(socket: &mut WebSocket, frame: &HeatmapFrame) -> anyhow::Result<bool> {
    let json = serde_json::to_string(frame)?;
    let r = timeout(WS_SEND_TIMEOUT, socket.send(Message::Text(json.into()))).await;
    Ok(matches!(r, Ok(Ok(()))))
}

async fn stream_heatmap(
    mut socket: WebSocket,
    rx: &mut broadcast::Receiver<HeatmapFrame>,
    conn_count: Arc<AtomicUsize>,
    heatmap: Arc<HeatmapAggregator>,
) -> anyhow::Result<()> {
    conn_count.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    let _guard = WsHeatmapGuard(conn_count);
    tracing::info!("Client connected to heatmap stream");

    // Current grid first so idle/disconnected aggregators still render something.
    if !send_frame(&mut socket, &heatmap.frame()).await? {
        return Ok(());
    }

    let mut ping_interval =
        tokio::time::interval_at(tokio::time::Instant::now() + WS_PING_INTERVAL, WS_PING_INTERVAL);
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(frame) => {
                        if !send_frame(&mut socket, &frame).await? {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("WebSocket /ws/heatmap client lagged, skipped {} frames", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            _ = ping_interval.tick() => {
                let r = timeout(WS_SEND_TIMEOUT, socket.send(Message::Ping(Bytes::new()))).await;
                if !matches!(r, Ok(Ok(()))) {
                    break;
                }
            }
        }
    }
    Ok(())
}
