// Upstream point stream: one WebSocket connection, no automatic reconnect.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::USER_AGENT;

use super::aggregator::HeatmapAggregator;
use crate::clock::now_ms;
use crate::version::user_agent;

/// Connects to `endpoint` and feeds every text/binary frame to the aggregator until the
/// peer closes, the socket errors, or shutdown is signalled. `connected` tracks the socket.
pub(super) async fn run_stream(
    endpoint: String,
    aggregator: Arc<HeatmapAggregator>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let request = match build_request(&endpoint) {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(error = %e, endpoint = %endpoint, "invalid heatmap endpoint");
            return;
        }
    };

    let connect = tokio::select! {
        result = tokio_tungstenite::connect_async(request) => result,
        _ = shutdown_rx.changed() => return,
    };
    let ws = match connect {
        Ok((ws, _response)) => ws,
        Err(e) => {
            tracing::warn!(
                error = %e,
                endpoint = %endpoint,
                operation = "connect_heatmap_stream",
                "heatmap stream connect failed; grid will only decay"
            );
            aggregator.set_connected(false);
            return;
        }
    };
    aggregator.set_connected(true);
    tracing::info!(endpoint = %endpoint, "heatmap stream connected");

    let (mut sink, mut source) = ws.split();
    loop {
        tokio::select! {
            msg = source.next() => {
                let result = match msg {
                    Some(Ok(Message::Text(text))) => aggregator.ingest_text(text.as_str(), now_ms()),
                    Some(Ok(Message::Binary(bytes))) => aggregator.ingest_bytes(&bytes, now_ms()),
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::info!(endpoint = %endpoint, "heatmap stream closed by peer");
                        break;
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, endpoint = %endpoint, "heatmap stream error");
                        break;
                    }
                };
                if let Err(e) = result {
                    tracing::debug!(error = %e, "dropped malformed heatmap message");
                }
            }
            _ = shutdown_rx.changed() => {
                let _ = sink.send(Message::Close(None)).await;
                break;
            }
        }
    }
    aggregator.set_connected(false);
    // TODO: reconnect with backoff once product decides whether the polling fallback is enough.
}

fn build_request(
    endpoint: &str,
) -> anyhow::Result<tokio_tungstenite::tungstenite::handshake::client::Request> {
    let mut request = endpoint.into_client_request()?;
    request
        .headers_mut()
        .insert(USER_AGENT, HeaderValue::from_str(&user_agent())?);
    Ok(request)
}
