// Decaying heatmap aggregator: point window + intensity grid behind one mutex.
// The stream task ingests and the tick task decays/bins; both may run on any worker thread.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use thiserror::Error;

use super::grid::IntensityGrid;
use crate::config::HeatmapConfig;
use crate::models::{HeatmapFrame, HeatmapMessage, HeatmapStats, PointEvent};

/// Upper bound on buffered points; oldest are evicted first when a burst overruns it.
pub const MAX_BUFFERED_POINTS: usize = 100_000;

/// Why an inbound message was dropped. Logged at debug, never returned to stream peers.
#[derive(Debug, Error)]
pub enum MessageError {
    #[error("invalid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),
    #[error("expected an object with a `points` or `tracks` array")]
    UnknownShape,
    #[error("binary frame is not UTF-8")]
    NotUtf8,
}

struct AggregatorState {
    points: VecDeque<PointEvent>,
    grid: IntensityGrid,
    updated_at: i64,
    /// Cleared on shutdown; ticks after that leave the grid alone.
    live: bool,
}

pub struct HeatmapAggregator {
    rows: usize,
    cols: usize,
    window_ms: i64,
    decay: f64,
    state: Mutex<AggregatorState>,
    connected: AtomicBool,
    messages_accepted: AtomicU64,
    messages_rejected: AtomicU64,
    points_ingested: AtomicU64,
    ticks: AtomicU64,
}

impl HeatmapAggregator {
    pub fn new(config: &HeatmapConfig) -> Self {
        Self {
            rows: config.rows,
            cols: config.cols,
            window_ms: config.window_ms as i64,
            decay: config.decay,
            state: Mutex::new(AggregatorState {
                points: VecDeque::new(),
                grid: IntensityGrid::new(config.rows, config.cols),
                updated_at: 0,
                live: true,
            }),
            connected: AtomicBool::new(false),
            messages_accepted: AtomicU64::new(0),
            messages_rejected: AtomicU64::new(0),
            points_ingested: AtomicU64::new(0),
            ticks: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, AggregatorState> {
        // A panic mid-tick leaves at worst a partially decayed grid; keep serving it.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Relaxed);
    }

    pub fn is_live(&self) -> bool {
        self.lock().live
    }

    /// Parses one text frame and buffers its points. Returns the number of points buffered.
    pub fn ingest_text(&self, text: &str, now_ms: i64) -> Result<usize, MessageError> {
        match parse_message(text) {
            Ok(msg) => Ok(self.ingest(msg, now_ms)),
            Err(e) => {
                self.record_rejected();
                Err(e)
            }
        }
    }

    pub fn ingest_bytes(&self, bytes: &[u8], now_ms: i64) -> Result<usize, MessageError> {
        match std::str::from_utf8(bytes) {
            Ok(text) => self.ingest_text(text, now_ms),
            Err(_) => {
                self.record_rejected();
                Err(MessageError::NotUtf8)
            }
        }
    }

    fn record_rejected(&self) {
        self.messages_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Buffers every sample of `msg` stamped with `now_ms`. Negative or NaN weights are skipped.
    pub fn ingest(&self, msg: HeatmapMessage, now_ms: i64) -> usize {
        let events: Vec<PointEvent> = msg
            .into_samples()
            .into_iter()
            .map(|s| PointEvent::from_sample(s, now_ms))
            .filter(|p| p.value >= 0.0)
            .collect();
        let n = events.len();
        {
            let mut state = self.lock();
            if !state.live {
                return 0;
            }
            state.points.extend(events);
            let overflow = state.points.len().saturating_sub(MAX_BUFFERED_POINTS);
            if overflow > 0 {
                state.points.drain(..overflow);
                tracing::debug!(evicted = overflow, "heatmap point buffer full");
            }
        }
        self.messages_accepted.fetch_add(1, Ordering::Relaxed);
        self.points_ingested.fetch_add(n as u64, Ordering::Relaxed);
        n
    }

    /// One recompute step: prune the window, decay, then add freshly binned points.
    /// Returns the resulting frame, or `None` once the aggregator has been shut down.
    pub fn tick(&self, now_ms: i64) -> Option<HeatmapFrame> {
        let mut state = self.lock();
        if !state.live {
            return None;
        }
        let cutoff = now_ms - self.window_ms;
        state.points.retain(|p| p.received_at > cutoff);

        state.grid.decay(self.decay);
        let binned = IntensityGrid::bin_points(
            state.points.iter().map(|p| (p.x, p.y, p.value)),
            self.rows,
            self.cols,
        );
        state.grid.accumulate(&binned);
        state.updated_at = now_ms;
        self.ticks.fetch_add(1, Ordering::Relaxed);

        Some(self.frame_from(&state))
    }

    /// Current grid and connection flag, as of the most recent completed tick.
    pub fn frame(&self) -> HeatmapFrame {
        let state = self.lock();
        self.frame_from(&state)
    }

    /// Copy of the current grid (for blur/normalization on read).
    pub fn grid(&self) -> IntensityGrid {
        self.lock().grid.clone()
    }

    fn frame_from(&self, state: &AggregatorState) -> HeatmapFrame {
        HeatmapFrame {
            connected: self.is_connected(),
            rows: self.rows,
            cols: self.cols,
            grid: state.grid.to_rows(),
            updated_at: state.updated_at,
        }
    }

    pub fn stats(&self) -> HeatmapStats {
        let points_buffered = self.lock().points.len();
        HeatmapStats {
            connected: self.is_connected(),
            messages_accepted: self.messages_accepted.load(Ordering::Relaxed),
            messages_rejected: self.messages_rejected.load(Ordering::Relaxed),
            points_ingested: self.points_ingested.load(Ordering::Relaxed),
            points_buffered,
            ticks: self.ticks.load(Ordering::Relaxed),
        }
    }

    /// Stops accepting points and ticks. Taken under the state lock, so no tick in flight
    /// can touch the grid after this returns.
    pub fn shutdown(&self) {
        let mut state = self.lock();
        state.live = false;
        state.points.clear();
        self.set_connected(false);
    }
}

/// Decodes an inbound stream message into one of the two known shapes.
pub fn parse_message(text: &str) -> Result<HeatmapMessage, MessageError> {
    let value: serde_json::Value = serde_json::from_str(text).map_err(MessageError::InvalidJson)?;
    serde_json::from_value(value).map_err(|_| MessageError::UnknownShape)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_message_accepts_both_shapes() {
        let m = parse_message(r#"{"points":[{"x":0.1,"y":0.2}]}"#).unwrap();
        assert!(matches!(m, HeatmapMessage::Points { ref points } if points.len() == 1));
        let m = parse_message(r#"{"tracks":[{"x":0.1,"y":0.2,"value":3}],"frame":7}"#).unwrap();
        assert!(matches!(m, HeatmapMessage::Tracks { ref tracks } if tracks[0].value == Some(3.0)));
    }

    #[test]
    fn parse_message_rejects_unknown_and_invalid() {
        assert!(matches!(
            parse_message("not json"),
            Err(MessageError::InvalidJson(_))
        ));
        assert!(matches!(
            parse_message(r#"{"boxes":[]}"#),
            Err(MessageError::UnknownShape)
        ));
        assert!(matches!(
            parse_message(r#"{"points":"nope"}"#),
            Err(MessageError::UnknownShape)
        ));
        assert!(matches!(
            parse_message(r#"[1,2,3]"#),
            Err(MessageError::UnknownShape)
        ));
    }
}
