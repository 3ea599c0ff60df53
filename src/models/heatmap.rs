// Heatmap wire types: inbound point messages, stored point events, outbound frames

use serde::{Deserialize, Serialize};

/// One point as sent by the camera pipeline. Coordinates are fractions of frame width/height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointSample {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub value: Option<f64>,
}

/// Inbound stream message. Either shape may carry extra keys; `points` wins when both are present.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum HeatmapMessage {
    Points { points: Vec<PointSample> },
    Tracks { tracks: Vec<PointSample> },
}

impl HeatmapMessage {
    pub fn into_samples(self) -> Vec<PointSample> {
        match self {
            HeatmapMessage::Points { points } => points,
            HeatmapMessage::Tracks { tracks } => tracks,
        }
    }
}

/// A point held in the sliding window. `received_at` is stamped on ingestion (epoch ms).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointEvent {
    pub x: f64,
    pub y: f64,
    pub value: f64,
    pub received_at: i64,
}

impl PointEvent {
    /// Weight defaults to 1 when the sample has none.
    pub fn from_sample(sample: PointSample, received_at: i64) -> Self {
        Self {
            x: sample.x,
            y: sample.y,
            value: sample.value.unwrap_or(1.0),
            received_at,
        }
    }
}

/// Grid as seen by readers: result of the most recent completed tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapFrame {
    pub connected: bool,
    pub rows: usize,
    pub cols: usize,
    pub grid: Vec<Vec<f64>>,
    /// Epoch ms of the tick that produced this grid; 0 before the first tick.
    pub updated_at: i64,
}

/// Ingestion counters for GET /api/heatmap/stats and the periodic stats log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapStats {
    pub connected: bool,
    pub messages_accepted: u64,
    pub messages_rejected: u64,
    pub points_ingested: u64,
    pub points_buffered: usize,
    pub ticks: u64,
}
