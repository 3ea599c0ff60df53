// Domain models: metrics snapshots, heatmap points/frames, suggestions

mod heatmap;
mod metrics;
mod suggestion;

pub use heatmap::{HeatmapFrame, HeatmapMessage, HeatmapStats, PointEvent, PointSample};
pub use metrics::{MetricAverages, MetricsSnapshot, compute_averages, mean_present};
pub use suggestion::{Severity, Suggestion, SuggestionBoard, SuggestionPref};
