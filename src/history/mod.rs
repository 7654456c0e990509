mod window;

pub use window::{HistoryWindow, MetricSummary};

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::MeasurementSnapshot;

pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// The seven tracked series, in chart order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Metric {
    Perclos,
    Headpose,
    Fatigue,
    Stress,
    YawnRate,
    Gaze,
    Near,
}

impl Metric {
    pub const ALL: [Metric; 7] = [
        Metric::Perclos,
        Metric::Headpose,
        Metric::Fatigue,
        Metric::Stress,
        Metric::YawnRate,
        Metric::Gaze,
        Metric::Near,
    ];

    fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            Metric::Perclos => "PERCLOS",
            Metric::Headpose => "Headpose variance",
            Metric::Fatigue => "Fatigue",
            Metric::Stress => "Stress",
            Metric::YawnRate => "Yawns / min",
            Metric::Gaze => "Gaze on screen",
            Metric::Near => "Near work",
        }
    }

    /// Fixed upper bound of the chart axis, when the metric has one.
    pub fn axis_max(self) -> Option<f64> {
        match self {
            Metric::Perclos | Metric::Gaze => Some(1.0),
            Metric::Fatigue | Metric::Stress => Some(100.0),
            Metric::Headpose | Metric::YawnRate | Metric::Near => None,
        }
    }
}

/// One history row: every tracked value of a single snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPoint {
    pub recorded_at: DateTime<Utc>,
    values: [f64; 7],
}

impl HistoryPoint {
    pub fn from_snapshot(snapshot: &MeasurementSnapshot) -> Self {
        let mut values = [0.0; 7];
        values[Metric::Perclos.index()] = snapshot.features.perclos;
        values[Metric::Headpose.index()] = snapshot.features.headpose_var;
        values[Metric::Fatigue.index()] = snapshot.indices.fatigue;
        values[Metric::Stress.index()] = snapshot.indices.stress;
        values[Metric::YawnRate.index()] = snapshot.features.yawn_rate_min;
        values[Metric::Gaze.index()] = snapshot.features.gaze_on_pct;
        values[Metric::Near.index()] = snapshot.features.near_work;

        Self {
            recorded_at: snapshot.received_at,
            values,
        }
    }

    pub fn value(&self, metric: Metric) -> f64 {
        self.values[metric.index()]
    }
}

/// Fixed-capacity, arrival-ordered telemetry history.
///
/// Rows are stored whole, so the per-metric series derived from them always
/// share one length and one index space. Eviction drops the oldest row.
#[derive(Debug, Clone)]
pub struct TelemetryHistory {
    points: VecDeque<HistoryPoint>,
    capacity: usize,
}

impl Default for TelemetryHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

impl TelemetryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            points: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    pub fn append(&mut self, snapshot: &MeasurementSnapshot) {
        self.points.push_back(HistoryPoint::from_snapshot(snapshot));

        while self.points.len() > self.capacity {
            self.points.pop_front();
        }
    }

    /// The most recent `min(n, len)` rows as index-aligned series.
    pub fn window(&self, n: usize) -> HistoryWindow {
        let skip = self.points.len().saturating_sub(n);
        HistoryWindow::from_points(self.points.iter().skip(skip))
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn latest(&self) -> Option<&HistoryPoint> {
        self.points.back()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
