use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{HistoryPoint, Metric};

/// A read-only, column-oriented view over the most recent history rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryWindow {
    timestamps: Vec<DateTime<Utc>>,
    perclos: Vec<f64>,
    headpose: Vec<f64>,
    fatigue: Vec<f64>,
    stress: Vec<f64>,
    yawn_rate: Vec<f64>,
    gaze: Vec<f64>,
    near: Vec<f64>,
}

/// One chart's description: what it plots, how to label and scale it, and
/// the aggregates over the window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSummary {
    pub metric: Metric,
    pub label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub axis_max: Option<f64>,
    pub latest: f64,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

impl HistoryWindow {
    pub(super) fn from_points<'a>(points: impl Iterator<Item = &'a HistoryPoint>) -> Self {
        let mut window = Self::default();
        for point in points {
            window.timestamps.push(point.recorded_at);
            for metric in Metric::ALL {
                window.column_mut(metric).push(point.value(metric));
            }
        }
        window
    }

    fn column_mut(&mut self, metric: Metric) -> &mut Vec<f64> {
        match metric {
            Metric::Perclos => &mut self.perclos,
            Metric::Headpose => &mut self.headpose,
            Metric::Fatigue => &mut self.fatigue,
            Metric::Stress => &mut self.stress,
            Metric::YawnRate => &mut self.yawn_rate,
            Metric::Gaze => &mut self.gaze,
            Metric::Near => &mut self.near,
        }
    }

    pub fn series(&self, metric: Metric) -> &[f64] {
        match metric {
            Metric::Perclos => &self.perclos,
            Metric::Headpose => &self.headpose,
            Metric::Fatigue => &self.fatigue,
            Metric::Stress => &self.stress,
            Metric::YawnRate => &self.yawn_rate,
            Metric::Gaze => &self.gaze,
            Metric::Near => &self.near,
        }
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn summary(&self, metric: Metric) -> Option<MetricSummary> {
        let values = self.series(metric);
        let latest = *values.last()?;
        let (min, max, sum) = values.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY, 0.0),
            |(min, max, sum), &value| (min.min(value), max.max(value), sum + value),
        );

        Some(MetricSummary {
            metric,
            label: metric.label(),
            axis_max: metric.axis_max(),
            latest,
            mean: sum / values.len() as f64,
            min,
            max,
        })
    }

    /// Summaries for every metric, empty when the window is.
    pub fn summaries(&self) -> Vec<MetricSummary> {
        Metric::ALL
            .into_iter()
            .filter_map(|metric| self.summary(metric))
            .collect()
    }
}
