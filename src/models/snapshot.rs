//! Telemetry snapshot models.
//!
//! The wire types mirror the JSON pushed over `/ws` (snake_case keys, every
//! field optional). A [`MeasurementSnapshot`] is the receiver-side record built
//! from one such message and is never mutated afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Accepts a missing, `null` or present value, falling back to `T::default()`.
fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Features {
    #[serde(deserialize_with = "or_default")]
    pub perclos: f64,
    #[serde(deserialize_with = "or_default")]
    pub yawn_rate_min: f64,
    #[serde(deserialize_with = "or_default")]
    pub posture_angle_norm: f64,
    #[serde(deserialize_with = "or_default")]
    pub headpose_var: f64,
    #[serde(deserialize_with = "or_default")]
    pub gaze_on_pct: f64,
    #[serde(deserialize_with = "or_default")]
    pub near_work: f64,
    #[serde(deserialize_with = "or_default")]
    pub distance_cm: f64,
}

/// Derived scores, nominally 0-100.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Indices {
    #[serde(deserialize_with = "or_default")]
    pub fatigue: f64,
    #[serde(deserialize_with = "or_default")]
    pub stress: f64,
}

/// Event counters since the server started streaming. Never decrease.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Cumulative {
    #[serde(deserialize_with = "or_default")]
    pub blink_count: u64,
    #[serde(deserialize_with = "or_default")]
    pub yawn_count: u64,
    #[serde(deserialize_with = "or_default")]
    pub nodding_count: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameQuality {
    #[serde(deserialize_with = "or_default")]
    pub lighting: f64,
    #[serde(deserialize_with = "or_default")]
    pub fps: f64,
    #[serde(deserialize_with = "or_default")]
    pub occlusion: f64,
}

/// One raw message from the telemetry stream.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamMessage {
    pub features: Option<Features>,
    pub indices: Option<Indices>,
    pub cumulative: Option<Cumulative>,
    pub frame_b64: Option<String>,
    #[serde(default, deserialize_with = "or_default")]
    pub detect_enabled: bool,
    pub quality: Option<FrameQuality>,
    pub camera_error: Option<String>,
}

impl StreamMessage {
    /// Whether the message carries measurements, as opposed to a bare status
    /// notice such as a camera failure.
    pub fn is_measurement(&self) -> bool {
        self.features.is_some() || self.indices.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementSnapshot {
    pub features: Features,
    pub indices: Indices,
    pub cumulative: Cumulative,
    /// Base64 JPEG preview, present on a subset of messages only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame: Option<String>,
    pub detect_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<FrameQuality>,
    pub received_at: DateTime<Utc>,
}

impl MeasurementSnapshot {
    pub fn from_message(message: StreamMessage, received_at: DateTime<Utc>) -> Self {
        Self {
            features: message.features.unwrap_or_default(),
            indices: message.indices.unwrap_or_default(),
            cumulative: message.cumulative.unwrap_or_default(),
            frame: message.frame_b64.filter(|frame| !frame.is_empty()),
            detect_enabled: message.detect_enabled,
            quality: message.quality,
            received_at,
        }
    }
}
