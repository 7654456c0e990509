use chrono::{DateTime, Utc};

use crate::error::DecodeError;
use crate::models::{Cumulative, MeasurementSnapshot, StreamMessage};

#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Measurement(MeasurementSnapshot),
    /// Status message reporting that the server lost its camera.
    CameraError(String),
    /// Counters without measurements; they still advance the session totals.
    Counters(Cumulative),
    /// Well-formed message with nothing this client tracks.
    Empty,
}

/// Decodes one raw stream message. `received_at` becomes the snapshot's
/// timestamp; the server's own `ts` is not trusted.
pub fn decode_message(raw: &str, received_at: DateTime<Utc>) -> Result<Decoded, DecodeError> {
    let message: StreamMessage = serde_json::from_str(raw)?;

    if message.is_measurement() {
        return Ok(Decoded::Measurement(MeasurementSnapshot::from_message(
            message,
            received_at,
        )));
    }

    Ok(match (message.camera_error, message.cumulative) {
        (Some(error), _) => Decoded::CameraError(error),
        (None, Some(cumulative)) => Decoded::Counters(cumulative),
        (None, None) => Decoded::Empty,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(raw: &str) -> Decoded {
        decode_message(raw, Utc::now()).expect("message should decode")
    }

    #[test]
    fn decodes_a_full_server_message() {
        let raw = r#"{
            "ts": "2024-05-01T10:00:00+00:00",
            "features": {"perclos": 0.21, "yawn_rate_min": 1.5, "posture_angle_norm": 0.3,
                         "headpose_var": 4.2, "gaze_on_pct": 0.8, "distance_cm": 48.0, "near_work": 0.1},
            "indices": {"fatigue": 62.5, "stress": 31.0},
            "cumulative": {"blink_count": 14, "yawn_count": 2, "nodding_count": 1},
            "events": {"blink": true, "yawn": false, "nodding": false},
            "quality": {"lighting": 0.7, "fps": 19.5, "occlusion": 0.0},
            "frame_b64": "aGVsbG8=",
            "detect_enabled": true
        }"#;

        let Decoded::Measurement(snapshot) = decode(raw) else {
            panic!("expected a measurement");
        };
        assert_eq!(snapshot.features.perclos, 0.21);
        assert_eq!(snapshot.features.distance_cm, 48.0);
        assert_eq!(snapshot.indices.fatigue, 62.5);
        assert_eq!(snapshot.cumulative.blink_count, 14);
        assert_eq!(snapshot.frame.as_deref(), Some("aGVsbG8="));
        assert_eq!(snapshot.quality.map(|q| q.fps), Some(19.5));
        assert!(snapshot.detect_enabled);
    }

    #[test]
    fn missing_and_null_fields_default_to_zero() {
        let raw = r#"{"features": {"perclos": null}, "indices": {"fatigue": 40}, "frame_b64": null}"#;

        let Decoded::Measurement(snapshot) = decode(raw) else {
            panic!("expected a measurement");
        };
        assert_eq!(snapshot.features.perclos, 0.0);
        assert_eq!(snapshot.features.gaze_on_pct, 0.0);
        assert_eq!(snapshot.indices.stress, 0.0);
        assert_eq!(snapshot.cumulative.yawn_count, 0);
        assert!(snapshot.frame.is_none());
        assert!(!snapshot.detect_enabled);
    }

    #[test]
    fn received_at_comes_from_the_receiver() {
        let received_at = DateTime::parse_from_rfc3339("2030-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let raw = r#"{"ts": "2001-01-01T00:00:00Z", "indices": {}}"#;

        let Ok(Decoded::Measurement(snapshot)) = decode_message(raw, received_at) else {
            panic!("expected a measurement");
        };
        assert_eq!(snapshot.received_at, received_at);
    }

    #[test]
    fn camera_error_notice_is_not_a_measurement() {
        let raw = r#"{"ts": "2024-05-01T10:00:00+00:00", "camera_error": "device busy"}"#;
        assert_eq!(decode(raw), Decoded::CameraError("device busy".into()));
    }

    #[test]
    fn counter_only_message_keeps_its_counters() {
        let raw = r#"{"ts": 5, "cumulative": {"blink_count": 30, "yawn_count": 4}}"#;
        assert_eq!(
            decode(raw),
            Decoded::Counters(Cumulative {
                blink_count: 30,
                yawn_count: 4,
                nodding_count: 0,
            })
        );
    }

    #[test]
    fn unrelated_object_decodes_to_empty() {
        assert_eq!(decode(r#"{"ts": "now"}"#), Decoded::Empty);
    }

    #[test]
    fn malformed_payloads_are_rejected() {
        assert!(decode_message("not json", Utc::now()).is_err());
        assert!(decode_message("[1, 2, 3]", Utc::now()).is_err());
        assert!(decode_message(r#"{"indices": {"fatigue": "high"}}"#, Utc::now()).is_err());
    }
}
