//! Events pushed to the presentation layer.

use serde::Serialize;
use tokio::sync::mpsc;

use crate::history::{HistoryWindow, MetricSummary};
use crate::models::{Cumulative, MeasurementSnapshot, RequestKind, Turn};
use crate::permissions::Permission;
use crate::screen::Screen;
use crate::stream::ConnectionState;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum UiEvent {
    ScreenChanged {
        from: Screen,
        to: Screen,
    },
    /// Live dashboard refresh. Only sent while the monitor is visible.
    Telemetry {
        snapshot: MeasurementSnapshot,
    },
    DetectionChanged {
        enabled: bool,
    },
    Connection {
        state: ConnectionState,
    },
    CameraError {
        message: String,
    },
    PermissionDenied {
        permission: Permission,
    },
    /// Chart data for the stats overlay.
    StatsReady {
        window: HistoryWindow,
        summaries: Vec<MetricSummary>,
        cumulative: Cumulative,
    },
    ChartsReleased,
    RequestStarted {
        kind: RequestKind,
    },
    AdviceReady {
        kind: RequestKind,
        text: String,
    },
    AdviceFailed {
        kind: RequestKind,
        message: String,
    },
    TranscriptAppended {
        turn: Turn,
    },
    TranscriptCleared,
    Notification {
        title: String,
        body: String,
    },
}

pub trait UiSink: Send + Sync {
    fn emit(&self, event: UiEvent);
}

/// Forwards events to an unbounded channel; sends after the receiver is
/// dropped are discarded.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<UiEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<UiEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl UiSink for ChannelSink {
    fn emit(&self, event: UiEvent) {
        let _ = self.tx.send(event);
    }
}
