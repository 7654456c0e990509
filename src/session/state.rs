use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::history::TelemetryHistory;
use crate::models::{Cumulative, MeasurementSnapshot, RequestKind, StatsSummary, Turn};
use crate::screen::{Screen, ScreenMachine};
use crate::stream::ConnectionState;

/// Everything the coordinator task owns. Nothing else writes to it.
#[derive(Debug)]
pub struct SessionState {
    pub screen: ScreenMachine,
    pub history: TelemetryHistory,
    pub latest: Option<Arc<MeasurementSnapshot>>,
    /// Session totals from the most recent message that carried them, with or
    /// without measurements.
    pub cumulative: Option<Cumulative>,
    /// `None` until the first measurement reports the server's toggle.
    pub detect_enabled: Option<bool>,
    pub connection: ConnectionState,
    pub notifications_granted: bool,
    /// Tags the current monitoring run; replaced on every start.
    pub run_id: Option<Uuid>,
}

impl SessionState {
    pub fn new(onboarding_complete: bool, history_capacity: usize) -> Self {
        Self {
            screen: ScreenMachine::new(onboarding_complete),
            history: TelemetryHistory::with_capacity(history_capacity),
            latest: None,
            cumulative: None,
            detect_enabled: None,
            connection: ConnectionState::Disconnected,
            notifications_granted: false,
            run_id: None,
        }
    }

    pub fn record(&mut self, snapshot: Arc<MeasurementSnapshot>) {
        self.history.append(&snapshot);
        self.cumulative = Some(snapshot.cumulative);
        self.latest = Some(snapshot);
    }

    pub fn record_counters(&mut self, cumulative: Cumulative) {
        self.cumulative = Some(cumulative);
    }

    /// The figures for a report or chat request; `None` until telemetry has
    /// arrived.
    pub fn stats_summary(&self) -> Option<StatsSummary> {
        let snapshot = self.latest.as_deref()?;
        let cumulative = self.cumulative.unwrap_or(snapshot.cumulative);
        Some(StatsSummary {
            blink_count: cumulative.blink_count,
            yawn_count: cumulative.yawn_count,
            ..StatsSummary::from_snapshot(snapshot)
        })
    }

    pub fn view(&self, transcript: Vec<Turn>, in_flight: Vec<RequestKind>) -> SessionView {
        SessionView {
            screen: self.screen.current(),
            connection: self.connection,
            detect_enabled: self.detect_enabled,
            history_len: self.history.len(),
            latest: self.stats_summary(),
            notifications_granted: self.notifications_granted,
            run_id: self.run_id,
            transcript,
            in_flight,
        }
    }
}

/// Read-only copy of the session, for status queries.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub screen: Screen,
    pub connection: ConnectionState,
    pub detect_enabled: Option<bool>,
    pub history_len: usize,
    pub latest: Option<StatsSummary>,
    pub notifications_granted: bool,
    pub run_id: Option<Uuid>,
    pub transcript: Vec<Turn>,
    /// Requests still waiting on the advice service.
    pub in_flight: Vec<RequestKind>,
}
