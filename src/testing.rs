//! Test doubles shared by the unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use futures::channel::mpsc as inbound_channel;
use futures::StreamExt;
use tokio::sync::{mpsc, Semaphore};

use crate::conversation::AdviceClient;
use crate::error::{PipelineError, TransportError};
use crate::models::{
    AdviceResponse, ChatRequest, Cumulative, Features, Indices, MeasurementSnapshot,
    ReportRequest,
};
use crate::permissions::{Permission, PermissionOutcome, PermissionPrompter};
use crate::stream::{StreamConnection, StreamTransport};
use crate::ui::{UiEvent, UiSink};

/// A snapshot with fatigue `x`, stress `x + 1` and perclos `x / 100`.
pub(crate) fn snapshot_with(x: f64) -> MeasurementSnapshot {
    MeasurementSnapshot {
        features: Features {
            perclos: x / 100.0,
            headpose_var: x / 10.0,
            yawn_rate_min: 1.0,
            gaze_on_pct: 80.0,
            near_work: 0.0,
            ..Features::default()
        },
        indices: Indices {
            fatigue: x,
            stress: x + 1.0,
        },
        cumulative: Cumulative {
            blink_count: x as u64,
            yawn_count: 2,
            nodding_count: 0,
        },
        frame: None,
        detect_enabled: true,
        quality: None,
        received_at: Utc::now(),
    }
}

pub(crate) enum ScriptedConnect {
    Fail,
    Open(StreamConnection),
}

/// Server side of a scripted connection. Dropping it closes the stream.
pub(crate) struct FakeServer {
    inbound: inbound_channel::UnboundedSender<Result<String, TransportError>>,
    sent: mpsc::UnboundedReceiver<String>,
}

impl FakeServer {
    pub(crate) fn push(&self, raw: &str) {
        let _ = self.inbound.unbounded_send(Ok(raw.to_string()));
    }

    pub(crate) fn fail(&self, reason: &str) {
        let _ = self
            .inbound
            .unbounded_send(Err(TransportError::Receive(reason.to_string())));
    }

    pub(crate) async fn next_sent(&mut self) -> Option<String> {
        self.sent.recv().await
    }
}

/// Hands out scripted connections in order; an empty script fails.
#[derive(Default)]
pub(crate) struct FakeTransport {
    script: Mutex<VecDeque<ScriptedConnect>>,
    connects: AtomicUsize,
}

impl FakeTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn script(&self, step: ScriptedConnect) {
        self.script.lock().unwrap().push_back(step);
    }

    pub(crate) fn script_open(&self) -> FakeServer {
        let (inbound_tx, inbound_rx) = inbound_channel::unbounded();
        let (outbound, sent) = mpsc::unbounded_channel();
        self.script(ScriptedConnect::Open(StreamConnection {
            inbound: inbound_rx.boxed(),
            outbound,
        }));
        FakeServer {
            inbound: inbound_tx,
            sent,
        }
    }

    pub(crate) fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StreamTransport for FakeTransport {
    async fn connect(&self, _url: &str) -> Result<StreamConnection, TransportError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let step = self.script.lock().unwrap().pop_front();
        match step {
            Some(ScriptedConnect::Open(connection)) => Ok(connection),
            Some(ScriptedConnect::Fail) | None => {
                Err(TransportError::Connect("connection refused".into()))
            }
        }
    }
}

pub(crate) enum Reply {
    Text(String),
    Status(u16),
    Network(String),
}

/// Advice service double with scripted replies. A gated client parks every
/// call until [`FakeAdviceClient::release`] is called.
pub(crate) struct FakeAdviceClient {
    replies: Mutex<VecDeque<Reply>>,
    calls: AtomicUsize,
    reports: Mutex<Vec<ReportRequest>>,
    chats: Mutex<Vec<ChatRequest>>,
    gate: Option<Semaphore>,
    entered: Semaphore,
}

impl FakeAdviceClient {
    pub(crate) fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            calls: AtomicUsize::new(0),
            reports: Mutex::new(Vec::new()),
            chats: Mutex::new(Vec::new()),
            gate: None,
            entered: Semaphore::new(0),
        }
    }

    pub(crate) fn gated(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::new(replies)
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn report_requests(&self) -> Vec<ReportRequest> {
        self.reports.lock().unwrap().clone()
    }

    pub(crate) fn chat_requests(&self) -> Vec<ChatRequest> {
        self.chats.lock().unwrap().clone()
    }

    /// Resolves once a call has reached the client.
    pub(crate) async fn wait_until_called(&self) {
        self.entered.acquire().await.unwrap().forget();
    }

    /// Lets one parked call proceed.
    pub(crate) fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    async fn answer(&self) -> Result<AdviceResponse, PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.entered.add_permits(1);
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }

        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(Reply::Text(text)) => Ok(AdviceResponse { text }),
            Some(Reply::Status(code)) => Err(PipelineError::Status(code)),
            Some(Reply::Network(reason)) => Err(PipelineError::Network(reason)),
            None => Err(PipelineError::Network("no scripted reply".into())),
        }
    }
}

#[async_trait]
impl AdviceClient for FakeAdviceClient {
    async fn report(&self, request: &ReportRequest) -> Result<AdviceResponse, PipelineError> {
        self.reports.lock().unwrap().push(request.clone());
        self.answer().await
    }

    async fn chat(&self, request: &ChatRequest) -> Result<AdviceResponse, PipelineError> {
        self.chats.lock().unwrap().push(request.clone());
        self.answer().await
    }
}

#[derive(Default)]
pub(crate) struct RecordingSink {
    events: Mutex<Vec<UiEvent>>,
}

impl RecordingSink {
    pub(crate) fn events(&self) -> Vec<UiEvent> {
        self.events.lock().unwrap().clone()
    }

    pub(crate) fn failures(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                UiEvent::AdviceFailed { message, .. } => Some(message),
                _ => None,
            })
            .collect()
    }
}

impl UiSink for RecordingSink {
    fn emit(&self, event: UiEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Records which permissions were asked for and answers from fixed flags.
pub(crate) struct ScriptedPermissions {
    camera: bool,
    notifications: bool,
    asked: Mutex<Vec<Permission>>,
}

impl ScriptedPermissions {
    pub(crate) fn new(camera: bool, notifications: bool) -> Arc<Self> {
        Arc::new(Self {
            camera,
            notifications,
            asked: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn asked(&self) -> Vec<Permission> {
        self.asked.lock().unwrap().clone()
    }
}

#[async_trait]
impl PermissionPrompter for ScriptedPermissions {
    async fn request(&self, permission: Permission) -> PermissionOutcome {
        self.asked.lock().unwrap().push(permission);
        let granted = match permission {
            Permission::Camera => self.camera,
            Permission::Notifications => self.notifications,
        };
        if granted {
            PermissionOutcome::Granted
        } else {
            PermissionOutcome::Denied
        }
    }
}
