use std::sync::Arc;

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::conversation::{AdviceClient, ConversationPipeline, PendingChat};
use crate::error::PipelineError;
use crate::models::RequestKind;
use crate::permissions::{Permission, PermissionPrompter};
use crate::screen::{Screen, ScreenEvent, SideEffect};
use crate::settings::SettingsStore;
use crate::stream::{ConnectionManager, StreamEvent, StreamTransport};
use crate::ui::{UiEvent, UiSink};

use super::handle::{SessionCommand, SessionHandle};
use super::state::SessionState;

const NOTIFICATION_TITLE: &str = "Coaching advice";

/// The collaborators a session is wired to.
pub struct SessionParts {
    pub transport: Arc<dyn StreamTransport>,
    pub advice: Arc<dyn AdviceClient>,
    pub permissions: Arc<dyn PermissionPrompter>,
    pub sink: Arc<dyn UiSink>,
    pub settings: Arc<SettingsStore>,
}

/// Composition root. One task drains user commands and stream events and is
/// the single writer of [`SessionState`].
pub struct SessionCoordinator {
    config: ClientConfig,
    state: SessionState,
    connection: ConnectionManager,
    pipeline: ConversationPipeline,
    permissions: Arc<dyn PermissionPrompter>,
    sink: Arc<dyn UiSink>,
    settings: Arc<SettingsStore>,
    commands: mpsc::UnboundedReceiver<SessionCommand>,
    stream_tx: mpsc::UnboundedSender<StreamEvent>,
    stream_rx: mpsc::UnboundedReceiver<StreamEvent>,
    /// Advice round trips started by this session; drained before shutdown
    /// returns.
    requests: JoinSet<()>,
}

impl SessionCoordinator {
    pub fn new(config: ClientConfig, parts: SessionParts) -> (Self, SessionHandle) {
        let (command_tx, commands) = mpsc::unbounded_channel();
        let (stream_tx, stream_rx) = mpsc::unbounded_channel();

        let state = SessionState::new(
            parts.settings.onboarding_complete(),
            config.history_capacity,
        );
        let connection = ConnectionManager::new(
            parts.transport,
            config.stream_url(),
            config.reconnect_delay,
        );
        let pipeline = ConversationPipeline::new(parts.advice, Arc::clone(&parts.sink));

        let coordinator = Self {
            config,
            state,
            connection,
            pipeline,
            permissions: parts.permissions,
            sink: parts.sink,
            settings: parts.settings,
            commands,
            stream_tx,
            stream_rx,
            requests: JoinSet::new(),
        };
        (coordinator, SessionHandle::new(command_tx))
    }

    pub fn screen(&self) -> Screen {
        self.state.screen.current()
    }

    /// Runs until shutdown is requested or every handle is dropped, then
    /// closes the stream.
    pub async fn run(mut self) -> Result<()> {
        info!("session starting on {:?}", self.screen());

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(SessionCommand::Shutdown) | None => break,
                    Some(command) => self.handle_command(command).await,
                },
                Some(event) = self.stream_rx.recv() => self.handle_stream(event),
                Some(joined) = self.requests.join_next(), if !self.requests.is_empty() => {
                    if let Err(err) = joined {
                        error!("advice request task failed: {err}");
                    }
                }
            }
        }

        self.connection
            .stop()
            .await
            .context("failed to stop the stream on shutdown")?;

        if !self.requests.is_empty() {
            info!("waiting for {} advice requests", self.requests.len());
        }
        while let Some(joined) = self.requests.join_next().await {
            if let Err(err) = joined {
                error!("advice request task failed: {err}");
            }
        }
        info!("session finished");
        Ok(())
    }

    async fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Screen(event) => self.apply_screen_event(event).await,
            SessionCommand::RequestReport => self.spawn_report(),
            SessionCommand::SendChat(message) => {
                let pending = self
                    .pipeline
                    .begin_chat(self.state.stats_summary(), &message);
                self.spawn_chat(pending);
            }
            SessionCommand::Analyze => {
                let pending = self.pipeline.begin_analysis(self.state.stats_summary());
                self.spawn_chat(pending);
            }
            SessionCommand::ClearChat => self.pipeline.clear_transcript(),
            SessionCommand::SetDetection(enabled) => {
                if !self.connection.set_detection(enabled) {
                    debug!("detection toggle dropped, no open stream");
                }
            }
            SessionCommand::View(reply) => {
                let in_flight = [RequestKind::Report, RequestKind::Chat]
                    .into_iter()
                    .filter(|kind| self.pipeline.is_in_flight(*kind))
                    .collect();
                let view = self.state.view(self.pipeline.transcript(), in_flight);
                let _ = reply.send(view);
            }
            SessionCommand::Shutdown => {}
        }
    }

    async fn apply_screen_event(&mut self, event: ScreenEvent) {
        let transition = self.state.screen.apply(event);
        if transition.is_ignored() {
            debug!("{event:?} has no effect on {:?}", transition.from);
            return;
        }

        if transition.from != transition.to {
            info!("screen {:?} -> {:?}", transition.from, transition.to);
            self.sink.emit(UiEvent::ScreenChanged {
                from: transition.from,
                to: transition.to,
            });
        }

        for effect in transition.effects {
            self.run_effect(effect).await;
        }
    }

    async fn run_effect(&mut self, effect: SideEffect) {
        match effect {
            SideEffect::RequestCamera => {
                self.ask(Permission::Camera).await;
            }
            SideEffect::PersistOnboarding => {
                if let Err(err) = self.settings.set_onboarding_complete(true) {
                    error!("failed to persist onboarding: {err:#}");
                }
            }
            SideEffect::RequestNotifications => {
                self.state.notifications_granted = self.ask(Permission::Notifications).await;
            }
            SideEffect::StartConnection => {
                if self.connection.start(self.stream_tx.clone()) {
                    let run_id = Uuid::new_v4();
                    info!("monitoring run {run_id} started");
                    self.state.run_id = Some(run_id);
                }
            }
            SideEffect::StopConnection => {
                if let Err(err) = self.connection.stop().await {
                    error!("failed to stop stream: {err:#}");
                }
                if let Some(run_id) = self.state.run_id.take() {
                    info!("monitoring run {run_id} stopped");
                }
            }
            SideEffect::PublishCharts => {
                let window = self.state.history.window(self.config.chart_window);
                let cumulative = self.state.cumulative.unwrap_or_default();
                self.sink.emit(UiEvent::StatsReady {
                    summaries: window.summaries(),
                    window,
                    cumulative,
                });
            }
            SideEffect::TearDownCharts => self.sink.emit(UiEvent::ChartsReleased),
        }
    }

    /// Prompts for a permission. A denial is reported and otherwise ignored.
    async fn ask(&self, permission: Permission) -> bool {
        let granted = self.permissions.request(permission).await.is_granted();
        if !granted {
            warn!("{permission:?} permission denied, continuing without it");
            self.sink.emit(UiEvent::PermissionDenied { permission });
        }
        granted
    }

    /// Claims the report slot here, on the session task, so a second request
    /// is refused immediately. Only the round trip runs in the background.
    fn spawn_report(&mut self) {
        let pending = match self.pipeline.begin_report(self.state.stats_summary()) {
            Ok(pending) => pending,
            Err(err) => {
                debug!("report not sent: {err}");
                return;
            }
        };
        let sink = Arc::clone(&self.sink);
        let notify = self.state.notifications_granted;

        self.requests.spawn(async move {
            if let Ok(text) = pending.send().await {
                if notify {
                    sink.emit(UiEvent::Notification {
                        title: NOTIFICATION_TITLE.into(),
                        body: first_line(&text),
                    });
                }
            }
        });
    }

    fn spawn_chat(&mut self, pending: Result<PendingChat, PipelineError>) {
        match pending {
            Ok(pending) => {
                self.requests.spawn(async move {
                    let _ = pending.send().await;
                });
            }
            Err(err) => debug!("chat not sent: {err}"),
        }
    }

    fn handle_stream(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::Snapshot(snapshot) => {
                self.state.record(Arc::clone(&snapshot));
                if self.screen() == Screen::Monitor {
                    self.sink.emit(UiEvent::Telemetry {
                        snapshot: (*snapshot).clone(),
                    });
                }
            }
            StreamEvent::Counters(cumulative) => self.state.record_counters(cumulative),
            StreamEvent::DetectEnabled(enabled) => {
                if self.state.detect_enabled != Some(enabled) {
                    self.state.detect_enabled = Some(enabled);
                    self.sink.emit(UiEvent::DetectionChanged { enabled });
                }
            }
            StreamEvent::CameraError(message) => {
                self.sink.emit(UiEvent::CameraError { message });
            }
            StreamEvent::State(state) => {
                self.state.connection = state;
                self.sink.emit(UiEvent::Connection { state });
            }
        }
    }
}

fn first_line(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default()
        .to_string()
}
