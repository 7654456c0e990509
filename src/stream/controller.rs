use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, info, warn};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::loop_worker::{connection_loop, LoopContext};
use super::transport::StreamTransport;
use super::{ClientCommand, ConnectionState, StreamEvent};

/// Owns the single streaming connection and its reconnect loop.
pub struct ConnectionManager {
    transport: Arc<dyn StreamTransport>,
    url: String,
    retry_delay: Duration,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    state_rx: watch::Receiver<ConnectionState>,
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
    command_tx: Option<mpsc::UnboundedSender<ClientCommand>>,
}

impl ConnectionManager {
    pub fn new(
        transport: Arc<dyn StreamTransport>,
        url: impl Into<String>,
        retry_delay: Duration,
    ) -> Self {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        Self {
            transport,
            url: url.into(),
            retry_delay,
            state_tx: Arc::new(state_tx),
            state_rx,
            handle: None,
            cancel_token: None,
            command_tx: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Starts the connect/reconnect loop. Returns `false` without doing
    /// anything when a loop is already running.
    pub fn start(&mut self, events: mpsc::UnboundedSender<StreamEvent>) -> bool {
        if self.is_active() {
            debug!("stream already active, ignoring start");
            return false;
        }

        let cancel_token = CancellationToken::new();
        let (command_tx, commands) = mpsc::unbounded_channel();

        let ctx = LoopContext {
            transport: Arc::clone(&self.transport),
            url: self.url.clone(),
            retry_delay: self.retry_delay,
            events,
            state_tx: Arc::clone(&self.state_tx),
            commands,
            cancel_token: cancel_token.clone(),
        };

        info!("starting stream to {}", self.url);
        self.handle = Some(tokio::spawn(connection_loop(ctx)));
        self.cancel_token = Some(cancel_token);
        self.command_tx = Some(command_tx);
        true
    }

    /// Closes the connection and cancels any pending reconnect. Safe to call
    /// repeatedly.
    pub async fn stop(&mut self) -> Result<()> {
        self.command_tx = None;

        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("stream loop task failed to join")?;
            info!("stream stopped");
        }

        // A loop that never ran leaves nothing to publish its shutdown.
        self.state_tx.send_replace(ConnectionState::Disconnected);
        Ok(())
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Asks the server to pause or resume detection. Returns `false` when no
    /// connection is open to carry the command.
    pub fn set_detection(&self, enabled: bool) -> bool {
        if self.state() != ConnectionState::Connected {
            warn!("cannot toggle detection while {:?}", self.state());
            return false;
        }

        match &self.command_tx {
            Some(tx) => tx.send(ClientCommand::Detect { enable: enabled }).is_ok(),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeTransport, ScriptedConnect};
    use tokio::time::Instant;

    const RETRY: Duration = Duration::from_millis(1500);

    fn manager(transport: &Arc<FakeTransport>) -> ConnectionManager {
        ConnectionManager::new(transport.clone(), "ws://test/ws", RETRY)
    }

    async fn wait_for_state(
        rx: &mut mpsc::UnboundedReceiver<StreamEvent>,
        wanted: ConnectionState,
    ) {
        while let Some(event) = rx.recv().await {
            if let StreamEvent::State(state) = event {
                if state == wanted {
                    return;
                }
            }
        }
        panic!("event channel closed before reaching {wanted:?}");
    }

    #[tokio::test]
    async fn start_while_connected_is_a_no_op() {
        let transport = Arc::new(FakeTransport::new());
        let _server = transport.script_open();
        let mut manager = manager(&transport);
        let (tx, mut rx) = mpsc::unbounded_channel();

        assert!(manager.start(tx.clone()));
        wait_for_state(&mut rx, ConnectionState::Connected).await;

        assert!(!manager.start(tx));
        tokio::task::yield_now().await;
        assert_eq!(transport.connects(), 1);
        assert_eq!(manager.state(), ConnectionState::Connected);

        manager.stop().await.unwrap();
    }

    #[tokio::test]
    async fn messages_are_forwarded_in_arrival_order_and_garbage_is_dropped() {
        let transport = Arc::new(FakeTransport::new());
        let server = transport.script_open();
        let mut manager = manager(&transport);
        let (tx, mut rx) = mpsc::unbounded_channel();
        manager.start(tx);
        wait_for_state(&mut rx, ConnectionState::Connected).await;

        server.push(r#"{"indices": {"fatigue": 1}, "detect_enabled": true}"#);
        server.push("{{ definitely not json");
        server.push(r#"{"indices": {"fatigue": 2}, "detect_enabled": false}"#);

        let mut fatigue = Vec::new();
        let mut flags = Vec::new();
        while fatigue.len() < 2 {
            match rx.recv().await.expect("stream events") {
                StreamEvent::Snapshot(snapshot) => fatigue.push(snapshot.indices.fatigue),
                StreamEvent::DetectEnabled(flag) => flags.push(flag),
                StreamEvent::State(state) => panic!("connection should survive, got {state:?}"),
                other => panic!("unexpected stream event {other:?}"),
            }
        }
        if let Some(StreamEvent::DetectEnabled(flag)) = rx.recv().await {
            flags.push(flag);
        }

        assert_eq!(fatigue, vec![1.0, 2.0]);
        assert_eq!(flags, vec![true, false]);
        manager.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn server_close_schedules_one_retry_after_the_delay() {
        let transport = Arc::new(FakeTransport::new());
        let server = transport.script_open();
        let mut manager = manager(&transport);
        let (tx, mut rx) = mpsc::unbounded_channel();
        manager.start(tx);
        wait_for_state(&mut rx, ConnectionState::Connected).await;

        drop(server);
        wait_for_state(&mut rx, ConnectionState::Closed).await;
        let closed_at = Instant::now();

        wait_for_state(&mut rx, ConnectionState::Connecting).await;
        assert!(closed_at.elapsed() >= RETRY);
        wait_for_state(&mut rx, ConnectionState::Failed).await;
        assert_eq!(transport.connects(), 2);

        manager.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn receive_error_reconnects_to_a_fresh_stream() {
        let transport = Arc::new(FakeTransport::new());
        let first = transport.script_open();
        let second = transport.script_open();
        let mut manager = manager(&transport);
        let (tx, mut rx) = mpsc::unbounded_channel();
        manager.start(tx);
        wait_for_state(&mut rx, ConnectionState::Connected).await;

        first.fail("connection reset");
        wait_for_state(&mut rx, ConnectionState::Failed).await;
        wait_for_state(&mut rx, ConnectionState::Connected).await;
        assert_eq!(transport.connects(), 2);

        second.push(r#"{"features": {"perclos": 0.3}}"#);
        loop {
            if let Some(StreamEvent::Snapshot(snapshot)) = rx.recv().await {
                assert_eq!(snapshot.features.perclos, 0.3);
                break;
            }
        }

        manager.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn failures_retry_indefinitely_without_backoff() {
        let transport = Arc::new(FakeTransport::new());
        let mut manager = manager(&transport);
        let (tx, mut rx) = mpsc::unbounded_channel();
        manager.start(tx);

        let mut last = None;
        for _ in 0..5 {
            wait_for_state(&mut rx, ConnectionState::Connecting).await;
            let now = Instant::now();
            if let Some(previous) = last {
                let gap: Duration = now - previous;
                assert!(gap >= RETRY && gap < RETRY * 2, "gap was {gap:?}");
            }
            last = Some(now);
        }

        manager.stop().await.unwrap();
        assert!(transport.connects() >= 5);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_a_pending_reconnect() {
        let transport = Arc::new(FakeTransport::new());
        transport.script(ScriptedConnect::Fail);
        let mut manager = manager(&transport);
        let (tx, mut rx) = mpsc::unbounded_channel();
        manager.start(tx);

        wait_for_state(&mut rx, ConnectionState::Failed).await;
        assert_eq!(transport.connects(), 1);

        tokio::time::advance(Duration::from_millis(500)).await;
        manager.stop().await.unwrap();
        tokio::time::advance(Duration::from_secs(10)).await;
        tokio::task::yield_now().await;

        assert_eq!(transport.connects(), 1);
        assert_eq!(manager.state(), ConnectionState::Disconnected);
        assert!(!manager.is_active());
    }

    #[tokio::test]
    async fn stop_is_idempotent_and_restart_opens_a_new_connection() {
        let transport = Arc::new(FakeTransport::new());
        let _first = transport.script_open();
        let _second = transport.script_open();
        let mut manager = manager(&transport);

        manager.stop().await.unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        manager.start(tx.clone());
        wait_for_state(&mut rx, ConnectionState::Connected).await;
        manager.stop().await.unwrap();
        manager.stop().await.unwrap();
        assert_eq!(manager.state(), ConnectionState::Disconnected);

        assert!(manager.start(tx));
        wait_for_state(&mut rx, ConnectionState::Connected).await;
        assert_eq!(transport.connects(), 2);
        manager.stop().await.unwrap();
    }

    #[tokio::test]
    async fn detection_toggle_is_sent_over_the_open_stream() {
        let transport = Arc::new(FakeTransport::new());
        let mut server = transport.script_open();
        let mut manager = manager(&transport);

        assert!(!manager.set_detection(false));

        let (tx, mut rx) = mpsc::unbounded_channel();
        manager.start(tx);
        wait_for_state(&mut rx, ConnectionState::Connected).await;

        assert!(manager.set_detection(false));
        let sent = server.next_sent().await.expect("command reaches the server");
        assert_eq!(sent, r#"{"cmd":"detect","enable":false}"#);

        manager.stop().await.unwrap();
    }
}
