use anyhow::{anyhow, Result};
use tokio::sync::{mpsc, oneshot};

use crate::screen::ScreenEvent;

use super::state::SessionView;

#[derive(Debug)]
pub enum SessionCommand {
    Screen(ScreenEvent),
    RequestReport,
    SendChat(String),
    Analyze,
    ClearChat,
    SetDetection(bool),
    View(oneshot::Sender<SessionView>),
    Shutdown,
}

/// Cloneable front door to a running [`super::SessionCoordinator`].
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<SessionCommand>,
}

impl SessionHandle {
    pub(super) fn new(tx: mpsc::UnboundedSender<SessionCommand>) -> Self {
        Self { tx }
    }

    pub fn send(&self, command: SessionCommand) -> Result<()> {
        self.tx
            .send(command)
            .map_err(|_| anyhow!("session coordinator has shut down"))
    }

    pub fn screen(&self, event: ScreenEvent) -> Result<()> {
        self.send(SessionCommand::Screen(event))
    }

    pub fn request_report(&self) -> Result<()> {
        self.send(SessionCommand::RequestReport)
    }

    pub fn send_chat(&self, message: impl Into<String>) -> Result<()> {
        self.send(SessionCommand::SendChat(message.into()))
    }

    pub fn analyze(&self) -> Result<()> {
        self.send(SessionCommand::Analyze)
    }

    pub fn clear_chat(&self) -> Result<()> {
        self.send(SessionCommand::ClearChat)
    }

    pub fn set_detection(&self, enabled: bool) -> Result<()> {
        self.send(SessionCommand::SetDetection(enabled))
    }

    /// Snapshot of the session once every earlier command has been handled.
    pub async fn view(&self) -> Result<SessionView> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::View(reply))?;
        rx.await
            .map_err(|_| anyhow!("session coordinator dropped the status request"))
    }

    pub fn shutdown(&self) -> Result<()> {
        self.send(SessionCommand::Shutdown)
    }
}
