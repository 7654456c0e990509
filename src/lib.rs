pub mod config;
pub mod conversation;
pub mod error;
pub mod history;
pub mod models;
pub mod permissions;
pub mod screen;
pub mod session;
pub mod settings;
pub mod stream;
pub mod terminal;
pub mod ui;
mod utils;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use anyhow::{Context, Result};
use log::{info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use config::ClientConfig;
use conversation::HttpAdviceClient;
use permissions::StaticPermissions;
use session::{SessionCoordinator, SessionHandle, SessionParts};
use settings::SettingsStore;
use stream::WebSocketTransport;
use ui::{ChannelSink, UiEvent};

/// Switches for a terminal session that are not part of [`ClientConfig`].
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Forget the onboarding flag before starting.
    pub reset: bool,
    pub grant_camera: bool,
    pub grant_notifications: bool,
    /// Keep base64 preview frames in printed telemetry events.
    pub with_frames: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            reset: false,
            grant_camera: true,
            grant_notifications: true,
            with_frames: false,
        }
    }
}

/// Runs a session against the configured server, driven by stdin and
/// printing UI events to stdout as JSON lines.
pub async fn run(config: ClientConfig, options: RunOptions) -> Result<()> {
    utils::logging::init(config.debug);
    info!("RuleVision client starting, server {}", config.server_url);

    let settings = Arc::new(SettingsStore::new(config.settings_path.clone())?);
    if options.reset {
        settings
            .reset_onboarding()
            .context("failed to reset onboarding")?;
        info!("onboarding reset");
    }

    let (sink, events) = ChannelSink::new();
    let advice = HttpAdviceClient::new(&config)?;

    let (coordinator, handle) = SessionCoordinator::new(
        config,
        SessionParts {
            transport: Arc::new(WebSocketTransport),
            advice: Arc::new(advice),
            permissions: Arc::new(StaticPermissions::new(
                options.grant_camera,
                options.grant_notifications,
            )),
            sink: Arc::new(sink),
            settings,
        },
    );

    let session = tokio::spawn(coordinator.run());
    let printer = tokio::spawn(print_events(events, options.with_frames));

    let input = read_commands(&handle).await;
    let _ = handle.shutdown();

    let finished = session.await.context("session task failed to join")?;
    // The printer ends once the session's sinks are dropped and the queue
    // is flushed.
    printer.await.context("event printer failed to join")?;
    input?;
    finished
}

async fn read_commands(handle: &SessionHandle) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    eprintln!("{}", terminal::HELP);

    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let input = match terminal::parse_line(&line) {
            Ok(Some(input)) => input,
            Ok(None) => continue,
            Err(err) => {
                eprintln!("{err}");
                continue;
            }
        };

        match input {
            terminal::Input::Help => eprintln!("{}", terminal::HELP),
            terminal::Input::Status => {
                let view = handle.view().await?;
                println!("{}", serde_json::json!({ "status": view }));
            }
            input => {
                if !terminal::dispatch(handle, input)? {
                    break;
                }
            }
        }
    }
    Ok(())
}

async fn print_events(mut events: mpsc::UnboundedReceiver<UiEvent>, with_frames: bool) {
    while let Some(mut event) = events.recv().await {
        if !with_frames {
            if let UiEvent::Telemetry { snapshot } = &mut event {
                snapshot.frame = None;
            }
        }
        match serde_json::to_string(&event) {
            Ok(line) => println!("{line}"),
            Err(err) => warn!("failed to encode ui event: {err}"),
        }
    }
}
