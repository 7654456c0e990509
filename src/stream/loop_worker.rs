use std::sync::Arc;

use chrono::Utc;
use futures::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::error::TransportError;

use super::decode::{decode_message, Decoded};
use super::transport::{StreamConnection, StreamTransport};
use super::{ClientCommand, ConnectionState, StreamEvent};

// Set to false to silence per-connection logging
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

pub(crate) struct LoopContext {
    pub transport: Arc<dyn StreamTransport>,
    pub url: String,
    pub retry_delay: Duration,
    pub events: mpsc::UnboundedSender<StreamEvent>,
    pub state_tx: Arc<watch::Sender<ConnectionState>>,
    pub commands: mpsc::UnboundedReceiver<ClientCommand>,
    pub cancel_token: CancellationToken,
}

enum PumpOutcome {
    Cancelled,
    Closed,
    Failed(TransportError),
}

/// Connects, pumps messages until the stream ends, waits `retry_delay`, and
/// goes again. Only the cancel token ends the loop.
pub(crate) async fn connection_loop(mut ctx: LoopContext) {
    let mut attempt: u64 = 0;

    loop {
        attempt += 1;
        publish(&ctx, ConnectionState::Connecting);

        let connected = tokio::select! {
            biased;
            _ = ctx.cancel_token.cancelled() => break,
            result = ctx.transport.connect(&ctx.url) => result,
        };

        match connected {
            Ok(connection) => {
                // Commands queued while disconnected refer to a stream that no longer exists.
                while ctx.commands.try_recv().is_ok() {}

                log_info!("stream connected to {} (attempt {})", ctx.url, attempt);
                publish(&ctx, ConnectionState::Connected);

                match pump(&mut ctx, connection).await {
                    PumpOutcome::Cancelled => break,
                    PumpOutcome::Closed => {
                        log_info!("stream closed by server, retrying in {:?}", ctx.retry_delay);
                        publish(&ctx, ConnectionState::Closed);
                    }
                    PumpOutcome::Failed(err) => {
                        log_warn!("stream dropped: {err}; retrying in {:?}", ctx.retry_delay);
                        publish(&ctx, ConnectionState::Failed);
                    }
                }
            }
            Err(err) => {
                log_warn!("stream attempt {} failed: {err}; retrying in {:?}", attempt, ctx.retry_delay);
                publish(&ctx, ConnectionState::Failed);
            }
        }

        if ctx.events.is_closed() {
            log_warn!("stream consumer is gone, stopping reconnect loop");
            break;
        }

        tokio::select! {
            biased;
            _ = ctx.cancel_token.cancelled() => break,
            _ = tokio::time::sleep(ctx.retry_delay) => {}
        }
    }

    log_info!("stream loop shutting down");
    publish(&ctx, ConnectionState::Disconnected);
}

async fn pump(ctx: &mut LoopContext, connection: StreamConnection) -> PumpOutcome {
    let StreamConnection {
        mut inbound,
        outbound,
    } = connection;

    loop {
        tokio::select! {
            biased;
            _ = ctx.cancel_token.cancelled() => return PumpOutcome::Cancelled,
            Some(command) = ctx.commands.recv() => {
                match serde_json::to_string(&command) {
                    Ok(text) => {
                        if outbound.send(text).is_err() {
                            log_warn!("stream writer is gone, dropping {command:?}");
                        }
                    }
                    Err(err) => log_error!("failed to encode {command:?}: {err}"),
                }
            }
            next = inbound.next() => match next {
                Some(Ok(raw)) => handle_message(ctx, &raw),
                Some(Err(err)) => return PumpOutcome::Failed(err),
                None => return PumpOutcome::Closed,
            },
        }
    }
}

fn handle_message(ctx: &LoopContext, raw: &str) {
    match decode_message(raw, Utc::now()) {
        Ok(Decoded::Measurement(snapshot)) => {
            let detect_enabled = snapshot.detect_enabled;
            let _ = ctx.events.send(StreamEvent::Snapshot(Arc::new(snapshot)));
            let _ = ctx.events.send(StreamEvent::DetectEnabled(detect_enabled));
        }
        Ok(Decoded::CameraError(message)) => {
            log_warn!("server reported camera error: {message}");
            let _ = ctx.events.send(StreamEvent::CameraError(message));
        }
        Ok(Decoded::Counters(cumulative)) => {
            let _ = ctx.events.send(StreamEvent::Counters(cumulative));
        }
        Ok(Decoded::Empty) => {}
        Err(err) => log_warn!("dropping stream message: {err}"),
    }
}

fn publish(ctx: &LoopContext, state: ConnectionState) {
    ctx.state_tx.send_replace(state);
    let _ = ctx.events.send(StreamEvent::State(state));
}
