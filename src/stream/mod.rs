pub mod controller;
pub mod decode;
pub mod loop_worker;
pub mod transport;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::models::{Cumulative, MeasurementSnapshot};

pub use controller::ConnectionManager;
pub use decode::{decode_message, Decoded};
pub use transport::{StreamConnection, StreamTransport, WebSocketTransport};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// The server closed the stream; a reconnect is pending.
    Closed,
    /// Connecting or receiving failed; a reconnect is pending.
    Failed,
}

impl Default for ConnectionState {
    fn default() -> Self {
        ConnectionState::Disconnected
    }
}

/// Everything the stream worker reports, delivered in arrival order.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    Snapshot(Arc<MeasurementSnapshot>),
    DetectEnabled(bool),
    /// Counters from a message that carried no measurements.
    Counters(Cumulative),
    CameraError(String),
    State(ConnectionState),
}

/// Messages the client may send back over an open stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "lowercase")]
pub enum ClientCommand {
    Detect { enable: bool },
}
