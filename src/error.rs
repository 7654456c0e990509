use thiserror::Error;

use crate::models::RequestKind;

/// Failures of the streaming connection. Always recovered by reconnecting.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("failed to connect: {0}")]
    Connect(String),

    #[error("stream receive failed: {0}")]
    Receive(String),
}

/// A stream message that could not be decoded. The message is dropped.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("malformed stream message: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures of a report or chat request, surfaced inline to the user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("a {0} request is already in flight")]
    Busy(RequestKind),

    #[error("telemetry is still being collected, try again shortly")]
    DataNotReady,

    #[error("message is empty")]
    EmptyMessage,

    #[error("request failed ({0})")]
    Status(u16),

    #[error("network error: {0}")]
    Network(String),

    #[error("malformed response: {0}")]
    Decode(String),
}

/// A terminal input line that does not name a command.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command `{0}`, try `help`")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),
}
