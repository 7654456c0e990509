use std::fmt;

use serde::{Deserialize, Serialize};

use super::snapshot::MeasurementSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One entry of the conversation transcript.
///
/// `notice` marks synthetic assistant turns produced locally when a chat
/// request fails. They are shown to the user but never sent back upstream
/// as conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub notice: bool,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            notice: false,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            notice: false,
        }
    }

    pub fn notice(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            notice: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RequestKind {
    Report,
    Chat,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestKind::Report => f.write_str("report"),
            RequestKind::Chat => f.write_str("chat"),
        }
    }
}

/// Figures sent to the advice service with every request.
///
/// The `avg_*` names are what the service expects; the values are the
/// latest indices, not averages over the history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsSummary {
    pub avg_fatigue: f64,
    pub avg_stress: f64,
    pub perclos: f64,
    pub blink_count: u64,
    pub yawn_count: u64,
}

impl StatsSummary {
    pub fn from_snapshot(snapshot: &MeasurementSnapshot) -> Self {
        Self {
            avg_fatigue: snapshot.indices.fatigue,
            avg_stress: snapshot.indices.stress,
            perclos: snapshot.features.perclos,
            blink_count: snapshot.cumulative.blink_count,
            yawn_count: snapshot.cumulative.yawn_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocRef {
    pub title: String,
    pub path: String,
}

impl DocRef {
    /// Placeholder reference attached to reports and analysis requests.
    pub fn session_log() -> Self {
        Self {
            title: "Session log".into(),
            path: "local".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRequest {
    pub stats: StatsSummary,
    pub docs: Vec<DocRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub stats: StatsSummary,
    pub docs: Vec<DocRef>,
    pub conversation_history: Vec<Turn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdviceResponse {
    #[serde(default)]
    pub text: String,
}
