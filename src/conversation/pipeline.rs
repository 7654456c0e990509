use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use log::{error, info, warn};

use crate::error::PipelineError;
use crate::models::{
    ChatRequest, DocRef, ReportRequest, RequestKind, StatsSummary, Turn,
};
use crate::ui::{UiEvent, UiSink};

use super::client::AdviceClient;

pub const ANALYSIS_PROMPT: &str = "Please analyze my current state.";

const EMPTY_REPORT: &str = "No result.";
const EMPTY_REPLY: &str = "No response could be generated.";

/// Held for the lifetime of one request; releases the kind's slot on drop,
/// whichever way the request ends.
struct InFlight {
    flag: Arc<AtomicBool>,
}

impl InFlight {
    fn acquire(flag: &Arc<AtomicBool>, kind: RequestKind) -> Result<Self, PipelineError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| PipelineError::Busy(kind))?;
        Ok(Self {
            flag: Arc::clone(flag),
        })
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// The turns of the current conversation. `epoch` moves on every clear so
/// replies to a cleared conversation can be recognised.
#[derive(Debug, Default)]
struct Transcript {
    turns: Vec<Turn>,
    epoch: u64,
}

fn lock(transcript: &Mutex<Transcript>) -> MutexGuard<'_, Transcript> {
    transcript
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn fail(sink: &dyn UiSink, kind: RequestKind, err: &PipelineError) {
    sink.emit(UiEvent::AdviceFailed {
        kind,
        message: err.to_string(),
    });
}

fn non_empty(text: String, fallback: &str) -> String {
    if text.trim().is_empty() {
        fallback.to_string()
    } else {
        text
    }
}

/// Report and chat requests against the advice service, plus the chat
/// transcript. Cheap to clone; clones share the transcript and the guards.
///
/// Each request is split in two. `begin_*` runs synchronously on the
/// caller: it takes the in-flight slot, checks for telemetry and records the
/// user turn. The returned pending request does the network round trip and
/// may be moved to another task.
#[derive(Clone)]
pub struct ConversationPipeline {
    client: Arc<dyn AdviceClient>,
    sink: Arc<dyn UiSink>,
    transcript: Arc<Mutex<Transcript>>,
    report_in_flight: Arc<AtomicBool>,
    chat_in_flight: Arc<AtomicBool>,
}

impl ConversationPipeline {
    pub fn new(client: Arc<dyn AdviceClient>, sink: Arc<dyn UiSink>) -> Self {
        Self {
            client,
            sink,
            transcript: Arc::new(Mutex::new(Transcript::default())),
            report_in_flight: Arc::new(AtomicBool::new(false)),
            chat_in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_in_flight(&self, kind: RequestKind) -> bool {
        self.flag(kind).load(Ordering::Acquire)
    }

    fn flag(&self, kind: RequestKind) -> &Arc<AtomicBool> {
        match kind {
            RequestKind::Report => &self.report_in_flight,
            RequestKind::Chat => &self.chat_in_flight,
        }
    }

    pub fn transcript(&self) -> Vec<Turn> {
        lock(&self.transcript).turns.clone()
    }

    /// Starts a new conversation. Replies still in flight for the old one
    /// are discarded when they land.
    pub fn clear_transcript(&self) {
        {
            let mut transcript = lock(&self.transcript);
            transcript.turns.clear();
            transcript.epoch += 1;
        }
        self.sink.emit(UiEvent::TranscriptCleared);
    }

    /// Claims the report slot. Leaves the transcript untouched.
    pub fn begin_report(
        &self,
        stats: Option<StatsSummary>,
    ) -> Result<PendingReport, PipelineError> {
        let kind = RequestKind::Report;
        let guard = self.acquire(kind)?;
        let stats = self.require_stats(kind, stats)?;

        self.sink.emit(UiEvent::RequestStarted { kind });
        Ok(PendingReport {
            client: Arc::clone(&self.client),
            sink: Arc::clone(&self.sink),
            request: ReportRequest {
                stats,
                docs: vec![DocRef::session_log()],
            },
            _guard: guard,
        })
    }

    /// Claims the chat slot for a free-form message. Blank messages are
    /// ignored.
    pub fn begin_chat(
        &self,
        stats: Option<StatsSummary>,
        message: &str,
    ) -> Result<PendingChat, PipelineError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(PipelineError::EmptyMessage);
        }
        self.begin_exchange(stats, message, Vec::new(), Some(message.to_owned()))
    }

    /// Claims the chat slot to ask for an analysis of the current state.
    pub fn begin_analysis(
        &self,
        stats: Option<StatsSummary>,
    ) -> Result<PendingChat, PipelineError> {
        self.begin_exchange(stats, ANALYSIS_PROMPT, vec![DocRef::session_log()], None)
    }

    pub async fn request_report(
        &self,
        stats: Option<StatsSummary>,
    ) -> Result<String, PipelineError> {
        self.begin_report(stats)?.send().await
    }

    pub async fn send_chat(
        &self,
        stats: Option<StatsSummary>,
        message: &str,
    ) -> Result<String, PipelineError> {
        self.begin_chat(stats, message)?.send().await
    }

    pub async fn analyze(&self, stats: Option<StatsSummary>) -> Result<String, PipelineError> {
        self.begin_analysis(stats)?.send().await
    }

    fn begin_exchange(
        &self,
        stats: Option<StatsSummary>,
        prompt: &str,
        docs: Vec<DocRef>,
        user_message: Option<String>,
    ) -> Result<PendingChat, PipelineError> {
        let kind = RequestKind::Chat;
        let guard = self.acquire(kind)?;
        let stats = self.require_stats(kind, stats)?;

        let turn = Turn::user(prompt);
        let (history, epoch) = {
            let mut transcript = lock(&self.transcript);
            transcript.turns.push(turn.clone());
            let history = transcript
                .turns
                .iter()
                .filter(|turn| !turn.notice)
                .cloned()
                .collect::<Vec<_>>();
            (history, transcript.epoch)
        };
        self.sink.emit(UiEvent::TranscriptAppended { turn });
        self.sink.emit(UiEvent::RequestStarted { kind });

        Ok(PendingChat {
            client: Arc::clone(&self.client),
            sink: Arc::clone(&self.sink),
            transcript: Arc::clone(&self.transcript),
            request: ChatRequest {
                stats,
                docs,
                conversation_history: history,
                user_message,
            },
            epoch,
            _guard: guard,
        })
    }

    fn acquire(&self, kind: RequestKind) -> Result<InFlight, PipelineError> {
        InFlight::acquire(self.flag(kind), kind).inspect_err(|err| {
            warn!("rejected {kind} request: {err}");
            fail(self.sink.as_ref(), kind, err);
        })
    }

    fn require_stats(
        &self,
        kind: RequestKind,
        stats: Option<StatsSummary>,
    ) -> Result<StatsSummary, PipelineError> {
        stats.ok_or_else(|| {
            let err = PipelineError::DataNotReady;
            fail(self.sink.as_ref(), kind, &err);
            err
        })
    }
}

/// A report that holds the report slot until it resolves.
pub struct PendingReport {
    client: Arc<dyn AdviceClient>,
    sink: Arc<dyn UiSink>,
    request: ReportRequest,
    _guard: InFlight,
}

impl PendingReport {
    pub async fn send(self) -> Result<String, PipelineError> {
        let kind = RequestKind::Report;
        match self.client.report(&self.request).await {
            Ok(response) => {
                let text = non_empty(response.text, EMPTY_REPORT);
                info!("report ready ({} chars)", text.len());
                self.sink.emit(UiEvent::AdviceReady {
                    kind,
                    text: text.clone(),
                });
                Ok(text)
            }
            Err(err) => {
                error!("report request failed: {err}");
                fail(self.sink.as_ref(), kind, &err);
                Err(err)
            }
        }
    }
}

/// A chat turn whose user half is already in the transcript.
pub struct PendingChat {
    client: Arc<dyn AdviceClient>,
    sink: Arc<dyn UiSink>,
    transcript: Arc<Mutex<Transcript>>,
    request: ChatRequest,
    epoch: u64,
    _guard: InFlight,
}

impl PendingChat {
    pub async fn send(self) -> Result<String, PipelineError> {
        let kind = RequestKind::Chat;
        let result = self
            .client
            .chat(&self.request)
            .await
            .map(|response| non_empty(response.text, EMPTY_REPLY));

        if let Err(err) = &result {
            error!("chat request failed: {err}");
        }

        let turn = match &result {
            Ok(text) => Turn::assistant(text.clone()),
            Err(err) => Turn::notice(format!("An error occurred: {err}")),
        };
        {
            let mut transcript = lock(&self.transcript);
            if transcript.epoch != self.epoch {
                info!("conversation was cleared, discarding chat reply");
                return result;
            }
            transcript.turns.push(turn.clone());
        }
        self.sink.emit(UiEvent::TranscriptAppended { turn });

        match &result {
            Ok(text) => self.sink.emit(UiEvent::AdviceReady {
                kind,
                text: text.clone(),
            }),
            Err(err) => fail(self.sink.as_ref(), kind, err),
        }
        result
    }
}
