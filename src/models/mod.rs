pub mod conversation;
pub mod snapshot;

pub use conversation::{
    AdviceResponse, ChatRequest, DocRef, ReportRequest, RequestKind, Role, StatsSummary, Turn,
};
pub use snapshot::{
    Cumulative, Features, FrameQuality, Indices, MeasurementSnapshot, StreamMessage,
};
