//! Report and chat requests against the advice service.

pub mod client;
pub mod pipeline;

pub use client::{AdviceClient, HttpAdviceClient};
pub use pipeline::{ConversationPipeline, PendingChat, PendingReport, ANALYSIS_PROMPT};
