//! Per-request question answering.

use serde::Serialize;
use thiserror::Error;

mod service;

pub use service::QueryService;

/// Lifecycle of one question.
///
/// `Received → Validated → Embedded → Retrieved → Answered`, with `Rejected`
/// for blank input and `Failed` for any collaborator error after validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStage {
    Received,
    Validated,
    Embedded,
    Retrieved,
    Answered,
    Rejected,
    Failed,
}

impl std::fmt::Display for RequestStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            RequestStage::Received => "received",
            RequestStage::Validated => "validated",
            RequestStage::Embedded => "embedded",
            RequestStage::Retrieved => "retrieved",
            RequestStage::Answered => "answered",
            RequestStage::Rejected => "rejected",
            RequestStage::Failed => "failed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("Please enter a message.")]
    InvalidInput,
}

/// A retrieved chunk as reported back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceRef {
    pub source: String,
    pub chunk_index: usize,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<SourceRef>,
    /// True when `text` is the configured fallback rather than generated.
    pub fallback: bool,
}
