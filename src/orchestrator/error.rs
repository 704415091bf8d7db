//! Pipeline-specific error types
//!
//! The stage error taxonomy is deliberately small: every stage failure the
//! orchestrator routes on is a timeout, an unavailable upstream, malformed
//! LLM output, or a cancelled run.

use crate::llm::{LlmError, SearchError};
use crate::orchestrator::parser::ShapeTag;
use crate::orchestrator::prompts::TemplateId;
use thiserror::Error;

/// Failure of a single stage adapter
#[derive(Error, Debug)]
pub enum StageError {
    /// External call exceeded the stage's timeout
    #[error("upstream call timed out")]
    UpstreamTimeout,

    /// External service failed for a non-timeout reason
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// LLM output did not match the expected shape
    #[error("malformed {shape} output: {snippet}")]
    MalformedOutput {
        /// Which shape was expected
        shape: ShapeTag,
        /// Leading fragment of the raw output, for diagnostics
        snippet: String,
    },

    /// The whole pipeline run was cancelled (caller deadline expired)
    #[error("pipeline run cancelled")]
    Cancelled,
}

impl From<LlmError> for StageError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::Timeout => StageError::UpstreamTimeout,
            other => StageError::UpstreamUnavailable(other.to_string()),
        }
    }
}

impl From<SearchError> for StageError {
    fn from(e: SearchError) -> Self {
        match e {
            SearchError::Timeout => StageError::UpstreamTimeout,
            other => StageError::UpstreamUnavailable(other.to_string()),
        }
    }
}

impl From<ParseError> for StageError {
    fn from(e: ParseError) -> Self {
        StageError::MalformedOutput {
            shape: e.shape,
            snippet: e.snippet,
        }
    }
}

impl From<PromptError> for StageError {
    fn from(e: PromptError) -> Self {
        // A bind failure means stage code and template disagree; surface it
        // rather than panic, the run degrades like any other stage failure.
        StageError::UpstreamUnavailable(format!("prompt binding failed: {e}"))
    }
}

/// Parse/validation failure of LLM output against an expected shape
///
/// Never produced for partially valid output: the parser either yields a
/// fully populated value or this error.
#[derive(Error, Debug)]
#[error("malformed {shape} output: {snippet}")]
pub struct ParseError {
    /// Which shape was expected
    pub shape: ShapeTag,
    /// Leading fragment of the raw output, for diagnostics
    pub snippet: String,
}

impl ParseError {
    /// Build an error carrying a bounded snippet of the offending output
    pub fn new(shape: ShapeTag, raw: &str) -> Self {
        const SNIPPET_LEN: usize = 200;
        let snippet = raw.chars().take(SNIPPET_LEN).collect();
        Self { shape, snippet }
    }
}

/// Prompt binding failure
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PromptError {
    /// A required placeholder has no bound value
    #[error("template {template} is missing required variable '{name}'")]
    MissingVariable {
        /// Template being bound
        template: TemplateId,
        /// Name of the unbound placeholder
        name: &'static str,
    },
}
