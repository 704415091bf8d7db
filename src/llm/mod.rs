//! External-service clients
//!
//! The pipeline talks to two external capabilities: a chat-completion LLM
//! service and a literature vector-search service. Both are consumed through
//! traits so the orchestrator can be exercised with in-memory fakes, and both
//! concrete clients hold a shared `reqwest::Client` that is safe to reuse
//! across concurrent pipeline invocations (stateless request/response).

pub mod api_client;
pub mod mistral_types;
pub mod search_client;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub use api_client::MistralClient;
pub use search_client::LiteratureIndexClient;

/// Per-request generation settings for an LLM call
#[derive(Debug, Clone)]
pub struct GenerationParams {
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum tokens to generate
    pub max_tokens: u32,
    /// Nucleus-sampling parameter
    pub top_p: f32,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for GenerationParams {
    fn default() -> Self {
        // Low temperature for medical accuracy
        Self {
            temperature: 0.2,
            max_tokens: 2048,
            top_p: 0.9,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Errors that can occur while calling the LLM service
#[derive(Error, Debug)]
pub enum LlmError {
    /// Request exceeded its timeout
    #[error("LLM request timed out")]
    Timeout,

    /// Service rejected the request for rate-limit/quota reasons (HTTP 429)
    #[error("LLM quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Transport failure or non-success HTTP status
    #[error("LLM service unavailable: {0}")]
    Unavailable(String),

    /// Response body could not be decoded into the expected wire shape
    #[error("Malformed LLM service response: {0}")]
    MalformedResponse(String),

    /// API key missing or empty
    #[error("LLM API key is not set")]
    MissingApiKey,
}

/// Errors that can occur while calling the literature index
#[derive(Error, Debug)]
pub enum SearchError {
    /// Request exceeded its timeout
    #[error("literature search timed out")]
    Timeout,

    /// Transport failure or non-success HTTP status
    #[error("literature index unavailable: {0}")]
    Unavailable(String),

    /// Response body could not be decoded into the expected wire shape
    #[error("malformed literature index response: {0}")]
    MalformedResponse(String),
}

/// Generates raw text from a prompt
///
/// Implemented by [`MistralClient`]; tests substitute in-memory fakes.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String, LlmError>;
}

/// Request to the literature index
#[derive(Debug, Clone, Serialize)]
pub struct SearchRequest {
    /// Raw query text
    pub query: String,
    /// Structured medical context available at call time (may be empty)
    pub context: serde_json::Value,
    /// Maximum number of passages to return
    pub limit: usize,
    /// Minimum relevance score
    pub threshold: f32,
}

/// One ranked passage returned by the literature index
#[derive(Debug, Clone, Deserialize)]
pub struct SearchHit {
    /// Source document title
    pub title: String,
    /// Page number within the source
    pub page: u32,
    /// Passage text
    #[serde(default)]
    pub excerpt: String,
    /// Relevance score reported by the index
    pub confidence: f32,
}

/// Retrieves ranked literature passages for a query
///
/// Implemented by [`LiteratureIndexClient`]; tests substitute in-memory fakes.
#[async_trait]
pub trait LiteratureSearch: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>, SearchError>;
}
