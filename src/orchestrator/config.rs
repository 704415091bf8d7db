//! Pipeline configuration
//!
//! Centralized knobs for the orchestration pipeline: per-stage timeouts,
//! literature retrieval limits, and LLM sampling parameters.

use crate::llm::GenerationParams;
use std::time::Duration;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Timeout for the classifier LLM call
    pub classifier_timeout: Duration,
    /// Timeout for the context-extraction LLM call
    pub extraction_timeout: Duration,
    /// Timeout for the literature search call
    pub literature_timeout: Duration,
    /// Timeout for the diagnosis LLM call
    pub diagnosis_timeout: Duration,
    /// Timeout for the treatment LLM call
    pub treatment_timeout: Duration,
    /// Timeout for the safety-validation LLM call
    pub safety_timeout: Duration,
    /// Deadline for the whole run; expiry cancels in-flight calls
    pub pipeline_timeout: Duration,
    /// Maximum number of literature references to keep
    pub literature_limit: usize,
    /// Minimum relevance score for literature references
    pub literature_threshold: f32,
    /// Sampling temperature for LLM calls
    pub temperature: f32,
    /// Maximum tokens per LLM call
    pub max_tokens: u32,
    /// Nucleus-sampling parameter for LLM calls
    pub top_p: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            classifier_timeout: Duration::from_secs(30),
            extraction_timeout: Duration::from_secs(30),
            literature_timeout: Duration::from_secs(10),
            diagnosis_timeout: Duration::from_secs(30),
            treatment_timeout: Duration::from_secs(30),
            safety_timeout: Duration::from_secs(30),
            pipeline_timeout: Duration::from_secs(120),
            literature_limit: 5,
            literature_threshold: 0.7,
            // Low temperature for medical accuracy
            temperature: 0.2,
            max_tokens: 2048,
            top_p: 0.9,
        }
    }
}

impl PipelineConfig {
    /// Generation parameters for an LLM stage with the given timeout
    pub fn generation_params(&self, timeout: Duration) -> GenerationParams {
        GenerationParams {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            top_p: self.top_p,
            timeout,
        }
    }
}
