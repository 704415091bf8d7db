//! Medical context extraction stage
//!
//! Pulls symptoms, age group, severity, contraindications and history out of
//! the raw query text. Runs concurrently with literature retrieval.

use crate::llm::TextGenerator;
use crate::orchestrator::config::PipelineConfig;
use crate::orchestrator::error::StageError;
use crate::orchestrator::parser;
use crate::orchestrator::prompts::{self, TemplateId};
use crate::orchestrator::types::MedicalContext;
use tokio::time::timeout;

/// Extract structured medical context from the raw query text
pub async fn extract_context(
    llm: &dyn TextGenerator,
    config: &PipelineConfig,
    query_text: &str,
) -> Result<MedicalContext, StageError> {
    let prompt = prompts::bind(TemplateId::ContextExtraction, &[("query", query_text)])?;
    let params = config.generation_params(config.extraction_timeout);

    let raw = timeout(config.extraction_timeout, llm.generate(&prompt, &params))
        .await
        .map_err(|_| StageError::UpstreamTimeout)??;

    let context = parser::parse_context(&raw)?;

    tracing::debug!(
        age_group = %context.age_group,
        severity = %context.severity,
        symptom_count = context.symptoms.len(),
        "Medical context extracted"
    );

    Ok(context)
}
