//! Safety validation stage
//!
//! Last stage before assembly. A failure here never aborts the pipeline:
//! the orchestrator degrades to the conservative
//! [`SafetyAssessment::degraded`](crate::orchestrator::types::SafetyAssessment::degraded)
//! default, which escalates rather than approves.

use crate::llm::TextGenerator;
use crate::orchestrator::config::PipelineConfig;
use crate::orchestrator::error::StageError;
use crate::orchestrator::parser;
use crate::orchestrator::prompts::{self, TemplateId};
use crate::orchestrator::types::{SafetyAssessment, TreatmentPlan};
use tokio::time::timeout;

/// Validate the diagnosis/treatment pair against the original query
pub async fn validate_safety(
    llm: &dyn TextGenerator,
    config: &PipelineConfig,
    query_text: &str,
    primary_diagnosis: &str,
    treatment: &TreatmentPlan,
) -> Result<SafetyAssessment, StageError> {
    // TreatmentPlan serializes infallibly (string keys, no custom impls)
    let treatment_json =
        serde_json::to_string(treatment).unwrap_or_else(|_| "{}".to_string());

    let prompt = prompts::bind(
        TemplateId::Safety,
        &[
            ("query", query_text),
            ("diagnosis", primary_diagnosis),
            ("treatment", &treatment_json),
        ],
    )?;
    let params = config.generation_params(config.safety_timeout);

    let raw = timeout(config.safety_timeout, llm.generate(&prompt, &params))
        .await
        .map_err(|_| StageError::UpstreamTimeout)??;

    let assessment = parser::parse_safety(&raw)?;

    tracing::debug!(
        is_safe = assessment.is_safe,
        warnings = assessment.warnings.len(),
        requires_escalation = assessment.requires_escalation,
        "Safety validation completed"
    );

    Ok(assessment)
}
