//! Differential diagnosis stage
//!
//! Hard dependency of the pipeline: without a primary diagnosis there is
//! nothing downstream stages can safely build on.

use crate::llm::TextGenerator;
use crate::orchestrator::config::PipelineConfig;
use crate::orchestrator::error::StageError;
use crate::orchestrator::parser;
use crate::orchestrator::prompts::{self, TemplateId};
use crate::orchestrator::stages::{render_context, render_literature};
use crate::orchestrator::types::{DifferentialDiagnosis, LiteratureReference, MedicalContext};
use tokio::time::timeout;

/// Generate a differential diagnosis from the extracted context and
/// whatever literature was retrieved (possibly none)
pub async fn generate_diagnosis(
    llm: &dyn TextGenerator,
    config: &PipelineConfig,
    context: &MedicalContext,
    literature: &[LiteratureReference],
) -> Result<DifferentialDiagnosis, StageError> {
    let symptoms = context
        .symptoms
        .iter()
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");
    let medical_context = render_context(context);
    let literature_lines = render_literature(literature);

    let prompt = prompts::bind(
        TemplateId::Diagnosis,
        &[
            ("age_group", context.age_group.as_str()),
            ("symptoms", &symptoms),
            ("medical_context", &medical_context),
            ("literature", &literature_lines),
        ],
    )?;
    let params = config.generation_params(config.diagnosis_timeout);

    let raw = timeout(config.diagnosis_timeout, llm.generate(&prompt, &params))
        .await
        .map_err(|_| StageError::UpstreamTimeout)??;

    let diagnosis = parser::parse_diagnosis(&raw)?;

    tracing::debug!(
        primary = %diagnosis.primary,
        alternatives = diagnosis.alternatives.len(),
        red_flags = diagnosis.red_flags.len(),
        "Differential diagnosis generated"
    );

    Ok(diagnosis)
}
