//! Treatment planning stage

use crate::llm::TextGenerator;
use crate::orchestrator::config::PipelineConfig;
use crate::orchestrator::error::StageError;
use crate::orchestrator::parser;
use crate::orchestrator::prompts::{self, TemplateId};
use crate::orchestrator::stages::{render_context, render_literature};
use crate::orchestrator::types::{LiteratureReference, MedicalContext, TreatmentPlan};
use tokio::time::timeout;

/// Generate a treatment plan for the primary diagnosis
pub async fn generate_treatment(
    llm: &dyn TextGenerator,
    config: &PipelineConfig,
    primary_diagnosis: &str,
    context: &MedicalContext,
    literature: &[LiteratureReference],
) -> Result<TreatmentPlan, StageError> {
    let medical_context = render_context(context);
    let literature_lines = render_literature(literature);

    let prompt = prompts::bind(
        TemplateId::Treatment,
        &[
            ("diagnosis", primary_diagnosis),
            ("age_group", context.age_group.as_str()),
            ("medical_context", &medical_context),
            ("literature", &literature_lines),
        ],
    )?;
    let params = config.generation_params(config.treatment_timeout);

    let raw = timeout(config.treatment_timeout, llm.generate(&prompt, &params))
        .await
        .map_err(|_| StageError::UpstreamTimeout)??;

    let treatment = parser::parse_treatment(&raw)?;

    tracing::debug!(
        first_line_len = treatment.first_line.len(),
        medications = treatment.dosing.len(),
        "Treatment plan generated"
    );

    Ok(treatment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::testing::{fixtures, markers, Reply, ScriptedLlm};
    use crate::orchestrator::types::{AgeGroup, Severity};
    use std::collections::BTreeSet;

    fn infant_context() -> MedicalContext {
        MedicalContext {
            symptoms: BTreeSet::from(["fever".to_string()]),
            age_group: AgeGroup::Infant,
            severity: Severity::Moderate,
            contraindications: BTreeSet::new(),
            relevant_history: vec![],
        }
    }

    #[tokio::test]
    async fn test_treat_happy_path() {
        let llm = ScriptedLlm::new(vec![(
            markers::TREATMENT,
            Reply::Text(fixtures::TREATMENT_JSON),
        )]);
        let treatment = generate_treatment(
            &llm,
            &PipelineConfig::default(),
            "Serious bacterial infection",
            &infant_context(),
            &[],
        )
        .await
        .unwrap();
        assert!(treatment.first_line.contains("IV antibiotics"));
        assert!(treatment.dosing.contains_key("ceftriaxone"));
    }

    #[tokio::test]
    async fn test_treat_upstream_timeout() {
        let llm = ScriptedLlm::new(vec![(markers::TREATMENT, Reply::Timeout)]);
        let result = generate_treatment(
            &llm,
            &PipelineConfig::default(),
            "Bronchiolitis",
            &infant_context(),
            &[],
        )
        .await;
        assert!(matches!(result, Err(StageError::UpstreamTimeout)));
    }

    #[tokio::test]
    async fn test_treat_malformed_output() {
        let llm = ScriptedLlm::new(vec![(markers::TREATMENT, Reply::Text("not json"))]);
        let result = generate_treatment(
            &llm,
            &PipelineConfig::default(),
            "Bronchiolitis",
            &infant_context(),
            &[],
        )
        .await;
        assert!(matches!(result, Err(StageError::MalformedOutput { .. })));
    }
}
