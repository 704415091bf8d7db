//! Query classification stage
//!
//! First stage of every run: routes the raw query into one of the closed
//! category/urgency vocabularies so downstream stages know what they are
//! working with.

use crate::llm::TextGenerator;
use crate::orchestrator::config::PipelineConfig;
use crate::orchestrator::error::StageError;
use crate::orchestrator::parser;
use crate::orchestrator::prompts::{self, TemplateId};
use crate::orchestrator::types::QueryClassification;
use tokio::time::timeout;

/// Classify the raw query text
pub async fn classify_query(
    llm: &dyn TextGenerator,
    config: &PipelineConfig,
    query_text: &str,
) -> Result<QueryClassification, StageError> {
    let prompt = prompts::bind(TemplateId::Classification, &[("query", query_text)])?;
    let params = config.generation_params(config.classifier_timeout);

    let raw = timeout(config.classifier_timeout, llm.generate(&prompt, &params))
        .await
        .map_err(|_| StageError::UpstreamTimeout)??;

    let classification = parser::parse_classification(&raw)?;

    tracing::debug!(
        category = %classification.category,
        urgency = %classification.urgency,
        confidence = classification.confidence,
        "Query classified"
    );

    Ok(classification)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::testing::{fixtures, markers, Reply, ScriptedLlm};
    use crate::orchestrator::types::{QueryCategory, Urgency};
    use std::time::Duration;

    #[tokio::test]
    async fn test_classify_happy_path() {
        let llm = ScriptedLlm::new(vec![(
            markers::CLASSIFICATION,
            Reply::Text(fixtures::CLASSIFICATION_JSON),
        )]);
        let classification = classify_query(&llm, &PipelineConfig::default(), "fever")
            .await
            .unwrap();
        assert_eq!(classification.category, QueryCategory::SymptomAssessment);
        assert_eq!(classification.urgency, Urgency::Urgent);
    }

    #[tokio::test]
    async fn test_classify_malformed_output() {
        let llm = ScriptedLlm::new(vec![(
            markers::CLASSIFICATION,
            Reply::Text("I cannot classify this."),
        )]);
        let result = classify_query(&llm, &PipelineConfig::default(), "fever").await;
        assert!(matches!(result, Err(StageError::MalformedOutput { .. })));
    }

    #[tokio::test]
    async fn test_classify_upstream_timeout() {
        let llm = ScriptedLlm::new(vec![(markers::CLASSIFICATION, Reply::Timeout)]);
        let result = classify_query(&llm, &PipelineConfig::default(), "fever").await;
        assert!(matches!(result, Err(StageError::UpstreamTimeout)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_classify_stage_timeout_bounds_slow_upstream() {
        let llm = ScriptedLlm::new(vec![(
            markers::CLASSIFICATION,
            Reply::Sleep(Duration::from_secs(60), fixtures::CLASSIFICATION_JSON),
        )]);
        let config = PipelineConfig::default();
        let result = classify_query(&llm, &config, "fever").await;
        assert!(matches!(result, Err(StageError::UpstreamTimeout)));
    }
}
