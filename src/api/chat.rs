//! Orchestrated chat API handlers
//!
//! `POST /api/chat/orchestrated` runs one query through the diagnostic
//! pipeline and persists the conversation artifacts. This layer is the
//! pipeline's caller: it distinguishes completed results from fallbacks
//! before anything is stored, so a degraded apology can never be recorded
//! as clinical output.

use crate::chat::models::{DiagnosticWorkflow, Message, MessageRole};
use crate::error::AppError;
use crate::orchestrator::types::{
    AlternativeDiagnosis, DiagnosticResult, LiteratureReference, MedicalQuery, PipelineOutcome,
    ReasoningTrace, TreatmentPlan,
};
use crate::state::AppState;
use anyhow::anyhow;
use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Request body for the orchestrated chat endpoint
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratedChatRequest {
    /// The medical query text
    pub message: String,
    /// Session identifier
    pub session_id: String,
    /// Conversation to append to; defaults to the session id
    pub conversation_id: Option<String>,
}

/// Diagnostic portion of a successful response
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticSummary {
    pub primary_diagnosis: String,
    pub differential_diagnoses: Vec<AlternativeDiagnosis>,
    pub red_flags: BTreeSet<String>,
    pub investigations: BTreeSet<String>,
}

/// Response body for the orchestrated chat endpoint
///
/// `success` is the contract with downstream persistence and display logic:
/// a `false` response is a degraded apology, never a diagnosis.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratedChatResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<DiagnosticSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub treatment: Option<TreatmentPlan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<LiteratureReference>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    pub reasoning: ReasoningTrace,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// POST /api/chat/orchestrated - run the diagnostic pipeline for a query
pub async fn chat_orchestrated(
    State(state): State<Arc<AppState>>,
    Json(request): Json<OrchestratedChatRequest>,
) -> Result<Json<OrchestratedChatResponse>, AppError> {
    if request.message.trim().is_empty() || request.session_id.trim().is_empty() {
        return Err(AppError::InvalidRequest(
            "message and sessionId are required".to_string(),
        ));
    }

    let conversation_id = request
        .conversation_id
        .clone()
        .unwrap_or_else(|| request.session_id.clone());
    ensure_conversation(&state, &conversation_id, &request.message).await?;

    let user_message = Message::new(
        Uuid::new_v4().to_string(),
        conversation_id.clone(),
        MessageRole::User,
        request.message.clone(),
    );
    state.db.add_message(&user_message).await?;

    let query = MedicalQuery::new(request.message.clone(), request.session_id.clone());
    let started = Instant::now();
    let outcome = state.orchestrator.run(&query).await;
    let latency_ms = started.elapsed().as_millis() as u64;

    match outcome {
        PipelineOutcome::Completed(result) => {
            let formatted = format_diagnostic_response(&result);

            let workflow = DiagnosticWorkflow::new(
                Uuid::new_v4().to_string(),
                request.session_id.clone(),
                serde_json::to_string(&result)
                    .map_err(|e| AppError::Internal(anyhow!("serialize step_data: {e}")))?,
                serde_json::to_string(result.reasoning.entries())
                    .map_err(|e| AppError::Internal(anyhow!("serialize completed_steps: {e}")))?,
                confidence_scores(&result).to_string(),
            );
            state.db.record_workflow(&workflow).await?;

            let sources_json = serde_json::to_string(&result.literature)
                .map_err(|e| AppError::Internal(anyhow!("serialize sources: {e}")))?;
            let assistant_message = Message::new(
                Uuid::new_v4().to_string(),
                conversation_id,
                MessageRole::Assistant,
                formatted.clone(),
            )
            .with_confidence(f64::from(result.confidence))
            .with_sources(sources_json);
            state.db.add_message(&assistant_message).await?;

            Ok(Json(OrchestratedChatResponse {
                success: true,
                message: formatted,
                diagnostic: Some(DiagnosticSummary {
                    primary_diagnosis: result.diagnosis.primary.clone(),
                    differential_diagnoses: result.diagnosis.alternatives.clone(),
                    red_flags: result.diagnosis.red_flags.clone(),
                    investigations: result.diagnosis.investigations.clone(),
                }),
                treatment: Some(result.treatment),
                sources: Some(result.literature),
                confidence: Some(result.confidence),
                reasoning: result.reasoning,
                latency_ms,
                error: None,
            }))
        }
        PipelineOutcome::FallenBack(fallback) => {
            // Apology goes into the conversation; no workflow record is
            // written, so the store never mistakes this for a diagnosis.
            let assistant_message = Message::new(
                Uuid::new_v4().to_string(),
                conversation_id,
                MessageRole::Assistant,
                fallback.message.clone(),
            );
            state.db.add_message(&assistant_message).await?;

            Ok(Json(OrchestratedChatResponse {
                success: false,
                message: fallback.message,
                diagnostic: None,
                treatment: None,
                sources: None,
                confidence: None,
                reasoning: fallback.reasoning,
                latency_ms,
                error: Some("pipeline fell back to a degraded response".to_string()),
            }))
        }
    }
}

/// GET /api/conversations - list conversations, most recent first
pub async fn list_conversations(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<crate::chat::models::Conversation>>, AppError> {
    Ok(Json(state.db.get_conversations().await?))
}

/// GET /api/conversations/:id/messages - messages of one conversation
pub async fn get_conversation_messages(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Message>>, AppError> {
    if state.db.get_conversation(&id).await?.is_none() {
        return Err(AppError::ConversationNotFound(id));
    }
    Ok(Json(state.db.get_messages(&id).await?))
}

/// Create the conversation row on first contact
async fn ensure_conversation(
    state: &AppState,
    conversation_id: &str,
    first_message: &str,
) -> Result<(), AppError> {
    if state.db.get_conversation(conversation_id).await?.is_some() {
        return Ok(());
    }
    let title: String = first_message.chars().take(60).collect();
    let conversation =
        crate::chat::models::Conversation::new(conversation_id.to_string(), title);
    state.db.create_conversation(&conversation).await
}

/// Per-stage confidence scores persisted with the workflow record
fn confidence_scores(result: &DiagnosticResult) -> serde_json::Value {
    serde_json::json!({
        "classification": result.confidence,
        "diagnosis": result
            .diagnosis
            .alternatives
            .first()
            .map(|alt| alt.probability)
            .unwrap_or(0.0),
    })
}

/// Render a diagnostic result as markdown for display
fn format_diagnostic_response(result: &DiagnosticResult) -> String {
    let mut markdown = String::new();

    markdown.push_str("## Clinical Analysis\n\n");
    markdown.push_str(&format!(
        "**Query Classification:** {}\n",
        result.classification.category
    ));
    markdown.push_str(&format!(
        "**Confidence Level:** {:.1}%\n\n",
        result.confidence * 100.0
    ));

    markdown.push_str("## Differential Diagnosis\n\n");
    markdown.push_str("### Primary Diagnosis\n");
    markdown.push_str(&format!("**{}**\n\n", result.diagnosis.primary));

    if !result.diagnosis.alternatives.is_empty() {
        markdown.push_str("### Alternative Diagnoses\n");
        for (idx, alt) in result.diagnosis.alternatives.iter().enumerate() {
            markdown.push_str(&format!(
                "{}. **{}** ({:.1}%)\n   - {}\n",
                idx + 1,
                alt.diagnosis,
                alt.probability * 100.0,
                alt.reasoning
            ));
        }
        markdown.push('\n');
    }

    if !result.diagnosis.red_flags.is_empty() {
        markdown.push_str("## ⚠️ Red Flags\n\n");
        for flag in &result.diagnosis.red_flags {
            markdown.push_str(&format!("- **{flag}**\n"));
        }
        markdown.push('\n');
    }

    if !result.diagnosis.investigations.is_empty() {
        markdown.push_str("## Recommended Investigations\n\n");
        for investigation in &result.diagnosis.investigations {
            markdown.push_str(&format!("- {investigation}\n"));
        }
        markdown.push('\n');
    }

    markdown.push_str("## Treatment Plan\n\n");
    markdown.push_str("### First-Line Treatment\n");
    markdown.push_str(&format!("{}\n\n", result.treatment.first_line));

    if !result.treatment.dosing.is_empty() {
        markdown.push_str("### Dosing\n");
        for (medication, dose) in &result.treatment.dosing {
            markdown.push_str(&format!("- **{medication}:** {dose}\n"));
        }
        markdown.push('\n');
    }

    if !result.treatment.alternatives.is_empty() {
        markdown.push_str("### Alternative Treatments\n");
        for alternative in &result.treatment.alternatives {
            markdown.push_str(&format!("- {alternative}\n"));
        }
        markdown.push('\n');
    }

    if !result.treatment.monitoring.is_empty() {
        markdown.push_str("### Monitoring Parameters\n");
        for parameter in &result.treatment.monitoring {
            markdown.push_str(&format!("- {parameter}\n"));
        }
        markdown.push('\n');
    }

    if !result.treatment.escalation_criteria.is_empty() {
        markdown.push_str("### When to Escalate Care\n");
        for criterion in &result.treatment.escalation_criteria {
            markdown.push_str(&format!("- {criterion}\n"));
        }
        markdown.push('\n');
    }

    if !result.treatment.parental_education.is_empty() {
        markdown.push_str("### Parental Education\n");
        for point in &result.treatment.parental_education {
            markdown.push_str(&format!("- {point}\n"));
        }
        markdown.push('\n');
    }

    if !result.safety.warnings.is_empty() {
        markdown.push_str("## Safety Warnings\n\n");
        for warning in &result.safety.warnings {
            markdown.push_str(&format!("- ⚠️ {warning}\n"));
        }
        markdown.push('\n');
    }

    if !result.literature.is_empty() {
        markdown.push_str("## 📚 Medical Sources\n\n");
        for (idx, source) in result.literature.iter().enumerate() {
            markdown.push_str(&format!(
                "{}. **{}** - Page {}\n   Confidence: {:.1}%\n",
                idx + 1,
                source.title,
                source.page,
                source.relevance * 100.0
            ));
        }
    }

    markdown
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::ChatDb;
    use crate::orchestrator::testing::{
        fixtures, markers, FakeSearch, Reply, ScriptedLlm, SearchBehavior,
    };
    use crate::orchestrator::MedicalOrchestrator;
    use tempfile::tempdir;

    async fn test_state(
        script: Vec<(&'static str, Reply)>,
        search: SearchBehavior,
    ) -> (Arc<AppState>, tempfile::TempDir) {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("test.db");
        let db = ChatDb::new(path.to_str().unwrap()).await.unwrap();
        let orchestrator = MedicalOrchestrator::new(
            Arc::new(ScriptedLlm::new(script)),
            Arc::new(FakeSearch { behavior: search }),
        );
        (Arc::new(AppState::new(orchestrator, db)), dir)
    }

    fn happy_script() -> Vec<(&'static str, Reply)> {
        vec![
            (markers::CLASSIFICATION, Reply::Text(fixtures::CLASSIFICATION_JSON)),
            (markers::CONTEXT, Reply::Text(fixtures::CONTEXT_JSON)),
            (markers::DIAGNOSIS, Reply::Text(fixtures::DIAGNOSIS_JSON)),
            (markers::TREATMENT, Reply::Text(fixtures::TREATMENT_JSON)),
            (markers::SAFETY, Reply::Text(fixtures::SAFETY_JSON)),
        ]
    }

    fn request(message: &str) -> OrchestratedChatRequest {
        OrchestratedChatRequest {
            message: message.to_string(),
            session_id: "session-1".to_string(),
            conversation_id: None,
        }
    }

    #[tokio::test]
    async fn test_chat_rejects_missing_fields() {
        let (state, _dir) = test_state(happy_script(), SearchBehavior::Empty).await;
        let result = chat_orchestrated(State(state), Json(request("   "))).await;
        assert!(matches!(result, Err(AppError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_chat_success_persists_workflow_and_messages() {
        let (state, _dir) = test_state(happy_script(), SearchBehavior::Empty).await;
        let response = chat_orchestrated(
            State(state.clone()),
            Json(request("3-month-old infant with fever and poor feeding")),
        )
        .await
        .unwrap();

        assert!(response.0.success);
        assert!(response.0.message.contains("## Clinical Analysis"));
        assert_eq!(response.0.reasoning.len(), 6);

        let workflows = state.db.get_workflows("session-1").await.unwrap();
        assert_eq!(workflows.len(), 1);

        let messages = state.db.get_messages("session-1").await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "user");
        assert_eq!(messages[1].role, "assistant");
        assert!(messages[1].confidence.is_some());
    }

    #[tokio::test]
    async fn test_chat_fallback_skips_workflow_record() {
        let mut script = happy_script();
        script[0] = (markers::CLASSIFICATION, Reply::Unavailable);
        let (state, _dir) = test_state(script, SearchBehavior::Empty).await;

        let response = chat_orchestrated(
            State(state.clone()),
            Json(request("fever in my infant")),
        )
        .await
        .unwrap();

        assert!(!response.0.success);
        assert!(response.0.error.is_some());
        assert!(response.0.diagnostic.is_none());
        assert!(response.0.message.contains("fever in my infant"));

        // No workflow record for a fallback; the apology is a plain message
        let workflows = state.db.get_workflows("session-1").await.unwrap();
        assert!(workflows.is_empty());
        let messages = state.db.get_messages("session-1").await.unwrap();
        assert_eq!(messages.len(), 2);
        assert!(messages[1].content.contains("unable to process"));
    }

    #[tokio::test]
    async fn test_conversation_listing_endpoints() {
        let (state, _dir) = test_state(happy_script(), SearchBehavior::Empty).await;
        chat_orchestrated(State(state.clone()), Json(request("fever")))
            .await
            .unwrap();

        let conversations = list_conversations(State(state.clone())).await.unwrap();
        assert_eq!(conversations.0.len(), 1);

        let messages = get_conversation_messages(
            State(state.clone()),
            Path("session-1".to_string()),
        )
        .await
        .unwrap();
        assert_eq!(messages.0.len(), 2);

        let missing =
            get_conversation_messages(State(state), Path("nope".to_string())).await;
        assert!(matches!(missing, Err(AppError::ConversationNotFound(_))));
    }

    #[test]
    fn test_format_diagnostic_response_sections() {
        use crate::orchestrator::types::*;
        use std::collections::{BTreeMap, BTreeSet};

        let result = DiagnosticResult {
            classification: QueryClassification {
                category: QueryCategory::SymptomAssessment,
                confidence: 0.9,
                urgency: Urgency::Urgent,
                specialty: "pediatrics".to_string(),
            },
            confidence: 0.9,
            diagnosis: DifferentialDiagnosis {
                primary: "Bronchiolitis".to_string(),
                alternatives: vec![AlternativeDiagnosis {
                    diagnosis: "Pneumonia".to_string(),
                    probability: 0.2,
                    reasoning: "no focal findings".to_string(),
                }],
                red_flags: BTreeSet::from(["grunting".to_string()]),
                investigations: BTreeSet::from(["pulse oximetry".to_string()]),
            },
            treatment: TreatmentPlan {
                first_line: "Supportive care with nasal suctioning".to_string(),
                alternatives: vec![],
                dosing: BTreeMap::from([(
                    "paracetamol".to_string(),
                    "15 mg/kg q6h PRN".to_string(),
                )]),
                monitoring: vec!["work of breathing".to_string()],
                escalation_criteria: vec!["oxygen saturation below 92%".to_string()],
                parental_education: vec!["small frequent feeds".to_string()],
            },
            literature: vec![LiteratureReference {
                title: "Bronchiolitis".to_string(),
                page: 2044,
                excerpt: String::new(),
                relevance: 0.88,
            }],
            safety: SafetyAssessment {
                is_safe: true,
                warnings: vec![],
                requires_escalation: false,
            },
            reasoning: ReasoningTrace::new(),
        };

        let markdown = format_diagnostic_response(&result);
        assert!(markdown.contains("## Clinical Analysis"));
        assert!(markdown.contains("**Bronchiolitis**"));
        assert!(markdown.contains("1. **Pneumonia** (20.0%)"));
        assert!(markdown.contains("## ⚠️ Red Flags"));
        assert!(markdown.contains("- **paracetamol:** 15 mg/kg q6h PRN"));
        assert!(markdown.contains("### When to Escalate Care"));
        assert!(markdown.contains("**Bronchiolitis** - Page 2044"));
    }
}
