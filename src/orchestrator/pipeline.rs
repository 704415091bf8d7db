//! Pipeline orchestrator
//!
//! Drives one medical query through the stage sequence
//! `Classifying -> ExtractingAndSearching -> Diagnosing -> TreatmentPlanning
//! -> ValidatingSafety -> Assembled`, with `FallenBack` reachable from any
//! point before a validated treatment exists.
//!
//! Context extraction and literature retrieval fan out concurrently after
//! classification and are joined before diagnosis; the join never waits on
//! literature beyond its own timeout. The orchestrator is the single owner
//! of the reasoning trace, so entries land in pipeline-causal order even
//! when stages race. Each invocation owns its own trace and intermediate
//! state; the only shared resources are the injected client handles.

use crate::llm::{LiteratureSearch, TextGenerator};
use crate::orchestrator::assembler;
use crate::orchestrator::config::PipelineConfig;
use crate::orchestrator::error::StageError;
use crate::orchestrator::fallback;
use crate::orchestrator::stages;
use crate::orchestrator::types::{
    MedicalQuery, PipelineOutcome, ReasoningTrace, SafetyAssessment,
};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::time::{timeout_at, Instant};

/// States of one pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Classifying,
    ExtractingAndSearching,
    Diagnosing,
    TreatmentPlanning,
    ValidatingSafety,
    Assembled,
    FallenBack,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineState::Idle => "idle",
            PipelineState::Classifying => "classifying",
            PipelineState::ExtractingAndSearching => "extracting_and_searching",
            PipelineState::Diagnosing => "diagnosing",
            PipelineState::TreatmentPlanning => "treatment_planning",
            PipelineState::ValidatingSafety => "validating_safety",
            PipelineState::Assembled => "assembled",
            PipelineState::FallenBack => "fallen_back",
        };
        f.write_str(s)
    }
}

/// Orchestrates the multi-stage diagnostic pipeline
///
/// Client handles are injected at construction and shared across concurrent
/// runs; nothing else is shared between invocations.
pub struct MedicalOrchestrator {
    llm: Arc<dyn TextGenerator>,
    search: Arc<dyn LiteratureSearch>,
    config: PipelineConfig,
}

/// Run the stage future against the whole-run deadline
///
/// Deadline expiry is reported as `Cancelled`, distinct from a stage's own
/// `UpstreamTimeout`.
async fn bounded<T, F>(deadline: Instant, fut: F) -> Result<T, StageError>
where
    F: Future<Output = Result<T, StageError>>,
{
    match timeout_at(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(StageError::Cancelled),
    }
}

/// Trace wording for a failed stage attempt
fn failure_entry(stage: &str, error: &StageError) -> String {
    match error {
        StageError::Cancelled => format!("{stage} cancelled before completion"),
        other => format!("{stage} failed: {other}"),
    }
}

impl MedicalOrchestrator {
    /// Create an orchestrator with default pipeline configuration
    pub fn new(llm: Arc<dyn TextGenerator>, search: Arc<dyn LiteratureSearch>) -> Self {
        Self::with_config(llm, search, PipelineConfig::default())
    }

    /// Create an orchestrator with explicit configuration
    pub fn with_config(
        llm: Arc<dyn TextGenerator>,
        search: Arc<dyn LiteratureSearch>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            llm,
            search,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the full pipeline for one query
    ///
    /// Never errors from the caller's perspective: a run either completes
    /// with a [`DiagnosticResult`](crate::orchestrator::types::DiagnosticResult)
    /// or falls back to a non-diagnostic response. Callers must check the
    /// outcome variant before persisting anything as clinical output.
    pub async fn run(&self, query: &MedicalQuery) -> PipelineOutcome {
        let deadline = Instant::now() + self.config.pipeline_timeout;
        let mut trace = ReasoningTrace::new();

        tracing::info!(
            session_id = %query.session_id,
            query_len = query.text.len(),
            "Pipeline run started"
        );

        self.transition(PipelineState::Classifying, query);
        let classification = match bounded(
            deadline,
            stages::classify_query(self.llm.as_ref(), &self.config, &query.text),
        )
        .await
        {
            Ok(classification) => {
                trace.push(format!(
                    "Query classified as {} (urgency: {}, confidence: {:.2})",
                    classification.category, classification.urgency, classification.confidence
                ));
                classification
            }
            Err(error) => {
                trace.push(failure_entry("Query classification", &error));
                return self.fall_back(query, trace);
            }
        };

        self.transition(PipelineState::ExtractingAndSearching, query);
        // Fan-out: context extraction and literature retrieval race. The
        // retriever gets whatever context is available at call time, which
        // at launch is none.
        let (context_result, literature_result) = tokio::join!(
            bounded(
                deadline,
                stages::extract_context(self.llm.as_ref(), &self.config, &query.text),
            ),
            bounded(
                deadline,
                stages::search_literature(self.search.as_ref(), &self.config, &query.text, None),
            ),
        );

        // Fan-in. Trace writes happen here, after the join, so entries keep
        // causal order regardless of which stage finished first.
        let context = match context_result {
            Ok(context) => {
                trace.push(format!(
                    "Extracted medical context (age group: {}, severity: {}, {} symptoms)",
                    context.age_group,
                    context.severity,
                    context.symptoms.len()
                ));
                Some(context)
            }
            Err(error) => {
                trace.push(failure_entry("Context extraction", &error));
                None
            }
        };
        let literature = match literature_result {
            Ok(references) => {
                trace.push(format!(
                    "Retrieved {} literature references",
                    references.len()
                ));
                references
            }
            Err(error) => {
                // Literature is an enrichment, not a hard dependency
                trace.push(format!(
                    "Literature retrieval degraded ({error}); continuing without references"
                ));
                Vec::new()
            }
        };
        let Some(context) = context else {
            return self.fall_back(query, trace);
        };

        self.transition(PipelineState::Diagnosing, query);
        let diagnosis = match bounded(
            deadline,
            stages::generate_diagnosis(self.llm.as_ref(), &self.config, &context, &literature),
        )
        .await
        {
            Ok(diagnosis) => {
                trace.push(format!(
                    "Differential diagnosis generated (primary: {}, {} alternatives, {} red flags)",
                    diagnosis.primary,
                    diagnosis.alternatives.len(),
                    diagnosis.red_flags.len()
                ));
                diagnosis
            }
            Err(error) => {
                trace.push(failure_entry("Differential diagnosis", &error));
                return self.fall_back(query, trace);
            }
        };

        self.transition(PipelineState::TreatmentPlanning, query);
        let treatment = match bounded(
            deadline,
            stages::generate_treatment(
                self.llm.as_ref(),
                &self.config,
                &diagnosis.primary,
                &context,
                &literature,
            ),
        )
        .await
        {
            Ok(treatment) => {
                trace.push(format!(
                    "Treatment plan generated ({} medications, {} escalation criteria)",
                    treatment.dosing.len(),
                    treatment.escalation_criteria.len()
                ));
                treatment
            }
            Err(error) => {
                // A diagnosis without a treatment plan is not returned as a
                // success; this is a product-safety boundary.
                trace.push(failure_entry("Treatment planning", &error));
                return self.fall_back(query, trace);
            }
        };

        self.transition(PipelineState::ValidatingSafety, query);
        let safety = match bounded(
            deadline,
            stages::validate_safety(
                self.llm.as_ref(),
                &self.config,
                &query.text,
                &diagnosis.primary,
                &treatment,
            ),
        )
        .await
        {
            Ok(assessment) => {
                trace.push(format!(
                    "Safety validation completed (safe: {}, escalation required: {})",
                    assessment.is_safe, assessment.requires_escalation
                ));
                assessment
            }
            Err(StageError::Cancelled) => {
                // Cancellation outranks the degrade rule: the caller's
                // deadline has passed, so no result is returned at all.
                trace.push(failure_entry("Safety validation", &StageError::Cancelled));
                return self.fall_back(query, trace);
            }
            Err(error) => {
                // Fail-safe, never fail-open: an unavailable validator
                // escalates instead of approving.
                trace.push(format!(
                    "Safety validation degraded ({error}); defaulting to escalation"
                ));
                SafetyAssessment::degraded()
            }
        };

        self.transition(PipelineState::Assembled, query);
        let result = assembler::assemble(
            classification,
            diagnosis,
            treatment,
            literature,
            safety,
            trace,
        );

        tracing::info!(
            session_id = %query.session_id,
            stages_attempted = result.reasoning.len(),
            primary = %result.diagnosis.primary,
            requires_escalation = result.safety.requires_escalation,
            "Pipeline run completed"
        );

        PipelineOutcome::Completed(result)
    }

    fn transition(&self, state: PipelineState, query: &MedicalQuery) {
        tracing::debug!(
            session_id = %query.session_id,
            state = %state,
            "Pipeline state transition"
        );
    }

    fn fall_back(&self, query: &MedicalQuery, trace: ReasoningTrace) -> PipelineOutcome {
        self.transition(PipelineState::FallenBack, query);
        tracing::warn!(
            session_id = %query.session_id,
            stages_attempted = trace.len(),
            "Pipeline fell back"
        );
        PipelineOutcome::FallenBack(fallback::respond(&query.text, trace))
    }
}
