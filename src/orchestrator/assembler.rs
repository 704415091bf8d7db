//! Result assembly
//!
//! Pure merge of the stage outputs into the terminal [`DiagnosticResult`].
//! Structural completeness is enforced by the signature (owned, non-optional
//! inputs), so there is no runtime failure path; the ordering invariants are
//! re-established here before the result leaves the pipeline.

use crate::orchestrator::types::{
    DiagnosticResult, DifferentialDiagnosis, LiteratureReference, QueryClassification,
    ReasoningTrace, SafetyAssessment, TreatmentPlan,
};

/// Merge stage outputs into the final result record
pub fn assemble(
    classification: QueryClassification,
    mut diagnosis: DifferentialDiagnosis,
    treatment: TreatmentPlan,
    mut literature: Vec<LiteratureReference>,
    safety: SafetyAssessment,
    trace: ReasoningTrace,
) -> DiagnosticResult {
    diagnosis
        .alternatives
        .sort_by(|a, b| b.probability.total_cmp(&a.probability));
    literature.sort_by(|a, b| b.relevance.total_cmp(&a.relevance));

    let confidence = classification.confidence;

    DiagnosticResult {
        classification,
        confidence,
        diagnosis,
        treatment,
        literature,
        safety,
        reasoning: trace,
    }
}
