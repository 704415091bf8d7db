//! Pipeline data model
//!
//! Typed contracts passed between pipeline stages. Wire names mirror the
//! JSON the LLM service is instructed to emit (camelCase keys, closed enum
//! vocabularies), so the parser can deserialize straight into these shapes.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Immutable input to one pipeline run
#[derive(Debug, Clone)]
pub struct MedicalQuery {
    /// Raw query text from the user
    pub text: String,
    /// Session the query belongs to
    pub session_id: String,
}

impl MedicalQuery {
    pub fn new(text: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            session_id: session_id.into(),
        }
    }
}

/// Category assigned by the classifier stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryCategory {
    /// Patient describing symptoms
    SymptomAssessment,
    /// Asking for a diagnosis
    DiagnosisRequest,
    /// Asking for treatment options
    TreatmentPlan,
    /// Questions about medications
    MedicationQuery,
    /// Asking for clinical guidelines
    GuidelineReference,
    /// General medical education
    GeneralEducation,
}

impl QueryCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryCategory::SymptomAssessment => "SYMPTOM_ASSESSMENT",
            QueryCategory::DiagnosisRequest => "DIAGNOSIS_REQUEST",
            QueryCategory::TreatmentPlan => "TREATMENT_PLAN",
            QueryCategory::MedicationQuery => "MEDICATION_QUERY",
            QueryCategory::GuidelineReference => "GUIDELINE_REFERENCE",
            QueryCategory::GeneralEducation => "GENERAL_EDUCATION",
        }
    }
}

impl fmt::Display for QueryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How quickly the query needs clinical attention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Routine,
    Urgent,
    Emergency,
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Urgency::Routine => "routine",
            Urgency::Urgent => "urgent",
            Urgency::Emergency => "emergency",
        };
        f.write_str(s)
    }
}

/// Output of the classifier stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryClassification {
    /// Assigned category
    pub category: QueryCategory,
    /// Classifier confidence in [0, 1]
    pub confidence: f32,
    /// Clinical urgency
    pub urgency: Urgency,
    /// Suggested specialty (free text, e.g. "neonatology")
    pub specialty: String,
}

/// Pediatric age group extracted from the query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgeGroup {
    Newborn,
    Infant,
    Toddler,
    Preschool,
    SchoolAge,
    Adolescent,
    /// No age information in the query
    General,
}

impl AgeGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgeGroup::Newborn => "newborn",
            AgeGroup::Infant => "infant",
            AgeGroup::Toddler => "toddler",
            AgeGroup::Preschool => "preschool",
            AgeGroup::SchoolAge => "school-age",
            AgeGroup::Adolescent => "adolescent",
            AgeGroup::General => "general",
        }
    }
}

impl fmt::Display for AgeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Overall severity extracted from the query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Mild,
    Moderate,
    Severe,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Mild => "mild",
            Severity::Moderate => "moderate",
            Severity::Severe => "severe",
        };
        f.write_str(s)
    }
}

/// Structured medical facts extracted from the query text
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalContext {
    /// Symptoms mentioned in the query
    pub symptoms: BTreeSet<String>,
    /// Patient age group
    pub age_group: AgeGroup,
    /// Severity assessment
    pub severity: Severity,
    /// Contraindications mentioned (allergies, comorbidities)
    pub contraindications: BTreeSet<String>,
    /// Relevant medical history, in the order it was mentioned
    pub relevant_history: Vec<String>,
}

/// One supporting passage from the literature index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiteratureReference {
    /// Source document title
    pub title: String,
    /// Page number (1-based)
    pub page: u32,
    /// Passage text
    pub excerpt: String,
    /// Relevance score in [0, 1]
    pub relevance: f32,
}

/// One alternative diagnosis with its independent likelihood estimate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlternativeDiagnosis {
    /// Diagnosis name
    pub diagnosis: String,
    /// Independent LLM-estimated likelihood in [0, 1]; the values across a
    /// differential are not a probability distribution and are never
    /// normalized
    pub probability: f32,
    /// Why this diagnosis is considered
    pub reasoning: String,
}

/// Output of the diagnosis stage
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DifferentialDiagnosis {
    /// Most likely diagnosis
    pub primary: String,
    /// Alternatives sorted by descending probability
    pub alternatives: Vec<AlternativeDiagnosis>,
    /// Findings requiring immediate attention
    pub red_flags: BTreeSet<String>,
    /// Recommended investigations
    pub investigations: BTreeSet<String>,
}

/// Output of the treatment stage
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreatmentPlan {
    /// First-line treatment with age-appropriate dosing
    pub first_line: String,
    /// Alternative treatments
    pub alternatives: Vec<String>,
    /// Drug name to dose specification
    pub dosing: BTreeMap<String, String>,
    /// Parameters to monitor
    pub monitoring: Vec<String>,
    /// When to escalate care
    pub escalation_criteria: Vec<String>,
    /// Education points for parents
    pub parental_education: Vec<String>,
}

/// Output of the safety validation stage
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyAssessment {
    /// Whether the diagnosis/treatment pair passed validation
    pub is_safe: bool,
    /// Safety warnings raised by the validator
    pub warnings: Vec<String>,
    /// Whether the case must be escalated to a clinician
    pub requires_escalation: bool,
}

impl SafetyAssessment {
    /// Conservative default used when the safety validator itself fails.
    /// Fail-safe, never fail-open: an unavailable validator escalates.
    pub fn degraded() -> Self {
        Self {
            is_safe: false,
            warnings: vec!["safety validation unavailable".to_string()],
            requires_escalation: true,
        }
    }
}

/// Append-only audit log of stage attempts for one pipeline run
///
/// One entry per stage attempted (successful, degraded or failed), in
/// pipeline-causal order. Entries are never reordered or truncated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReasoningTrace(Vec<String>);

impl ReasoningTrace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one entry
    pub fn push(&mut self, entry: impl Into<String>) {
        self.0.push(entry.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn entries(&self) -> &[String] {
        &self.0
    }
}

/// Terminal aggregate of a completed pipeline run
///
/// Assembled once per request and never mutated afterwards; owned
/// exclusively by the caller after return.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticResult {
    /// Classifier output
    pub classification: QueryClassification,
    /// Classification-derived confidence
    pub confidence: f32,
    /// Differential diagnosis
    pub diagnosis: DifferentialDiagnosis,
    /// Treatment plan
    pub treatment: TreatmentPlan,
    /// Supporting literature, by descending relevance (may be empty)
    pub literature: Vec<LiteratureReference>,
    /// Safety assessment (possibly the degraded default)
    pub safety: SafetyAssessment,
    /// Audit trace, one entry per stage attempted
    pub reasoning: ReasoningTrace,
}

/// Degraded response produced when the pipeline cannot complete
///
/// Carries no medical content; the message embeds the original query
/// verbatim for operator triage.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FallbackResult {
    /// Static, non-diagnostic apology message
    pub message: String,
    /// Trace accumulated up to the point of failure
    pub reasoning: ReasoningTrace,
}

/// What one pipeline run produced
///
/// Callers must distinguish the two variants before persisting: a
/// `FallenBack` result is not a diagnosis and must never be stored as one.
#[derive(Debug, Clone)]
pub enum PipelineOutcome {
    /// The pipeline reached `Assembled`
    Completed(DiagnosticResult),
    /// A hard-dependency stage failed or the run was cancelled
    FallenBack(FallbackResult),
}

impl PipelineOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, PipelineOutcome::Completed(_))
    }

    /// The reasoning trace regardless of outcome
    pub fn reasoning(&self) -> &ReasoningTrace {
        match self {
            PipelineOutcome::Completed(result) => &result.reasoning,
            PipelineOutcome::FallenBack(fallback) => &fallback.reasoning,
        }
    }
}
