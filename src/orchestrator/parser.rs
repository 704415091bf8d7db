//! Structured-output parsing
//!
//! The LLM service returns free text that is expected to contain one
//! well-formed JSON object, possibly surrounded by prose or markdown fences.
//! This module is the robustness boundary against that non-determinism: each
//! shape has an exact set of required keys, closed enum vocabularies, and
//! numeric ranges. Anything that does not validate completely is rejected
//! with [`ParseError`]; a result value is never partially populated.

use crate::orchestrator::error::ParseError;
use crate::orchestrator::types::{
    AlternativeDiagnosis, DifferentialDiagnosis, MedicalContext, QueryClassification,
    SafetyAssessment, TreatmentPlan,
};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fmt;

/// Which structural contract a raw LLM response is parsed against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeTag {
    Classification,
    Context,
    Diagnosis,
    Treatment,
    Safety,
}

impl fmt::Display for ShapeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ShapeTag::Classification => "classification",
            ShapeTag::Context => "context",
            ShapeTag::Diagnosis => "diagnosis",
            ShapeTag::Treatment => "treatment",
            ShapeTag::Safety => "safety",
        };
        f.write_str(s)
    }
}

/// Extract the first balanced JSON object from raw text
///
/// Tolerates prose and markdown fences around the object. Brace matching is
/// string-aware so braces inside JSON string values do not confuse it.
fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in raw.as_bytes().iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    // '{' and '}' are ASCII, so these are char boundaries
                    return Some(&raw[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

fn in_unit_range(value: f32) -> bool {
    (0.0..=1.0).contains(&value)
}

/// Parse a classifier response
pub fn parse_classification(raw: &str) -> Result<QueryClassification, ParseError> {
    let err = || ParseError::new(ShapeTag::Classification, raw);
    let json = extract_json_object(raw).ok_or_else(err)?;
    let parsed: QueryClassification = serde_json::from_str(json).map_err(|_| err())?;

    if !in_unit_range(parsed.confidence) {
        return Err(err());
    }
    Ok(parsed)
}

/// Parse a context-extraction response
pub fn parse_context(raw: &str) -> Result<MedicalContext, ParseError> {
    let err = || ParseError::new(ShapeTag::Context, raw);
    let json = extract_json_object(raw).ok_or_else(err)?;
    serde_json::from_str(json).map_err(|_| err())
}

/// Diagnosis wire shape: `primaryDiagnosis` plus ranked alternatives
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireDiagnosis {
    primary_diagnosis: String,
    alternatives: Vec<AlternativeDiagnosis>,
    red_flags: BTreeSet<String>,
    investigations: BTreeSet<String>,
}

/// Parse a diagnosis response
///
/// Alternatives come back sorted by descending probability; probabilities are
/// independent confidences, validated into [0, 1] but never normalized.
pub fn parse_diagnosis(raw: &str) -> Result<DifferentialDiagnosis, ParseError> {
    let err = || ParseError::new(ShapeTag::Diagnosis, raw);
    let json = extract_json_object(raw).ok_or_else(err)?;
    let wire: WireDiagnosis = serde_json::from_str(json).map_err(|_| err())?;

    if wire.primary_diagnosis.trim().is_empty() {
        return Err(err());
    }
    if wire
        .alternatives
        .iter()
        .any(|alt| !in_unit_range(alt.probability))
    {
        return Err(err());
    }

    let mut alternatives = wire.alternatives;
    alternatives.sort_by(|a, b| b.probability.total_cmp(&a.probability));

    Ok(DifferentialDiagnosis {
        primary: wire.primary_diagnosis,
        alternatives,
        red_flags: wire.red_flags,
        investigations: wire.investigations,
    })
}

/// Parse a treatment-plan response
pub fn parse_treatment(raw: &str) -> Result<TreatmentPlan, ParseError> {
    let err = || ParseError::new(ShapeTag::Treatment, raw);
    let json = extract_json_object(raw).ok_or_else(err)?;
    serde_json::from_str(json).map_err(|_| err())
}

/// Parse a safety-validation response
pub fn parse_safety(raw: &str) -> Result<SafetyAssessment, ParseError> {
    let err = || ParseError::new(ShapeTag::Safety, raw);
    let json = extract_json_object(raw).ok_or_else(err)?;
    serde_json::from_str(json).map_err(|_| err())
}
