//! In-memory fakes for exercising stage adapters and the orchestrator
//! without HTTP. The scripted LLM routes on a marker substring of the
//! prompt, so one fake can serve every stage of a run.

use crate::llm::{
    GenerationParams, LiteratureSearch, LlmError, SearchError, SearchHit, SearchRequest,
    TextGenerator,
};
use async_trait::async_trait;
use std::time::Duration;

/// Canned behavior for one scripted LLM reply
pub(crate) enum Reply {
    /// Reply with this text
    Text(&'static str),
    /// Fail with a timeout
    Timeout,
    /// Fail with a transport error
    Unavailable,
    /// Sleep, then reply (for exercising stage timeouts and cancellation)
    Sleep(Duration, &'static str),
}

/// Fake LLM that picks its reply by matching a marker substring of the prompt
pub(crate) struct ScriptedLlm {
    script: Vec<(&'static str, Reply)>,
}

impl ScriptedLlm {
    pub(crate) fn new(script: Vec<(&'static str, Reply)>) -> Self {
        Self { script }
    }
}

#[async_trait]
impl TextGenerator for ScriptedLlm {
    async fn generate(&self, prompt: &str, _params: &GenerationParams) -> Result<String, LlmError> {
        for (marker, reply) in &self.script {
            if prompt.contains(marker) {
                return match reply {
                    Reply::Text(text) => Ok((*text).to_string()),
                    Reply::Timeout => Err(LlmError::Timeout),
                    Reply::Unavailable => Err(LlmError::Unavailable("scripted outage".to_string())),
                    Reply::Sleep(delay, text) => {
                        tokio::time::sleep(*delay).await;
                        Ok((*text).to_string())
                    }
                };
            }
        }
        Err(LlmError::Unavailable(format!(
            "no scripted reply matches prompt: {:.60}",
            prompt
        )))
    }
}

/// Canned behavior for the fake literature index
pub(crate) enum SearchBehavior {
    Hits(Vec<SearchHit>),
    Empty,
    Unavailable,
    /// Sleep longer than the stage timeout
    Sleep(Duration),
}

/// Fake literature index
pub(crate) struct FakeSearch {
    pub(crate) behavior: SearchBehavior,
}

#[async_trait]
impl LiteratureSearch for FakeSearch {
    async fn search(&self, _request: &SearchRequest) -> Result<Vec<SearchHit>, SearchError> {
        match &self.behavior {
            SearchBehavior::Hits(hits) => Ok(hits.clone()),
            SearchBehavior::Empty => Ok(Vec::new()),
            SearchBehavior::Unavailable => {
                Err(SearchError::Unavailable("scripted outage".to_string()))
            }
            SearchBehavior::Sleep(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(Vec::new())
            }
        }
    }
}

/// Prompt markers unique to each template, for scripting replies per stage
pub(crate) mod markers {
    pub(crate) const CLASSIFICATION: &str = "medical query classifier";
    pub(crate) const CONTEXT: &str = "Extract medical information";
    pub(crate) const DIAGNOSIS: &str = "expert pediatric diagnostician";
    pub(crate) const TREATMENT: &str = "pediatric treatment specialist";
    pub(crate) const SAFETY: &str = "Validate the safety";
}

/// Well-formed stage outputs for happy-path scripts
pub(crate) mod fixtures {
    pub(crate) const CLASSIFICATION_JSON: &str = r#"{
        "category": "SYMPTOM_ASSESSMENT",
        "confidence": 0.9,
        "urgency": "urgent",
        "specialty": "pediatrics"
    }"#;

    pub(crate) const CONTEXT_JSON: &str = r#"{
        "symptoms": ["fever", "poor feeding"],
        "ageGroup": "infant",
        "severity": "moderate",
        "contraindications": [],
        "relevantHistory": []
    }"#;

    pub(crate) const DIAGNOSIS_JSON: &str = r#"{
        "primaryDiagnosis": "Serious bacterial infection until proven otherwise",
        "alternatives": [
            {"diagnosis": "Urinary tract infection", "probability": 0.35, "reasoning": "common occult source at this age"},
            {"diagnosis": "Viral syndrome", "probability": 0.3, "reasoning": "most frequent overall cause"}
        ],
        "redFlags": ["age < 3 months with fever requires urgent evaluation"],
        "investigations": ["blood culture", "urinalysis"]
    }"#;

    pub(crate) const TREATMENT_JSON: &str = r#"{
        "firstLine": "Hospital admission with empiric IV antibiotics pending cultures",
        "alternatives": ["observation with serial exams if low-risk criteria met"],
        "dosing": {"ceftriaxone": "50 mg/kg IV q24h"},
        "monitoring": ["temperature", "feeding volume"],
        "escalationCriteria": ["immediate emergency evaluation for lethargy or apnea"],
        "parentalEducation": ["return immediately if the infant becomes difficult to rouse"]
    }"#;

    pub(crate) const SAFETY_JSON: &str = r#"{
        "isSafe": true,
        "warnings": [],
        "requiresEscalation": true
    }"#;
}
