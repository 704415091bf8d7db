//! Prompt templates and binding
//!
//! Closed-set registry of the five pipeline prompts. Each template declares
//! the variable names it requires; binding fails fast when a required
//! placeholder is unbound and silently ignores unrecognized variables.
//! Binding is a pure string operation with no I/O.

use crate::orchestrator::error::PromptError;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;

/// Identifies one of the versioned pipeline prompt templates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateId {
    Classification,
    ContextExtraction,
    Diagnosis,
    Treatment,
    Safety,
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TemplateId::Classification => "classification",
            TemplateId::ContextExtraction => "context-extraction",
            TemplateId::Diagnosis => "diagnosis",
            TemplateId::Treatment => "treatment",
            TemplateId::Safety => "safety",
        };
        f.write_str(s)
    }
}

/// A prompt template and its required variable names
struct Template {
    text: &'static str,
    required: &'static [&'static str],
}

const CLASSIFICATION_TEMPLATE: &str = r#"You are a medical query classifier for Nelson-GPT, a pediatric diagnostic assistant.

Analyze this query and classify it:
Query: "{query}"

Classify into ONE category:
- SYMPTOM_ASSESSMENT: Patient describing symptoms
- DIAGNOSIS_REQUEST: Asking for diagnosis
- TREATMENT_PLAN: Asking for treatment
- MEDICATION_QUERY: Questions about medications
- GUIDELINE_REFERENCE: Asking for clinical guidelines
- GENERAL_EDUCATION: General medical education

Also determine:
- Urgency: routine, urgent, or emergency
- Specialty: pediatrics, neonatology, infectious_disease, etc.

Respond in JSON format:
{
  "category": "CATEGORY_NAME",
  "confidence": 0.95,
  "urgency": "routine",
  "specialty": "pediatrics"
}"#;

const CONTEXT_EXTRACTION_TEMPLATE: &str = r#"Extract medical information from this query:
Query: "{query}"

Extract:
1. Symptoms mentioned
2. Age group (newborn, infant, toddler, preschool, school-age, adolescent, general)
3. Severity (mild, moderate, severe)
4. Any contraindications mentioned
5. Relevant medical history

Respond in JSON format:
{
  "symptoms": ["symptom1", "symptom2"],
  "ageGroup": "age-group",
  "severity": "mild|moderate|severe",
  "contraindications": ["contraindication1"],
  "relevantHistory": ["history1"]
}"#;

const DIAGNOSIS_TEMPLATE: &str = r#"You are an expert pediatric diagnostician using Nelson Textbook of Pediatrics.

Patient Information:
- Age Group: {age_group}
- Symptoms: {symptoms}
- Medical Context: {medical_context}

Medical Literature References:
{literature}

Generate a differential diagnosis with:
1. Most likely diagnosis (primary)
2. Alternative diagnoses ranked by probability
3. Red flags requiring immediate attention
4. Recommended investigations

Respond in JSON format:
{
  "primaryDiagnosis": "diagnosis_name",
  "alternatives": [
    {
      "diagnosis": "name",
      "probability": 0.85,
      "reasoning": "why this is likely"
    }
  ],
  "redFlags": ["flag1", "flag2"],
  "investigations": ["test1", "test2"]
}"#;

const TREATMENT_TEMPLATE: &str = r#"You are a pediatric treatment specialist using Nelson Textbook of Pediatrics.

Diagnosis: {diagnosis}
Age Group: {age_group}
Patient Context: {medical_context}

Medical Literature References:
{literature}

Generate a comprehensive treatment plan:
1. First-line treatment with age-appropriate dosing
2. Alternative treatments
3. Monitoring parameters
4. Escalation criteria
5. Parental education points

Respond in JSON format:
{
  "firstLine": "treatment description with dosing",
  "alternatives": ["alt1", "alt2"],
  "dosing": {
    "medication": "dose per kg or age-based"
  },
  "monitoring": ["parameter1", "parameter2"],
  "escalationCriteria": ["criterion1"],
  "parentalEducation": ["point1"]
}"#;

const SAFETY_TEMPLATE: &str = r#"Validate the safety of this medical response:

Query: {query}
Diagnosis: {diagnosis}
Treatment: {treatment}

Check for:
1. Contraindications
2. Drug interactions
3. Age-appropriateness
4. Dosing errors
5. Missing safety considerations

Respond in JSON format:
{
  "isSafe": true,
  "warnings": ["warning1"],
  "requiresEscalation": false
}"#;

static TEMPLATES: Lazy<HashMap<TemplateId, Template>> = Lazy::new(|| {
    let mut map = HashMap::new();
    map.insert(
        TemplateId::Classification,
        Template {
            text: CLASSIFICATION_TEMPLATE,
            required: &["query"],
        },
    );
    map.insert(
        TemplateId::ContextExtraction,
        Template {
            text: CONTEXT_EXTRACTION_TEMPLATE,
            required: &["query"],
        },
    );
    map.insert(
        TemplateId::Diagnosis,
        Template {
            text: DIAGNOSIS_TEMPLATE,
            required: &["age_group", "symptoms", "medical_context", "literature"],
        },
    );
    map.insert(
        TemplateId::Treatment,
        Template {
            text: TREATMENT_TEMPLATE,
            required: &["diagnosis", "age_group", "medical_context", "literature"],
        },
    );
    map.insert(
        TemplateId::Safety,
        Template {
            text: SAFETY_TEMPLATE,
            required: &["query", "diagnosis", "treatment"],
        },
    );
    map
});

/// Render a template against the given variables
///
/// Every placeholder the template requires must have a bound value; extra
/// variables are ignored. Deterministic for identical inputs.
pub fn bind(id: TemplateId, vars: &[(&str, &str)]) -> Result<String, PromptError> {
    // Registry is total over TemplateId, so the lookup cannot miss.
    let template = &TEMPLATES[&id];

    let mut rendered = template.text.to_string();
    for &name in template.required {
        let value = vars
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| *value)
            .ok_or(PromptError::MissingVariable { template: id, name })?;
        rendered = rendered.replace(&format!("{{{name}}}"), value);
    }

    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_classification() {
        let prompt = bind(
            TemplateId::Classification,
            &[("query", "toddler with barking cough")],
        )
        .unwrap();
        assert!(prompt.contains("toddler with barking cough"));
        assert!(prompt.contains("SYMPTOM_ASSESSMENT"));
        assert!(!prompt.contains("{query}"));
    }

    #[test]
    fn test_bind_missing_variable() {
        let result = bind(TemplateId::Diagnosis, &[("age_group", "infant")]);
        assert_eq!(
            result.unwrap_err(),
            PromptError::MissingVariable {
                template: TemplateId::Diagnosis,
                name: "symptoms",
            }
        );
    }

    #[test]
    fn test_bind_ignores_unrecognized_variable() {
        let prompt = bind(
            TemplateId::Classification,
            &[("query", "fever"), ("bogus", "ignored")],
        )
        .unwrap();
        assert!(prompt.contains("fever"));
        assert!(!prompt.contains("ignored"));
    }

    #[test]
    fn test_bind_is_deterministic() {
        let vars = [
            ("diagnosis", "acute otitis media"),
            ("age_group", "toddler"),
            ("medical_context", "{}"),
            ("literature", "- Otitis Media (p.3417)"),
        ];
        let first = bind(TemplateId::Treatment, &vars).unwrap();
        let second = bind(TemplateId::Treatment, &vars).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_bind_preserves_json_example_braces() {
        let prompt = bind(TemplateId::Safety, &[
            ("query", "q"),
            ("diagnosis", "d"),
            ("treatment", "t"),
        ])
        .unwrap();
        // The embedded JSON example must survive binding untouched
        assert!(prompt.contains("\"isSafe\": true"));
    }

    #[test]
    fn test_every_template_binds_with_full_variables() {
        let full = [
            ("query", "q"),
            ("age_group", "infant"),
            ("symptoms", "fever"),
            ("medical_context", "{}"),
            ("literature", "none"),
            ("diagnosis", "d"),
            ("treatment", "t"),
        ];
        for id in [
            TemplateId::Classification,
            TemplateId::ContextExtraction,
            TemplateId::Diagnosis,
            TemplateId::Treatment,
            TemplateId::Safety,
        ] {
            let rendered = bind(id, &full).unwrap();
            assert!(!rendered.is_empty());
        }
    }
}
