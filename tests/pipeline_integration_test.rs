//! Integration tests for the diagnostic pipeline end-to-end flow
//!
//! These tests run the real orchestrator against real HTTP clients pointed
//! at mocked Mistral and literature-search services, verifying:
//! 1. Stage sequencing and the fan-out/fan-in join
//! 2. Prose-wrapped LLM output surviving the parser
//! 3. Fallback and degrade policy at the HTTP level
//! 4. The reasoning-trace audit contract

use mockito::{Matcher, Server, ServerGuard};
use nelson_gpt_backend::llm::{LiteratureIndexClient, MistralClient};
use nelson_gpt_backend::orchestrator::types::{MedicalQuery, PipelineOutcome};
use nelson_gpt_backend::orchestrator::MedicalOrchestrator;
use std::sync::Arc;

const QUERY: &str = "3-month-old infant with fever 39.5°C and poor feeding";

const CLASSIFICATION_JSON: &str = r#"{"category": "SYMPTOM_ASSESSMENT", "confidence": 0.9, "urgency": "urgent", "specialty": "pediatrics"}"#;

const CONTEXT_JSON: &str = r#"{"symptoms": ["fever", "poor feeding"], "ageGroup": "infant", "severity": "moderate", "contraindications": [], "relevantHistory": []}"#;

const DIAGNOSIS_JSON: &str = r#"{
    "primaryDiagnosis": "Serious bacterial infection until proven otherwise",
    "alternatives": [
        {"diagnosis": "Urinary tract infection", "probability": 0.35, "reasoning": "common occult source"},
        {"diagnosis": "Viral syndrome", "probability": 0.3, "reasoning": "most frequent cause overall"}
    ],
    "redFlags": ["age < 3 months with fever requires urgent evaluation"],
    "investigations": ["blood culture", "urinalysis"]
}"#;

const TREATMENT_JSON: &str = r#"{
    "firstLine": "Hospital admission with empiric IV antibiotics pending cultures",
    "alternatives": [],
    "dosing": {"ceftriaxone": "50 mg/kg IV q24h"},
    "monitoring": ["temperature", "feeding volume"],
    "escalationCriteria": ["immediate emergency evaluation for lethargy or apnea"],
    "parentalEducation": ["return immediately if the infant becomes difficult to rouse"]
}"#;

const SAFETY_JSON: &str = r#"{"isSafe": true, "warnings": [], "requiresEscalation": true}"#;

/// Wrap stage JSON in a Mistral chat-completions response, with prose around
/// the JSON block the way real model output tends to arrive
fn llm_body(stage_json: &str) -> String {
    let content = format!("Here is the requested JSON:\n```json\n{stage_json}\n```\nLet me know if I can help further.");
    serde_json::json!({
        "choices": [{
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 100, "completion_tokens": 50}
    })
    .to_string()
}

/// Mock one LLM stage, routed by a marker phrase unique to its prompt
async fn mock_stage(server: &mut ServerGuard, marker: &str, body: String) -> mockito::Mock {
    server
        .mock("POST", "/v1/chat/completions")
        .match_body(Matcher::Regex(marker.to_string()))
        .with_status(200)
        .with_body(body)
        .create_async()
        .await
}

fn orchestrator(llm_url: String, search_url: String) -> MedicalOrchestrator {
    let http_client = reqwest::Client::new();
    let mistral = MistralClient::with_base_url(
        http_client.clone(),
        "test-key".to_string(),
        "mistral-large-latest".to_string(),
        llm_url,
    );
    let search = LiteratureIndexClient::new(http_client, search_url, "svc-key".to_string());
    MedicalOrchestrator::new(Arc::new(mistral), Arc::new(search))
}

#[tokio::test]
async fn test_full_pipeline_against_mocked_services() {
    let mut llm_server = Server::new_async().await;
    let mut search_server = Server::new_async().await;

    let classify = mock_stage(
        &mut llm_server,
        "medical query classifier",
        llm_body(CLASSIFICATION_JSON),
    )
    .await;
    let extract = mock_stage(
        &mut llm_server,
        "Extract medical information",
        llm_body(CONTEXT_JSON),
    )
    .await;
    let diagnose = mock_stage(
        &mut llm_server,
        "expert pediatric diagnostician",
        llm_body(DIAGNOSIS_JSON),
    )
    .await;
    let treat = mock_stage(
        &mut llm_server,
        "pediatric treatment specialist",
        llm_body(TREATMENT_JSON),
    )
    .await;
    let safety = mock_stage(
        &mut llm_server,
        "Validate the safety",
        llm_body(SAFETY_JSON),
    )
    .await;

    let search_mock = search_server
        .mock("POST", "/search")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "limit": 5,
            "threshold": 0.7,
        })))
        .with_status(200)
        .with_body(
            r#"{"results": [
                {"title": "Fever Without a Focus", "page": 1280, "excerpt": "...", "confidence": 0.92},
                {"title": "Sepsis in the Neonate", "page": 1004, "excerpt": "...", "confidence": 0.81}
            ]}"#,
        )
        .create_async()
        .await;

    let orchestrator = orchestrator(
        llm_server.url(),
        format!("{}/search", search_server.url()),
    );
    let outcome = orchestrator
        .run(&MedicalQuery::new(QUERY, "session-int-1"))
        .await;

    classify.assert_async().await;
    extract.assert_async().await;
    diagnose.assert_async().await;
    treat.assert_async().await;
    safety.assert_async().await;
    search_mock.assert_async().await;

    let result = match outcome {
        PipelineOutcome::Completed(result) => result,
        PipelineOutcome::FallenBack(fallback) => {
            panic!("expected completion, fell back: {:?}", fallback.reasoning)
        }
    };

    assert_eq!(result.reasoning.len(), 6);
    assert!((result.confidence - 0.9).abs() < f32::EPSILON);
    assert!(result.diagnosis.primary.contains("bacterial infection"));
    assert!(result
        .diagnosis
        .red_flags
        .contains("age < 3 months with fever requires urgent evaluation"));
    assert!(result
        .treatment
        .escalation_criteria
        .iter()
        .any(|c| c.contains("emergency evaluation")));
    assert!(result.safety.requires_escalation);
    assert_eq!(result.literature.len(), 2);
    // Ranked by descending relevance
    assert_eq!(result.literature[0].title, "Fever Without a Focus");
}

#[tokio::test]
async fn test_classifier_http_failure_falls_back() {
    let mut llm_server = Server::new_async().await;
    let mut search_server = Server::new_async().await;

    let classify = llm_server
        .mock("POST", "/v1/chat/completions")
        .with_status(503)
        .with_body("service unavailable")
        .create_async()
        .await;
    let _search_mock = search_server
        .mock("POST", "/search")
        .with_status(200)
        .with_body(r#"{"results": []}"#)
        .create_async()
        .await;

    let orchestrator = orchestrator(
        llm_server.url(),
        format!("{}/search", search_server.url()),
    );
    let outcome = orchestrator
        .run(&MedicalQuery::new(QUERY, "session-int-2"))
        .await;

    classify.assert_async().await;

    let fallback = match outcome {
        PipelineOutcome::FallenBack(fallback) => fallback,
        PipelineOutcome::Completed(_) => panic!("expected fallback"),
    };
    assert_eq!(fallback.reasoning.len(), 1);
    assert!(fallback.reasoning.entries()[0].starts_with("Query classification failed"));
    assert!(fallback.message.contains(QUERY));
}

#[tokio::test]
async fn test_literature_index_outage_degrades_but_completes() {
    let mut llm_server = Server::new_async().await;
    let mut search_server = Server::new_async().await;

    let _classify = mock_stage(
        &mut llm_server,
        "medical query classifier",
        llm_body(CLASSIFICATION_JSON),
    )
    .await;
    let _extract = mock_stage(
        &mut llm_server,
        "Extract medical information",
        llm_body(CONTEXT_JSON),
    )
    .await;
    let _diagnose = mock_stage(
        &mut llm_server,
        "expert pediatric diagnostician",
        llm_body(DIAGNOSIS_JSON),
    )
    .await;
    let _treat = mock_stage(
        &mut llm_server,
        "pediatric treatment specialist",
        llm_body(TREATMENT_JSON),
    )
    .await;
    let _safety = mock_stage(
        &mut llm_server,
        "Validate the safety",
        llm_body(SAFETY_JSON),
    )
    .await;

    let search_mock = search_server
        .mock("POST", "/search")
        .with_status(500)
        .with_body("index rebuilding")
        .create_async()
        .await;

    let orchestrator = orchestrator(
        llm_server.url(),
        format!("{}/search", search_server.url()),
    );
    let outcome = orchestrator
        .run(&MedicalQuery::new(QUERY, "session-int-3"))
        .await;

    search_mock.assert_async().await;

    let result = match outcome {
        PipelineOutcome::Completed(result) => result,
        PipelineOutcome::FallenBack(fallback) => {
            panic!("expected completion, fell back: {:?}", fallback.reasoning)
        }
    };
    assert!(result.literature.is_empty());
    assert_eq!(result.reasoning.len(), 6);
    assert!(result.reasoning.entries()[2].contains("Literature retrieval degraded"));
}

#[tokio::test]
async fn test_malformed_safety_output_degrades_to_escalation() {
    let mut llm_server = Server::new_async().await;
    let mut search_server = Server::new_async().await;

    let _classify = mock_stage(
        &mut llm_server,
        "medical query classifier",
        llm_body(CLASSIFICATION_JSON),
    )
    .await;
    let _extract = mock_stage(
        &mut llm_server,
        "Extract medical information",
        llm_body(CONTEXT_JSON),
    )
    .await;
    let _diagnose = mock_stage(
        &mut llm_server,
        "expert pediatric diagnostician",
        llm_body(DIAGNOSIS_JSON),
    )
    .await;
    let _treat = mock_stage(
        &mut llm_server,
        "pediatric treatment specialist",
        llm_body(TREATMENT_JSON),
    )
    .await;
    // Safety stage answers with prose only - no JSON shape to parse
    let _safety = mock_stage(
        &mut llm_server,
        "Validate the safety",
        llm_body_plain("Everything looks fine to me."),
    )
    .await;

    let _search_mock = search_server
        .mock("POST", "/search")
        .with_status(200)
        .with_body(r#"{"results": []}"#)
        .create_async()
        .await;

    let orchestrator = orchestrator(
        llm_server.url(),
        format!("{}/search", search_server.url()),
    );
    let outcome = orchestrator
        .run(&MedicalQuery::new(QUERY, "session-int-4"))
        .await;

    let result = match outcome {
        PipelineOutcome::Completed(result) => result,
        PipelineOutcome::FallenBack(fallback) => {
            panic!("expected completion, fell back: {:?}", fallback.reasoning)
        }
    };
    // Fail-safe: a validator that cannot be parsed escalates
    assert!(!result.safety.is_safe);
    assert!(result.safety.requires_escalation);
    assert_eq!(result.safety.warnings, vec!["safety validation unavailable"]);
    assert!(result.reasoning.entries()[5].contains("Safety validation degraded"));
}

/// Mistral response whose content is plain prose (no JSON object)
fn llm_body_plain(content: &str) -> String {
    serde_json::json!({
        "choices": [{
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
    .to_string()
}
