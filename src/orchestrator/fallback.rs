//! Fallback responder
//!
//! Terminal non-diagnostic path taken when a hard-dependency stage fails.
//! The message is static apart from the verbatim query echo (kept for
//! operator triage) and must never contain medical content: by construction
//! the pipeline could not validate any.

use crate::orchestrator::types::{FallbackResult, ReasoningTrace};

/// Build the degraded response for a run that could not complete
pub fn respond(query_text: &str, trace: ReasoningTrace) -> FallbackResult {
    let message = format!(
        "I'm currently unable to process your query due to a temporary issue.\n\n\
         Please try again in a moment. If the issue persists, please contact support.\n\n\
         Your query: \"{query_text}\""
    );

    FallbackResult {
        message,
        reasoning: trace,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_respond_echoes_query_verbatim() {
        let fallback = respond(
            "3-month-old infant with fever 39.5°C and poor feeding",
            ReasoningTrace::new(),
        );
        assert!(fallback
            .message
            .contains("\"3-month-old infant with fever 39.5°C and poor feeding\""));
    }

    #[test]
    fn test_respond_is_deterministic() {
        let first = respond("same query", ReasoningTrace::new());
        let second = respond("same query", ReasoningTrace::new());
        assert_eq!(first.message, second.message);
    }

    #[test]
    fn test_respond_carries_trace() {
        let mut trace = ReasoningTrace::new();
        trace.push("Query classification failed: upstream call timed out");
        let fallback = respond("q", trace);
        assert_eq!(fallback.reasoning.len(), 1);
    }

    #[test]
    fn test_respond_contains_no_medical_content() {
        let fallback = respond("fever", ReasoningTrace::new());
        for term in ["diagnosis", "treatment", "dosing", "medication"] {
            assert!(
                !fallback.message.to_lowercase().contains(term),
                "fallback message must not mention '{term}'"
            );
        }
    }
}
