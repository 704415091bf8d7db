//! Stage adapters
//!
//! One module per pipeline stage. Each adapter composes the prompt binder,
//! one bounded external call, and the structured-output parser, and returns
//! `Result<Output, StageError>`. The orchestrator decides what a failure
//! means; adapters only report it.

pub mod classify;
pub mod diagnose;
pub mod extract;
pub mod literature;
pub mod safety;
pub mod treat;

pub use classify::classify_query;
pub use diagnose::generate_diagnosis;
pub use extract::extract_context;
pub use literature::search_literature;
pub use safety::validate_safety;
pub use treat::generate_treatment;

use crate::orchestrator::types::{LiteratureReference, MedicalContext};

/// Render references as `- {title} (p.{page})` lines for prompt inclusion
pub(crate) fn render_literature(references: &[LiteratureReference]) -> String {
    references
        .iter()
        .map(|reference| format!("- {} (p.{})", reference.title, reference.page))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Serialize extracted context for prompt inclusion
pub(crate) fn render_context(context: &MedicalContext) -> String {
    // MedicalContext serializes infallibly (string keys, no custom impls)
    serde_json::to_string(context).unwrap_or_else(|_| "{}".to_string())
}
