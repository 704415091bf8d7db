//! Literature retrieval stage
//!
//! Queries the vector index for supporting passages. Literature is an
//! enrichment, not a hard dependency: the orchestrator absorbs a failure
//! here into an empty reference list and keeps going.

use crate::llm::{LiteratureSearch, SearchRequest};
use crate::orchestrator::config::PipelineConfig;
use crate::orchestrator::error::StageError;
use crate::orchestrator::types::{LiteratureReference, MedicalContext};
use tokio::time::timeout;

/// Retrieve ranked literature references for the query
///
/// `context` is best-effort: when retrieval races context extraction the
/// orchestrator passes whatever is available at call time, which at launch
/// is nothing.
pub async fn search_literature(
    search: &dyn LiteratureSearch,
    config: &PipelineConfig,
    query_text: &str,
    context: Option<&MedicalContext>,
) -> Result<Vec<LiteratureReference>, StageError> {
    let request = SearchRequest {
        query: query_text.to_string(),
        context: context
            .and_then(|c| serde_json::to_value(c).ok())
            .unwrap_or_else(|| serde_json::json!({})),
        limit: config.literature_limit,
        threshold: config.literature_threshold,
    };

    let hits = timeout(config.literature_timeout, search.search(&request))
        .await
        .map_err(|_| StageError::UpstreamTimeout)??;

    let mut references: Vec<LiteratureReference> = hits
        .into_iter()
        .filter_map(|hit| {
            if hit.page < 1 || !(0.0..=1.0).contains(&hit.confidence) {
                tracing::warn!(
                    title = %hit.title,
                    page = hit.page,
                    relevance = hit.confidence,
                    "Dropping literature hit with invalid page or relevance"
                );
                return None;
            }
            Some(LiteratureReference {
                title: hit.title,
                page: hit.page,
                excerpt: hit.excerpt,
                relevance: hit.confidence,
            })
        })
        .collect();

    references.sort_by(|a, b| b.relevance.total_cmp(&a.relevance));
    references.truncate(config.literature_limit);

    tracing::debug!(count = references.len(), "Literature retrieved");
    Ok(references)
}
