//! Literature index client
//!
//! HTTP client for the pediatric literature vector-search service. The index
//! is consumed as a black box: query text plus whatever structured context is
//! available go in, ranked passages come out.

use crate::llm::{LiteratureSearch, SearchError, SearchHit, SearchRequest};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// Response envelope from the vector-search service
#[derive(Deserialize, Debug)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

/// HTTP client for the literature vector-search service
#[derive(Clone)]
pub struct LiteratureIndexClient {
    client: reqwest::Client,
    url: String,
    service_key: String,
    timeout: Duration,
}

impl LiteratureIndexClient {
    /// Create a client for the given endpoint
    pub fn new(client: reqwest::Client, url: String, service_key: String) -> Self {
        Self {
            client,
            url,
            service_key,
            timeout: Duration::from_secs(10),
        }
    }

    /// Override the request timeout (default 10s)
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl LiteratureSearch for LiteratureIndexClient {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>, SearchError> {
        tracing::debug!(
            url = %self.url,
            query_len = request.query.len(),
            limit = request.limit,
            threshold = request.threshold,
            "Calling literature index"
        );

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.service_key)
            .timeout(self.timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SearchError::Timeout
                } else {
                    SearchError::Unavailable(format!("failed to send request: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());

            tracing::warn!(
                status_code = status.as_u16(),
                error_body = %error_body,
                "Literature index returned error status"
            );

            return Err(SearchError::Unavailable(format!(
                "HTTP {}: {error_body}",
                status.as_u16()
            )));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| SearchError::MalformedResponse(e.to_string()))?;

        tracing::debug!(hits = parsed.results.len(), "Literature index responded");
        Ok(parsed.results)
    }
}
