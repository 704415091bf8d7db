//! Mistral API client
//!
//! Direct HTTP client for calling the Mistral chat-completions API.
//! Every pipeline stage that needs reasoning goes through this client and
//! expects structured JSON inside the returned text.

use crate::llm::mistral_types::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage};
use crate::llm::{GenerationParams, LlmError, TextGenerator};
use async_trait::async_trait;

const MISTRAL_API_BASE_URL: &str = "https://api.mistral.ai";

/// HTTP client for the Mistral chat-completions API
///
/// Holds a shared `reqwest::Client` (connection pooling) and is safe to reuse
/// across concurrent pipeline invocations: nothing is mutated per call.
#[derive(Clone)]
pub struct MistralClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl MistralClient {
    /// Create a client against the production API
    pub fn new(client: reqwest::Client, api_key: String, model: String) -> Self {
        Self::with_base_url(client, api_key, model, MISTRAL_API_BASE_URL.to_string())
    }

    /// Create a client against a custom base URL (for testing)
    pub fn with_base_url(
        client: reqwest::Client,
        api_key: String,
        model: String,
        base_url: String,
    ) -> Self {
        Self {
            client,
            api_key,
            base_url,
            model,
        }
    }

    /// The model name requests are issued for
    pub fn model(&self) -> &str {
        &self.model
    }

    async fn call_api(&self, prompt: &str, params: &GenerationParams) -> Result<String, LlmError> {
        if self.api_key.is_empty() {
            return Err(LlmError::MissingApiKey);
        }

        let url = format!("{}/v1/chat/completions", self.base_url);
        let request_body = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: params.temperature,
            top_p: params.top_p,
            max_tokens: params.max_tokens,
        };

        tracing::debug!(
            url = %url,
            model = %self.model,
            prompt_len = prompt.len(),
            timeout_ms = params.timeout.as_millis() as u64,
            "Calling Mistral API"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .timeout(params.timeout)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout
                } else {
                    LlmError::Unavailable(format!("failed to send request: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let status_code = status.as_u16();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());

            tracing::error!(
                status_code = status_code,
                error_body = %error_body,
                "Mistral API returned error status"
            );

            if status_code == 429 {
                return Err(LlmError::QuotaExceeded(error_body));
            }

            return Err(LlmError::Unavailable(format!(
                "HTTP {status_code}: {error_body}"
            )));
        }

        let response_body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout
            } else {
                LlmError::Unavailable(format!("failed to read response body: {e}"))
            }
        })?;

        let parsed: ChatCompletionResponse = serde_json::from_str(&response_body).map_err(|e| {
            LlmError::MalformedResponse(format!("{e} - response body: {response_body}"))
        })?;

        let choice = parsed
            .choices
            .first()
            .ok_or_else(|| LlmError::MalformedResponse("response contains no choices".to_string()))?;

        let text = &choice.message.content;
        if text.is_empty() {
            return Err(LlmError::MalformedResponse(
                "response text is empty".to_string(),
            ));
        }

        tracing::debug!(
            response_len = text.len(),
            completion_tokens = parsed.usage.as_ref().map(|u| u.completion_tokens),
            "Received response from Mistral API"
        );

        Ok(text.clone())
    }
}

#[async_trait]
impl TextGenerator for MistralClient {
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String, LlmError> {
        self.call_api(prompt, params).await
    }
}
