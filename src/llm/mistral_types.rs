//! Mistral API wire types
//!
//! Structs that mirror the Mistral chat-completions JSON format.
//! Used to serialize requests and deserialize API responses.

use serde::{Deserialize, Serialize};

/// Request body for the chat-completions endpoint
#[derive(Serialize, Debug)]
pub struct ChatCompletionRequest {
    /// Model name (e.g. "mistral-large-latest")
    pub model: String,
    /// Conversation messages (a single user message for pipeline calls)
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature
    pub temperature: f32,
    /// Nucleus-sampling parameter
    pub top_p: f32,
    /// Maximum tokens to generate
    pub max_tokens: u32,
}

/// A single chat message
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ChatMessage {
    /// Role of the sender ("user", "assistant", "system")
    pub role: String,
    /// Message text
    pub content: String,
}

/// Top-level chat-completions response
#[derive(Deserialize, Debug)]
pub struct ChatCompletionResponse {
    /// List of completion choices from the model
    pub choices: Vec<ChatChoice>,
    /// Token usage accounting
    #[serde(default)]
    pub usage: Option<Usage>,
}

/// A single completion choice
#[derive(Deserialize, Debug)]
pub struct ChatChoice {
    /// The generated message
    pub message: ChatMessage,
    /// Why the model stopped generating (if reported)
    #[serde(default)]
    #[allow(dead_code)] // Part of API response format, may be used in future
    pub finish_reason: Option<String>,
}

/// Token usage reported by the API
#[derive(Deserialize, Debug)]
pub struct Usage {
    /// Tokens consumed by the prompt
    #[allow(dead_code)] // Part of API response format, may be used in future
    pub prompt_tokens: u32,
    /// Tokens generated in the completion
    pub completion_tokens: u32,
}
