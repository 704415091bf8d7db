//! Chat data models
//!
//! Defines structures for conversations, messages, and persisted
//! diagnostic-workflow records.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Role of a message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Message from the user
    User,
    /// Message from the assistant
    Assistant,
}

impl MessageRole {
    /// Convert the role to its string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

/// A conversation thread
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Conversation {
    /// Unique identifier for the conversation
    pub id: String,
    /// Title of the conversation (derived from the first message)
    pub title: String,
    /// When the conversation was created (Unix timestamp)
    pub created_at: i64,
    /// When the conversation was last updated (Unix timestamp)
    pub updated_at: i64,
}

impl Conversation {
    /// Create a new conversation
    pub fn new(id: String, title: String) -> Self {
        let now = Utc::now().timestamp();
        Self {
            id,
            title,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A single message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Message {
    /// Unique identifier for the message
    pub id: String,
    /// ID of the conversation this message belongs to
    pub conversation_id: String,
    /// Role of the message sender, stored as "user" or "assistant"
    pub role: String,
    /// Content of the message
    pub content: String,
    /// Classification confidence, for assistant messages carrying a diagnosis
    pub confidence: Option<f64>,
    /// Literature references as a JSON array, if any
    pub sources: Option<String>,
    /// When the message was created (Unix timestamp)
    pub created_at: i64,
}

impl Message {
    /// Create a new plain message
    pub fn new(id: String, conversation_id: String, role: MessageRole, content: String) -> Self {
        Self {
            id,
            conversation_id,
            role: role.as_str().to_string(),
            content,
            confidence: None,
            sources: None,
            created_at: Utc::now().timestamp(),
        }
    }

    /// Attach a classification confidence
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Attach serialized literature sources
    pub fn with_sources(mut self, sources: String) -> Self {
        self.sources = Some(sources);
        self
    }
}

/// Persisted record of one completed diagnostic pipeline run
///
/// Written only for `Assembled` outcomes; a fallback response is stored as a
/// plain assistant message and never lands in this table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DiagnosticWorkflow {
    /// Unique identifier for the workflow record
    pub id: String,
    /// Session the run belonged to
    pub session_id: String,
    /// Workflow variant ("standard")
    pub workflow_type: String,
    /// Full diagnostic result as JSON
    pub step_data: String,
    /// Reasoning trace as a JSON array
    pub completed_steps: String,
    /// Per-stage confidence scores as JSON
    pub confidence_scores: String,
    /// When the record was created (Unix timestamp)
    pub created_at: i64,
}

impl DiagnosticWorkflow {
    /// Create a new workflow record
    pub fn new(
        id: String,
        session_id: String,
        step_data: String,
        completed_steps: String,
        confidence_scores: String,
    ) -> Self {
        Self {
            id,
            session_id,
            workflow_type: "standard".to_string(),
            step_data,
            completed_steps,
            confidence_scores,
            created_at: Utc::now().timestamp(),
        }
    }
}
