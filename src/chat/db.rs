//! Chat database operations
//!
//! Handles all database interactions for conversations, messages, and
//! diagnostic-workflow records. The pipeline itself never touches this
//! store; the API layer (the pipeline's caller) owns persistence.

use crate::chat::models::{Conversation, DiagnosticWorkflow, Message};
use crate::error::AppError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, info};

/// Database connection pool for chat operations
#[derive(Clone)]
pub struct ChatDb {
    pool: SqlitePool,
}

impl ChatDb {
    /// Initialize database connection pool
    ///
    /// # Arguments
    /// * `db_path` - Path to the SQLite database file
    pub async fn new(db_path: &str) -> Result<Self, AppError> {
        // Ensure parent directory exists
        if let Some(parent) = PathBuf::from(db_path).parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Internal(anyhow::anyhow!("Failed to create db directory: {}", e))
            })?;
        }

        // SQLite connection string format: sqlite://path/to/db.db
        let connection_string = if db_path.starts_with("sqlite:") {
            db_path.to_string()
        } else {
            format!("sqlite:{}", db_path)
        };

        let options = SqliteConnectOptions::from_str(&connection_string)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid database path: {}", e)))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        info!("Connected to SQLite database at: {}", db_path);

        let db = Self { pool };
        db.run_migrations().await?;

        Ok(db)
    }

    /// Run database migrations
    async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations...");

        let migration_sql = include_str!("../../migrations/001_create_chats.sql");

        // Strip comment lines and inline comments, then split into statements
        let mut cleaned_sql = String::new();
        for line in migration_sql.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with("--") {
                continue;
            }
            let without_comments = if let Some(comment_pos) = trimmed.find("--") {
                &trimmed[..comment_pos]
            } else {
                trimmed
            };
            cleaned_sql.push_str(without_comments.trim());
            cleaned_sql.push(' ');
        }

        let statements: Vec<&str> = cleaned_sql
            .split(';')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect();

        for statement in statements {
            sqlx::query(statement).execute(&self.pool).await?;
        }

        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Get all conversations, ordered by most recently updated
    pub async fn get_conversations(&self) -> Result<Vec<Conversation>, AppError> {
        let conversations = sqlx::query_as::<_, Conversation>(
            "SELECT id, title, created_at, updated_at FROM conversations ORDER BY updated_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(conversations)
    }

    /// Get a conversation by ID
    pub async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, AppError> {
        let conversation = sqlx::query_as::<_, Conversation>(
            "SELECT id, title, created_at, updated_at FROM conversations WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(conversation)
    }

    /// Create a new conversation
    pub async fn create_conversation(&self, conversation: &Conversation) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO conversations (id, title, created_at, updated_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&conversation.id)
        .bind(&conversation.title)
        .bind(conversation.created_at)
        .bind(conversation.updated_at)
        .execute(&self.pool)
        .await?;

        debug!("Created conversation: {}", conversation.id);
        Ok(())
    }

    /// Update conversation's updated_at timestamp (when new message is added)
    pub async fn touch_conversation(&self, id: &str) -> Result<(), AppError> {
        let updated_at = chrono::Utc::now().timestamp();
        sqlx::query("UPDATE conversations SET updated_at = ? WHERE id = ?")
            .bind(updated_at)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Get all messages for a conversation, ordered by creation time
    pub async fn get_messages(&self, conversation_id: &str) -> Result<Vec<Message>, AppError> {
        let messages = sqlx::query_as::<_, Message>(
            "SELECT id, conversation_id, role, content, confidence, sources, created_at \
             FROM messages WHERE conversation_id = ? ORDER BY created_at ASC",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }

    /// Add a message to a conversation
    pub async fn add_message(&self, message: &Message) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO messages (id, conversation_id, role, content, confidence, sources, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&message.id)
        .bind(&message.conversation_id)
        .bind(&message.role)
        .bind(&message.content)
        .bind(message.confidence)
        .bind(&message.sources)
        .bind(message.created_at)
        .execute(&self.pool)
        .await?;

        self.touch_conversation(&message.conversation_id).await?;

        debug!(
            "Added message {} to conversation {}",
            message.id, message.conversation_id
        );
        Ok(())
    }

    /// Record a completed diagnostic workflow
    pub async fn record_workflow(&self, workflow: &DiagnosticWorkflow) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO diagnostic_workflows \
             (id, session_id, workflow_type, step_data, completed_steps, confidence_scores, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&workflow.id)
        .bind(&workflow.session_id)
        .bind(&workflow.workflow_type)
        .bind(&workflow.step_data)
        .bind(&workflow.completed_steps)
        .bind(&workflow.confidence_scores)
        .bind(workflow.created_at)
        .execute(&self.pool)
        .await?;

        debug!(
            "Recorded diagnostic workflow {} for session {}",
            workflow.id, workflow.session_id
        );
        Ok(())
    }

    /// Get all workflow records for a session, oldest first
    pub async fn get_workflows(&self, session_id: &str) -> Result<Vec<DiagnosticWorkflow>, AppError> {
        let workflows = sqlx::query_as::<_, DiagnosticWorkflow>(
            "SELECT id, session_id, workflow_type, step_data, completed_steps, confidence_scores, created_at \
             FROM diagnostic_workflows WHERE session_id = ? ORDER BY created_at ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(workflows)
    }
}
