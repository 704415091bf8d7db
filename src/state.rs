//! Shared application state
//!
//! Everything handlers need: the orchestrator (holding the injected client
//! handles) and the chat store. All fields are internally synchronized or
//! immutable, so the state is shared as a plain `Arc`.

use crate::chat::ChatDb;
use crate::orchestrator::MedicalOrchestrator;

/// Application state shared across request handlers
pub struct AppState {
    /// The diagnostic pipeline orchestrator
    pub orchestrator: MedicalOrchestrator,
    /// Conversation/workflow store
    pub db: ChatDb,
}

impl AppState {
    pub fn new(orchestrator: MedicalOrchestrator, db: ChatDb) -> Self {
        Self { orchestrator, db }
    }
}
