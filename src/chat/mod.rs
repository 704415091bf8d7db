//! Conversation persistence
//!
//! SQLite-backed store for conversations, messages, and diagnostic-workflow
//! records. Owned by the API layer; the pipeline core never writes here.

pub mod db;
pub mod models;

pub use db::ChatDb;
