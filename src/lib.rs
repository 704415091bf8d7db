//! Nelson-GPT Backend Library
//!
//! Pediatric diagnostic assistant backend: a multi-stage LLM reasoning
//! pipeline behind a small REST API. This library exposes modules for
//! testing and external use; the main binary is in `src/main.rs`.

pub mod api;
pub mod chat;
pub mod config;
pub mod error;
pub mod llm;
pub mod orchestrator;
pub mod state;
