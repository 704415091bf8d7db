//! API module
//!
//! Contains HTTP request handlers for the orchestrated chat endpoint and
//! conversation listing.

pub mod chat;
