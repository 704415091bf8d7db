//! Application configuration
//!
//! Centralized configuration management with environment variable support
//! and sensible defaults.

use std::env;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Chat database configuration
    pub database: DatabaseConfig,
    /// Mistral LLM service configuration
    pub mistral: MistralConfig,
    /// Literature vector-search service configuration
    pub search: SearchConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind the server to
    pub port: u16,
    /// Host address to bind to
    pub host: String,
}

/// Chat database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file
    pub path: String,
}

/// Mistral LLM service configuration
#[derive(Debug, Clone)]
pub struct MistralConfig {
    /// API key (from MISTRAL_API_KEY)
    pub api_key: String,
    /// API base URL
    pub base_url: String,
    /// Model name
    pub model: String,
}

/// Literature vector-search service configuration
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Vector search endpoint URL
    pub url: String,
    /// Bearer token for the search service
    pub service_key: String,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig {
                port: env::var("PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(8080),
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            },
            database: DatabaseConfig {
                path: env::var("DATABASE_PATH").unwrap_or_else(|_| {
                    // Default to ~/.nelson-gpt or current directory
                    if let Some(home) = env::var_os("HOME") {
                        format!("{}/.nelson-gpt/chats.db", home.to_string_lossy())
                    } else {
                        ".nelson-gpt/chats.db".to_string()
                    }
                }),
            },
            mistral: MistralConfig {
                api_key: env::var("MISTRAL_API_KEY").unwrap_or_default(),
                base_url: env::var("MISTRAL_BASE_URL")
                    .unwrap_or_else(|_| "https://api.mistral.ai".to_string()),
                model: env::var("MISTRAL_MODEL")
                    .unwrap_or_else(|_| "mistral-large-latest".to_string()),
            },
            search: SearchConfig {
                url: env::var("VECTOR_SEARCH_URL").unwrap_or_default(),
                service_key: env::var("SEARCH_SERVICE_KEY").unwrap_or_default(),
            },
        }
    }

    /// Get the server address as a string
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
