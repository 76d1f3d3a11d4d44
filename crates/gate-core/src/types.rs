//! ============================================================================
//! Core Types for Purge Gate
//! ============================================================================
//! Storage and database layers return `anyhow::Result`; configuration
//! problems surface as `GateError`.
//! ============================================================================

use std::path::PathBuf;

/// Error types for the gate
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("Failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

pub type GateResult<T> = std::result::Result<T, GateError>;
