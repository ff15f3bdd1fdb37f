//! gpustress Error Definitions
//!
//! Defines error types used throughout the core.

use thiserror::Error;

/// Core engine error types
#[derive(Error, Debug)]
pub enum CoreError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown quality level: {0}")]
    UnknownQuality(String),

    #[error("Invalid resolution: {0}")]
    InvalidResolution(String),

    #[error("Unknown test mode: {0}")]
    UnknownMode(String),

    // =========================================================================
    // Workload Errors
    // =========================================================================
    #[error("Workload backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Workload frame failed: {0}")]
    Workload(String),

    // =========================================================================
    // Export Errors
    // =========================================================================
    #[error("Export failed: {0}")]
    Export(String),

    // =========================================================================
    // General Errors
    // =========================================================================
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Core engine result type
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Whether the error must abort the run before it starts
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            CoreError::InvalidConfig(_)
                | CoreError::UnknownQuality(_)
                | CoreError::InvalidResolution(_)
                | CoreError::UnknownMode(_)
        )
    }
}
