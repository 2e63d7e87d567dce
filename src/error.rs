//! Error types for the autoscaler
//!
//! ## Table of Contents
//! - **AutoscalerError**: Main error enum covering construction and tick failures
//! - **Result**: Type alias for `Result<T, AutoscalerError>`

use thiserror::Error;

/// Result type alias for autoscaler operations
pub type Result<T> = std::result::Result<T, AutoscalerError>;

/// Main error type for autoscaler operations
#[derive(Error, Debug)]
pub enum AutoscalerError {
    /// Invalid configuration at construction time (fatal)
    #[error("configuration error: {0}")]
    Config(String),

    /// Metrics registry construction or export failure
    #[error("metrics error: {0}")]
    Metrics(String),

    /// The spot placer was asked to select a zone with no configured zones
    #[error("spot placer has no zones configured")]
    EmptyZoneSet,

    /// Serialization/deserialization error for decision payloads
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error (should not occur in normal operation)
    #[error("internal error: {0}")]
    Internal(String),
}

impl AutoscalerError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a metrics error
    pub fn metrics(msg: impl Into<String>) -> Self {
        Self::Metrics(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<prometheus::Error> for AutoscalerError {
    fn from(err: prometheus::Error) -> Self {
        Self::Metrics(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_message() {
        let err = AutoscalerError::config("min_replicas cannot exceed max_replicas");
        assert_eq!(
            err.to_string(),
            "configuration error: min_replicas cannot exceed max_replicas"
        );
    }

    #[test]
    fn test_empty_zone_set_message() {
        let err = AutoscalerError::EmptyZoneSet;
        assert_eq!(err.to_string(), "spot placer has no zones configured");
    }
}
