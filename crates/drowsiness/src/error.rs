//! Configuration Error Types

use thiserror::Error;

/// Errors raised while validating a [`crate::MonitorConfig`]
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Value out of allowed range
    #[error("{field} value {value} is out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// NaN or infinite value
    #[error("{field} must be a finite number, got {value}")]
    NotFinite { field: &'static str, value: f64 },
}
