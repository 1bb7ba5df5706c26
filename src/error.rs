//! Custom error types for Ratchet.
//!
//! Every failure a gate can raise is a variant here, so the binary can map
//! it to a process exit code and the library can tell "the build should
//! fail" apart from "the tool itself broke".

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Ratchet operations
#[derive(Error, Debug)]
pub enum RatchetError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Failed to load configuration
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        path: Option<PathBuf>,
    },

    /// Invalid configuration value
    #[error("Invalid configuration: {field} - {reason}")]
    InvalidConfig { field: String, reason: String },

    // =========================================================================
    // Threshold Errors
    // =========================================================================
    /// A threshold file exists but one of its lines cannot be trusted
    #[error("Malformed threshold file {path} at line {line}: {reason}")]
    InvalidThresholds {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// The coverage report has a counter type with no configured floor
    #[error("Not found settings in {file} for: {}", format_types(.types))]
    MissingCoverageThreshold { file: String, types: Vec<String> },

    // =========================================================================
    // Report Errors
    // =========================================================================
    /// An analyzer report is present but could not be read or parsed
    #[error("Failed to parse report {path}: {message}")]
    Report { path: PathBuf, message: String },

    // =========================================================================
    // Repository Errors
    // =========================================================================
    /// Git operation failed
    #[error("Git operation failed: {operation} - {message}")]
    Git { operation: String, message: String },

    // =========================================================================
    // Gate Errors
    // =========================================================================
    /// A gate decided the build must fail (regression or stale threshold)
    #[error("{message}")]
    GateFailed { gate: String, message: String },

    // =========================================================================
    // Wrapped Errors
    // =========================================================================
    /// IO error wrapper
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn format_types(types: &[String]) -> String {
    types
        .iter()
        .map(|t| format!("type={}", t))
        .collect::<Vec<_>>()
        .join(", ")
}

impl RatchetError {
    // =========================================================================
    // Constructor helpers
    // =========================================================================

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            path: None,
        }
    }

    /// Create a configuration error with path
    pub fn config_with_path(message: impl Into<String>, path: PathBuf) -> Self {
        Self::Config {
            message: message.into(),
            path: Some(path),
        }
    }

    /// Create a git error
    pub fn git(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Git {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a report parsing error
    pub fn report(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Report {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a gate failure
    pub fn gate_failed(gate: impl Into<String>, message: impl Into<String>) -> Self {
        Self::GateFailed {
            gate: gate.into(),
            message: message.into(),
        }
    }

    // =========================================================================
    // Classification helpers
    // =========================================================================

    /// Check if this error is an ordinary quality-gate failure rather than
    /// a broken environment or configuration.
    pub fn is_gate_failure(&self) -> bool {
        matches!(self, Self::GateFailed { .. })
    }

    /// Check if this error comes from configuration the project owns
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::Config { .. }
                | Self::InvalidConfig { .. }
                | Self::InvalidThresholds { .. }
                | Self::MissingCoverageThreshold { .. }
        )
    }

    /// Get error code for exit status
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::GateFailed { .. } => 1,
            Self::Git { .. } => 3,
            Self::Report { .. } => 4,
            _ if self.is_configuration_error() => 7,
            _ => 1,
        }
    }
}

/// Type alias for Ratchet results
pub type Result<T> = std::result::Result<T, RatchetError>;
