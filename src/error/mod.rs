//! Error handling for dojo-import.
//!
//! This module provides:
//! - [`DojoError`]: The main error enum for all pipeline operations
//! - [`ErrorCode`]: Standardized error codes for machine parsing
//! - [`StructuredError`]: Rich error type with suggestions and context
//!
//! Only fatal conditions live here. Structural non-conformance travels as a
//! `ValidationReport` and missing metadata as soft issues on `Assessed<T>`.

mod codes;
mod suggestions;

use std::io;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use codes::ErrorCode;
pub use suggestions::suggest_for_error;

/// Main error type for the import pipeline.
#[derive(Error, Debug)]
pub enum DojoError {
    #[error("Security violation: {reason} ({value})")]
    SecurityViolation { reason: String, value: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Transfer failed: {0}")]
    Transfer(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Unsupported source: {0}")]
    UnsupportedSource(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DojoError {
    /// Shorthand for a security rejection carrying the offending value.
    pub fn security(reason: impl Into<String>, value: impl Into<String>) -> Self {
        Self::SecurityViolation {
            reason: reason.into(),
            value: value.into(),
        }
    }

    /// Get the error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::SecurityViolation { .. } => ErrorCode::SecurityViolation,
            Self::NotFound(_) => ErrorCode::SourceNotFound,
            Self::Transfer(_) => ErrorCode::TransferFailed,
            Self::Timeout(_) => ErrorCode::NetworkTimeout,
            Self::UnsupportedSource(_) => ErrorCode::SourceUnsupported,
            Self::InvalidInput(_) => ErrorCode::InvalidInput,
            Self::Config(_) => ErrorCode::ConfigInvalid,
            Self::Git(_) => ErrorCode::GitError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::SerializationError,
        }
    }

    /// Get context information for this error as JSON.
    #[must_use]
    pub fn context(&self) -> Option<Value> {
        match self {
            Self::SecurityViolation { reason, value } => {
                Some(serde_json::json!({ "reason": reason, "value": value }))
            }
            Self::NotFound(what) => Some(serde_json::json!({ "path": what })),
            Self::UnsupportedSource(source) => Some(serde_json::json!({ "source": source })),
            _ => None,
        }
    }

    /// Convert this error to a structured error.
    #[must_use]
    pub fn to_structured(&self) -> StructuredError {
        StructuredError::from_dojo_error(self)
    }
}

/// A structured error with machine-readable code, suggestion, and context.
///
/// This is the shape emitted in machine output so calling tools can react
/// to a failure without parsing the message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// The error code (e.g., "SECURITY_VIOLATION")
    pub code: ErrorCode,

    /// The numeric error code (e.g., 101)
    pub numeric_code: u16,

    /// Human-readable error message
    pub message: String,

    /// Actionable suggestion for recovery
    pub suggestion: String,

    /// Additional context for debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,

    /// Whether this error is potentially recoverable by the user
    pub recoverable: bool,

    /// Error category (e.g., "fetch", "config", "network")
    pub category: String,
}

impl StructuredError {
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            numeric_code: code.numeric(),
            suggestion: code.suggestion().to_string(),
            context: None,
            recoverable: code.is_recoverable(),
            category: code.category().to_string(),
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn from_dojo_error(err: &DojoError) -> Self {
        let code = err.code();
        let context = err.context();
        let suggestion = suggest_for_error(code, context.as_ref());

        Self {
            code,
            numeric_code: code.numeric(),
            message: err.to_string(),
            suggestion,
            context,
            recoverable: code.is_recoverable(),
            category: code.category().to_string(),
        }
    }

    /// Add context to this error, regenerating the suggestion.
    #[must_use]
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self.suggestion = suggest_for_error(self.code, self.context.as_ref());
        self
    }
}

impl std::fmt::Display for StructuredError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl From<&DojoError> for StructuredError {
    fn from(err: &DojoError) -> Self {
        Self::from_dojo_error(err)
    }
}

/// Result type alias using DojoError.
pub type Result<T> = std::result::Result<T, DojoError>;
