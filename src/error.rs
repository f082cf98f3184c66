//! Error types for claimscore
//!
//! Two families live here:
//!
//! - [`ClaimscoreError`] covers process start: configuration, artifact
//!   loading and server binding. Any of these is fatal.
//! - [`PredictError`] covers a single `/predict` request. Each variant maps
//!   to exactly one HTTP status and one client-facing message.

use axum::http::StatusCode;
use thiserror::Error;

use crate::{gbdt::ParseError, scaler::ScalerError};

/// Result type alias for process-level operations
pub type Result<T> = std::result::Result<T, ClaimscoreError>;

/// Fatal process-level errors
#[derive(Debug, Error)]
pub enum ClaimscoreError {
    /// File could not be read
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path being accessed
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Configuration file or override is invalid
    #[error("Configuration error: {reason}")]
    Config {
        /// What was wrong
        reason: String,
    },

    /// Scaler artifact failed to load or validate
    #[error("Failed to load scaler from {path}: {source}")]
    ScalerLoad {
        /// Artifact path
        path: String,
        /// Underlying error
        #[source]
        source: ScalerError,
    },

    /// Model artifact failed to load or validate
    #[error("Failed to load model from {path}: {source}")]
    ModelLoad {
        /// Artifact path
        path: String,
        /// Underlying error
        #[source]
        source: ParseError,
    },

    /// Listener bind or serve loop failure
    #[error("Server error during {operation}: {reason}")]
    Server {
        /// Operation that failed (bind, serve)
        operation: String,
        /// Failure description
        reason: String,
    },
}

/// Failure of one step of the prediction pipeline
///
/// Validation variants carry what the caller needs to fix the request.
/// Internal variants carry detail for the server log only; the client sees
/// a fixed message from [`PredictError::client_message`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictError {
    /// Body is not JSON, or has no `features` object
    #[error("no features provided")]
    NoFeatures,

    /// One or more schema features absent, in schema order
    #[error("missing required features: {}", .0.join(", "))]
    MissingFeatures(Vec<String>),

    /// First feature, in schema order, whose value is not a float
    #[error("invalid value for {field}; expected float")]
    InvalidValue {
        /// Offending feature name
        field: String,
    },

    /// Scaler transform failed
    #[error("error scaling features: {0}")]
    Scaling(String),

    /// Model predict failed
    #[error("error making prediction: {0}")]
    Prediction(String),

    /// Anything outside the stages above
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl PredictError {
    /// HTTP status for this failure
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NoFeatures | Self::MissingFeatures(_) | Self::InvalidValue { .. } => {
                StatusCode::BAD_REQUEST
            },
            Self::Scaling(_) | Self::Prediction(_) | Self::Unexpected(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            },
        }
    }

    /// Message returned to the caller in the `error` field
    ///
    /// Scaling and prediction detail is deliberately absent.
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            Self::NoFeatures => "No features provided in the request".to_string(),
            Self::MissingFeatures(names) => {
                format!("Missing required features: {}", names.join(", "))
            },
            Self::InvalidValue { field } => format!("Invalid value for {field}. Expected float."),
            Self::Scaling(_) => "Error scaling features".to_string(),
            Self::Prediction(_) => "Error making prediction".to_string(),
            Self::Unexpected(message) => format!("An unexpected error occurred: {message}"),
        }
    }

    /// True for failures the caller can fix by resubmitting
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}
