//! API request/response types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Prediction request
///
/// The handler parses bodies itself so that malformed input maps onto the
/// service's own error messages. This type is for clients and tests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictRequest {
    /// Feature name to value
    pub features: Map<String, Value>,
}

/// Prediction response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    /// Model output for the submitted claim
    pub prediction: f64,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Features each request must carry
    pub num_features: usize,
}
