//! HTTP API for claim scoring
//!
//! Provides REST endpoints using axum.
//!
//! ## Endpoints
//!
//! - `POST /predict` - Score one claim
//! - `GET /health` - Health check
//! - `GET /metrics` - Prometheus-formatted metrics
//!
//! ## Example
//!
//! ```rust,ignore
//! use claimscore::api::{create_router, AppState};
//!
//! let state = AppState::new(InferenceEngine::new(scaler, model));
//! let app = create_router(state);
//! axum::serve(listener, app).await?;
//! ```

use std::{sync::Arc, time::Instant};

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{debug, error, info, warn};

use crate::{
    error::PredictError,
    features::extract_features_from_slice,
    inference::InferenceEngine,
    metrics::MetricsCollector,
    schema::NUM_FEATURES,
};

mod types;
pub use types::{ErrorResponse, HealthResponse, PredictRequest, PredictResponse};

#[cfg(test)]
pub(crate) mod test_helpers;
#[cfg(test)]
mod tests;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Loaded scaler and model
    engine: InferenceEngine,
    /// Metrics collector for monitoring
    metrics: Arc<MetricsCollector>,
}

impl AppState {
    /// Create application state around a loaded engine
    #[must_use]
    pub fn new(engine: InferenceEngine) -> Self {
        Self {
            engine,
            metrics: Arc::new(MetricsCollector::new()),
        }
    }

    /// Metrics collector used by the handlers
    #[must_use]
    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    /// Log and count a failed request, producing its response
    fn reject(&self, err: &PredictError) -> (StatusCode, Json<ErrorResponse>) {
        if err.is_client_error() {
            warn!(error = %err, "rejected prediction request");
            self.metrics.record_client_error();
        } else {
            error!(error = %err, "prediction request failed");
            self.metrics.record_internal_error();
        }
        error_response(err)
    }
}

/// Status and body for a pipeline failure
#[must_use]
pub fn error_response(err: &PredictError) -> (StatusCode, Json<ErrorResponse>) {
    (
        err.status_code(),
        Json(ErrorResponse {
            error: err.client_message(),
        }),
    )
}

/// Create the API router
///
/// # Arguments
///
/// * `state` - Application state with the loaded engine
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/predict", post(predict_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Prediction handler (`POST /predict`)
///
/// The body is taken as raw bytes. Unparsable JSON gets the same response
/// as a body without `features`, and the content type is not checked.
async fn predict_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<PredictResponse>, (StatusCode, Json<ErrorResponse>)> {
    let start = Instant::now();
    debug!(payload = %String::from_utf8_lossy(&body), "received prediction request");

    let features = extract_features_from_slice(&body).map_err(|e| state.reject(&e))?;
    debug!(features = ?features.as_slice(), "extracted features");

    let prediction = state.engine.score(&features).map_err(|e| state.reject(&e))?;

    let elapsed = start.elapsed();
    info!(
        prediction,
        latency_us = elapsed.as_micros() as u64,
        "prediction made"
    );
    state.metrics.record_success(elapsed);

    let response = PredictResponse { prediction };
    debug!(?response, "sending response");
    Ok(Json(response))
}

/// Health check handler
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: crate::VERSION.to_string(),
        num_features: NUM_FEATURES,
    })
}

/// Metrics handler - returns Prometheus-formatted metrics
async fn metrics_handler(State(state): State<AppState>) -> String {
    state.metrics.to_prometheus()
}
