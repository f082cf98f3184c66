//! Scaling and prediction stages
//!
//! [`InferenceEngine`] holds the two loaded artifacts behind `Arc` and runs
//! scale → predict → extract for one validated [`FeatureVector`]. Both
//! artifacts are read-only after load, so one engine is shared by every
//! request without locking.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, error};

use crate::{
    error::PredictError,
    features::FeatureVector,
    gbdt::Predictor,
    scaler::Scaler,
};

/// Scaler and model pair used to score requests
#[derive(Clone)]
pub struct InferenceEngine {
    scaler: Arc<dyn Scaler>,
    model: Arc<dyn Predictor>,
}

impl std::fmt::Debug for InferenceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceEngine").finish_non_exhaustive()
    }
}

impl InferenceEngine {
    /// Create an engine from loaded artifacts
    #[must_use]
    pub fn new(scaler: Arc<dyn Scaler>, model: Arc<dyn Predictor>) -> Self {
        Self { scaler, model }
    }

    /// Score one feature vector
    ///
    /// A panic inside the scaler or model is reported as
    /// [`PredictError::Unexpected`] instead of unwinding into the server.
    ///
    /// # Errors
    ///
    /// - [`PredictError::Scaling`] if the scaler fails
    /// - [`PredictError::Prediction`] if the model fails
    /// - [`PredictError::Unexpected`] if the model output is unusable
    pub fn score(&self, features: &FeatureVector) -> Result<f64, PredictError> {
        catch_unwind(AssertUnwindSafe(|| self.run_stages(features))).unwrap_or_else(|payload| {
            let message = panic_message(payload.as_ref());
            error!(error = %message, "panic during inference");
            Err(PredictError::Unexpected(message))
        })
    }

    fn run_stages(&self, features: &FeatureVector) -> Result<f64, PredictError> {
        let row = features.to_row_matrix();

        let scaled = self.scaler.transform(row.view()).map_err(|e| {
            error!(error = %e, "error scaling features");
            PredictError::Scaling(e.to_string())
        })?;
        debug!(scaled = ?scaled.row(0).to_vec(), "features scaled");

        let output = self.model.predict(scaled.view()).map_err(|e| {
            error!(error = %e, "error making prediction");
            PredictError::Prediction(e.to_string())
        })?;

        let prediction = output
            .first()
            .copied()
            .ok_or_else(|| PredictError::Unexpected("model returned no output".to_string()))?;
        if !prediction.is_finite() {
            return Err(PredictError::Unexpected(format!(
                "model returned a non-finite prediction ({prediction})"
            )));
        }
        Ok(prediction)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "inference panicked".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::{
        sample_vector, ConstantModel, EmptyModel, FailingModel, FailingScaler, IdentityScaler,
        PanickingScaler, SumModel,
    };

    #[test]
    fn test_score_constant_model() {
        let engine = InferenceEngine::new(Arc::new(IdentityScaler), Arc::new(ConstantModel(0.75)));
        assert_eq!(engine.score(&sample_vector()).expect("score"), 0.75);
    }

    #[test]
    fn test_score_passes_scaled_row_to_model() {
        let engine = InferenceEngine::new(Arc::new(IdentityScaler), Arc::new(SumModel));
        let expected: f64 = sample_vector().as_slice().iter().sum();
        assert_eq!(engine.score(&sample_vector()).expect("score"), expected);
    }

    #[test]
    fn test_scaler_failure_maps_to_scaling() {
        let engine = InferenceEngine::new(Arc::new(FailingScaler), Arc::new(ConstantModel(1.0)));
        let err = engine.score(&sample_vector()).unwrap_err();
        assert!(matches!(err, PredictError::Scaling(_)));
        assert_eq!(err.client_message(), "Error scaling features");
    }

    #[test]
    fn test_model_failure_maps_to_prediction() {
        let engine = InferenceEngine::new(Arc::new(IdentityScaler), Arc::new(FailingModel));
        let err = engine.score(&sample_vector()).unwrap_err();
        assert!(matches!(err, PredictError::Prediction(_)));
    }

    #[test]
    fn test_empty_output_is_unexpected() {
        let engine = InferenceEngine::new(Arc::new(IdentityScaler), Arc::new(EmptyModel));
        let err = engine.score(&sample_vector()).unwrap_err();
        assert_eq!(
            err,
            PredictError::Unexpected("model returned no output".to_string())
        );
    }

    #[test]
    fn test_non_finite_output_is_unexpected() {
        let engine =
            InferenceEngine::new(Arc::new(IdentityScaler), Arc::new(ConstantModel(f64::NAN)));
        assert!(matches!(
            engine.score(&sample_vector()).unwrap_err(),
            PredictError::Unexpected(_)
        ));
    }

    #[test]
    fn test_panic_is_unexpected() {
        let engine = InferenceEngine::new(Arc::new(PanickingScaler), Arc::new(ConstantModel(1.0)));
        let err = engine.score(&sample_vector()).unwrap_err();
        assert_eq!(err, PredictError::Unexpected("scaler exploded".to_string()));
    }

    #[test]
    fn test_score_is_idempotent() {
        let engine = InferenceEngine::new(Arc::new(IdentityScaler), Arc::new(SumModel));
        let a = engine.score(&sample_vector()).expect("score");
        let b = engine.score(&sample_vector()).expect("score");
        assert_eq!(a, b);
    }
}
