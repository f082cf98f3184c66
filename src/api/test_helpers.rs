//! Test helpers for api and inference tests
//!
//! Mock scalers and models satisfying the same traits as the loaded
//! artifacts, plus payload builders.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde_json::{json, Map, Value};
use tower::util::ServiceExt;

use super::*;
use crate::{
    features::FeatureVector,
    gbdt::{ModelError, Predictor},
    scaler::{Scaler, ScalerError},
    schema::FEATURE_SCHEMA,
};

/// Returns its input unchanged
pub struct IdentityScaler;

impl Scaler for IdentityScaler {
    fn transform(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>, ScalerError> {
        Ok(x.to_owned())
    }
}

/// Always fails, with detail that must never reach a client
pub struct FailingScaler;

/// Detail carried by [`FailingScaler`] errors
pub const SCALER_FAILURE_DETAIL: &str = "secret-internal-detail";

impl Scaler for FailingScaler {
    fn transform(&self, _x: ArrayView2<'_, f64>) -> Result<Array2<f64>, ScalerError> {
        Err(ScalerError::DimensionMismatch {
            what: SCALER_FAILURE_DETAIL,
            expected: 0,
            actual: 0,
        })
    }
}

/// Panics on every call
pub struct PanickingScaler;

impl Scaler for PanickingScaler {
    fn transform(&self, _x: ArrayView2<'_, f64>) -> Result<Array2<f64>, ScalerError> {
        panic!("scaler exploded")
    }
}

/// Predicts the same value for every row
pub struct ConstantModel(pub f64);

impl Predictor for ConstantModel {
    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>, ModelError> {
        Ok(Array1::from_elem(x.nrows(), self.0))
    }
}

/// Predicts the row sum
pub struct SumModel;

impl Predictor for SumModel {
    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>, ModelError> {
        Ok(x.sum_axis(Axis(1)))
    }
}

/// Always fails
pub struct FailingModel;

impl Predictor for FailingModel {
    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>, ModelError> {
        Err(ModelError::DimensionMismatch {
            expected: 1000,
            actual: x.ncols(),
        })
    }
}

/// Returns no predictions at all
pub struct EmptyModel;

impl Predictor for EmptyModel {
    fn predict(&self, _x: ArrayView2<'_, f64>) -> Result<Array1<f64>, ModelError> {
        Ok(Array1::zeros(0))
    }
}

/// Feature `i` set to `i + 1`
pub fn sample_vector() -> FeatureVector {
    let mut values = [0.0; crate::schema::NUM_FEATURES];
    for (i, v) in values.iter_mut().enumerate() {
        *v = i as f64 + 1.0;
    }
    FeatureVector::from_values(values).expect("finite values")
}

/// Every schema feature, feature `i` set to the numeric string `"i"`
pub fn full_features() -> Map<String, Value> {
    FEATURE_SCHEMA
        .iter()
        .enumerate()
        .map(|(i, name)| ((*name).to_string(), json!(i.to_string())))
        .collect()
}

/// Wrap a feature map in a request body
pub fn predict_body(features: Map<String, Value>) -> String {
    serde_json::to_string(&PredictRequest { features }).expect("serializable request")
}

/// Router over the given mocks
pub fn create_test_app(scaler: impl Scaler + 'static, model: impl Predictor + 'static) -> Router {
    create_router(AppState::new(InferenceEngine::new(
        Arc::new(scaler),
        Arc::new(model),
    )))
}

/// POST a body to `/predict`, returning status and parsed JSON
pub async fn post_predict(app: Router, body: impl Into<Body>) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/predict")
                .header("content-type", "application/json")
                .body(body.into())
                .expect("test"),
        )
        .await
        .expect("test");

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("test");
    let json = serde_json::from_slice(&bytes).expect("json body");
    (status, json)
}
