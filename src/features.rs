//! Validated feature assembly
//!
//! Turns an arbitrary JSON request body into a [`FeatureVector`] aligned to
//! [`FEATURE_SCHEMA`]. Validation runs in a fixed order and stops at the
//! first failing step:
//!
//! 1. the body must hold a `features` object
//! 2. every schema name must be present (all missing names are reported)
//! 3. every value must coerce to a float (only the first offender is reported)
//! 4. the vector is assembled in schema order
//!
//! Steps 2 and 3 intentionally differ: missing names are aggregated while
//! coercion stops at the first bad value. Clients depend on both messages.

use ndarray::Array2;
use serde_json::{Map, Value};

use crate::{
    error::PredictError,
    schema::{feature_index, FEATURE_SCHEMA, NUM_FEATURES},
};

/// Key holding the feature mapping in a request body
pub const FEATURES_KEY: &str = "features";

/// Feature values in schema order
///
/// Only [`extract_features`] and [`FeatureVector::from_values`] build one,
/// so a vector always has exactly [`NUM_FEATURES`] finite entries.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: [f64; NUM_FEATURES],
}

impl FeatureVector {
    /// Build from values already in schema order
    ///
    /// Returns `None` if any value is not finite.
    #[must_use]
    pub fn from_values(values: [f64; NUM_FEATURES]) -> Option<Self> {
        values
            .iter()
            .all(|v| v.is_finite())
            .then_some(Self { values })
    }

    /// Values in schema order
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Value of a named feature
    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        feature_index(name).map(|i| self.values[i])
    }

    /// Single-row matrix for the scaler
    #[must_use]
    pub fn to_row_matrix(&self) -> Array2<f64> {
        Array2::from_shape_fn((1, NUM_FEATURES), |(_, j)| self.values[j])
    }
}

/// Run validation steps 1 through 4 over a parsed request body
///
/// # Errors
///
/// - [`PredictError::NoFeatures`] if `body` has no `features` object
/// - [`PredictError::MissingFeatures`] listing every absent schema name
/// - [`PredictError::InvalidValue`] naming the first non-coercible value
pub fn extract_features(body: &Value) -> Result<FeatureVector, PredictError> {
    let features = feature_map(body)?;
    check_complete(features)?;
    let values = coerce_all(features)?;
    Ok(FeatureVector { values })
}

/// Parse a raw request body and extract features from it
///
/// Bytes that are not JSON are treated the same as a body without a
/// `features` object.
///
/// # Errors
///
/// Same as [`extract_features`].
pub fn extract_features_from_slice(body: &[u8]) -> Result<FeatureVector, PredictError> {
    let value: Value = serde_json::from_slice(body).map_err(|_| PredictError::NoFeatures)?;
    extract_features(&value)
}

fn feature_map(body: &Value) -> Result<&Map<String, Value>, PredictError> {
    body.get(FEATURES_KEY)
        .and_then(Value::as_object)
        .ok_or(PredictError::NoFeatures)
}

fn check_complete(features: &Map<String, Value>) -> Result<(), PredictError> {
    let missing: Vec<String> = FEATURE_SCHEMA
        .iter()
        .filter(|name| !features.contains_key(**name))
        .map(|name| (*name).to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(PredictError::MissingFeatures(missing))
    }
}

fn coerce_all(features: &Map<String, Value>) -> Result<[f64; NUM_FEATURES], PredictError> {
    let mut values = [0.0; NUM_FEATURES];
    for (slot, name) in values.iter_mut().zip(FEATURE_SCHEMA.iter()) {
        *slot = features
            .get(*name)
            .and_then(coerce_value)
            .ok_or_else(|| PredictError::InvalidValue {
                field: (*name).to_string(),
            })?;
    }
    Ok(values)
}

/// Coerce one JSON value to a finite float
///
/// Numbers and numeric strings (surrounding whitespace allowed) are accepted.
/// Strings may group digits with single underscores, as in `"1_000"`.
/// Number literals too large for `f64` are rejected here, per field.
/// Booleans, null, arrays, objects, non-numeric strings and non-finite results
/// are rejected.
#[must_use]
pub fn coerce_value(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_float(s.trim()),
        Value::Null | Value::Bool(_) | Value::Array(_) | Value::Object(_) => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn parse_float(s: &str) -> Option<f64> {
    if !s.contains('_') {
        return s.parse().ok();
    }
    let bytes = s.as_bytes();
    let grouped = bytes
        .iter()
        .enumerate()
        .filter(|(_, b)| **b == b'_')
        .all(|(i, _)| {
            i > 0
                && bytes[i - 1].is_ascii_digit()
                && bytes.get(i + 1).is_some_and(u8::is_ascii_digit)
        });
    if !grouped {
        return None;
    }
    s.replace('_', "").parse().ok()
}
