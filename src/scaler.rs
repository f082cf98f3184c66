//! Feature scaling
//!
//! The scaler is fitted offline and exported as JSON. At runtime it is a
//! read-only per-column affine transform `(x - mean) / scale`.
//!
//! ## Artifact format
//!
//! ```json
//! {
//!   "mean": [57 floats],
//!   "scale": [57 floats],
//!   "feature_names": ["BeneID", "ClaimID", ...]
//! }
//! ```
//!
//! `feature_names` is optional. When present it must equal the feature
//! schema in order.

use std::path::Path;

use ndarray::{Array1, Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schema::{FEATURE_SCHEMA, NUM_FEATURES};

/// Scaler load and transform failures
#[derive(Debug, Error)]
pub enum ScalerError {
    /// Artifact file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Artifact is not valid scaler JSON
    #[error("invalid scaler JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Parameter or input width does not match what is expected
    #[error("dimension mismatch for {what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Which array was checked
        what: &'static str,
        /// Expected width
        expected: usize,
        /// Actual width
        actual: usize,
    },

    /// Artifact column names disagree with the feature schema
    #[error("feature name mismatch at column {index}: expected {expected}, got {actual}")]
    FeatureNameMismatch {
        /// Column index
        index: usize,
        /// Schema name
        expected: String,
        /// Artifact name
        actual: String,
    },

    /// A parameter or a transformed value is NaN or infinite
    #[error("non-finite value in {what} at column {index}")]
    NonFinite {
        /// Which array held the value
        what: &'static str,
        /// Column index
        index: usize,
    },
}

/// Capability to transform a batch of feature rows
///
/// Implementations must be safe to call from many requests at once without
/// interior mutation.
pub trait Scaler: Send + Sync {
    /// Transform an `n x NUM_FEATURES` matrix into a matrix of the same shape
    ///
    /// # Errors
    ///
    /// Returns an error if the input cannot be transformed.
    fn transform(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>, ScalerError>;
}

/// Serialized scaler parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalerParams {
    /// Per-column mean
    pub mean: Vec<f64>,
    /// Per-column standard deviation
    pub scale: Vec<f64>,
    /// Column names used at fit time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names: Option<Vec<String>>,
}

/// Standardizing scaler with fitted mean and scale
#[derive(Debug, Clone)]
pub struct StandardScaler {
    mean: Array1<f64>,
    scale: Array1<f64>,
}

impl StandardScaler {
    /// Build from parameters, validating them against the schema
    ///
    /// A zero scale is replaced by one, matching how a constant column is
    /// fitted.
    ///
    /// # Errors
    ///
    /// Returns an error if widths differ from [`NUM_FEATURES`], names differ
    /// from the schema, or any parameter is not finite.
    pub fn from_params(params: ScalerParams) -> Result<Self, ScalerError> {
        check_width("mean", params.mean.len())?;
        check_width("scale", params.scale.len())?;

        if let Some(names) = &params.feature_names {
            check_width("feature_names", names.len())?;
            if let Some((index, (expected, actual))) = FEATURE_SCHEMA
                .iter()
                .zip(names.iter())
                .enumerate()
                .find(|(_, (expected, actual))| **expected != actual.as_str())
            {
                return Err(ScalerError::FeatureNameMismatch {
                    index,
                    expected: (*expected).to_string(),
                    actual: actual.clone(),
                });
            }
        }

        check_finite("mean", &params.mean)?;
        check_finite("scale", &params.scale)?;

        let scale = params
            .scale
            .into_iter()
            .map(|s| if s == 0.0 { 1.0 } else { s })
            .collect::<Array1<f64>>();

        Ok(Self {
            mean: Array1::from(params.mean),
            scale,
        })
    }

    /// Parse a JSON artifact
    ///
    /// # Errors
    ///
    /// Returns an error on malformed JSON or invalid parameters.
    pub fn from_json(content: &str) -> Result<Self, ScalerError> {
        Self::from_params(serde_json::from_str(content)?)
    }

    /// Load a JSON artifact from disk
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is invalid.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ScalerError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Fitted means
    #[must_use]
    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    /// Fitted scales, zeros replaced by one
    #[must_use]
    pub fn scale(&self) -> &Array1<f64> {
        &self.scale
    }
}

impl Scaler for StandardScaler {
    fn transform(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>, ScalerError> {
        if x.ncols() != self.mean.len() {
            return Err(ScalerError::DimensionMismatch {
                what: "input",
                expected: self.mean.len(),
                actual: x.ncols(),
            });
        }

        let scaled = (&x - &self.mean) / &self.scale;

        for row in scaled.rows() {
            if let Some(index) = row.iter().position(|v| !v.is_finite()) {
                return Err(ScalerError::NonFinite {
                    what: "output",
                    index,
                });
            }
        }
        Ok(scaled)
    }
}

fn check_width(what: &'static str, actual: usize) -> Result<(), ScalerError> {
    if actual != NUM_FEATURES {
        return Err(ScalerError::DimensionMismatch {
            what,
            expected: NUM_FEATURES,
            actual,
        });
    }
    Ok(())
}

fn check_finite(what: &'static str, values: &[f64]) -> Result<(), ScalerError> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(ScalerError::NonFinite { what, index }),
        None => Ok(()),
    }
}
