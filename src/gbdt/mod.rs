//! Gradient-boosted tree scoring
//!
//! Loads a LightGBM model saved in text format and scores rows with it.
//! Only single-output models are accepted (regression family and binary),
//! since the service returns one scalar per request.
//!
//! ## Example
//!
//! ```rust,ignore
//! use claimscore::gbdt::{LightGbmModel, Predictor};
//!
//! let model = LightGbmModel::from_file("lgbm_model.txt")?;
//! let scores = model.predict(scaled.view())?;
//! ```

mod text;

use std::path::Path;

use ndarray::{Array1, ArrayView1, ArrayView2};
use thiserror::Error;

pub use text::ModelHeader;

/// Values at or below this magnitude count as zero for missing handling
const ZERO_THRESHOLD: f64 = 1e-35;

/// Model load failures
#[derive(Debug, Error)]
pub enum ParseError {
    /// File could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Required key absent
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// Value did not parse
    #[error("invalid value for {field}: {value}")]
    InvalidValue {
        /// Key being parsed
        field: &'static str,
        /// Offending text
        value: String,
    },

    /// Per-node or per-leaf array has the wrong length
    #[error("tree {tree}: {field} has {actual} entries, expected {expected}")]
    ArraySizeMismatch {
        /// Tree index
        tree: usize,
        /// Array name
        field: &'static str,
        /// Expected length
        expected: usize,
        /// Actual length
        actual: usize,
    },

    /// Tree structure is inconsistent
    #[error("tree {tree}: {reason}")]
    InvalidTree {
        /// Tree index
        tree: usize,
        /// What is wrong
        reason: String,
    },

    /// Linear-leaf trees cannot be scored here
    #[error("tree {0}: linear trees are not supported")]
    LinearTree(usize),

    /// Objective has no single-scalar output
    #[error("unsupported objective: {0}")]
    UnsupportedObjective(String),

    /// Model has no trees
    #[error("model contains no trees")]
    NoTrees,

    /// Recorded training column differs from the expected one
    #[error("feature {index}: model was trained on {actual}, expected {expected}")]
    FeatureNameMismatch {
        /// Column position
        index: usize,
        /// Name the service supplies at this position
        expected: String,
        /// Name recorded in the model
        actual: String,
    },

    /// Model input width disagrees with what the caller needs
    #[error("model expects {actual} features, service provides {expected}")]
    FeatureCountMismatch {
        /// Width the service provides
        expected: usize,
        /// Width the model was trained on
        actual: usize,
    },
}

/// Scoring failures
#[derive(Debug, Error)]
pub enum ModelError {
    /// Input rows are narrower than the model needs
    #[error("dimension mismatch: model needs {expected} columns, got {actual}")]
    DimensionMismatch {
        /// Columns required
        expected: usize,
        /// Columns given
        actual: usize,
    },
}

/// Capability to score a batch of scaled rows
///
/// Implementations must be safe to call from many requests at once without
/// interior mutation.
pub trait Predictor: Send + Sync {
    /// One prediction per input row
    ///
    /// # Errors
    ///
    /// Returns an error if the rows cannot be scored.
    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>, ModelError>;
}

/// Transform from raw tree sum to prediction
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Objective {
    /// Regression family: raw score is the prediction
    Identity,
    /// Regression fitted on `sqrt(|y|)`: output is `sign(x) * x^2`
    SignedSquare,
    /// Log-link regression (poisson, gamma, tweedie)
    Exp,
    /// Binary or cross-entropy: logistic with the given slope
    Sigmoid {
        /// Slope applied before the logistic
        sigmoid: f64,
    },
}

impl Objective {
    /// Parse an `objective=` header value
    ///
    /// # Errors
    ///
    /// Multiclass, ranking and unknown objectives are rejected.
    pub fn parse(s: &str) -> Result<Self, ParseError> {
        let mut parts = s.split_whitespace();
        let name = parts.next().unwrap_or("");
        let sqrt = parts.any(|p| p == "sqrt");
        let param = |key: &str| {
            s.split_whitespace()
                .find_map(|p| p.strip_prefix(key).and_then(|v| v.parse::<f64>().ok()))
        };

        match name {
            "regression" | "regression_l2" | "regression_l1" | "l1" | "l2" | "huber" | "fair"
            | "quantile" | "mape" => Ok(if sqrt { Self::SignedSquare } else { Self::Identity }),
            "poisson" | "gamma" | "tweedie" => Ok(Self::Exp),
            "binary" => Ok(Self::Sigmoid {
                sigmoid: param("sigmoid:").unwrap_or(1.0),
            }),
            "cross_entropy" | "xentropy" => Ok(Self::Sigmoid { sigmoid: 1.0 }),
            _ => Err(ParseError::UnsupportedObjective(s.to_string())),
        }
    }

    /// Apply to a raw score
    #[must_use]
    pub fn transform(self, raw: f64) -> f64 {
        match self {
            Self::Identity => raw,
            Self::SignedSquare => raw.signum() * raw * raw,
            Self::Exp => raw.exp(),
            Self::Sigmoid { sigmoid } => 1.0 / (1.0 + (-sigmoid * raw).exp()),
        }
    }
}

/// How missing values are detected at a split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingType {
    /// No missing handling; NaN is read as zero
    #[default]
    None,
    /// Zero is missing
    Zero,
    /// NaN is missing
    NaN,
}

/// Decoded LightGBM `decision_type` byte
///
/// Bit 0 is the categorical flag, bit 1 is default-left, bits 2-3 are the
/// missing type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecisionType {
    /// Split tests category membership
    pub is_categorical: bool,
    /// Missing values go left
    pub default_left: bool,
    /// Missing detection mode
    pub missing_type: MissingType,
}

impl DecisionType {
    /// Decode the bitfield
    #[must_use]
    pub fn from_i8(value: i8) -> Self {
        let bits = value as u8;
        Self {
            is_categorical: bits & 1 != 0,
            default_left: bits & 2 != 0,
            missing_type: match (bits >> 2) & 3 {
                1 => MissingType::Zero,
                2 => MissingType::NaN,
                _ => MissingType::None,
            },
        }
    }
}

/// One regression tree in LightGBM's array layout
///
/// Internal nodes are indexed `0..num_leaves - 1`. A negative child `c`
/// refers to leaf `!c`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Tree {
    pub(crate) split_feature: Vec<usize>,
    pub(crate) threshold: Vec<f64>,
    pub(crate) decision: Vec<DecisionType>,
    pub(crate) left_child: Vec<i32>,
    pub(crate) right_child: Vec<i32>,
    pub(crate) leaf_value: Vec<f64>,
    pub(crate) cat_boundaries: Vec<usize>,
    pub(crate) cat_threshold: Vec<u32>,
}

impl Tree {
    pub(crate) fn single_leaf(value: f64) -> Self {
        Self {
            split_feature: Vec::new(),
            threshold: Vec::new(),
            decision: Vec::new(),
            left_child: Vec::new(),
            right_child: Vec::new(),
            leaf_value: vec![value],
            cat_boundaries: Vec::new(),
            cat_threshold: Vec::new(),
        }
    }

    pub(crate) fn num_leaves(&self) -> usize {
        self.leaf_value.len()
    }

    /// Check references so traversal cannot index out of bounds or loop
    ///
    /// Children of an internal node always have a larger index than it.
    pub(crate) fn validate(&self, tree: usize, num_features: usize) -> Result<(), ParseError> {
        let num_internal = self.split_feature.len();
        let invalid = |reason: String| ParseError::InvalidTree { tree, reason };

        for node in 0..num_internal {
            for child in [self.left_child[node], self.right_child[node]] {
                let ok = if child < 0 {
                    ((!child) as usize) < self.num_leaves()
                } else {
                    (child as usize) > node && (child as usize) < num_internal
                };
                if !ok {
                    return Err(invalid(format!("invalid child {child} at node {node}")));
                }
            }

            if self.split_feature[node] >= num_features {
                return Err(invalid(format!(
                    "node {node} splits on feature {} beyond max_feature_idx",
                    self.split_feature[node]
                )));
            }

            if self.decision[node].is_categorical {
                let cat_idx = self.threshold[node];
                let idx = cat_idx as usize;
                if cat_idx < 0.0
                    || idx + 1 >= self.cat_boundaries.len()
                    || self.cat_boundaries[idx] > self.cat_boundaries[idx + 1]
                    || self.cat_boundaries[idx + 1] > self.cat_threshold.len()
                {
                    return Err(invalid(format!("node {node} has invalid category index")));
                }
            }
        }
        Ok(())
    }

    /// Value of the leaf `row` lands in
    pub(crate) fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        if self.split_feature.is_empty() {
            return self.leaf_value[0];
        }

        let mut node = 0usize;
        loop {
            let value = row[self.split_feature[node]];
            let next = if self.goes_left(node, value) {
                self.left_child[node]
            } else {
                self.right_child[node]
            };
            if next < 0 {
                return self.leaf_value[(!next) as usize];
            }
            node = next as usize;
        }
    }

    fn goes_left(&self, node: usize, value: f64) -> bool {
        let decision = self.decision[node];
        if decision.is_categorical {
            self.categorical_left(node, decision, value)
        } else {
            numerical_left(decision, self.threshold[node], value)
        }
    }

    fn categorical_left(&self, node: usize, decision: DecisionType, value: f64) -> bool {
        let category = if value.is_nan() {
            if decision.missing_type == MissingType::NaN {
                return false;
            }
            0
        } else {
            value as i64
        };
        if category < 0 {
            return false;
        }

        let cat_idx = self.threshold[node] as usize;
        let words = &self.cat_threshold[self.cat_boundaries[cat_idx]..self.cat_boundaries[cat_idx + 1]];
        let word = (category / 32) as usize;
        word < words.len() && (words[word] >> (category % 32)) & 1 == 1
    }
}

fn numerical_left(decision: DecisionType, threshold: f64, value: f64) -> bool {
    let value = if value.is_nan() && decision.missing_type != MissingType::NaN {
        0.0
    } else {
        value
    };
    let missing = match decision.missing_type {
        MissingType::Zero => value.abs() <= ZERO_THRESHOLD,
        MissingType::NaN => value.is_nan(),
        MissingType::None => false,
    };
    if missing {
        decision.default_left
    } else {
        value <= threshold
    }
}

/// LightGBM model loaded from its text format
#[derive(Debug, Clone)]
pub struct LightGbmModel {
    header: ModelHeader,
    trees: Vec<Tree>,
}

impl LightGbmModel {
    /// Parse model text
    ///
    /// # Errors
    ///
    /// Returns an error on malformed text or an unsupported model.
    pub fn from_string(content: &str) -> Result<Self, ParseError> {
        let (header, trees) = text::parse_model(content)?;
        Ok(Self { header, trees })
    }

    /// Load model text from disk
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ParseError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_string(&content)
    }

    /// Require the model to read exactly `num_features` columns
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::FeatureCountMismatch`] otherwise.
    pub fn expect_features(self, num_features: usize) -> Result<Self, ParseError> {
        if self.num_features() != num_features {
            return Err(ParseError::FeatureCountMismatch {
                expected: num_features,
                actual: self.num_features(),
            });
        }
        Ok(self)
    }

    /// Require the recorded training column names to equal `names` in order
    ///
    /// Models saved without names carry LightGBM's `Column_N` defaults, or
    /// none at all; those are accepted since they say nothing about order.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::FeatureNameMismatch`] at the first differing
    /// position, or [`ParseError::FeatureCountMismatch`] if the name list
    /// has a different length.
    pub fn expect_feature_names(self, names: &[&str]) -> Result<Self, ParseError> {
        let recorded = &self.header.feature_names;
        let defaults = recorded
            .iter()
            .enumerate()
            .all(|(i, n)| *n == format!("Column_{i}"));
        if defaults {
            return Ok(self);
        }
        if recorded.len() != names.len() {
            return Err(ParseError::FeatureCountMismatch {
                expected: names.len(),
                actual: recorded.len(),
            });
        }
        if let Some((index, (expected, actual))) = names
            .iter()
            .zip(recorded)
            .enumerate()
            .find(|(_, (expected, actual))| **expected != actual.as_str())
        {
            return Err(ParseError::FeatureNameMismatch {
                index,
                expected: (*expected).to_string(),
                actual: actual.clone(),
            });
        }
        Ok(self)
    }

    /// Parsed header
    #[must_use]
    pub fn header(&self) -> &ModelHeader {
        &self.header
    }

    /// Number of trees
    #[must_use]
    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    /// Input width
    #[must_use]
    pub fn num_features(&self) -> usize {
        self.header.max_feature_idx + 1
    }

    /// Sum of leaf values for one row, before the objective transform
    #[must_use]
    pub fn raw_score(&self, row: ArrayView1<'_, f64>) -> f64 {
        let sum: f64 = self.trees.iter().map(|t| t.predict_row(row)).sum();
        if self.header.average_output {
            sum / self.trees.len() as f64
        } else {
            sum
        }
    }
}

impl Predictor for LightGbmModel {
    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>, ModelError> {
        if x.ncols() < self.num_features() {
            return Err(ModelError::DimensionMismatch {
                expected: self.num_features(),
                actual: x.ncols(),
            });
        }
        Ok(x.rows()
            .into_iter()
            .map(|row| self.header.objective.transform(self.raw_score(row)))
            .collect())
    }
}
