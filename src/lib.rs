//! # Claimscore
//!
//! HTTP scoring service for claim-level fraud features.
//!
//! A client posts the named features of a single claim to `POST /predict`.
//! The service checks that every feature in the fixed schema is present and
//! numeric, assembles them in the order the model was trained on, applies the
//! fitted standard scaler, and returns the gradient-boosted model's score.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use claimscore::{
//!     api::{create_router, AppState},
//!     gbdt::LightGbmModel,
//!     inference::InferenceEngine,
//!     scaler::StandardScaler,
//!     schema::NUM_FEATURES,
//! };
//!
//! let scaler = StandardScaler::from_file("scaler.json")?;
//! let model = LightGbmModel::from_file("lgbm_model.txt")?.expect_features(NUM_FEATURES)?;
//! let app = create_router(AppState::new(InferenceEngine::new(
//!     Arc::new(scaler),
//!     Arc::new(model),
//! )));
//! ```
//!
//! ## Architecture
//!
//! - [`schema`]: the ordered feature names
//! - [`features`]: request validation and feature vector assembly
//! - [`scaler`] and [`gbdt`]: the two loaded artifacts
//! - [`inference`]: scale then predict, with failures classified
//! - [`api`]: axum router and handlers

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
// Clippy allows (MUST come after deny/warn to override them)
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)] // usize -> f64 for metrics is acceptable
#![allow(clippy::cast_possible_truncation)] // u128 -> u64 for latency is safe
#![allow(clippy::cast_sign_loss)] // Metrics conversions are safe
#![allow(clippy::must_use_candidate)] // Not all methods need #[must_use]
#![allow(clippy::doc_markdown)] // Allow feature names without backticks
#![allow(clippy::float_cmp)] // Allow float comparisons in tests
#![allow(clippy::missing_panics_doc)] // Allow missing Panics doc sections

pub mod api;
/// CLI command implementations (extracted for testability)
pub mod cli;
pub mod config;
pub mod error;
pub mod features;
/// Gradient-boosted decision tree inference
///
/// Loads LightGBM text models and evaluates them natively.
pub mod gbdt;
pub mod inference;
pub mod metrics;
pub mod scaler;
pub mod schema;

// Re-exports for convenience
pub use error::{ClaimscoreError, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(VERSION.starts_with("0."));
        assert!(VERSION.contains('.'));
    }
}
