//! CLI command implementations
//!
//! This module contains the business logic for CLI commands,
//! extracted from main.rs for testability.

// CLI glue code - relaxed lint requirements
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::needless_pass_by_value)]

use std::fmt::Write as _;
use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::{
    api::{create_router, AppState},
    config::ServerConfig,
    error::{ClaimscoreError, Result},
    gbdt::LightGbmModel,
    inference::InferenceEngine,
    scaler::StandardScaler,
    schema::{FEATURE_SCHEMA, NUM_FEATURES},
};

/// Install the global tracing subscriber
///
/// `RUST_LOG` wins over the configured filter when set. Calling this twice
/// is harmless; the second subscriber is discarded.
pub fn init_logging(filter: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init();
}

/// Load both artifacts and check they agree with the feature schema
pub fn load_engine(config: &ServerConfig) -> Result<InferenceEngine> {
    let scaler = load_scaler(config)?;
    info!(path = %config.scaler_path.display(), "scaler loaded");

    let model = load_model(config)?;
    info!(
        path = %config.model_path.display(),
        trees = model.num_trees(),
        objective = ?model.header().objective,
        "model loaded"
    );

    Ok(InferenceEngine::new(Arc::new(scaler), Arc::new(model)))
}

fn load_scaler(config: &ServerConfig) -> Result<StandardScaler> {
    StandardScaler::from_file(&config.scaler_path).map_err(|source| ClaimscoreError::ScalerLoad {
        path: config.scaler_path.display().to_string(),
        source,
    })
}

fn load_model(config: &ServerConfig) -> Result<LightGbmModel> {
    LightGbmModel::from_file(&config.model_path)
        .and_then(|m| m.expect_features(NUM_FEATURES))
        .and_then(|m| m.expect_feature_names(&FEATURE_SCHEMA))
        .map_err(|source| ClaimscoreError::ModelLoad {
            path: config.model_path.display().to_string(),
            source,
        })
}

/// Load the artifacts and serve until Ctrl-C
pub async fn serve(config: ServerConfig) -> Result<()> {
    let engine = load_engine(&config)?;
    let app = create_router(AppState::new(engine));
    let addr = config.socket_addr().await?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ClaimscoreError::Server {
            operation: "bind".to_string(),
            reason: format!("{addr}: {e}"),
        })?;

    info!(%addr, "claimscore listening");
    info!("endpoints: POST /predict, GET /health, GET /metrics");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ClaimscoreError::Server {
            operation: "serve".to_string(),
            reason: e.to_string(),
        })?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

/// Load both artifacts and describe them without serving
pub fn check_artifacts(config: &ServerConfig) -> Result<String> {
    let scaler = load_scaler(config)?;
    let model = load_model(config)?;

    let header = model.header();
    let mut out = String::new();
    let _ = writeln!(out, "Scaler: {}", config.scaler_path.display());
    let _ = writeln!(out, "  columns: {}", scaler.mean().len());
    let _ = writeln!(out, "Model: {}", config.model_path.display());
    let _ = writeln!(out, "  version: {}", header.version);
    let _ = writeln!(out, "  objective: {:?}", header.objective);
    let _ = writeln!(out, "  trees: {}", model.num_trees());
    let _ = writeln!(out, "  features: {}", model.num_features());
    let _ = writeln!(out, "OK");
    Ok(out)
}

/// Version and feature schema, one name per line
pub fn info_text() -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Claimscore v{}", crate::VERSION);
    let _ = writeln!(out, "Claim fraud scoring service");
    let _ = writeln!(out);
    let _ = writeln!(out, "Features ({NUM_FEATURES}, in model order):");
    for (i, name) in FEATURE_SCHEMA.iter().enumerate() {
        let _ = writeln!(out, "  {i:>2}  {name}");
    }
    out
}
