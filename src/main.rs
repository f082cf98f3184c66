//! Claimscore CLI - claim fraud scoring server
//!
//! # Commands
//!
//! - `serve` - Load the scaler and model, then serve `POST /predict`
//! - `check` - Load and validate both artifacts without serving
//! - `info` - Show version and the feature schema

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use claimscore::{
    cli,
    config::{CliOverrides, ServerConfig},
    error::Result,
};
use tracing::error;

/// Claimscore - fraud scoring for single insurance claims
#[derive(Parser)]
#[command(name = "claimscore")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the scoring server
    ///
    /// Examples:
    ///   claimscore serve
    ///   claimscore serve --port 8080 --model lgbm_model.txt --scaler scaler.json
    ///   claimscore serve --config claimscore.toml
    Serve {
        /// Host to bind to
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,

        #[command(flatten)]
        artifacts: ArtifactArgs,
    },
    /// Load and validate the artifacts, then exit
    Check {
        #[command(flatten)]
        artifacts: ArtifactArgs,
    },
    /// Show version and feature schema
    Info,
}

#[derive(Args)]
struct ArtifactArgs {
    /// TOML configuration file (also read from CLAIMSCORE_CONFIG)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// LightGBM model in text format
    #[arg(short, long, value_name = "FILE")]
    model: Option<PathBuf>,

    /// Fitted scaler parameters (JSON)
    #[arg(short, long, value_name = "FILE")]
    scaler: Option<PathBuf>,
}

impl ArtifactArgs {
    fn into_overrides(self, host: Option<String>, port: Option<u16>) -> CliOverrides {
        CliOverrides {
            config: self.config,
            host,
            port,
            model: self.model,
            scaler: self.scaler,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            host,
            port,
            artifacts,
        } => {
            let config = resolve(&artifacts.into_overrides(host, port));
            if let Err(e) = cli::serve(config).await {
                error!(error = %e, "server failed");
                std::process::exit(1);
            }
        },
        Commands::Check { artifacts } => {
            let config = resolve(&artifacts.into_overrides(None, None));
            match cli::check_artifacts(&config) {
                Ok(summary) => print!("{summary}"),
                Err(e) => {
                    error!(error = %e, "artifact check failed");
                    std::process::exit(1);
                },
            }
        },
        Commands::Info => {
            print!("{}", cli::info_text());
        },
    }

    Ok(())
}

/// Resolve configuration and install logging, exiting on a bad config
fn resolve(overrides: &CliOverrides) -> ServerConfig {
    match ServerConfig::load(overrides) {
        Ok(config) => {
            cli::init_logging(&config.log_filter);
            config
        },
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        },
    }
}
