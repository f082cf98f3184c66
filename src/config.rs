//! Server configuration
//!
//! Settings are layered, later layers winning:
//!
//! 1. built-in defaults
//! 2. a TOML file (`--config` or `CLAIMSCORE_CONFIG`)
//! 3. `CLAIMSCORE_*` environment variables
//! 4. command-line flags
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//!
//! [artifacts]
//! model = "/srv/models/lgbm_model.txt"
//! scaler = "/srv/models/scaler.json"
//!
//! [logging]
//! filter = "claimscore=debug,info"
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{ClaimscoreError, Result};

/// Environment variable naming a config file
pub const CONFIG_ENV: &str = "CLAIMSCORE_CONFIG";

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_MODEL_PATH: &str = "lgbm_model.txt";
const DEFAULT_SCALER_PATH: &str = "scaler.json";
const DEFAULT_LOG_FILTER: &str = "info";

/// Resolved server settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Bind host
    pub host: String,
    /// Bind port
    pub port: u16,
    /// LightGBM text model
    pub model_path: PathBuf,
    /// Scaler JSON
    pub scaler_path: PathBuf,
    /// `tracing` filter directive
    pub log_filter: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            scaler_path: PathBuf::from(DEFAULT_SCALER_PATH),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    /// `--config`
    pub config: Option<PathBuf>,
    /// `--host`
    pub host: Option<String>,
    /// `--port`
    pub port: Option<u16>,
    /// `--model`
    pub model: Option<PathBuf>,
    /// `--scaler`
    pub scaler: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    server: Option<FileServerConfig>,
    artifacts: Option<FileArtifactsConfig>,
    logging: Option<FileLoggingConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileServerConfig {
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileArtifactsConfig {
    model: Option<PathBuf>,
    scaler: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileLoggingConfig {
    filter: Option<String>,
}

impl ServerConfig {
    /// Resolve all layers
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed, or an
    /// environment override is malformed.
    pub fn load(cli: &CliOverrides) -> Result<Self> {
        let mut cfg = Self::default();

        let file = cli
            .config
            .clone()
            .or_else(|| env_non_empty(CONFIG_ENV).map(PathBuf::from));
        if let Some(path) = file {
            cfg.apply_file(&path)?;
        }

        cfg.apply_env(env_non_empty)?;
        cfg.apply_cli(cli);
        Ok(cfg)
    }

    /// Merge a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid config.
    pub fn apply_file(&mut self, path: &Path) -> Result<()> {
        let raw = std::fs::read_to_string(path).map_err(|source| ClaimscoreError::Io {
            path: path.display().to_string(),
            source,
        })?;
        self.apply_toml(&raw).map_err(|e| ClaimscoreError::Config {
            reason: format!("{}: {e}", path.display()),
        })
    }

    fn apply_toml(&mut self, raw: &str) -> std::result::Result<(), toml::de::Error> {
        let file: FileConfig = toml::from_str(raw)?;

        if let Some(server) = file.server {
            if let Some(host) = non_empty(server.host) {
                self.host = host;
            }
            if let Some(port) = server.port {
                self.port = port;
            }
        }
        if let Some(artifacts) = file.artifacts {
            if let Some(model) = artifacts.model {
                self.model_path = model;
            }
            if let Some(scaler) = artifacts.scaler {
                self.scaler_path = scaler;
            }
        }
        if let Some(filter) = file.logging.and_then(|l| non_empty(l.filter)) {
            self.log_filter = filter;
        }
        Ok(())
    }

    /// Merge environment overrides read through `lookup`
    ///
    /// # Errors
    ///
    /// Returns an error if `CLAIMSCORE_PORT` is not a port number.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(v) = lookup("CLAIMSCORE_HOST") {
            self.host = v;
        }
        if let Some(v) = lookup("CLAIMSCORE_PORT") {
            self.port = v.parse().map_err(|_| ClaimscoreError::Config {
                reason: format!("CLAIMSCORE_PORT is not a valid port: {v}"),
            })?;
        }
        if let Some(v) = lookup("CLAIMSCORE_MODEL") {
            self.model_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("CLAIMSCORE_SCALER") {
            self.scaler_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("CLAIMSCORE_LOG") {
            self.log_filter = v;
        }
        Ok(())
    }

    /// Merge command-line flags
    pub fn apply_cli(&mut self, cli: &CliOverrides) {
        if let Some(host) = &cli.host {
            self.host.clone_from(host);
        }
        if let Some(port) = cli.port {
            self.port = port;
        }
        if let Some(model) = &cli.model {
            self.model_path.clone_from(model);
        }
        if let Some(scaler) = &cli.scaler {
            self.scaler_path.clone_from(scaler);
        }
    }

    /// Resolved bind address
    ///
    /// The host may be an IP literal or a name such as `localhost`; the
    /// first resolved address is used.
    ///
    /// # Errors
    ///
    /// Returns an error if the host does not resolve.
    pub async fn socket_addr(&self) -> Result<SocketAddr> {
        let invalid = |reason: String| ClaimscoreError::Config {
            reason: format!("Invalid address {}:{}: {reason}", self.host, self.port),
        };
        tokio::net::lookup_host((self.host.as_str(), self.port))
            .await
            .map_err(|e| invalid(e.to_string()))?
            .next()
            .ok_or_else(|| invalid("host resolved to no addresses".to_string()))
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    non_empty(std::env::var(key).ok())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.host, "127.0.0.1");
        assert_eq!(cfg.port, 5000);
        assert_eq!(cfg.model_path, PathBuf::from("lgbm_model.txt"));
        assert_eq!(cfg.scaler_path, PathBuf::from("scaler.json"));
        assert_eq!(cfg.log_filter, "info");
    }

    #[test]
    fn test_toml_layer() {
        let mut cfg = ServerConfig::default();
        cfg.apply_toml(
            r#"
            [server]
            host = "0.0.0.0"
            port = 8080

            [artifacts]
            model = "/srv/model.txt"

            [logging]
            filter = "debug"
            "#,
        )
        .expect("valid toml");

        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.model_path, PathBuf::from("/srv/model.txt"));
        assert_eq!(cfg.scaler_path, PathBuf::from("scaler.json"));
        assert_eq!(cfg.log_filter, "debug");
    }

    #[test]
    fn test_toml_unknown_key_rejected() {
        let mut cfg = ServerConfig::default();
        assert!(cfg.apply_toml("[server]\nworkers = 4\n").is_err());
    }

    #[test]
    fn test_apply_file() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(file, "[server]\nport = 9100").expect("write");

        let mut cfg = ServerConfig::default();
        cfg.apply_file(file.path()).expect("load");
        assert_eq!(cfg.port, 9100);
    }

    #[test]
    fn test_apply_file_missing() {
        let mut cfg = ServerConfig::default();
        let err = cfg.apply_file(Path::new("/nonexistent/claimscore.toml")).unwrap_err();
        assert!(matches!(err, ClaimscoreError::Io { .. }));
    }

    #[test]
    fn test_env_layer() {
        let env: HashMap<&str, &str> = [
            ("CLAIMSCORE_HOST", "10.0.0.1"),
            ("CLAIMSCORE_PORT", "7000"),
            ("CLAIMSCORE_SCALER", "/tmp/s.json"),
        ]
        .into_iter()
        .collect();

        let mut cfg = ServerConfig::default();
        cfg.apply_env(|k| env.get(k).map(|v| (*v).to_string()))
            .expect("valid env");
        assert_eq!(cfg.host, "10.0.0.1");
        assert_eq!(cfg.port, 7000);
        assert_eq!(cfg.scaler_path, PathBuf::from("/tmp/s.json"));
        assert_eq!(cfg.model_path, PathBuf::from("lgbm_model.txt"));
    }

    #[test]
    fn test_env_bad_port() {
        let mut cfg = ServerConfig::default();
        let err = cfg
            .apply_env(|k| (k == "CLAIMSCORE_PORT").then(|| "seventy".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("CLAIMSCORE_PORT"));
    }

    #[test]
    fn test_cli_wins() {
        let mut cfg = ServerConfig::default();
        cfg.apply_toml("[server]\nport = 8080\n").expect("valid toml");
        cfg.apply_cli(&CliOverrides {
            port: Some(9000),
            model: Some(PathBuf::from("m.txt")),
            ..CliOverrides::default()
        });
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.model_path, PathBuf::from("m.txt"));
    }

    #[tokio::test]
    async fn test_socket_addr() {
        let cfg = ServerConfig::default();
        let addr = cfg.socket_addr().await.expect("addr");
        assert_eq!(addr, SocketAddr::from(([127, 0, 0, 1], 5000)));

        let bad = ServerConfig {
            host: "not a host".to_string(),
            ..ServerConfig::default()
        };
        assert!(matches!(
            bad.socket_addr().await.unwrap_err(),
            ClaimscoreError::Config { .. }
        ));
    }

    #[tokio::test]
    async fn test_socket_addr_resolves_hostname() {
        let cfg = ServerConfig {
            host: "localhost".to_string(),
            port: 8080,
            ..ServerConfig::default()
        };
        let addr = cfg.socket_addr().await.expect("localhost resolves");
        assert!(addr.ip().is_loopback());
        assert_eq!(addr.port(), 8080);
    }

    #[test]
    fn test_non_empty_trims() {
        assert_eq!(non_empty(Some("  x ".to_string())), Some("x".to_string()));
        assert_eq!(non_empty(Some("   ".to_string())), None);
        assert_eq!(non_empty(None), None);
    }
}
