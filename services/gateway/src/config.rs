//! services/gateway/src/config.rs
//!
//! Defines the gateway's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

use conceptify_core::upload::DEFAULT_MAX_UPLOAD_BYTES;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// How to launch the external extraction process. The uploaded file's path is
/// appended as the final argument.
#[derive(Clone, Debug)]
pub struct ExtractorConfig {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub timeout: Duration,
    pub max_concurrent: usize,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    pub results_dir: PathBuf,
    pub uploads_dir: PathBuf,
    pub max_upload_bytes: u64,
    pub cors_origin: Option<String>,
    pub extractor: ExtractorConfig,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; `from_env` passes the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Server Settings ---
        let bind_address_str = lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:5001".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_origin = lookup("CORS_ORIGIN").filter(|o| !o.is_empty());

        // --- Storage Settings ---
        let results_dir = lookup("RESULTS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./data"));
        let uploads_dir = lookup("UPLOADS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./uploads"));
        let max_upload_bytes = parse_or(&lookup, "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?;

        // --- Extraction Process Settings ---
        let program = lookup("EXTRACTOR_PROGRAM").unwrap_or_else(|| "uv".to_string());
        let args = lookup("EXTRACTOR_ARGS")
            .unwrap_or_else(|| "run python ocr_wrapper.py".to_string())
            .split_whitespace()
            .map(str::to_string)
            .collect();
        let working_dir = lookup("EXTRACTOR_WORKDIR").map(PathBuf::from);
        let timeout_secs: u64 = parse_or(&lookup, "EXTRACTOR_TIMEOUT_SECS", 300)?;
        let max_concurrent: usize = parse_or(&lookup, "MAX_CONCURRENT_EXTRACTIONS", 2)?;
        if max_concurrent == 0 {
            return Err(ConfigError::InvalidValue(
                "MAX_CONCURRENT_EXTRACTIONS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            bind_address,
            log_level,
            results_dir,
            uploads_dir,
            max_upload_bytes,
            cors_origin,
            extractor: ExtractorConfig {
                program,
                args,
                working_dir,
                timeout: Duration::from_secs(timeout_secs),
                max_concurrent,
            },
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_the_node_gateway() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bind_address.port(), 5001);
        assert_eq!(config.max_upload_bytes, 50 * 1024 * 1024);
        assert_eq!(config.extractor.program, "uv");
        assert_eq!(
            config.extractor.args,
            vec!["run", "python", "ocr_wrapper.py"]
        );
        assert_eq!(config.extractor.timeout, Duration::from_secs(300));
        assert!(config.cors_origin.is_none());
    }

    #[test]
    fn overrides_are_parsed() {
        let config = Config::from_lookup(lookup(&[
            ("BIND_ADDRESS", "127.0.0.1:8080"),
            ("EXTRACTOR_TIMEOUT_SECS", "5"),
            ("MAX_CONCURRENT_EXTRACTIONS", "8"),
            ("RESULTS_DIR", "/tmp/results"),
        ]))
        .unwrap();
        assert_eq!(config.bind_address.port(), 8080);
        assert_eq!(config.extractor.timeout, Duration::from_secs(5));
        assert_eq!(config.extractor.max_concurrent, 8);
        assert_eq!(config.results_dir, PathBuf::from("/tmp/results"));
    }

    #[test]
    fn invalid_values_are_reported_by_name() {
        let err = Config::from_lookup(lookup(&[("MAX_UPLOAD_BYTES", "lots")])).unwrap_err();
        assert!(err.to_string().contains("MAX_UPLOAD_BYTES"));

        let err = Config::from_lookup(lookup(&[("MAX_CONCURRENT_EXTRACTIONS", "0")])).unwrap_err();
        assert!(err.to_string().contains("MAX_CONCURRENT_EXTRACTIONS"));
    }
}
