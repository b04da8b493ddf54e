//! Runtime configuration read from the environment
//!
//! `main` loads `.env` with dotenvy first, then calls [`Config::from_env`].
//!
//! # Environment Variables
//!
//! - `PORT` - Server port number (default: 8080)
//! - `DATABASE_URL` - Path to database file (default: "data.db")
//! - `STORAGE_BACKEND` - `local` or `http` (default: `local`)
//! - `STORAGE_DIR` - Root directory of the local backend (default: "uploads")
//! - `STORAGE_ENDPOINT` - Base URL objects are PUT to (required for `http`)
//! - `STORAGE_TOKEN` - Optional bearer token for the `http` backend
//! - `STORAGE_PUBLIC_URL` - Base of the returned public URLs
//! - `MAX_UPLOAD_BYTES` - Largest accepted audio upload (default: 25 MiB)
//! - `ORPHAN_SWEEP_SECS` - Interval of the orphan sweep; unset disables it

use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::upload::{HttpObjectStore, LocalObjectStore, ObjectStore, UploadError};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a valid number, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },

    #[error("unknown STORAGE_BACKEND {0:?} (expected \"local\" or \"http\")")]
    UnknownBackend(String),

    #[error("{0} is required when STORAGE_BACKEND=http")]
    Missing(&'static str),
}

/// Where uploaded audio goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    Local {
        root: PathBuf,
        public_url: String,
    },
    Http {
        endpoint: String,
        token: Option<String>,
        public_url: String,
    },
}

impl StorageConfig {
    pub fn build(&self) -> Result<Arc<dyn ObjectStore>, UploadError> {
        Ok(match self {
            StorageConfig::Local { root, public_url } => {
                Arc::new(LocalObjectStore::new(root.clone(), public_url.clone()))
            }
            StorageConfig::Http {
                endpoint,
                token,
                public_url,
            } => Arc::new(HttpObjectStore::new(
                endpoint.clone(),
                public_url.clone(),
                token.as_deref(),
            )?),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub storage: StorageConfig,
    pub max_upload_bytes: usize,
    pub orphan_sweep_interval: Option<Duration>,
}

fn parse_number<T: std::str::FromStr>(
    name: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { name, value: raw }),
        None => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let port = parse_number("PORT", get("PORT"), DEFAULT_PORT)?;
        let database_url = get("DATABASE_URL").unwrap_or_else(|| "data.db".to_string());
        let max_upload_bytes =
            parse_number("MAX_UPLOAD_BYTES", get("MAX_UPLOAD_BYTES"), DEFAULT_MAX_UPLOAD_BYTES)?;

        let orphan_sweep_interval = match get("ORPHAN_SWEEP_SECS") {
            Some(raw) => {
                let secs: u64 = parse_number("ORPHAN_SWEEP_SECS", Some(raw), 0)?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
            None => None,
        };

        let backend = get("STORAGE_BACKEND").unwrap_or_else(|| "local".to_string());
        let storage = match backend.to_ascii_lowercase().as_str() {
            "local" => StorageConfig::Local {
                root: PathBuf::from(get("STORAGE_DIR").unwrap_or_else(|| "uploads".to_string())),
                public_url: get("STORAGE_PUBLIC_URL")
                    .unwrap_or_else(|| format!("http://localhost:{}/files", port)),
            },
            "http" => {
                let endpoint = get("STORAGE_ENDPOINT").ok_or(ConfigError::Missing("STORAGE_ENDPOINT"))?;
                StorageConfig::Http {
                    public_url: get("STORAGE_PUBLIC_URL").unwrap_or_else(|| endpoint.clone()),
                    token: get("STORAGE_TOKEN"),
                    endpoint,
                }
            }
            _ => return Err(ConfigError::UnknownBackend(backend)),
        };

        Ok(Self {
            port,
            database_url,
            storage,
            max_upload_bytes,
            orphan_sweep_interval,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_to_local_storage() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.database_url, "data.db");
        assert_eq!(config.max_upload_bytes, 25 * 1024 * 1024);
        assert_eq!(config.orphan_sweep_interval, None);
        assert_eq!(
            config.storage,
            StorageConfig::Local {
                root: PathBuf::from("uploads"),
                public_url: "http://localhost:8080/files".into(),
            }
        );
    }

    #[test]
    fn http_backend_requires_endpoint() {
        assert_eq!(
            config_from(&[("STORAGE_BACKEND", "http")]),
            Err(ConfigError::Missing("STORAGE_ENDPOINT"))
        );

        let config = config_from(&[
            ("STORAGE_BACKEND", "http"),
            ("STORAGE_ENDPOINT", "https://r2.example.com/bucket"),
            ("STORAGE_PUBLIC_URL", "https://cdn.example.com"),
            ("STORAGE_TOKEN", "t0k3n"),
        ])
        .unwrap();
        assert_eq!(
            config.storage,
            StorageConfig::Http {
                endpoint: "https://r2.example.com/bucket".into(),
                token: Some("t0k3n".into()),
                public_url: "https://cdn.example.com".into(),
            }
        );
    }

    #[test]
    fn rejects_malformed_numbers() {
        assert_eq!(
            config_from(&[("PORT", "eighty")]),
            Err(ConfigError::InvalidNumber {
                name: "PORT",
                value: "eighty".into(),
            })
        );
    }

    #[test]
    fn zero_sweep_interval_disables_sweeps() {
        let config = config_from(&[("ORPHAN_SWEEP_SECS", "0")]).unwrap();
        assert_eq!(config.orphan_sweep_interval, None);

        let config = config_from(&[("ORPHAN_SWEEP_SECS", "300")]).unwrap();
        assert_eq!(config.orphan_sweep_interval, Some(Duration::from_secs(300)));
    }
}
