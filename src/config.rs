// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read from the environment once at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `GOOGLE_APPLICATION_CREDENTIALS` | Service account key file | Required |
//! | `FIRESTORE_LOG_COLLECTION` | Firestore collection for access logs | `access_logs` |
//! | `AUTH_TIMEOUT_SECS` | Timeout for identity provider calls | `10` |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM files; serve HTTPS when both are set | unset |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//! | `FIREBASE_JWKS_URL` | ID token signing keys | Google securetoken JWKS |
//! | `IDENTITY_TOOLKIT_URL` | Identity Toolkit REST base | Google production |
//! | `FIRESTORE_URL` | Firestore REST base | Google production |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::auth::jwks::FIREBASE_JWKS_URL;
use crate::providers::firebase_auth::IDENTITY_TOOLKIT_BASE_URL;
use crate::providers::firestore::FIRESTORE_BASE_URL;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const CREDENTIALS_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";
pub const LOG_COLLECTION_ENV: &str = "FIRESTORE_LOG_COLLECTION";
pub const AUTH_TIMEOUT_ENV: &str = "AUTH_TIMEOUT_SECS";
pub const TLS_CERT_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_ENV: &str = "TLS_KEY_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";
pub const JWKS_URL_ENV: &str = "FIREBASE_JWKS_URL";
pub const IDENTITY_TOOLKIT_URL_ENV: &str = "IDENTITY_TOOLKIT_URL";
pub const FIRESTORE_URL_ENV: &str = "FIRESTORE_URL";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_LOG_COLLECTION: &str = "access_logs";
const DEFAULT_AUTH_TIMEOUT: Duration = Duration::from_secs(10);

/// Default `RUST_LOG` filter when none is set.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable not set")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },

    #[error("TLS_CERT_PATH and TLS_KEY_PATH must be set together")]
    IncompleteTls,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl LogFormat {
    /// Unknown values fall back to `Pretty`; logging must come up even when
    /// the rest of the configuration is broken.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if v == "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }

    pub fn from_env() -> Self {
        Self::parse(std::env::var(LOG_FORMAT_ENV).ok().as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Google endpoints the providers talk to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub jwks_url: String,
    pub identity_toolkit_url: String,
    pub firestore_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            jwks_url: FIREBASE_JWKS_URL.to_string(),
            identity_toolkit_url: IDENTITY_TOOLKIT_BASE_URL.to_string(),
            firestore_url: FIRESTORE_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub credentials_path: PathBuf,
    pub log_collection: String,
    pub auth_timeout: Duration,
    pub tls: Option<TlsPaths>,
    pub endpoints: Endpoints,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let host = get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = match get(PORT_ENV) {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                name: PORT_ENV,
                value,
            })?,
            None => DEFAULT_PORT,
        };

        let credentials_path = get(CREDENTIALS_ENV)
            .map(PathBuf::from)
            .ok_or(ConfigError::Missing(CREDENTIALS_ENV))?;

        let log_collection =
            get(LOG_COLLECTION_ENV).unwrap_or_else(|| DEFAULT_LOG_COLLECTION.to_string());

        let auth_timeout = match get(AUTH_TIMEOUT_ENV) {
            Some(value) => match value.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::Invalid {
                        name: AUTH_TIMEOUT_ENV,
                        value,
                    })
                }
            },
            None => DEFAULT_AUTH_TIMEOUT,
        };

        let tls = match (get(TLS_CERT_ENV), get(TLS_KEY_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: cert.into(),
                key: key.into(),
            }),
            (None, None) => None,
            _ => return Err(ConfigError::IncompleteTls),
        };

        let defaults = Endpoints::default();
        let endpoints = Endpoints {
            jwks_url: get(JWKS_URL_ENV).unwrap_or(defaults.jwks_url),
            identity_toolkit_url: get(IDENTITY_TOOLKIT_URL_ENV)
                .unwrap_or(defaults.identity_toolkit_url),
            firestore_url: get(FIRESTORE_URL_ENV).unwrap_or(defaults.firestore_url),
        };

        Ok(Self {
            host,
            port,
            credentials_path,
            log_collection,
            auth_timeout,
            tls,
            endpoints,
        })
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse().map_err(|_| ConfigError::Invalid {
            name: HOST_ENV,
            value: self.host.clone(),
        })
    }
}
