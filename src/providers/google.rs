// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Google service account credentials.
//!
//! The Firebase Admin REST APIs (Identity Toolkit, Firestore) take an OAuth2
//! access token minted from the service account key through the JWT-bearer
//! grant. Tokens are cached and reused until shortly before they expire.

use std::path::Path;
use std::time::{Duration, Instant};

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime requested for each assertion (the maximum Google accepts).
const ASSERTION_LIFETIME: Duration = Duration::from_secs(3600);

/// Cached tokens are renewed this long before they expire.
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

pub const SCOPE_CLOUD_PLATFORM: &str = "https://www.googleapis.com/auth/cloud-platform";
pub const SCOPE_IDENTITY_TOOLKIT: &str = "https://www.googleapis.com/auth/identitytoolkit";
pub const SCOPE_DATASTORE: &str = "https://www.googleapis.com/auth/datastore";

#[derive(Debug, thiserror::Error)]
pub enum CredentialsError {
    #[error("failed to read credentials file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid service account key: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("service account private key is unusable: {0}")]
    InvalidKey(String),

    #[error("failed to sign token assertion: {0}")]
    Signing(String),

    #[error("token exchange failed: {0}")]
    Exchange(String),
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// The fields of a service account JSON key that this service uses.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub project_id: String,
    pub client_email: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountKey {
    pub fn from_json(json: &str) -> Result<Self, CredentialsError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, CredentialsError> {
        let json = std::fs::read_to_string(path).map_err(|source| CredentialsError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct AssertionClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: u64,
    exp: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// Mints and caches OAuth2 access tokens for a service account.
pub struct AccessTokenSource {
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    scope: String,
    http: Client,
    cache: RwLock<Option<CachedToken>>,
}

impl AccessTokenSource {
    pub fn new(key: ServiceAccountKey, scopes: &[&str], http: Client) -> Result<Self, CredentialsError> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| CredentialsError::InvalidKey(e.to_string()))?;

        Ok(Self {
            key,
            encoding_key,
            scope: scopes.join(" "),
            http,
            cache: RwLock::new(None),
        })
    }

    pub fn project_id(&self) -> &str {
        &self.key.project_id
    }

    /// A valid access token, fetched anew when the cached one is close to
    /// expiry.
    pub async fn access_token(&self) -> Result<String, CredentialsError> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if Instant::now() + REFRESH_MARGIN < cached.expires_at {
                    return Ok(cached.token.clone());
                }
            }
        }

        let (token, lifetime) = self.exchange().await?;
        let mut cache = self.cache.write().await;
        *cache = Some(CachedToken {
            token: token.clone(),
            expires_at: Instant::now() + lifetime,
        });
        Ok(token)
    }

    fn signed_assertion(&self, now: u64) -> Result<String, CredentialsError> {
        let claims = AssertionClaims {
            iss: self.key.client_email.clone(),
            scope: self.scope.clone(),
            aud: self.key.token_uri.clone(),
            iat: now,
            exp: now + ASSERTION_LIFETIME.as_secs(),
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();

        encode(&header, &claims, &self.encoding_key)
            .map_err(|e| CredentialsError::Signing(e.to_string()))
    }

    async fn exchange(&self) -> Result<(String, Duration), CredentialsError> {
        let now = chrono::Utc::now().timestamp().max(0) as u64;
        let assertion = self.signed_assertion(now)?;

        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| CredentialsError::Exchange(format!("token request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.map_err(|e| {
                CredentialsError::Exchange(format!("failed to read {status} token response: {e}"))
            })?;
            return Err(CredentialsError::Exchange(format!(
                "token request returned {status}: {body}"
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| CredentialsError::Exchange(format!("invalid token response: {e}")))?;

        if token.access_token.trim().is_empty() {
            return Err(CredentialsError::Exchange(
                "token response did not include access_token".to_string(),
            ));
        }

        let lifetime = token
            .expires_in
            .map(Duration::from_secs)
            .unwrap_or(ASSERTION_LIFETIME);

        tracing::debug!(
            client_email = %self.key.client_email,
            expires_in_secs = lifetime.as_secs(),
            "Obtained service account access token"
        );
        Ok((token.access_token, lifetime))
    }
}
