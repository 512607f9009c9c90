// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Firebase Authentication as the credential verifier.
//!
//! - ID tokens are verified locally against Google's public keys.
//! - Account creation and lookup go through the Identity Toolkit admin API,
//!   authenticated with the service account.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::google::AccessTokenSource;
use crate::auth::jwks::JwksManager;
use crate::auth::verifier::{CredentialVerifier, VerifierError};
use crate::auth::{Identity, UserRecord};

pub const IDENTITY_TOOLKIT_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const ISSUER_PREFIX: &str = "https://securetoken.google.com/";

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountRecord {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<AccountRecord>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

impl From<AccountRecord> for UserRecord {
    fn from(record: AccountRecord) -> Self {
        Self {
            uid: record.local_id,
            email: record.email.filter(|e| !e.is_empty()),
        }
    }
}

pub struct FirebaseVerifier {
    project_id: String,
    jwks: JwksManager,
    tokens: Arc<AccessTokenSource>,
    http: Client,
    base_url: String,
}

impl FirebaseVerifier {
    /// `base_url` is the Identity Toolkit REST root, `jwks_url` the ID token
    /// signing keys.
    pub fn new(
        tokens: Arc<AccessTokenSource>,
        base_url: impl Into<String>,
        jwks_url: impl Into<String>,
        http: Client,
    ) -> Self {
        Self {
            project_id: tokens.project_id().to_string(),
            jwks: JwksManager::new(jwks_url, http.clone()),
            tokens,
            http,
            base_url: base_url.into(),
        }
    }

    async fn post_admin(&self, path: &str, payload: &Value) -> Result<Value, VerifierError> {
        let token = self
            .tokens
            .access_token()
            .await
            .map_err(|e| VerifierError::Provider(e.to_string()))?;

        let url = format!(
            "{}/projects/{}/{}",
            self.base_url.trim_end_matches('/'),
            self.project_id,
            path
        );

        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(payload)
            .send()
            .await
            .map_err(|e| VerifierError::Request(format!("POST {path} failed: {e}")))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            VerifierError::Request(format!("reading {path} response (HTTP {status}) failed: {e}"))
        })?;
        if !status.is_success() {
            return Err(classify_error(status.as_u16(), &body));
        }

        serde_json::from_str(&body)
            .map_err(|e| VerifierError::Provider(format!("invalid response from {path}: {e}")))
    }
}

#[async_trait]
impl CredentialVerifier for FirebaseVerifier {
    async fn create_account(&self, email: &str, password: &str) -> Result<UserRecord, VerifierError> {
        let payload = json!({
            "email": email,
            "password": password,
            "emailVerified": false,
            "disabled": false,
        });

        let response = self.post_admin("accounts", &payload).await?;
        let record: AccountRecord = serde_json::from_value(response)
            .map_err(|e| VerifierError::Provider(format!("invalid account record: {e}")))?;

        tracing::info!(uid = %record.local_id, "Created Firebase account");
        Ok(record.into())
    }

    async fn verify_token(&self, token: &str) -> Result<Identity, VerifierError> {
        let header = decode_header(token)
            .map_err(|e| VerifierError::InvalidToken(format!("malformed ID token: {e}")))?;
        let kid = header
            .kid
            .ok_or_else(|| VerifierError::InvalidToken("ID token has no \"kid\" header".to_string()))?;

        let key = self.jwks.get_decoding_key(&kid).await?;
        verify_id_token(token, &key, &self.project_id)
    }

    async fn get_user(&self, uid: &str) -> Result<UserRecord, VerifierError> {
        let response = self
            .post_admin("accounts:lookup", &json!({ "localId": [uid] }))
            .await?;
        let lookup: LookupResponse = serde_json::from_value(response)
            .map_err(|e| VerifierError::Provider(format!("invalid lookup response: {e}")))?;

        lookup
            .users
            .into_iter()
            .next()
            .map(UserRecord::from)
            .ok_or_else(|| VerifierError::UserNotFound(uid.to_string()))
    }
}

/// Validate a Firebase ID token against an already selected key.
fn verify_id_token(
    token: &str,
    key: &DecodingKey,
    project_id: &str,
) -> Result<Identity, VerifierError> {
    let mut validation = Validation::new(Algorithm::RS256);
    validation.leeway = CLOCK_SKEW_LEEWAY;
    validation.set_issuer(&[format!("{ISSUER_PREFIX}{project_id}")]);
    validation.set_audience(&[project_id]);
    validation.set_required_spec_claims(&["exp", "iat", "iss", "aud", "sub"]);

    let data = decode::<HashMap<String, Value>>(token, key, &validation).map_err(|e| {
        use jsonwebtoken::errors::ErrorKind;
        let detail = match e.kind() {
            ErrorKind::ExpiredSignature => "ID token has expired".to_string(),
            ErrorKind::InvalidSignature => "ID token signature is invalid".to_string(),
            ErrorKind::InvalidIssuer => "ID token has incorrect \"iss\" claim".to_string(),
            ErrorKind::InvalidAudience => "ID token has incorrect \"aud\" claim".to_string(),
            ErrorKind::ImmatureSignature => "ID token is not yet valid".to_string(),
            ErrorKind::InvalidAlgorithm => "ID token has incorrect algorithm".to_string(),
            _ => format!("failed to verify ID token: {e}"),
        };
        VerifierError::InvalidToken(detail)
    })?;

    Identity::from_claims(data.claims)
}

/// Map an Identity Toolkit error response to a verifier error.
///
/// The API reports the reason as an upper-case code at the start of
/// `error.message`, e.g. `EMAIL_EXISTS` or `USER_NOT_FOUND : ...`.
fn classify_error(status: u16, body: &str) -> VerifierError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_default();

    let code = message
        .split(|c: char| c == ':' || c.is_whitespace())
        .next()
        .unwrap_or_default();

    match code {
        "EMAIL_EXISTS" | "DUPLICATE_EMAIL" => VerifierError::EmailExists,
        "USER_NOT_FOUND" => VerifierError::UserNotFound(message.clone()),
        _ if message.is_empty() => VerifierError::Provider(format!("HTTP {status}: {body}")),
        _ => VerifierError::Provider(format!("HTTP {status}: {message}")),
    }
}
