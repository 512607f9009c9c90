// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared fakes and helpers for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::audit::{AccessLogEntry, AuditError, AuditLogger, AuditSink};
use crate::auth::verifier::{CredentialVerifier, VerifierError};
use crate::auth::{Identity, UserRecord};
use crate::identity::IdentityService;
use crate::providers::google::SCOPE_CLOUD_PLATFORM;
use crate::providers::{AccessTokenSource, ServiceAccountKey};
use crate::state::AppState;

pub const TEST_RSA_PRIVATE_KEY: &str = include_str!("../testdata/service_account_key.pem");
pub const TEST_RSA_PUBLIC_KEY: &str = include_str!("../testdata/service_account_pub.pem");

/// A service account key file signed with the test RSA key.
pub fn service_account_json() -> String {
    serde_json::json!({
        "type": "service_account",
        "project_id": "demo-project",
        "private_key_id": TEST_KEY_ID,
        "private_key": TEST_RSA_PRIVATE_KEY,
        "client_email": "gateway@demo-project.iam.gserviceaccount.com",
        "token_uri": "https://oauth2.googleapis.com/token",
    })
    .to_string()
}

/// Kid of [`test_jwks`] and of the test service account key.
pub const TEST_KEY_ID: &str = "test-key-id";

/// Public JWK set holding [`TEST_RSA_PUBLIC_KEY`] under [`TEST_KEY_ID`].
pub fn test_jwks() -> Value {
    json!({
        "keys": [{
            "kty": "RSA",
            "alg": "RS256",
            "use": "sig",
            "kid": TEST_KEY_ID,
            "n": "uX2BRwyZRDUfSubmi21czII31lCiK-QMff44y0oeR8fVXDxrurBQAL4PWG0MbXkBXlBs7o_3mDy-C1aDOdUo3wMFb57g7fkQnJgLPBfGjgPlWJyTfEEEw3_nQ-gNkz_6N9oU1uFh24HmRiG2l_KWkDlFkaq3zOo98qy8oIYTWjRhAqLRilOLBqgQed3aksDYpZ_CvRlnzWp9te3_NakdsT-BuFmqmgnMIwHX4a2TR41ek_pUzA72ibIN01Vkq5CkImSgnn_O_HnQLJtiob_c59kEPR7mkTi_z2b1SwCdADV02lxYwxcF4bhIHn8HuMw9ZtTwZ1KWTWLuyLHkmS8cjQ",
            "e": "AQAB",
        }]
    })
}

/// Token source for the test service account, exchanging at `token_uri`.
pub fn token_source(token_uri: &str) -> Arc<AccessTokenSource> {
    let mut key = ServiceAccountKey::from_json(&service_account_json()).unwrap();
    key.token_uri = token_uri.to_string();
    Arc::new(AccessTokenSource::new(key, &[SCOPE_CLOUD_PLATFORM], reqwest::Client::new()).unwrap())
}

/// OAuth token endpoint at `/token` handing out `test-access-token`.
pub async fn mock_token_endpoint(server: &mut mockito::ServerGuard) -> mockito::Mock {
    server
        .mock("POST", "/token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"access_token":"test-access-token","expires_in":3600,"token_type":"Bearer"}"#)
        .create_async()
        .await
}

/// A server that answers every request with `status` and a body cut short
/// of its declared length, so reading the body fails.
///
/// Returns the base URL.
pub async fn truncated_body_server(status: u16) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 4096];
                while !request_complete(&request) {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }

                let response = format!(
                    "HTTP/1.1 {status} Error\r\ncontent-type: application/json\r\ncontent-length: 100\r\nconnection: close\r\n\r\n{{\"error\":"
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    format!("http://{addr}")
}

fn request_complete(request: &[u8]) -> bool {
    let Some(header_end) = request.windows(4).position(|w| w == b"\r\n\r\n") else {
        return false;
    };
    let head = String::from_utf8_lossy(&request[..header_end]);
    let body_len = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    request.len() >= header_end + 4 + body_len
}

pub fn test_state(verifier: Arc<FakeVerifier>, sink: Arc<dyn AuditSink>) -> AppState {
    let audit = AuditLogger::new(sink);
    AppState::new(IdentityService::new(verifier, audit.clone()), audit)
}

pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// In-memory identity provider.
///
/// Tokens are registered up front with [`FakeVerifier::add_token`]; any
/// other token fails with `"unknown token"`.
#[derive(Default)]
pub struct FakeVerifier {
    tokens: Mutex<HashMap<String, Identity>>,
    users: Mutex<HashMap<String, UserRecord>>,
    create_error: Mutex<Option<String>>,
    verify_error: Mutex<Option<String>>,
    verify_calls: AtomicUsize,
    next_uid: AtomicUsize,
}

impl FakeVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_token(&self, token: &str, uid: &str, email: Option<&str>) {
        let mut claims = HashMap::new();
        claims.insert("sub".to_string(), Value::from(uid));
        if let Some(email) = email {
            claims.insert("email".to_string(), Value::from(email));
        }
        let identity = Identity::from_claims(claims).unwrap();
        self.tokens.lock().unwrap().insert(token.to_string(), identity);
    }

    pub fn add_user(&self, uid: &str, email: Option<&str>) {
        self.users.lock().unwrap().insert(
            uid.to_string(),
            UserRecord {
                uid: uid.to_string(),
                email: email.map(str::to_string),
            },
        );
    }

    pub fn user(&self, uid: &str) -> Option<UserRecord> {
        self.users.lock().unwrap().get(uid).cloned()
    }

    /// Make every later `create_account` fail with a provider error.
    pub fn fail_create_with(&self, message: &str) {
        *self.create_error.lock().unwrap() = Some(message.to_string());
    }

    /// Make every later `verify_token` fail as if the provider were down.
    pub fn fail_verify_with(&self, message: &str) {
        *self.verify_error.lock().unwrap() = Some(message.to_string());
    }

    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialVerifier for FakeVerifier {
    async fn create_account(&self, email: &str, _password: &str) -> Result<UserRecord, VerifierError> {
        if let Some(message) = self.create_error.lock().unwrap().clone() {
            return Err(VerifierError::Provider(message));
        }

        let mut users = self.users.lock().unwrap();
        if users.values().any(|u| u.email.as_deref() == Some(email)) {
            return Err(VerifierError::EmailExists);
        }

        let uid = format!("uid_{}", self.next_uid.fetch_add(1, Ordering::SeqCst) + 1);
        let record = UserRecord {
            uid: uid.clone(),
            email: Some(email.to_string()),
        };
        users.insert(uid, record.clone());
        Ok(record)
    }

    async fn verify_token(&self, token: &str) -> Result<Identity, VerifierError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.verify_error.lock().unwrap().clone() {
            return Err(VerifierError::Request(message));
        }
        self.tokens
            .lock()
            .unwrap()
            .get(token)
            .cloned()
            .ok_or_else(|| VerifierError::InvalidToken("unknown token".to_string()))
    }

    async fn get_user(&self, uid: &str) -> Result<UserRecord, VerifierError> {
        self.user(uid)
            .ok_or_else(|| VerifierError::UserNotFound(uid.to_string()))
    }
}

/// A verifier whose calls never complete.
pub struct HangingVerifier;

#[async_trait]
impl CredentialVerifier for HangingVerifier {
    async fn create_account(&self, _email: &str, _password: &str) -> Result<UserRecord, VerifierError> {
        std::future::pending().await
    }

    async fn verify_token(&self, _token: &str) -> Result<Identity, VerifierError> {
        std::future::pending().await
    }

    async fn get_user(&self, _uid: &str) -> Result<UserRecord, VerifierError> {
        std::future::pending().await
    }
}

async fn wait_until(counter: &AtomicUsize, count: usize, timeout: Duration) {
    let deadline = tokio::time::Instant::now() + timeout;
    while counter.load(Ordering::SeqCst) < count && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// A sink that rejects every entry.
#[derive(Default)]
pub struct FailingSink {
    attempts: AtomicUsize,
}

impl FailingSink {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub async fn wait_for_attempts(&self, count: usize, timeout: Duration) {
        wait_until(&self.attempts, count, timeout).await
    }
}

#[async_trait]
impl AuditSink for FailingSink {
    async fn append(&self, _entry: &AccessLogEntry) -> Result<(), AuditError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(AuditError::Rejected("sink unavailable".to_string()))
    }
}

/// A sink whose writes never complete.
#[derive(Default)]
pub struct HangingSink {
    attempts: AtomicUsize,
}

impl HangingSink {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub async fn wait_for_attempts(&self, count: usize, timeout: Duration) {
        wait_until(&self.attempts, count, timeout).await
    }
}

#[async_trait]
impl AuditSink for HangingSink {
    async fn append(&self, _entry: &AccessLogEntry) -> Result<(), AuditError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }
}
