// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Identity Service
//!
//! Orchestrates registration, token verification, sign-in and profile
//! lookup on top of a [`CredentialVerifier`], and emits the access log
//! entries for those outcomes.
//!
//! | Operation | Access log |
//! |---|---|
//! | [`IdentityService::register`] | `REGISTER_SUCCESS` / `REGISTER_FAIL` |
//! | [`IdentityService::login`] | `LOGIN_*` or `LOGIN_GOOGLE_*` |
//! | [`IdentityService::verify_token`] | none |
//! | [`IdentityService::get_profile`] | none |

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::audit::{AccessAction, AccessLogEntry, AuditLogger};
use crate::auth::verifier::{CredentialVerifier, VerifierError};
use crate::auth::Identity;

/// Default bound for a single verifier call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("email already registered")]
    AlreadyExists,

    #[error("failed to create user: {0}")]
    CreationFailed(String),

    #[error("{0}")]
    InvalidToken(String),

    #[error("failed to retrieve user profile: {0}")]
    LookupFailed(String),
}

/// Which sign-in endpoint a token arrived through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignInFlow {
    Password,
    Google,
}

impl SignInFlow {
    pub fn success_action(self) -> AccessAction {
        match self {
            SignInFlow::Password => AccessAction::LoginSuccess,
            SignInFlow::Google => AccessAction::GoogleLoginSuccess,
        }
    }

    pub fn failure_action(self) -> AccessAction {
        match self {
            SignInFlow::Password => AccessAction::LoginFail,
            SignInFlow::Google => AccessAction::GoogleLoginFail,
        }
    }

    pub fn success_message(self) -> &'static str {
        match self {
            SignInFlow::Password => "Login successful",
            SignInFlow::Google => "Google sign-in successful",
        }
    }

    /// Client-facing message for a rejected token.
    pub fn failure_message(self, detail: &str) -> String {
        match self {
            SignInFlow::Password => "Invalid or expired token".to_string(),
            SignInFlow::Google => format!("Invalid or expired Google token: {detail}"),
        }
    }
}

/// Public view of a user account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub subject_id: String,
    pub email: Option<String>,
}

pub struct IdentityService {
    verifier: Arc<dyn CredentialVerifier>,
    audit: AuditLogger,
    call_timeout: Duration,
}

impl IdentityService {
    pub fn new(verifier: Arc<dyn CredentialVerifier>, audit: AuditLogger) -> Self {
        Self {
            verifier,
            audit,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, VerifierError>
    where
        F: Future<Output = Result<T, VerifierError>>,
    {
        tokio::time::timeout(self.call_timeout, call)
            .await
            .unwrap_or(Err(VerifierError::Timeout(self.call_timeout)))
    }

    /// Create an account and return its subject id.
    ///
    /// Input validation (email syntax, password length) happens before this
    /// is called.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        client_ip: &str,
    ) -> Result<String, IdentityError> {
        let result = self
            .bounded(self.verifier.create_account(email, password))
            .await;

        match result {
            Ok(record) => {
                tracing::info!(subject_id = %record.uid, "User registered");
                self.audit.submit(
                    AccessLogEntry::new(AccessAction::RegisterSuccess, client_ip)
                        .with_user(record.uid.clone())
                        .with_email(email),
                );
                Ok(record.uid)
            }
            Err(err) => {
                tracing::warn!(error = %err, client_ip = %client_ip, "Registration failed");
                self.audit.submit(
                    AccessLogEntry::new(AccessAction::RegisterFail, client_ip)
                        .with_email(email)
                        .failed(err.to_string()),
                );
                match err {
                    VerifierError::EmailExists => Err(IdentityError::AlreadyExists),
                    other => Err(IdentityError::CreationFailed(other.to_string())),
                }
            }
        }
    }

    /// Verify an ID token. Writes no access log entry.
    pub async fn verify_token(&self, id_token: &str) -> Result<Identity, IdentityError> {
        self.bounded(self.verifier.verify_token(id_token))
            .await
            .map_err(|e| IdentityError::InvalidToken(e.to_string()))
    }

    /// Verify a sign-in token and record the outcome.
    ///
    /// On failure nothing from the token is logged besides the verifier's
    /// error detail.
    pub async fn login(
        &self,
        id_token: &str,
        client_ip: &str,
        flow: SignInFlow,
    ) -> Result<Identity, IdentityError> {
        match self.bounded(self.verifier.verify_token(id_token)).await {
            Ok(identity) => {
                let mut entry = AccessLogEntry::new(flow.success_action(), client_ip)
                    .with_user(identity.subject_id.clone());
                if let Some(email) = &identity.email {
                    entry = entry.with_email(email.clone());
                }
                self.audit.submit(entry);
                Ok(identity)
            }
            Err(err) => {
                let detail = err.to_string();
                tracing::info!(error = %detail, client_ip = %client_ip, "Sign-in rejected");
                self.audit.submit(
                    AccessLogEntry::new(flow.failure_action(), client_ip).failed(detail.clone()),
                );
                Err(IdentityError::InvalidToken(detail))
            }
        }
    }

    /// Look up the profile of a verified subject.
    pub async fn get_profile(&self, subject_id: &str) -> Result<Profile, IdentityError> {
        let record = self
            .bounded(self.verifier.get_user(subject_id))
            .await
            .map_err(|e| {
                tracing::error!(subject_id = %subject_id, error = %e, "Profile lookup failed");
                IdentityError::LookupFailed(e.to_string())
            })?;

        Ok(Profile {
            subject_id: record.uid,
            email: record.email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemorySink;
    use crate::test_support::{FakeVerifier, HangingVerifier};

    fn service(verifier: Arc<FakeVerifier>, sink: Arc<MemorySink>) -> IdentityService {
        IdentityService::new(verifier, AuditLogger::new(sink))
    }

    #[tokio::test]
    async fn register_logs_success_with_subject_and_email() {
        let verifier = Arc::new(FakeVerifier::new());
        let sink = Arc::new(MemorySink::new());
        let svc = service(verifier.clone(), sink.clone());

        let uid = svc.register("new@b.com", "secret1", "10.1.1.1").await.unwrap();
        assert_eq!(verifier.user(&uid).unwrap().email.as_deref(), Some("new@b.com"));

        let entries = sink.wait_for(1, Duration::from_secs(1)).await;
        assert_eq!(entries.len(), 1);
        let entry = &entries[0].entry;
        assert_eq!(entry.action(), AccessAction::RegisterSuccess);
        assert_eq!(entry.user_id(), Some(uid.as_str()));
        assert_eq!(entry.email(), Some("new@b.com"));
        assert_eq!(entry.ip_address(), "10.1.1.1");
        assert!(entry.error_details().is_none());
    }

    #[tokio::test]
    async fn duplicate_registration_is_a_conflict() {
        let verifier = Arc::new(FakeVerifier::new());
        verifier.add_user("uid_1", Some("taken@b.com"));
        let sink = Arc::new(MemorySink::new());
        let svc = service(verifier, sink.clone());

        let err = svc.register("taken@b.com", "secret1", "10.1.1.1").await.unwrap_err();
        assert!(matches!(err, IdentityError::AlreadyExists));

        let entries = sink.wait_for(1, Duration::from_secs(1)).await;
        assert_eq!(entries.len(), 1);
        let entry = &entries[0].entry;
        assert_eq!(entry.action(), AccessAction::RegisterFail);
        assert_eq!(entry.email(), Some("taken@b.com"));
        assert!(entry.user_id().is_none());
        assert!(entry.error_details().is_some());
    }

    #[tokio::test]
    async fn other_creation_errors_are_internal() {
        let verifier = Arc::new(FakeVerifier::new());
        verifier.fail_create_with("quota exceeded");
        let sink = Arc::new(MemorySink::new());
        let svc = service(verifier, sink.clone());

        let err = svc.register("x@b.com", "secret1", "10.1.1.1").await.unwrap_err();
        assert!(matches!(err, IdentityError::CreationFailed(ref d) if d.contains("quota exceeded")));
        assert_eq!(
            sink.wait_for(1, Duration::from_secs(1)).await[0].entry.action(),
            AccessAction::RegisterFail
        );
    }

    #[tokio::test]
    async fn verify_token_does_not_log() {
        let verifier = Arc::new(FakeVerifier::new());
        verifier.add_token("tok", "uid_7", None);
        let sink = Arc::new(MemorySink::new());
        let svc = service(verifier, sink.clone());

        assert_eq!(svc.verify_token("tok").await.unwrap().subject_id, "uid_7");
        let err = svc.verify_token("bad").await.unwrap_err();
        assert!(matches!(err, IdentityError::InvalidToken(ref d) if d == "unknown token"));
        assert!(sink.wait_for(1, Duration::from_millis(50)).await.is_empty());
    }

    #[tokio::test]
    async fn password_login_records_email_from_claims() {
        let verifier = Arc::new(FakeVerifier::new());
        verifier.add_token("tok", "uid_7", Some("seven@b.com"));
        let sink = Arc::new(MemorySink::new());
        let svc = service(verifier, sink.clone());

        let identity = svc.login("tok", "::1", SignInFlow::Password).await.unwrap();
        assert_eq!(identity.subject_id, "uid_7");

        let entries = sink.wait_for(1, Duration::from_secs(1)).await;
        let entry = &entries[0].entry;
        assert_eq!(entry.action(), AccessAction::LoginSuccess);
        assert_eq!(entry.user_id(), Some("uid_7"));
        assert_eq!(entry.email(), Some("seven@b.com"));
    }

    #[tokio::test]
    async fn google_login_failure_logs_detail_only() {
        let verifier = Arc::new(FakeVerifier::new());
        let sink = Arc::new(MemorySink::new());
        let svc = service(verifier, sink.clone());

        let err = svc.login("bad", "::1", SignInFlow::Google).await.unwrap_err();
        assert!(matches!(err, IdentityError::InvalidToken(_)));

        let entries = sink.wait_for(1, Duration::from_secs(1)).await;
        assert_eq!(entries.len(), 1);
        let entry = &entries[0].entry;
        assert_eq!(entry.action(), AccessAction::GoogleLoginFail);
        assert_eq!(entry.error_details(), Some("unknown token"));
        assert!(entry.user_id().is_none());
        assert!(entry.email().is_none());
    }

    #[tokio::test]
    async fn unreachable_provider_on_login_is_still_logged() {
        let verifier = Arc::new(FakeVerifier::new());
        verifier.fail_verify_with("JWKS endpoint unreachable");
        let sink = Arc::new(MemorySink::new());
        let svc = service(verifier, sink.clone());

        let err = svc.login("tok", "10.0.0.9", SignInFlow::Password).await.unwrap_err();
        assert!(matches!(err, IdentityError::InvalidToken(ref d) if d.contains("unreachable")));

        let entries = sink.wait_for(1, Duration::from_secs(1)).await;
        assert_eq!(entries.len(), 1);
        let entry = &entries[0].entry;
        assert_eq!(entry.action(), AccessAction::LoginFail);
        assert_eq!(entry.ip_address(), "10.0.0.9");
        assert!(entry.error_details().unwrap().contains("JWKS endpoint unreachable"));
    }

    #[tokio::test]
    async fn profile_lookup_is_idempotent() {
        let verifier = Arc::new(FakeVerifier::new());
        verifier.add_user("uid_3", Some("three@b.com"));
        let svc = service(verifier, Arc::new(MemorySink::new()));

        let first = svc.get_profile("uid_3").await.unwrap();
        let second = svc.get_profile("uid_3").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.email.as_deref(), Some("three@b.com"));
    }

    #[tokio::test]
    async fn unknown_profile_is_a_lookup_failure() {
        let svc = service(Arc::new(FakeVerifier::new()), Arc::new(MemorySink::new()));
        let err = svc.get_profile("ghost").await.unwrap_err();
        assert!(matches!(err, IdentityError::LookupFailed(_)));
    }

    #[tokio::test]
    async fn slow_verifier_is_cut_off() {
        let sink = Arc::new(MemorySink::new());
        let svc = IdentityService::new(Arc::new(HangingVerifier), AuditLogger::new(sink.clone()))
            .with_call_timeout(Duration::from_millis(20));

        let err = svc.login("tok", "::1", SignInFlow::Password).await.unwrap_err();
        assert!(matches!(err, IdentityError::InvalidToken(ref d) if d.contains("timed out")));

        let entries = sink.wait_for(1, Duration::from_secs(1)).await;
        assert_eq!(entries[0].entry.action(), AccessAction::LoginFail);
    }

    #[test]
    fn flow_messages() {
        assert_eq!(SignInFlow::Password.failure_message("x"), "Invalid or expired token");
        assert_eq!(
            SignInFlow::Google.failure_message("ID token has expired"),
            "Invalid or expired Google token: ID token has expired"
        );
        assert_eq!(SignInFlow::Google.success_message(), "Google sign-in successful");
    }
}
