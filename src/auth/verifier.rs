// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The credential verifier seam.

use std::time::Duration;

use async_trait::async_trait;

use super::{Identity, UserRecord};

/// Errors reported by a credential verifier.
#[derive(Debug, thiserror::Error)]
pub enum VerifierError {
    #[error("an account already exists for this email")]
    EmailExists,

    #[error("no user record for uid {0}")]
    UserNotFound(String),

    #[error("{0}")]
    InvalidToken(String),

    #[error("identity provider request failed: {0}")]
    Request(String),

    #[error("identity provider error: {0}")]
    Provider(String),

    #[error("identity provider call timed out after {0:?}")]
    Timeout(Duration),
}

/// External identity provider, acting both as token verifier and user store.
///
/// Implementations are shared across requests and must be safe for
/// concurrent use.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// Create an account. Fails with [`VerifierError::EmailExists`] on conflict.
    async fn create_account(&self, email: &str, password: &str)
        -> Result<UserRecord, VerifierError>;

    /// Verify an ID token and return the identity it asserts.
    async fn verify_token(&self, token: &str) -> Result<Identity, VerifierError>;

    /// Look up an account by subject id.
    async fn get_user(&self, uid: &str) -> Result<UserRecord, VerifierError>;
}
