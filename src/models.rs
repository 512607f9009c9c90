// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies of the REST API. All types derive `ToSchema`
//! for the OpenAPI document; wire names are camelCase.
//!
//! Request types carry their own `validate` check, run by the handlers right
//! after JSON decoding. A failed check is reported like a decoding error:
//! 400 `Invalid request body: <detail>`.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Minimum password length accepted by the identity provider.
pub const MIN_PASSWORD_LEN: usize = 6;

fn email_regex() -> &'static Regex {
    static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
        #[allow(clippy::unwrap_used)]
        Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9](?:[A-Za-z0-9\-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9\-]*[A-Za-z0-9])?)+$").unwrap()
    });
    &EMAIL_REGEX
}

pub fn is_valid_email(email: &str) -> bool {
    email_regex().is_match(email)
}

// =============================================================================
// Requests
// =============================================================================

/// Request body for POST /register.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RegisterRequest {
    /// Account email
    #[schema(example = "user@example.com")]
    pub email: String,
    /// At least 6 characters
    #[schema(min_length = 6)]
    pub password: String,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.email.is_empty() {
            return Err("email is required".to_string());
        }
        if !is_valid_email(&self.email) {
            return Err("email must be a valid email address".to_string());
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            ));
        }
        Ok(())
    }
}

/// Request body for POST /login and POST /auth/google/signin.
///
/// The ID token is obtained client-side from Firebase, either after a
/// password sign-in or from the Google provider.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenSignInRequest {
    pub id_token: String,
}

impl TokenSignInRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.id_token.trim().is_empty() {
            return Err("idToken is required".to_string());
        }
        Ok(())
    }
}

// =============================================================================
// Responses
// =============================================================================

/// Successful registration or sign-in.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub message: String,
    pub user_id: String,
}

impl AuthResponse {
    pub fn new(message: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            user_id: user_id.into(),
        }
    }
}

/// Response for GET /profile.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub user_id: String,
    /// Empty when the account has no email
    pub email: String,
}

/// Response for GET /health.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "UP")]
    pub status: String,
}

/// Body of every error response.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}
