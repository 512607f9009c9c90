// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Verified identities and user records.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::verifier::VerifierError;

/// Firebase caps `sub`/uid at 128 characters.
const MAX_SUBJECT_LEN: usize = 128;

/// Identity produced by a successful token verification.
///
/// Lives for one request and is never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    /// Canonical account id (`sub` claim)
    pub subject_id: String,

    /// Email claim, when the provider asserted one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Every claim of the verified token
    #[serde(default)]
    pub claims: HashMap<String, Value>,
}

impl Identity {
    /// Build an identity from a verified claim set.
    pub fn from_claims(claims: HashMap<String, Value>) -> Result<Self, VerifierError> {
        let subject_id = match claims.get("sub").and_then(Value::as_str) {
            Some(sub) if !sub.is_empty() && sub.len() <= MAX_SUBJECT_LEN => sub.to_string(),
            Some(_) => {
                return Err(VerifierError::InvalidToken(
                    "\"sub\" claim must be a non-empty string of at most 128 characters"
                        .to_string(),
                ))
            }
            None => {
                return Err(VerifierError::InvalidToken(
                    "token has no \"sub\" claim".to_string(),
                ))
            }
        };

        let email = claims
            .get("email")
            .and_then(Value::as_str)
            .filter(|e| !e.is_empty())
            .map(str::to_string);

        Ok(Self {
            subject_id,
            email,
            claims,
        })
    }
}

/// Account as known to the user store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}
