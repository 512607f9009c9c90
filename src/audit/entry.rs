// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Access log entries.

use serde::{Deserialize, Serialize};

/// Authentication outcomes that produce an access log entry.
///
/// The serialized labels are the ones already stored in the access log
/// collection and must not change.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessAction {
    RegisterSuccess,
    RegisterFail,
    LoginSuccess,
    LoginFail,
    #[serde(rename = "LOGIN_GOOGLE_SUCCESS")]
    GoogleLoginSuccess,
    #[serde(rename = "LOGIN_GOOGLE_FAIL")]
    GoogleLoginFail,
    TokenVerifyFail,
}

impl AccessAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessAction::RegisterSuccess => "REGISTER_SUCCESS",
            AccessAction::RegisterFail => "REGISTER_FAIL",
            AccessAction::LoginSuccess => "LOGIN_SUCCESS",
            AccessAction::LoginFail => "LOGIN_FAIL",
            AccessAction::GoogleLoginSuccess => "LOGIN_GOOGLE_SUCCESS",
            AccessAction::GoogleLoginFail => "LOGIN_GOOGLE_FAIL",
            AccessAction::TokenVerifyFail => "TOKEN_VERIFY_FAIL",
        }
    }
}

impl std::fmt::Display for AccessAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One access log record.
///
/// Built with the `with_*` methods and then handed to the audit logger by
/// value; there is no way to change an entry after that. The timestamp is
/// not part of the entry: the sink stamps it on write.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AccessLogEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    action: AccessAction,
    ip_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_details: Option<String>,
}

impl AccessLogEntry {
    pub fn new(action: AccessAction, ip_address: impl Into<String>) -> Self {
        Self {
            user_id: None,
            email: None,
            action,
            ip_address: ip_address.into(),
            error_details: None,
        }
    }

    /// Set the subject id of the account involved.
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Set the email. Empty strings are ignored.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        let email = email.into();
        if !email.is_empty() {
            self.email = Some(email);
        }
        self
    }

    /// Attach the failure detail.
    pub fn failed(mut self, error: impl Into<String>) -> Self {
        self.error_details = Some(error.into());
        self
    }

    pub fn action(&self) -> AccessAction {
        self.action
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn ip_address(&self) -> &str {
        &self.ip_address
    }

    pub fn error_details(&self) -> Option<&str> {
        self.error_details.as_deref()
    }
}
