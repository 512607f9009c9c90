// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The auth gate.
//!
//! Applied to the protected part of the router:
//!
//! ```rust,ignore
//! let protected = Router::new()
//!     .route("/profile", get(profile::get_profile))
//!     .route_layer(axum::middleware::from_fn_with_state(
//!         state.clone(),
//!         require_auth,
//!     ));
//! ```
//!
//! Missing or malformed headers are rejected without calling the verifier
//! and without an access log entry. A token the verifier rejects produces a
//! `TOKEN_VERIFY_FAIL` entry. A successful verification stores the subject
//! id in a [`RequestContext`] and writes nothing; logging a success is up to
//! the handler that uses the identity.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::{AuthError, ClientIp, RequestContext};
use crate::audit::{AccessAction, AccessLogEntry};
use crate::identity::IdentityError;
use crate::state::AppState;

const BEARER_SCHEME: &str = "Bearer";

/// Extract the credential from an `Authorization` header value.
///
/// Accepts exactly two whitespace-separated fields, the first being `Bearer`
/// in any letter case.
pub fn bearer_token(header: &HeaderValue) -> Result<&str, AuthError> {
    let value = header.to_str().map_err(|_| AuthError::InvalidAuthHeader)?;
    if value.trim().is_empty() {
        return Err(AuthError::MissingAuthHeader);
    }

    let mut fields = value.split_whitespace();
    match (fields.next(), fields.next(), fields.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case(BEARER_SCHEME) => {
            Ok(token)
        }
        _ => Err(AuthError::InvalidAuthHeader),
    }
}

/// Authentication middleware function.
pub async fn require_auth(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    mut request: Request,
    next: Next,
) -> Response {
    let token = match request.headers().get(AUTHORIZATION) {
        Some(header) => match bearer_token(header) {
            Ok(token) => token.to_string(),
            Err(e) => return e.into_response(),
        },
        None => return AuthError::MissingAuthHeader.into_response(),
    };

    match state.identity.verify_token(&token).await {
        Ok(identity) => {
            tracing::debug!(subject_id = %identity.subject_id, "Request authenticated");
            request
                .extensions_mut()
                .insert(RequestContext::authenticated(identity.subject_id));
            next.run(request).await
        }
        Err(err) => {
            let detail = match err {
                IdentityError::InvalidToken(detail) => detail,
                other => other.to_string(),
            };
            tracing::info!(client_ip = %client_ip, error = %detail, "Rejected bearer token");

            state.audit.submit(
                AccessLogEntry::new(AccessAction::TokenVerifyFail, client_ip).failed(detail.clone()),
            );

            AuthError::InvalidToken(detail).into_response()
        }
    }
}
