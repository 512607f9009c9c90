// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Registration and sign-in endpoints.
//!
//! Sign-in never sees a password: clients authenticate with Firebase
//! directly and send the resulting ID token here. Both sign-in routes verify
//! that token and record the outcome; they differ only in the access log
//! labels and response messages.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};

use super::parse_body;
use crate::auth::ClientIp;
use crate::error::ApiError;
use crate::identity::{IdentityError, SignInFlow};
use crate::models::{AuthResponse, ErrorResponse, RegisterRequest, TokenSignInRequest};
use crate::state::AppState;

/// Create a new email/password account.
#[utoipa::path(
    post,
    path = "/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = AuthResponse),
        (status = 400, description = "Malformed body, invalid email or short password", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
        (status = 500, description = "Identity provider failure", body = ErrorResponse),
    )
)]
pub async fn register(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let request = parse_body(payload)?;
    request
        .validate()
        .map_err(|detail| ApiError::bad_request(format!("Invalid request body: {detail}")))?;

    let user_id = state
        .identity
        .register(&request.email, &request.password, &client_ip)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse::new("User registered successfully", user_id)),
    ))
}

/// Verify an ID token obtained from an email/password sign-in.
#[utoipa::path(
    post,
    path = "/login",
    tag = "Auth",
    request_body = TokenSignInRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Malformed body", body = ErrorResponse),
        (status = 401, description = "Invalid or expired token", body = ErrorResponse),
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    payload: Result<Json<TokenSignInRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    sign_in(&state, &client_ip, payload, SignInFlow::Password).await
}

/// Verify an ID token obtained from the Google provider.
#[utoipa::path(
    post,
    path = "/auth/google/signin",
    tag = "Auth",
    request_body = TokenSignInRequest,
    responses(
        (status = 200, description = "Google sign-in successful", body = AuthResponse),
        (status = 400, description = "Malformed body", body = ErrorResponse),
        (status = 401, description = "Invalid or expired Google token", body = ErrorResponse),
    )
)]
pub async fn google_sign_in(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    payload: Result<Json<TokenSignInRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    sign_in(&state, &client_ip, payload, SignInFlow::Google).await
}

async fn sign_in(
    state: &AppState,
    client_ip: &str,
    payload: Result<Json<TokenSignInRequest>, JsonRejection>,
    flow: SignInFlow,
) -> Result<Json<AuthResponse>, ApiError> {
    let request = parse_body(payload)?;
    request
        .validate()
        .map_err(|detail| ApiError::bad_request(format!("Invalid request body: {detail}")))?;

    match state.identity.login(&request.id_token, client_ip, flow).await {
        Ok(identity) => Ok(Json(AuthResponse::new(
            flow.success_message(),
            identity.subject_id,
        ))),
        Err(IdentityError::InvalidToken(detail)) => {
            Err(ApiError::unauthorized(flow.failure_message(&detail)))
        }
        Err(other) => Err(other.into()),
    }
}
