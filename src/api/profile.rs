// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Profile endpoint.

use axum::{extract::State, Json};

use crate::auth::RequestContext;
use crate::error::ApiError;
use crate::identity::Profile;
use crate::models::{ErrorResponse, ProfileResponse};
use crate::state::AppState;

impl From<Profile> for ProfileResponse {
    fn from(profile: Profile) -> Self {
        Self {
            user_id: profile.subject_id,
            email: profile.email.unwrap_or_default(),
        }
    }
}

/// Get the profile of the authenticated user.
#[utoipa::path(
    get,
    path = "/profile",
    tag = "Profile",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "User profile", body = ProfileResponse),
        (status = 401, description = "Missing, malformed or invalid bearer token", body = ErrorResponse),
        (status = 500, description = "Profile lookup failed", body = ErrorResponse),
    )
)]
pub async fn get_profile(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> Result<Json<ProfileResponse>, ApiError> {
    let subject_id = ctx.subject_id()?;
    let profile = state.identity.get_profile(subject_id).await?;
    Ok(Json(profile.into()))
}
