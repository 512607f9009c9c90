// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Bearer-token authentication backed by Firebase ID tokens.
//!
//! ## Auth Flow
//!
//! 1. The client signs in with Firebase (email/password or Google)
//! 2. The client sends `Authorization: Bearer <Firebase ID token>`
//! 3. The auth gate ([`middleware::require_auth`]):
//!    - Parses the header (`Bearer` in any letter case, exactly one token)
//!    - Hands the token to the [`CredentialVerifier`]
//!    - Stores `sub` as the canonical subject id in a [`RequestContext`]
//!
//! ## Security
//!
//! - Only `/profile` sits behind the gate; registration, sign-in and health
//!   are public
//! - JWKS is fetched over HTTPS and cached for the advertised `max-age`
//! - Clock skew tolerance is 60 seconds
//! - Rejected tokens are recorded as `TOKEN_VERIFY_FAIL` access log entries

pub mod claims;
pub mod error;
pub mod extractor;
pub mod jwks;
pub mod middleware;
pub mod verifier;

pub use claims::{Identity, UserRecord};
pub use error::AuthError;
pub use extractor::{ClientIp, RequestContext};
pub use jwks::JwksManager;
pub use verifier::{CredentialVerifier, VerifierError};
