// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! External service integrations.
//!
//! - [`google`]: service account credentials and OAuth2 access tokens
//! - [`firebase_auth`]: Firebase Authentication as the credential verifier
//! - [`firestore`]: Cloud Firestore as the access log sink

pub mod firebase_auth;
pub mod firestore;
pub mod google;

pub use firebase_auth::FirebaseVerifier;
pub use firestore::FirestoreSink;
pub use google::{AccessTokenSource, CredentialsError, ServiceAccountKey};
