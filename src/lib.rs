// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity Gateway - HTTP front for Firebase Authentication
//!
//! Registers users, verifies Firebase ID tokens, serves the profile of the
//! authenticated user and records every authentication outcome in a
//! Firestore access log.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `audit` - Access log entries and fire-and-forget submission
//! - `auth` - Bearer token gate and the credential verifier seam
//! - `identity` - Registration, sign-in and profile orchestration
//! - `providers` - Firebase Authentication and Firestore over REST

pub mod api;
pub mod audit;
pub mod auth;
pub mod config;
pub mod error;
pub mod identity;
pub mod models;
pub mod providers;
pub mod state;

#[cfg(test)]
mod test_support;
