// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for request-scoped authentication state.
//!
//! ```rust,ignore
//! async fn my_handler(ctx: RequestContext) -> Result<Json<Profile>, ApiError> {
//!     let subject_id = ctx.subject_id()?;
//!     // ...
//! }
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::request::Parts,
};

use super::AuthError;

const FORWARDED_FOR: &str = "x-forwarded-for";
const REAL_IP: &str = "x-real-ip";
const UNKNOWN_IP: &str = "unknown";

/// Per-request authentication state.
///
/// The auth gate inserts one into the request extensions after a successful
/// verification. Routes that do not pass through the gate see an unset
/// context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    subject_id: Option<String>,
}

impl RequestContext {
    /// Context for a request whose token was verified.
    pub fn authenticated(subject_id: impl Into<String>) -> Self {
        Self {
            subject_id: Some(subject_id.into()),
        }
    }

    /// The verified subject id.
    ///
    /// An unset subject on a handler that needs one means the route was not
    /// wired behind the auth gate, so this reports
    /// [`AuthError::MissingContext`] (a server error), not a 401.
    pub fn subject_id(&self) -> Result<&str, AuthError> {
        self.subject_id.as_deref().ok_or(AuthError::MissingContext)
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .unwrap_or_default())
    }
}

/// Client address as recorded in access logs.
///
/// Resolution order: first `X-Forwarded-For` entry, `X-Real-IP`, the TCP
/// peer (requires `into_make_service_with_connect_info`), then `"unknown"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ClientIp(resolve_client_ip(parts)))
    }
}

fn header_str<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn resolve_client_ip(parts: &Parts) -> String {
    if let Some(first) = header_str(parts, FORWARDED_FOR)
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return first.to_string();
    }

    if let Some(real_ip) = header_str(parts, REAL_IP) {
        return real_ip.to_string();
    }

    parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_IP.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri("/test");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn context_defaults_to_unset() {
        let mut parts = parts(&[]);
        let ctx = RequestContext::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(ctx.subject_id(), Err(AuthError::MissingContext));
    }

    #[tokio::test]
    async fn context_reads_gate_inserted_subject() {
        let mut parts = parts(&[]);
        parts
            .extensions
            .insert(RequestContext::authenticated("uid_from_gate"));

        let ctx = RequestContext::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(ctx.subject_id(), Ok("uid_from_gate"));
    }

    #[tokio::test]
    async fn client_ip_prefers_first_forwarded_entry() {
        let mut parts = parts(&[
            ("X-Forwarded-For", "203.0.113.7, 10.0.0.1"),
            ("X-Real-IP", "198.51.100.2"),
        ]);
        let ClientIp(ip) = ClientIp::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(ip, "203.0.113.7");
    }

    #[tokio::test]
    async fn client_ip_falls_back_to_real_ip_then_peer() {
        let mut with_real_ip = parts(&[("X-Real-IP", "198.51.100.2")]);
        let ClientIp(ip) = ClientIp::from_request_parts(&mut with_real_ip, &())
            .await
            .unwrap();
        assert_eq!(ip, "198.51.100.2");

        let mut with_peer = parts(&[]);
        with_peer
            .extensions
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 10], 40000))));
        let ClientIp(ip) = ClientIp::from_request_parts(&mut with_peer, &())
            .await
            .unwrap();
        assert_eq!(ip, "192.0.2.10");

        let mut bare = parts(&[]);
        let ClientIp(ip) = ClientIp::from_request_parts(&mut bare, &()).await.unwrap();
        assert_eq!(ip, "unknown");
    }
}
