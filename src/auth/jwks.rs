// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWKS (JSON Web Key Set) fetching and caching.
//!
//! Firebase ID tokens are signed with Google's rotating `securetoken` keys.
//! The key set is cached for as long as the endpoint's
//! `Cache-Control: max-age` allows, falling back to one hour. A token with
//! an unknown `kid` triggers a refetch, but at most once per
//! [`MIN_REFETCH_INTERVAL`], so forged key ids cannot drive traffic to
//! Google.

use std::sync::Arc;
use std::time::{Duration, Instant};

use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, JwkSet};
use jsonwebtoken::DecodingKey;
use reqwest::header::CACHE_CONTROL;
use tokio::sync::RwLock;

use super::verifier::VerifierError;

/// Public keys for Firebase ID tokens.
pub const FIREBASE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

/// Cache TTL when the endpoint does not send `max-age`.
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Minimum age of the cached key set before an unknown `kid` may refetch it.
pub const MIN_REFETCH_INTERVAL: Duration = Duration::from_secs(60);

/// JWKS cache entry.
struct CacheEntry {
    jwks: JwkSet,
    fetched_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_fresh(&self) -> bool {
        self.fetched_at.elapsed() < self.ttl
    }
}

/// JWKS manager with caching.
#[derive(Clone)]
pub struct JwksManager {
    jwks_url: String,
    cache: Arc<RwLock<Option<CacheEntry>>>,
    client: reqwest::Client,
    min_refetch_interval: Duration,
}

impl JwksManager {
    pub fn new(jwks_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            jwks_url: jwks_url.into(),
            cache: Arc::new(RwLock::new(None)),
            client,
            min_refetch_interval: MIN_REFETCH_INTERVAL,
        }
    }

    /// Fetch JWKS (with caching).
    async fn get_jwks(&self) -> Result<JwkSet, VerifierError> {
        {
            let cache = self.cache.read().await;
            if let Some(entry) = cache.as_ref().filter(|e| e.is_fresh()) {
                return Ok(entry.jwks.clone());
            }
        }

        let (jwks, ttl) = self.fetch_jwks().await?;

        {
            let mut cache = self.cache.write().await;
            *cache = Some(CacheEntry {
                jwks: jwks.clone(),
                fetched_at: Instant::now(),
                ttl,
            });
        }

        Ok(jwks)
    }

    async fn fetch_jwks(&self) -> Result<(JwkSet, Duration), VerifierError> {
        let response = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| VerifierError::Request(format!("JWKS fetch failed: {e}")))?;

        if !response.status().is_success() {
            return Err(VerifierError::Request(format!(
                "HTTP {} from JWKS endpoint",
                response.status()
            )));
        }

        let ttl = response
            .headers()
            .get(CACHE_CONTROL)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_max_age)
            .unwrap_or(DEFAULT_CACHE_TTL);

        let jwks: JwkSet = response
            .json()
            .await
            .map_err(|e| VerifierError::Request(format!("invalid JWKS document: {e}")))?;

        tracing::debug!(keys = jwks.keys.len(), ttl_secs = ttl.as_secs(), "Fetched JWKS");
        Ok((jwks, ttl))
    }

    /// Get the RSA decoding key for the given key ID.
    ///
    /// An unknown `kid` refetches the set once before giving up, since Google
    /// rotates keys ahead of the advertised expiry.
    pub async fn get_decoding_key(&self, kid: &str) -> Result<DecodingKey, VerifierError> {
        let jwks = self.get_jwks().await?;
        if let Some(jwk) = find_key(&jwks, kid) {
            return jwk_to_decoding_key(jwk);
        }

        let no_match =
            || VerifierError::InvalidToken(format!("no public key matches kid \"{kid}\""));
        let jwks = self.refetch_for_unknown_kid().await?.ok_or_else(no_match)?;
        let jwk = find_key(&jwks, kid).ok_or_else(no_match)?;
        jwk_to_decoding_key(jwk)
    }

    /// Refetch after a `kid` miss. Returns `None` when the cached set is
    /// younger than the minimum refetch interval.
    ///
    /// The write lock is held across the fetch so concurrent misses share
    /// one request.
    async fn refetch_for_unknown_kid(&self) -> Result<Option<JwkSet>, VerifierError> {
        let mut cache = self.cache.write().await;
        if cache
            .as_ref()
            .is_some_and(|e| e.fetched_at.elapsed() < self.min_refetch_interval)
        {
            tracing::debug!("Unknown kid, JWKS fetched too recently to refetch");
            return Ok(None);
        }

        let (jwks, ttl) = self.fetch_jwks().await?;
        *cache = Some(CacheEntry {
            jwks: jwks.clone(),
            fetched_at: Instant::now(),
            ttl,
        });
        Ok(Some(jwks))
    }
}

fn find_key<'a>(jwks: &'a JwkSet, kid: &str) -> Option<&'a Jwk> {
    jwks.keys
        .iter()
        .find(|k| k.common.key_id.as_deref() == Some(kid))
}

/// `max-age` directive of a `Cache-Control` header.
fn parse_max_age(header: &str) -> Option<Duration> {
    header.split(',').find_map(|directive| {
        let (name, value) = directive.trim().split_once('=')?;
        if name.trim().eq_ignore_ascii_case("max-age") {
            value.trim().parse::<u64>().ok().map(Duration::from_secs)
        } else {
            None
        }
    })
}

/// Firebase only signs with RS256, so only RSA keys are accepted.
fn jwk_to_decoding_key(jwk: &Jwk) -> Result<DecodingKey, VerifierError> {
    match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => DecodingKey::from_rsa_components(&rsa.n, &rsa.e)
            .map_err(|e| VerifierError::Provider(format!("failed to create RSA key: {e}"))),
        _ => Err(VerifierError::Provider(
            "unsupported key type in JWKS".to_string(),
        )),
    }
}
