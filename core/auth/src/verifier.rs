// Copyright AGNTCY Contributors (https://github.com/agntcy)
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::debug;

use crate::builder::{VerifierBuilder, state};
use crate::cache::KeyCache;
use crate::errors::AuthError;
use crate::signature::verify_signature;
use crate::token::{Claims, DecodedToken, split};
use crate::traits::KeyFetcher;

/// Issuer of Google ID tokens.
pub const GOOGLE_ISSUER: &str = "https://accounts.google.com";

/// The only accepted signature algorithm.
pub const SUPPORTED_ALGORITHM: &str = "RS256";

/// Verifies identity tokens for a single client identifier.
///
/// A `Verifier` is meant to be created once and shared (for instance behind
/// an `Arc`) by every task that needs to check tokens.
#[derive(Debug)]
pub struct Verifier {
    keys: KeyCache,
    client_id: String,
    issuer: String,
    hosted_domain: Option<String>,
}

impl Verifier {
    /// Create a verifier accepting Google-issued tokens for `client_id`,
    /// with keys supplied by `fetcher`.
    ///
    /// The key set is fetched once before returning; an unusable key source
    /// makes construction fail.
    pub async fn new(
        fetcher: Arc<dyn KeyFetcher>,
        client_id: impl Into<String>,
    ) -> Result<Self, AuthError> {
        Self::builder()
            .client_id(client_id)
            .fetcher(fetcher)
            .build()
            .await
    }

    pub fn builder() -> VerifierBuilder<state::Initial> {
        VerifierBuilder::new()
    }

    pub(crate) fn from_parts(
        keys: KeyCache,
        client_id: String,
        issuer: String,
        hosted_domain: Option<String>,
    ) -> Self {
        Self {
            keys,
            client_id,
            issuer,
            hosted_domain,
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn hosted_domain(&self) -> Option<&str> {
        self.hosted_domain.as_deref()
    }

    pub fn key_cache(&self) -> &KeyCache {
        &self.keys
    }

    /// Decode and verify a compact token.
    ///
    /// Checks run in a fixed order and stop at the first failure: structure,
    /// algorithm, signing key, signature, issuer, audience, expiry, issue
    /// time and, when configured, hosted domain.
    pub async fn verify(&self, token: &str) -> Result<DecodedToken, AuthError> {
        let (header, claims, _) = split(token)?;
        let decoded = DecodedToken::decode(token)?;

        if decoded.header.alg != SUPPORTED_ALGORITHM {
            return Err(AuthError::UnsupportedAlgorithm(decoded.header.alg));
        }

        let key = self
            .keys
            .resolve_key(&decoded.header.kid)
            .await
            .map_err(AuthError::resolution_failed)?
            .ok_or_else(|| AuthError::KeyNotFound(decoded.header.kid.clone()))?;

        // signed bytes are the raw segments, never re-encoded
        let signing_input = &token[..header.len() + 1 + claims.len()];
        verify_signature(signing_input, &decoded.signature, &key)?;

        self.check_claims(&decoded.claims, unix_now())?;

        debug!(kid = %decoded.header.kid, sub = %decoded.claims.sub, "token verified");

        Ok(decoded)
    }

    /// Claim checks performed once the signature is known to be valid.
    fn check_claims(&self, claims: &Claims, now: i64) -> Result<(), AuthError> {
        if claims.iss != self.issuer {
            return Err(AuthError::InvalidIssuer {
                expected: self.issuer.clone(),
                found: claims.iss.clone(),
            });
        }

        if claims.aud != self.client_id {
            return Err(AuthError::AudienceMismatch {
                expected: self.client_id.clone(),
                found: claims.aud.clone(),
            });
        }

        if claims.exp <= now {
            return Err(AuthError::TokenExpired {
                exp: claims.exp,
                now,
            });
        }

        if claims.iat > now {
            return Err(AuthError::TokenNotYetValid {
                iat: claims.iat,
                now,
            });
        }

        if let Some(hd) = &self.hosted_domain {
            if &claims.hd != hd {
                return Err(AuthError::HostedDomainMismatch {
                    expected: hd.clone(),
                    found: claims.hd.clone(),
                });
            }
        }

        Ok(())
    }
}

fn unix_now() -> i64 {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_secs();
    i64::try_from(secs).unwrap_or(i64::MAX)
}
