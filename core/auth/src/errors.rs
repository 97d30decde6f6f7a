// Copyright AGNTCY Contributors (https://github.com/agntcy)
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    // Configuration / generic
    #[error("config error: {0}")]
    ConfigError(String),

    // Key set document
    #[error("malformed key set document: {0}")]
    MalformedDocument(#[source] serde_json::Error),
    #[error("malformed key entry: {0}")]
    MalformedKeyEntry(String),
    #[error("key set contains no keys")]
    EmptyKeySet,

    // Key set retrieval
    #[error("failed to fetch key set: {0}")]
    KeyFetch(String),
    #[error("HTTP request error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("max-age not found in cache-control header {0:?}")]
    MissingMaxAge(String),
    #[error("key set fetch timed out after {0:?}")]
    FetchTimeout(Duration),

    // Key cache
    #[error("key set refresh failed: {source}")]
    KeyRefreshFailed { source: Box<AuthError> },

    // Token structure
    #[error("malformed token: {0}")]
    MalformedToken(String),
    #[error("unsupported algorithm {0:?}, expected RS256")]
    UnsupportedAlgorithm(String),

    // Key resolution
    #[error("no key with id {0:?} in key set")]
    KeyNotFound(String),
    #[error("failed to resolve signing key: {source}")]
    KeyResolutionFailed { source: Box<AuthError> },

    // Signature
    #[error("malformed signature: {0}")]
    MalformedSignature(#[source] base64::DecodeError),
    #[error("signature verification failed")]
    SignatureInvalid,

    // Claims
    #[error("invalid issuer {found:?}, expected {expected:?}")]
    InvalidIssuer { expected: String, found: String },
    #[error("audience {found:?} does not match client id {expected:?}")]
    AudienceMismatch { expected: String, found: String },
    #[error("token expired at {exp} (now {now})")]
    TokenExpired { exp: i64, now: i64 },
    #[error("token issued in the future at {iat} (now {now})")]
    TokenNotYetValid { iat: i64, now: i64 },
    #[error("hosted domain {found:?} does not match {expected:?}")]
    HostedDomainMismatch { expected: String, found: String },
}

impl AuthError {
    /// Wrap a fetch or decode failure raised while refreshing the key set.
    pub(crate) fn refresh_failed(source: AuthError) -> Self {
        AuthError::KeyRefreshFailed {
            source: Box::new(source),
        }
    }

    /// Wrap a key cache failure surfaced while verifying a token.
    pub(crate) fn resolution_failed(source: AuthError) -> Self {
        AuthError::KeyResolutionFailed {
            source: Box::new(source),
        }
    }
}
