// Copyright AGNTCY Contributors (https://github.com/agntcy)
// SPDX-License-Identifier: Apache-2.0

//! Builder pattern implementation for the token verifier.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{DEFAULT_FETCH_TIMEOUT, KeyCache};
use crate::errors::AuthError;
use crate::fetcher::{GOOGLE_CERTS_URL, HttpKeyFetcher};
use crate::traits::KeyFetcher;
use crate::verifier::{GOOGLE_ISSUER, Verifier};

/// State markers for the verifier builder.
///
/// `Initial` -> `Ready` -> `Verifier`. The client identifier is the only
/// required setting, so `build` is only available once it has been given.
pub mod state {
    /// No client identifier set yet.
    pub struct Initial;

    /// Client identifier set, the verifier can be built.
    pub struct Ready;
}

/// Builder for [`Verifier`].
pub struct VerifierBuilder<S = state::Initial> {
    client_id: Option<String>,
    issuer: String,
    hosted_domain: Option<String>,

    // Key retrieval
    jwks_url: String,
    fetch_timeout: Duration,
    fetcher: Option<Arc<dyn KeyFetcher>>,

    _state: PhantomData<S>,
}

impl Default for VerifierBuilder<state::Initial> {
    fn default() -> Self {
        Self {
            client_id: None,
            issuer: GOOGLE_ISSUER.to_string(),
            hosted_domain: None,
            jwks_url: GOOGLE_CERTS_URL.to_string(),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            fetcher: None,
            _state: PhantomData,
        }
    }
}

// Base implementation for any state
impl<S> VerifierBuilder<S> {
    /// Expected `iss` claim. Defaults to Google's issuer.
    pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    /// Require the `hd` claim to match this hosted domain.
    pub fn hosted_domain(mut self, hosted_domain: impl Into<String>) -> Self {
        self.hosted_domain = Some(hosted_domain.into());
        self
    }

    /// Key set endpoint used when no fetcher is supplied.
    pub fn jwks_url(mut self, jwks_url: impl Into<String>) -> Self {
        self.jwks_url = jwks_url.into();
        self
    }

    /// Upper bound on a single key set fetch.
    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Use a custom key source instead of the HTTP fetcher.
    pub fn fetcher(mut self, fetcher: Arc<dyn KeyFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }
}

impl VerifierBuilder<state::Initial> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the client identifier tokens must be issued for.
    pub fn client_id(self, client_id: impl Into<String>) -> VerifierBuilder<state::Ready> {
        VerifierBuilder {
            client_id: Some(client_id.into()),
            issuer: self.issuer,
            hosted_domain: self.hosted_domain,
            jwks_url: self.jwks_url,
            fetch_timeout: self.fetch_timeout,
            fetcher: self.fetcher,
            _state: PhantomData,
        }
    }
}

impl VerifierBuilder<state::Ready> {
    /// Build the verifier, fetching the key set once.
    pub async fn build(self) -> Result<Verifier, AuthError> {
        let client_id = self
            .client_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AuthError::ConfigError("client id is required".to_string()))?;

        if self.issuer.is_empty() {
            return Err(AuthError::ConfigError("issuer is required".to_string()));
        }

        let fetcher = match self.fetcher {
            Some(fetcher) => fetcher,
            None => Arc::new(HttpKeyFetcher::new(&self.jwks_url, self.fetch_timeout)?),
        };

        let keys = KeyCache::new(fetcher, self.fetch_timeout).await?;

        Ok(Verifier::from_parts(
            keys,
            client_id,
            self.issuer,
            self.hosted_domain,
        ))
    }
}
