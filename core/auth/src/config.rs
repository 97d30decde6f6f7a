// Copyright AGNTCY Contributors (https://github.com/agntcy)
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use duration_str::deserialize_duration;
use serde::Deserialize;

use crate::builder::{VerifierBuilder, state};
use crate::cache::DEFAULT_FETCH_TIMEOUT;
use crate::errors::AuthError;
use crate::fetcher::GOOGLE_CERTS_URL;
use crate::verifier::{GOOGLE_ISSUER, Verifier};

/// Verifier settings as read from a configuration file.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct VerifierConfig {
    /// Client identifier tokens must be issued for (the `aud` claim)
    pub client_id: String,

    /// Expected token issuer
    #[serde(default = "default_issuer")]
    pub issuer: String,

    /// Hosted domain the `hd` claim must match, if any
    #[serde(default)]
    pub hosted_domain: Option<String>,

    /// Key set endpoint
    #[serde(default = "default_jwks_url")]
    pub jwks_url: String,

    /// Bound on a single key set fetch
    #[serde(
        default = "default_fetch_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub fetch_timeout: Duration,
}

fn default_issuer() -> String {
    GOOGLE_ISSUER.to_string()
}

fn default_jwks_url() -> String {
    GOOGLE_CERTS_URL.to_string()
}

fn default_fetch_timeout() -> Duration {
    DEFAULT_FETCH_TIMEOUT
}

impl VerifierConfig {
    pub fn new(client_id: impl Into<String>) -> Self {
        VerifierConfig {
            client_id: client_id.into(),
            issuer: default_issuer(),
            hosted_domain: None,
            jwks_url: default_jwks_url(),
            fetch_timeout: default_fetch_timeout(),
        }
    }

    pub fn with_client_id(self, client_id: impl Into<String>) -> Self {
        VerifierConfig {
            client_id: client_id.into(),
            ..self
        }
    }

    pub fn with_issuer(self, issuer: impl Into<String>) -> Self {
        VerifierConfig {
            issuer: issuer.into(),
            ..self
        }
    }

    pub fn with_hosted_domain(self, hosted_domain: impl Into<String>) -> Self {
        VerifierConfig {
            hosted_domain: Some(hosted_domain.into()),
            ..self
        }
    }

    pub fn with_jwks_url(self, jwks_url: impl Into<String>) -> Self {
        VerifierConfig {
            jwks_url: jwks_url.into(),
            ..self
        }
    }

    pub fn with_fetch_timeout(self, fetch_timeout: Duration) -> Self {
        VerifierConfig {
            fetch_timeout,
            ..self
        }
    }

    /// Builder preloaded with these settings.
    pub fn builder(&self) -> VerifierBuilder<state::Ready> {
        let builder = VerifierBuilder::new()
            .client_id(self.client_id.clone())
            .issuer(self.issuer.clone())
            .jwks_url(self.jwks_url.clone())
            .fetch_timeout(self.fetch_timeout);

        match &self.hosted_domain {
            Some(hd) => builder.hosted_domain(hd.clone()),
            None => builder,
        }
    }

    /// Build a verifier fetching keys from `jwks_url`.
    pub async fn into_verifier(self) -> Result<Verifier, AuthError> {
        self.builder().build().await
    }
}
