// Copyright AGNTCY Contributors (https://github.com/agntcy)
// SPDX-License-Identifier: Apache-2.0

//! Default key fetcher retrieving the provider's key set over HTTPS.

use std::sync::Once;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use reqwest::header::CACHE_CONTROL;
use tracing::debug;
use url::Url;

use crate::errors::AuthError;
use crate::traits::{KeyFetcher, KeySetResponse};

/// Google's published signing keys for ID tokens.
pub const GOOGLE_CERTS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";

static RUSTLS: Once = Once::new();

pub fn initialize_crypto_provider() {
    RUSTLS.call_once(|| {
        // Set aws-lc as default crypto provider, unless the process already did
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
    });
}

/// Fetches the key set with a GET request and derives its freshness
/// deadline from the `max-age` directive of the `Cache-Control` header.
#[derive(Debug, Clone)]
pub struct HttpKeyFetcher {
    url: Url,
    client: ReqwestClient,
}

impl HttpKeyFetcher {
    /// Create a fetcher for the given key set URL.
    pub fn new(url: &str, timeout: Duration) -> Result<Self, AuthError> {
        let url = Url::parse(url)
            .map_err(|e| AuthError::ConfigError(format!("invalid key set URL {}: {}", url, e)))?;

        initialize_crypto_provider();

        let client = ReqwestClient::builder()
            .user_agent("idtoken-auth")
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::ConfigError(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { url, client })
    }
}

#[async_trait]
impl KeyFetcher for HttpKeyFetcher {
    async fn fetch(&self) -> Result<KeySetResponse, AuthError> {
        debug!(url = %self.url, "fetching key set");

        let response = self.client.get(self.url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::KeyFetch(format!(
                "GET {} returned HTTP status {}",
                self.url, status
            )));
        }

        let cache_control = response
            .headers()
            .get(CACHE_CONTROL)
            .map(|v| v.to_str().unwrap_or_default().to_string())
            .unwrap_or_default();
        let max_age = extract_max_age(&cache_control)?;

        let expires_at = SystemTime::now()
            .checked_add(Duration::from_secs(max_age))
            .ok_or_else(|| AuthError::KeyFetch(format!("max-age {} out of range", max_age)))?;

        let body = response.bytes().await?;

        Ok(KeySetResponse::new(body, expires_at))
    }
}

/// Extract the `max-age` directive, in seconds, from a `Cache-Control` value.
pub fn extract_max_age(cache_control: &str) -> Result<u64, AuthError> {
    for directive in cache_control.split(',') {
        let Some((name, value)) = directive.trim().split_once('=') else {
            continue;
        };

        if name.trim().eq_ignore_ascii_case("max-age") {
            let value = value.trim().trim_matches('"');
            return value.parse().map_err(|e| {
                AuthError::KeyFetch(format!("invalid max-age value {:?}: {}", value, e))
            });
        }
    }

    Err(AuthError::MissingMaxAge(cache_control.to_string()))
}
