// Copyright AGNTCY Contributors (https://github.com/agntcy)
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::errors::AuthError;
use crate::keyset::{KeySet, PublicKey};
use crate::traits::KeyFetcher;

/// Default bound on a single key set fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Key set together with its freshness deadline. Replaced as a whole.
#[derive(Debug)]
struct KeyMaterial {
    key_set: KeySet,
    expires_at: SystemTime,
}

/// Cache of the provider's public keys, refreshed on lookup once stale.
///
/// Lookups that find fresh data only take the shared lock. A lookup that
/// finds stale data fetches and decodes the new set without holding any
/// lock, then swaps it in under the exclusive lock. Concurrent stale
/// lookups may each perform their own refresh.
pub struct KeyCache {
    fetcher: Arc<dyn KeyFetcher>,
    fetch_timeout: Duration,
    material: RwLock<Option<Arc<KeyMaterial>>>,
}

impl std::fmt::Debug for KeyCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let material = self.material.read();
        f.debug_struct("KeyCache")
            .field("fetch_timeout", &self.fetch_timeout)
            .field("keys", &material.as_ref().map(|m| m.key_set.len()))
            .field("expires_at", &material.as_ref().map(|m| m.expires_at))
            .finish()
    }
}

impl KeyCache {
    /// Create the cache and load the key set once.
    ///
    /// Fails if the initial fetch or decode fails, so a misconfigured key
    /// source is reported at construction.
    pub async fn new(
        fetcher: Arc<dyn KeyFetcher>,
        fetch_timeout: Duration,
    ) -> Result<Self, AuthError> {
        let cache = Self {
            fetcher,
            fetch_timeout,
            material: RwLock::new(None),
        };

        cache.resolve_key("").await?;

        Ok(cache)
    }

    /// Return the key with the given identifier.
    ///
    /// An unknown identifier is `Ok(None)`. A failed refresh leaves the
    /// cached keys untouched and is returned as `KeyRefreshFailed`.
    pub async fn resolve_key(&self, kid: &str) -> Result<Option<Arc<PublicKey>>, AuthError> {
        // the guard is dropped at the end of this statement
        let current = self.material.read().clone();

        let material = match current {
            Some(material) if SystemTime::now() < material.expires_at => material,
            _ => self.refresh().await.map_err(AuthError::refresh_failed)?,
        };

        Ok(material.key_set.get(kid))
    }

    /// Deadline of the currently cached key set, if any.
    pub fn expires_at(&self) -> Option<SystemTime> {
        self.material.read().as_ref().map(|m| m.expires_at)
    }

    async fn refresh(&self) -> Result<Arc<KeyMaterial>, AuthError> {
        debug!("key set missing or stale, fetching");

        let response = tokio::time::timeout(self.fetch_timeout, self.fetcher.fetch())
            .await
            .map_err(|_| AuthError::FetchTimeout(self.fetch_timeout))??;

        let key_set = KeySet::from_slice(&response.body)?;
        let material = Arc::new(KeyMaterial {
            key_set,
            expires_at: response.expires_at,
        });

        *self.material.write() = Some(material.clone());

        info!(
            keys = material.key_set.len(),
            expires_at = ?material.expires_at,
            "key set refreshed"
        );

        Ok(material)
    }
}
