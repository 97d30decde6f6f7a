// Copyright AGNTCY Contributors (https://github.com/agntcy)
// SPDX-License-Identifier: Apache-2.0

//! Common traits for key set retrieval.

use std::time::SystemTime;

use async_trait::async_trait;
use bytes::Bytes;

use crate::errors::AuthError;

/// Raw key set document together with the deadline after which it is stale.
#[derive(Debug, Clone)]
pub struct KeySetResponse {
    /// The key set document as returned by the provider
    pub body: Bytes,

    /// Wall-clock time at which the document must be fetched again
    pub expires_at: SystemTime,
}

impl KeySetResponse {
    pub fn new(body: impl Into<Bytes>, expires_at: SystemTime) -> Self {
        Self {
            body: body.into(),
            expires_at,
        }
    }
}

/// Source of the provider's published key set.
///
/// Implementations may be called from several tasks at once; each call is
/// independent of the others.
#[async_trait]
pub trait KeyFetcher: Send + Sync {
    /// Fetch the current key set document and its freshness deadline.
    async fn fetch(&self) -> Result<KeySetResponse, AuthError>;
}
