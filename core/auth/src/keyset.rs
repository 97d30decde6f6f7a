// Copyright AGNTCY Contributors (https://github.com/agntcy)
// SPDX-License-Identifier: Apache-2.0

//! Decoding of the provider's published key set into RSA public keys.

use std::collections::HashMap;
use std::sync::Arc;

use base64::Engine;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::AuthError;
use crate::token::BASE64_URL;

/// RSA public key made of a modulus and a public exponent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    /// Big-endian modulus without leading zero bytes
    modulus: Vec<u8>,
    exponent: u64,
}

impl PublicKey {
    /// Create a key from a big-endian modulus and a public exponent.
    pub fn new(modulus: &[u8], exponent: u64) -> Self {
        let start = modulus
            .iter()
            .position(|b| *b != 0)
            .unwrap_or(modulus.len());

        Self {
            modulus: modulus[start..].to_vec(),
            exponent,
        }
    }

    pub fn modulus(&self) -> &[u8] {
        &self.modulus
    }

    pub fn exponent(&self) -> u64 {
        self.exponent
    }

    /// Exponent as big-endian bytes without leading zeros.
    pub fn exponent_bytes(&self) -> Vec<u8> {
        let bytes = self.exponent.to_be_bytes();
        let start = bytes
            .iter()
            .position(|b| *b != 0)
            .unwrap_or(bytes.len() - 1);
        bytes[start..].to_vec()
    }

    /// Size of the modulus in bits.
    pub fn bits(&self) -> usize {
        match self.modulus.first() {
            Some(first) => self.modulus.len() * 8 - first.leading_zeros() as usize,
            None => 0,
        }
    }
}

/// Entry of the key set document. Fields other than these (kty, alg, use)
/// are ignored.
#[derive(Debug, Deserialize)]
struct RawKey {
    #[serde(default)]
    kid: Option<String>,
    #[serde(default)]
    n: Option<String>,
    #[serde(default)]
    e: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawKeySet {
    #[serde(default)]
    keys: Option<Vec<Value>>,
}

// Derived struct decoding also accepts sequences, so only objects are let
// through to it.
fn from_object<T: DeserializeOwned>(value: Value, what: &str) -> Result<T, AuthError> {
    match value {
        Value::Object(_) => serde_json::from_value(value).map_err(AuthError::MalformedDocument),
        other => Err(AuthError::MalformedDocument(serde::de::Error::custom(
            format!("{} must be an object, found {}", what, other),
        ))),
    }
}

/// Non-empty mapping from key identifier to public key.
#[derive(Debug, Clone)]
pub struct KeySet {
    keys: HashMap<String, Arc<PublicKey>>,
}

impl KeySet {
    /// Decode a key set document.
    ///
    /// Every entry must carry a non-empty `kid`, `n` and `e`. A document
    /// without any entry is rejected so that it never replaces a usable set.
    pub fn from_slice(document: &[u8]) -> Result<Self, AuthError> {
        let document: Value =
            serde_json::from_slice(document).map_err(AuthError::MalformedDocument)?;

        let entries = match document {
            Value::Null => Vec::new(),
            document => from_object::<RawKeySet>(document, "key set")?
                .keys
                .unwrap_or_default(),
        };

        let mut keys = HashMap::with_capacity(entries.len());
        for entry in entries {
            let (kid, key) = decode_entry(from_object(entry, "key entry")?)?;
            keys.insert(kid, Arc::new(key));
        }

        let set = Self { keys };
        if set.is_empty() {
            return Err(AuthError::EmptyKeySet);
        }

        Ok(set)
    }

    /// Look up a key by identifier.
    pub fn get(&self, kid: &str) -> Option<Arc<PublicKey>> {
        self.keys.get(kid).cloned()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn key_ids(&self) -> impl Iterator<Item = &str> {
        self.keys.keys().map(String::as_str)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn decode_entry(entry: RawKey) -> Result<(String, PublicKey), AuthError> {
    let (Some(kid), Some(n), Some(e)) = (
        non_empty(entry.kid.clone()),
        non_empty(entry.n),
        non_empty(entry.e),
    ) else {
        return Err(AuthError::MalformedKeyEntry(format!(
            "missing kid, n or e in entry {:?}",
            entry.kid.unwrap_or_default()
        )));
    };

    let modulus = BASE64_URL.decode(&n).map_err(|err| {
        AuthError::MalformedKeyEntry(format!("unable to decode n of key {}: {}", kid, err))
    })?;
    let exponent = BASE64_URL.decode(&e).map_err(|err| {
        AuthError::MalformedKeyEntry(format!("unable to decode e of key {}: {}", kid, err))
    })?;

    let exponent = exponent_from_be_bytes(&exponent).ok_or_else(|| {
        AuthError::MalformedKeyEntry(format!("exponent of key {} exceeds 64 bits", kid))
    })?;

    let key = PublicKey::new(&modulus, exponent);
    if key.modulus().is_empty() {
        return Err(AuthError::MalformedKeyEntry(format!(
            "modulus of key {} is zero",
            kid
        )));
    }

    Ok((kid, key))
}

fn exponent_from_be_bytes(bytes: &[u8]) -> Option<u64> {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    let significant = &bytes[start..];
    if significant.len() > 8 {
        return None;
    }

    Some(
        significant
            .iter()
            .fold(0u64, |acc, b| (acc << 8) | u64::from(*b)),
    )
}
