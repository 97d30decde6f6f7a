// Copyright AGNTCY Contributors (https://github.com/agntcy)
// SPDX-License-Identifier: Apache-2.0

//! Decoding of compact `header.claims.signature` identity tokens.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::errors::AuthError;

/// Unpadded base64url, accepting non-canonical trailing bits.
pub(crate) const BASE64_URL: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::RequireNone)
        .with_decode_allow_trailing_bits(true),
);

/// Token header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Header {
    /// Signature algorithm
    pub alg: String,

    /// Identifier of the signing key
    pub kid: String,

    /// Token type
    pub typ: String,
}

/// Claims carried by an identity token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Claims {
    /// Issuer
    pub iss: String,

    /// Authorized party
    pub azp: String,

    /// Audience (client identifier)
    pub aud: String,

    /// Subject
    pub sub: String,

    pub email: String,
    pub email_verified: bool,

    /// Access token hash
    pub at_hash: String,

    pub name: String,
    pub picture: String,
    pub given_name: String,
    pub family_name: String,
    pub locale: String,
    pub nonce: String,
    pub profile: String,

    /// Hosted domain
    pub hd: String,

    /// Issued at, seconds since the UNIX epoch
    pub iat: i64,

    /// Expiration, seconds since the UNIX epoch
    pub exp: i64,
}

/// A structurally valid token whose signature has not been checked yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedToken {
    pub header: Header,
    pub claims: Claims,

    /// Signature segment, still base64url encoded
    pub signature: String,
}

impl DecodedToken {
    /// Split a compact token and decode its header and claims segments.
    pub fn decode(compact: &str) -> Result<Self, AuthError> {
        let (header, claims, signature) = split(compact)?;

        if signature.is_empty() {
            return Err(AuthError::MalformedToken(
                "signature segment is empty".to_string(),
            ));
        }

        Ok(Self {
            header: decode_segment(header, "header")?,
            claims: decode_segment(claims, "claims")?,
            signature: signature.to_string(),
        })
    }
}

/// Split a compact token into its three segments.
pub(crate) fn split(compact: &str) -> Result<(&str, &str, &str), AuthError> {
    let mut parts = compact.split('.');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(header), Some(claims), Some(signature), None) => Ok((header, claims, signature)),
        _ => Err(AuthError::MalformedToken(format!(
            "expected 3 segments, found {}",
            compact.split('.').count()
        ))),
    }
}

fn decode_segment<T: DeserializeOwned>(segment: &str, name: &str) -> Result<T, AuthError> {
    let bytes = BASE64_URL.decode(segment).map_err(|e| {
        AuthError::MalformedToken(format!("unable to base64 decode {} segment: {}", name, e))
    })?;

    serde_json::from_slice(&bytes).map_err(|e| {
        AuthError::MalformedToken(format!("unable to json decode {} segment: {}", name, e))
    })
}
