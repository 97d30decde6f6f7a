// Copyright AGNTCY Contributors (https://github.com/agntcy)
// SPDX-License-Identifier: Apache-2.0

use aws_lc_rs::signature::{RSA_PKCS1_2048_8192_SHA256, RsaPublicKeyComponents};
use base64::Engine;

use crate::errors::AuthError;
use crate::keyset::PublicKey;
use crate::token::BASE64_URL;

/// Check an RS256 (RSASSA-PKCS1-v1_5 with SHA-256) signature.
///
/// `signing_input` must be the raw `header.claims` segments exactly as they
/// appeared in the token.
pub fn verify_signature(
    signing_input: &str,
    encoded_signature: &str,
    key: &PublicKey,
) -> Result<(), AuthError> {
    let signature = BASE64_URL
        .decode(encoded_signature)
        .map_err(AuthError::MalformedSignature)?;

    let exponent = key.exponent_bytes();
    let components = RsaPublicKeyComponents {
        n: key.modulus(),
        e: exponent.as_slice(),
    };

    components
        .verify(
            &RSA_PKCS1_2048_8192_SHA256,
            signing_input.as_bytes(),
            &signature,
        )
        .map_err(|_| AuthError::SignatureInvalid)
}
