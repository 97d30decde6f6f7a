// Copyright AGNTCY Contributors (https://github.com/agntcy)
// SPDX-License-Identifier: Apache-2.0

//! End-to-end tests of token verification with freshly generated RSA keys.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use openssl::hash::MessageDigest;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::sign::Signer;
use parking_lot::Mutex;
use serde_json::json;

use idtoken_auth::errors::AuthError;
use idtoken_auth::traits::{KeyFetcher, KeySetResponse};
use idtoken_auth::verifier::{GOOGLE_ISSUER, Verifier};

const CLIENT_ID: &str = "client-123";

/// Signing key of a fake identity provider.
struct TestKey {
    kid: String,
    private: PKey<Private>,
    n: String,
    e: String,
}

impl TestKey {
    fn generate(kid: &str) -> Self {
        let rsa = Rsa::generate(2048).expect("failed to generate RSA key");
        let n = URL_SAFE_NO_PAD.encode(rsa.n().to_vec());
        let e = URL_SAFE_NO_PAD.encode(rsa.e().to_vec());
        Self {
            kid: kid.to_string(),
            private: PKey::from_rsa(rsa).expect("failed to wrap RSA key"),
            n,
            e,
        }
    }

    fn jwk(&self) -> serde_json::Value {
        json!({"kty": "RSA", "alg": "RS256", "use": "sig", "kid": self.kid, "n": self.n, "e": self.e})
    }

    fn sign(&self, signing_input: &str) -> String {
        let mut signer = Signer::new(MessageDigest::sha256(), &self.private).unwrap();
        URL_SAFE_NO_PAD.encode(signer.sign_oneshot_to_vec(signing_input.as_bytes()).unwrap())
    }

    fn mint_with_header(&self, header: &serde_json::Value, claims: &serde_json::Value) -> String {
        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header.to_string()),
            URL_SAFE_NO_PAD.encode(claims.to_string())
        );
        let signature = self.sign(&signing_input);
        format!("{}.{}", signing_input, signature)
    }

    fn mint(&self, claims: &serde_json::Value) -> String {
        self.mint_with_header(
            &json!({"alg": "RS256", "kid": self.kid, "typ": "JWT"}),
            claims,
        )
    }
}

fn key_set(keys: &[&TestKey]) -> String {
    let keys: Vec<serde_json::Value> = keys.iter().map(|k| k.jwk()).collect();
    json!({ "keys": keys }).to_string()
}

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

fn claims(iat: i64, exp: i64) -> serde_json::Value {
    json!({
        "iss": GOOGLE_ISSUER,
        "azp": CLIENT_ID,
        "aud": CLIENT_ID,
        "sub": "110169484474386276334",
        "email": "user@example.com",
        "email_verified": true,
        "name": "Test User",
        "picture": "https://example.com/photo.jpg",
        "locale": "en",
        "nonce": "n-0S6_WzA2Mj",
        "iat": iat,
        "exp": exp
    })
}

/// Serves key set documents in order, repeating the last one.
struct RotatingFetcher {
    documents: Mutex<Vec<(String, Duration)>>,
    failing: Mutex<bool>,
    calls: AtomicUsize,
}

impl RotatingFetcher {
    fn new(documents: Vec<(String, Duration)>) -> Arc<Self> {
        Arc::new(Self {
            documents: Mutex::new(documents),
            failing: Mutex::new(false),
            calls: AtomicUsize::new(0),
        })
    }

    fn fail(&self, failing: bool) {
        *self.failing.lock() = failing;
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyFetcher for RotatingFetcher {
    async fn fetch(&self) -> Result<KeySetResponse, AuthError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if *self.failing.lock() {
            return Err(AuthError::KeyFetch("connection refused".to_string()));
        }

        let documents = self.documents.lock();
        let (body, ttl) = documents[call.min(documents.len() - 1)].clone();
        Ok(KeySetResponse::new(body, SystemTime::now() + ttl))
    }
}

async fn verifier_for(keys: &[&TestKey]) -> Verifier {
    let fetcher = RotatingFetcher::new(vec![(key_set(keys), Duration::from_secs(3600))]);
    Verifier::new(fetcher, CLIENT_ID).await.unwrap()
}

#[tokio::test]
async fn test_end_to_end_valid_token() {
    let key = TestKey::generate("k1");
    let verifier = verifier_for(&[&key]).await;

    let now = now();
    let token = key.mint(&claims(now - 10, now + 3600));

    let verified = verifier.verify(&token).await.unwrap();
    assert_eq!(verified.claims.aud, "client-123");
    assert_eq!(verified.claims.iss, GOOGLE_ISSUER);
    assert_eq!(verified.claims.sub, "110169484474386276334");
    assert_eq!(verified.claims.email, "user@example.com");
    assert!(verified.claims.email_verified);
    assert_eq!(verified.claims.nonce, "n-0S6_WzA2Mj");
    assert_eq!(verified.claims.iat, now - 10);
    assert_eq!(verified.claims.exp, now + 3600);
    assert_eq!(verified.header.kid, "k1");
    assert_eq!(verified.signature, token.rsplit('.').next().unwrap());

    // same token, same answer
    assert_eq!(verifier.verify(&token).await.unwrap(), verified);
}

#[tokio::test]
async fn test_flipped_signature_byte_is_rejected() {
    let key = TestKey::generate("k1");
    let verifier = verifier_for(&[&key]).await;

    let now = now();
    let token = key.mint(&claims(now - 10, now + 3600));
    let (signing_input, signature) = token.rsplit_once('.').unwrap();
    let signature = URL_SAFE_NO_PAD.decode(signature).unwrap();

    for position in [0, 1, signature.len() / 2, signature.len() - 1] {
        let mut flipped = signature.clone();
        flipped[position] ^= 0x01;
        let tampered = format!("{}.{}", signing_input, URL_SAFE_NO_PAD.encode(&flipped));

        let err = verifier.verify(&tampered).await.unwrap_err();
        assert!(
            matches!(err, AuthError::SignatureInvalid),
            "byte {} gave {:?}",
            position,
            err
        );
    }

    let garbled = format!("{}.{}", signing_input, "***");
    assert!(matches!(
        verifier.verify(&garbled).await,
        Err(AuthError::MalformedSignature(_))
    ));
}

#[tokio::test]
async fn test_time_window() {
    let key = TestKey::generate("k1");
    let verifier = verifier_for(&[&key]).await;
    let now = now();

    let expired = key.mint(&claims(now - 7200, now - 3600));
    assert!(matches!(
        verifier.verify(&expired).await,
        Err(AuthError::TokenExpired { .. })
    ));

    let future = key.mint(&claims(now + 600, now + 3600));
    assert!(matches!(
        verifier.verify(&future).await,
        Err(AuthError::TokenNotYetValid { .. })
    ));
}

#[tokio::test]
async fn test_unknown_kid() {
    let key = TestKey::generate("k1");
    let stranger = TestKey::generate("k2");
    let verifier = verifier_for(&[&key]).await;

    let now = now();
    let token = stranger.mint(&claims(now - 10, now + 3600));
    assert!(matches!(
        verifier.verify(&token).await,
        Err(AuthError::KeyNotFound(kid)) if kid == "k2"
    ));
}

#[tokio::test]
async fn test_wrong_key_same_kid() {
    let key = TestKey::generate("k1");
    let impostor = TestKey::generate("k1");
    let verifier = verifier_for(&[&key]).await;

    let now = now();
    let token = impostor.mint(&claims(now - 10, now + 3600));
    assert!(matches!(
        verifier.verify(&token).await,
        Err(AuthError::SignatureInvalid)
    ));
}

#[tokio::test]
async fn test_segment_count() {
    let key = TestKey::generate("k1");
    let verifier = verifier_for(&[&key]).await;

    let now = now();
    let token = key.mint(&claims(now - 10, now + 3600));
    let (signing_input, _) = token.rsplit_once('.').unwrap();

    for malformed in [
        "".to_string(),
        "no-dots".to_string(),
        signing_input.to_string(),
        format!("{}.extra", token),
        format!("{}..", signing_input),
    ] {
        assert!(
            matches!(
                verifier.verify(&malformed).await,
                Err(AuthError::MalformedToken(_))
            ),
            "{:?} accepted",
            malformed
        );
    }
}

#[tokio::test]
async fn test_rejection_order() {
    let key = TestKey::generate("k1");
    let other = TestKey::generate("k1");
    let verifier = verifier_for(&[&key]).await;
    let now = now();

    // unsupported algorithm wins over an unknown key
    let token = key.mint_with_header(
        &json!({"alg": "RS512", "kid": "nope"}),
        &claims(now - 10, now + 3600),
    );
    assert!(matches!(
        verifier.verify(&token).await,
        Err(AuthError::UnsupportedAlgorithm(_))
    ));

    // bad signature wins over bad claims
    let mut bad_claims = claims(now + 600, now - 3600);
    bad_claims["iss"] = json!("https://evil.example");
    let token = other.mint(&bad_claims);
    assert!(matches!(
        verifier.verify(&token).await,
        Err(AuthError::SignatureInvalid)
    ));

    // issuer, then audience, then expiry, then issued-at
    let token = key.mint(&bad_claims);
    assert!(matches!(
        verifier.verify(&token).await,
        Err(AuthError::InvalidIssuer { .. })
    ));

    bad_claims["iss"] = json!(GOOGLE_ISSUER);
    bad_claims["aud"] = json!("someone-else");
    let token = key.mint(&bad_claims);
    assert!(matches!(
        verifier.verify(&token).await,
        Err(AuthError::AudienceMismatch { .. })
    ));

    bad_claims["aud"] = json!(CLIENT_ID);
    let token = key.mint(&bad_claims);
    assert!(matches!(
        verifier.verify(&token).await,
        Err(AuthError::TokenExpired { .. })
    ));
}

#[tokio::test]
async fn test_key_rotation_after_deadline() {
    let old = TestKey::generate("old");
    let new = TestKey::generate("new");

    // the first set expires immediately; the refresh brings in the new key
    let fetcher = RotatingFetcher::new(vec![
        (key_set(&[&old]), Duration::ZERO),
        (key_set(&[&old, &new]), Duration::from_secs(3600)),
    ]);
    let verifier = Verifier::new(fetcher.clone(), CLIENT_ID).await.unwrap();
    assert_eq!(fetcher.calls(), 1);

    let now = now();
    let token = new.mint(&claims(now - 10, now + 3600));
    verifier.verify(&token).await.unwrap();
    assert_eq!(fetcher.calls(), 2);

    // now fresh, no further fetch
    let token = old.mint(&claims(now - 10, now + 3600));
    verifier.verify(&token).await.unwrap();
    assert_eq!(fetcher.calls(), 2);
}

#[tokio::test]
async fn test_refresh_failure_surfaces_as_resolution_failure() {
    let key = TestKey::generate("k1");
    let fetcher = RotatingFetcher::new(vec![(key_set(&[&key]), Duration::ZERO)]);
    let verifier = Verifier::new(fetcher.clone(), CLIENT_ID).await.unwrap();

    let now = now();
    let token = key.mint(&claims(now - 10, now + 3600));

    fetcher.fail(true);
    let err = verifier.verify(&token).await.unwrap_err();
    assert!(matches!(
        &err,
        AuthError::KeyResolutionFailed { source } if matches!(**source, AuthError::KeyRefreshFailed { .. })
    ));

    // the source recovers, so does verification
    fetcher.fail(false);
    verifier.verify(&token).await.unwrap();
}

#[tokio::test]
async fn test_construction_fails_fast() {
    let fetcher = RotatingFetcher::new(vec![("{}".to_string(), Duration::from_secs(60))]);
    assert!(matches!(
        Verifier::new(fetcher, CLIENT_ID).await,
        Err(AuthError::KeyRefreshFailed { .. })
    ));

    let fetcher = RotatingFetcher::new(vec![("{}".to_string(), Duration::from_secs(60))]);
    fetcher.fail(true);
    assert!(matches!(
        Verifier::new(fetcher, CLIENT_ID).await,
        Err(AuthError::KeyRefreshFailed { .. })
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_verification() {
    let k1 = TestKey::generate("k1");
    let k2 = TestKey::generate("k2");

    // every lookup sees a stale set, so refreshes race with each other
    let fetcher = RotatingFetcher::new(vec![(key_set(&[&k1, &k2]), Duration::ZERO)]);
    let verifier = Arc::new(Verifier::new(fetcher.clone(), CLIENT_ID).await.unwrap());

    let now = now();
    let valid = [
        k1.mint(&claims(now - 10, now + 3600)),
        k2.mint(&claims(now - 10, now + 3600)),
    ];
    let expired = k1.mint(&claims(now - 7200, now - 3600));

    let tasks = (0..200).map(|i| {
        let verifier = verifier.clone();
        let token = if i % 3 == 2 {
            expired.clone()
        } else {
            valid[i % 2].clone()
        };
        tokio::spawn(async move { (i, verifier.verify(&token).await) })
    });

    for result in futures::future::join_all(tasks).await {
        let (i, outcome) = result.unwrap();
        if i % 3 == 2 {
            assert!(matches!(outcome, Err(AuthError::TokenExpired { .. })));
        } else {
            let token = outcome.unwrap();
            assert_eq!(token.header.kid, if i % 2 == 0 { "k1" } else { "k2" });
        }
    }

    assert!(fetcher.calls() > 1);
}

#[tokio::test]
async fn test_token_minted_by_jsonwebtoken() {
    use jsonwebtoken_aws_lc::{Algorithm, EncodingKey, Header, encode};

    let key = TestKey::generate("k1");
    let verifier = verifier_for(&[&key]).await;

    let pem = key.private.rsa().unwrap().private_key_to_pem().unwrap();
    let encoding_key = EncodingKey::from_rsa_pem(&pem).unwrap();
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some("k1".to_string());

    let now = now();
    let token = encode(&header, &claims(now - 10, now + 3600), &encoding_key).unwrap();

    let verified = verifier.verify(&token).await.unwrap();
    assert_eq!(verified.header.typ, "JWT");
    assert_eq!(verified.claims.aud, CLIENT_ID);
}
