//! Shared fixtures for unit tests: signing keys, token builders and a fake provider

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{Value, json};
use url::Url;

use super::config::{AuthenticationOptions, ProviderCacheConfig};
use super::error::{AuthError, Result};
use super::jwks::{JwkSet, SigningKeySet};
use super::provider::{ConfigurationRetriever, ProviderConfiguration, ProviderConfigurationCache};

pub const ISSUER: &str = "https://idp.example.com";
/// Issuer as the provider writes it into tokens
pub const TOKEN_ISSUER: &str = "https://idp.example.com/";
pub const AUDIENCE: &str = "api://resource";

pub const CURRENT_KID: &str = "ed25519-2026-01";
pub const ROTATED_KID: &str = "ed25519-2026-07";
pub const RSA_KID: &str = "rsa-2026-01";

const CURRENT_PEM: &str = include_str!("../../tests/fixtures/ed25519-current.pem");
const CURRENT_X: &str = "JmC1z9a-w41xwv51ek_W-2qdyzPIoCk6E67KF1_pUmA";
const ROTATED_PEM: &str = include_str!("../../tests/fixtures/ed25519-rotated.pem");
const ROTATED_X: &str = "F4x46O4oVlF-N-xu8fScyGwPP2bftyVbZxsijf5lMxA";
const RSA_PEM: &str = include_str!("../../tests/fixtures/rsa-current.pem");
const RSA_N: &str = "pPXpDkG6VsqMP276ylg4dCsuIGQpW0Jl14YIQdQ4xpbsNwGdJWp2AMhydRwCBr6NxvCwsYTWaQry0n4PElucFiuEmySqStKN1E-LgJDGvw7FowJ5A8kcuusv31OaD1xCZsJ70KoXQ_O0QKtk0FpSXjT8eJ8eYK_rMCzjYFGsvf6yNeGpQGzAIRp_cOIvWGhRejls38Vr-dv0j9xgr6QRpOkYl9JqwGIH5GSZz91mQ_xfzndt-hMvoS2d6DIwiH-TR4IKvExD0Q50FJmYM7Cie5zSUUsh6uoNOIyAXa8JpK5XXL3JEH4-Uz5hNZf2mSv-vIlFRED7n8moCM-18fCzjw";

pub fn current_jwk() -> Value {
    json!({ "kid": CURRENT_KID, "kty": "OKP", "crv": "Ed25519", "alg": "EdDSA", "use": "sig", "x": CURRENT_X })
}

pub fn rotated_jwk() -> Value {
    json!({ "kid": ROTATED_KID, "kty": "OKP", "crv": "Ed25519", "alg": "EdDSA", "use": "sig", "x": ROTATED_X })
}

pub fn rsa_jwk() -> Value {
    json!({ "kid": RSA_KID, "kty": "RSA", "alg": "RS256", "use": "sig", "n": RSA_N, "e": "AQAB" })
}

#[derive(Debug, Clone, Copy)]
pub enum TestKey {
    Current,
    Rotated,
    Rsa,
}

impl TestKey {
    const fn kid(self) -> &'static str {
        match self {
            Self::Current => CURRENT_KID,
            Self::Rotated => ROTATED_KID,
            Self::Rsa => RSA_KID,
        }
    }

    fn encoding_key(self) -> EncodingKey {
        match self {
            Self::Current => EncodingKey::from_ed_pem(CURRENT_PEM.as_bytes()).unwrap(),
            Self::Rotated => EncodingKey::from_ed_pem(ROTATED_PEM.as_bytes()).unwrap(),
            Self::Rsa => EncodingKey::from_rsa_pem(RSA_PEM.as_bytes()).unwrap(),
        }
    }

    const fn algorithm(self) -> Algorithm {
        match self {
            Self::Current | Self::Rotated => Algorithm::EdDSA,
            Self::Rsa => Algorithm::RS256,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TestClaims {
    pub sub: String,
    pub iss: String,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
}

impl TestClaims {
    pub fn valid(sub: &str) -> Self {
        let now = now();
        Self {
            sub: sub.to_string(),
            iss: TOKEN_ISSUER.to_string(),
            aud: AUDIENCE.to_string(),
            exp: now + 3600,
            iat: now,
            nbf: None,
        }
    }
}

pub fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

/// Sign with the key's own kid
pub fn sign(key: TestKey, claims: &TestClaims) -> String {
    sign_with_kid(key, Some(key.kid()), claims)
}

pub fn sign_with_kid(key: TestKey, kid: Option<&str>, claims: &TestClaims) -> String {
    let mut header = Header::new(key.algorithm());
    header.kid = kid.map(ToString::to_string);
    encode(&header, claims, &key.encoding_key()).unwrap()
}

pub fn options() -> AuthenticationOptions {
    AuthenticationOptions::new(ISSUER, AUDIENCE).unwrap()
}

pub fn configuration(jwks: Vec<Value>) -> ProviderConfiguration {
    let jwks: JwkSet = serde_json::from_value(json!({ "keys": jwks })).unwrap();
    ProviderConfiguration::new(
        Url::parse(ISSUER).unwrap(),
        Url::parse("https://idp.example.com/.well-known/jwks.json").unwrap(),
        SigningKeySet::from_jwks(&jwks).unwrap(),
    )
}

/// In-memory provider that counts fetches and can rotate or fail on demand
#[derive(Debug)]
pub struct FakeRetriever {
    jwks: Mutex<Vec<Value>>,
    failing: AtomicBool,
    fetches: AtomicUsize,
    delay: Duration,
}

impl FakeRetriever {
    pub fn new(jwks: Vec<Value>) -> Self {
        Self {
            jwks: Mutex::new(jwks),
            failing: AtomicBool::new(false),
            fetches: AtomicUsize::new(0),
            delay: Duration::ZERO,
        }
    }

    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Replace the published key set, as a provider does on rotation
    pub fn publish(&self, jwks: Vec<Value>) {
        *self.jwks.lock() = jwks;
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConfigurationRetriever for FakeRetriever {
    async fn retrieve(&self) -> Result<ProviderConfiguration> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(AuthError::Discovery("provider unavailable".into()));
        }
        let jwks = self.jwks.lock().clone();
        Ok(configuration(jwks))
    }
}

pub fn cache(retriever: &Arc<FakeRetriever>) -> Arc<ProviderConfigurationCache> {
    Arc::new(ProviderConfigurationCache::new(
        Arc::clone(retriever) as Arc<dyn ConfigurationRetriever>,
        ProviderCacheConfig::default(),
    ))
}
