//! Fake identity provider and token helpers shared by integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use moodful_auth::{
    AuthenticationOptions, ProviderCacheConfig, ProviderConfigurationCache, RequestAuthenticator,
};
use serde::Serialize;
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const AUDIENCE: &str = "api://resource";
pub const CURRENT_KID: &str = "ed25519-2026-01";
pub const ROTATED_KID: &str = "ed25519-2026-07";

const CURRENT_PEM: &[u8] = include_bytes!("../fixtures/ed25519-current.pem");
const ROTATED_PEM: &[u8] = include_bytes!("../fixtures/ed25519-rotated.pem");

pub const DISCOVERY_PATH: &str = "/.well-known/openid-configuration";
pub const JWKS_PATH: &str = "/keys";

pub fn current_jwk() -> Value {
    json!({
        "kid": CURRENT_KID, "kty": "OKP", "crv": "Ed25519", "alg": "EdDSA", "use": "sig",
        "x": "JmC1z9a-w41xwv51ek_W-2qdyzPIoCk6E67KF1_pUmA"
    })
}

pub fn rotated_jwk() -> Value {
    json!({
        "kid": ROTATED_KID, "kty": "OKP", "crv": "Ed25519", "alg": "EdDSA", "use": "sig",
        "x": "F4x46O4oVlF-N-xu8fScyGwPP2bftyVbZxsijf5lMxA"
    })
}

/// OIDC provider served by wiremock over plain http
pub struct MockProvider {
    pub server: MockServer,
}

impl MockProvider {
    pub async fn start(keys: Vec<Value>) -> Self {
        let provider = Self {
            server: MockServer::start().await,
        };
        let issuer = provider.issuer();
        provider.mount(&issuer, keys).await;
        provider
    }

    /// Issuer as configured, without trailing slash
    pub fn issuer(&self) -> String {
        self.server.uri()
    }

    pub fn discovery_document(&self, issuer: &str) -> Value {
        json!({
            "issuer": issuer,
            "authorization_endpoint": format!("{}/authorize", self.server.uri()),
            "jwks_uri": format!("{}{JWKS_PATH}", self.server.uri()),
            "response_types_supported": ["code"],
            "subject_types_supported": ["public"],
            "id_token_signing_alg_values_supported": ["RS256"]
        })
    }

    /// Serve a discovery document naming `issuer` and the given key set
    pub async fn mount(&self, issuer: &str, keys: Vec<Value>) {
        Mock::given(method("GET"))
            .and(path(DISCOVERY_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(self.discovery_document(issuer)))
            .mount(&self.server)
            .await;

        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "keys": keys })))
            .mount(&self.server)
            .await;
    }

    /// Replace the published key set; request counters start from zero again
    pub async fn publish(&self, keys: Vec<Value>) {
        self.server.reset().await;
        let issuer = self.issuer();
        self.mount(&issuer, keys).await;
    }

    /// Stop answering: every request gets a 503
    pub async fn go_down(&self) {
        self.server.reset().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&self.server)
            .await;
    }

    /// Answer every request only after `delay`
    pub async fn slow_down(&self, delay: Duration, keys: Vec<Value>) {
        self.server.reset().await;
        let issuer = self.issuer();
        Mock::given(method("GET"))
            .and(path(DISCOVERY_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(self.discovery_document(&issuer))
                    .set_delay(delay),
            )
            .mount(&self.server)
            .await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "keys": keys }))
                    .set_delay(delay),
            )
            .mount(&self.server)
            .await;
    }

    pub async fn jwks_requests(&self) -> usize {
        self.requests_to(JWKS_PATH).await
    }

    pub async fn discovery_requests(&self) -> usize {
        self.requests_to(DISCOVERY_PATH).await
    }

    async fn requests_to(&self, request_path: &str) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|request| request.url.path() == request_path)
            .count()
    }

    pub fn options(&self) -> AuthenticationOptions {
        AuthenticationOptions::new(&self.issuer(), AUDIENCE).unwrap()
    }

    pub fn cache(&self) -> Arc<ProviderConfigurationCache> {
        self.cache_with_timeout(Duration::from_secs(5))
    }

    pub fn cache_with_timeout(&self, fetch_timeout: Duration) -> Arc<ProviderConfigurationCache> {
        let settings = ProviderCacheConfig::new().with_fetch_timeout(fetch_timeout);
        Arc::new(ProviderConfigurationCache::discover(&self.options(), settings).unwrap())
    }

    pub fn authenticator(&self) -> Arc<RequestAuthenticator> {
        self.authenticator_with(self.cache())
    }

    pub fn authenticator_with(
        &self,
        cache: Arc<ProviderConfigurationCache>,
    ) -> Arc<RequestAuthenticator> {
        Arc::new(RequestAuthenticator::new(Arc::new(self.options()), cache))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Claims {
    pub sub: String,
    pub iss: String,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(provider: &MockProvider, sub: &str) -> Self {
        let now = now();
        Self {
            sub: sub.to_string(),
            iss: format!("{}/", provider.issuer()),
            aud: AUDIENCE.to_string(),
            exp: now + 3600,
            iat: now,
        }
    }
}

pub fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

pub fn sign_current(claims: &Claims) -> String {
    sign(CURRENT_PEM, CURRENT_KID, claims)
}

pub fn sign_rotated(claims: &Claims) -> String {
    sign(ROTATED_PEM, ROTATED_KID, claims)
}

fn sign(pem: &[u8], kid: &str, claims: &Claims) -> String {
    let mut header = Header::new(Algorithm::EdDSA);
    header.kid = Some(kid.to_string());
    encode(&header, claims, &EncodingKey::from_ed_pem(pem).unwrap()).unwrap()
}
