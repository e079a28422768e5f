//! Bearer token authentication and owner-match authorization
//!
//! Requests are authenticated against an external OpenID Connect provider:
//!
//! - [`ProviderConfigurationCache`] holds the provider's issuer metadata and
//!   signing keys, fetched via OIDC discovery and refreshed on demand
//! - [`TokenValidator`] verifies signature and claims, refreshing the cache
//!   once when a token is signed with a key it has not seen yet
//! - [`RequestAuthenticator`] turns request headers into an
//!   [`AuthenticationVerdict`], with a debug bypass for local development
//! - [`owner::authorize`] requires the token subject to equal the owner of
//!   the addressed resource
//!
//! Every failure is reported to clients as 401. Nothing here spawns tasks;
//! all work happens on the caller's request.

mod authenticator;
mod claims;
mod config;
mod credentials;
mod error;
mod jwks;
mod middleware;
pub mod owner;
mod provider;
mod validator;

#[cfg(test)]
pub(crate) mod testing;

pub use authenticator::{AuthenticationVerdict, Identity, RequestAuthenticator};
pub use claims::{OneOrMany, Principal, TokenClaims, UnverifiedClaims};
pub use config::{AuthenticationOptions, ProviderCacheConfig, normalize_issuer};
pub use credentials::{BEARER_SCHEME, BearerToken, Credentials};
pub use error::{AuthError, Result, TokenRejection, unauthorized_response};
pub use jwks::{Jwk, JwkSet, SigningKey, SigningKeySet};
pub use middleware::{AuthState, OWNER_PATH_PARAM, owner_guard};
pub use provider::{
    ConfigurationRetriever, HttpConfigurationRetriever, ProviderConfiguration,
    ProviderConfigurationCache,
};
pub use validator::{TokenValidator, ValidationAttempt, validate_with};
