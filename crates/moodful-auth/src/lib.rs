//! Bearer token authentication and owner-match authorization against an
//! OpenID Connect provider

pub mod auth;
pub mod config;
mod error;
pub mod http;
pub mod observability;

pub use auth::{
    AuthError, AuthenticationOptions, AuthenticationVerdict, Identity, Principal,
    ProviderCacheConfig, ProviderConfigurationCache, RequestAuthenticator, TokenValidator,
};
pub use config::{Config, ConfigBuilder, HttpConfig, TelemetryConfig};
pub use error::{Error, Result};
