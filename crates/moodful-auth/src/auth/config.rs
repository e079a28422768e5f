//! Authentication configuration types

use std::time::Duration;

use url::Url;

use super::error::{AuthError, Result};

/// Normalize an issuer identifier to exactly one trailing slash.
///
/// Applied to the configured issuer, the discovery document issuer and the
/// token `iss` claim before any comparison.
#[must_use]
pub fn normalize_issuer(issuer: &str) -> String {
    format!("{}/", issuer.trim_end_matches('/'))
}

/// Options every request is validated against.
///
/// Built once at startup and shared read-only behind an `Arc`.
#[derive(Debug, Clone)]
pub struct AuthenticationOptions {
    /// OIDC issuer (used for discovery and `iss` validation)
    pub issuer: Url,
    /// Expected `aud` claim
    pub audience: String,
    /// Authenticate every request without looking at it (local tooling only)
    pub debug: bool,
    /// Clock skew tolerance for exp/nbf validation
    pub clock_skew: Duration,
}

impl AuthenticationOptions {
    pub fn new(issuer: &str, audience: impl Into<String>) -> Result<Self> {
        let issuer = Url::parse(issuer)
            .map_err(|e| AuthError::Config(format!("Invalid issuer URL: {e}")))?;

        if !matches!(issuer.scheme(), "https" | "http") {
            return Err(AuthError::Config(format!(
                "Issuer must use http or https, got '{}'",
                issuer.scheme()
            )));
        }

        let audience = audience.into();
        if audience.trim().is_empty() {
            return Err(AuthError::Config("Audience must not be empty".into()));
        }

        Ok(Self {
            issuer,
            audience,
            debug: false,
            clock_skew: Duration::ZERO,
        })
    }

    #[must_use]
    pub const fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    #[must_use]
    pub const fn with_clock_skew(mut self, clock_skew: Duration) -> Self {
        self.clock_skew = clock_skew;
        self
    }

    #[must_use]
    pub fn normalized_issuer(&self) -> String {
        normalize_issuer(self.issuer.as_str())
    }

    #[must_use]
    pub fn requires_https(&self) -> bool {
        self.issuer.scheme() == "https"
    }

    /// `<issuer>/.well-known/openid-configuration`
    pub fn discovery_url(&self) -> Result<Url> {
        let base = self.issuer.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}/.well-known/openid-configuration"))
            .map_err(|e| AuthError::Config(format!("Invalid discovery URL: {e}")))
    }
}

/// Provider configuration cache settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderCacheConfig {
    /// Age after which the cached configuration is fetched again
    pub refresh_interval: Duration,
    /// Minimum time between two forced refreshes once a configuration is cached
    pub refresh_cooldown: Duration,
    /// Overall timeout for each discovery or JWKS request
    pub fetch_timeout: Duration,
}

impl ProviderCacheConfig {
    pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(12 * 60 * 60);
    pub const DEFAULT_REFRESH_COOLDOWN: Duration = Duration::from_secs(5 * 60);
    pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

    #[must_use]
    pub const fn new() -> Self {
        Self {
            refresh_interval: Self::DEFAULT_REFRESH_INTERVAL,
            refresh_cooldown: Self::DEFAULT_REFRESH_COOLDOWN,
            fetch_timeout: Self::DEFAULT_FETCH_TIMEOUT,
        }
    }

    #[must_use]
    pub const fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    #[must_use]
    pub const fn with_refresh_cooldown(mut self, cooldown: Duration) -> Self {
        self.refresh_cooldown = cooldown;
        self
    }

    #[must_use]
    pub const fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }
}

impl Default for ProviderCacheConfig {
    fn default() -> Self {
        Self::new()
    }
}
