//! Identity provider configuration: discovery, JWKS fetching and caching
//!
//! The cache holds at most one [`ProviderConfiguration`] behind an
//! [`ArcSwapOption`]. Readers never take a lock and always observe a complete
//! configuration. Fetches are serialized so that any number of callers asking
//! for a refresh at the same time are satisfied by a single network round trip.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use openidconnect::core::CoreProviderMetadata;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use url::Url;

use super::config::{AuthenticationOptions, ProviderCacheConfig, normalize_issuer};
use super::error::{AuthError, Result};
use super::jwks::{JwkSet, SigningKeySet};

/// Wait before hitting a failing provider again while a stale configuration is served
const FAILED_FETCH_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Issuer metadata and signing keys, replaced wholesale on refresh
#[derive(Debug, Clone)]
pub struct ProviderConfiguration {
    issuer: Url,
    jwks_uri: Url,
    keys: SigningKeySet,
    fetched_at: Instant,
}

impl ProviderConfiguration {
    #[must_use]
    pub fn new(issuer: Url, jwks_uri: Url, keys: SigningKeySet) -> Self {
        Self {
            issuer,
            jwks_uri,
            keys,
            fetched_at: Instant::now(),
        }
    }

    #[must_use]
    pub const fn issuer(&self) -> &Url {
        &self.issuer
    }

    #[must_use]
    pub const fn jwks_uri(&self) -> &Url {
        &self.jwks_uri
    }

    #[must_use]
    pub const fn keys(&self) -> &SigningKeySet {
        &self.keys
    }

    #[must_use]
    pub const fn fetched_at(&self) -> Instant {
        self.fetched_at
    }

    #[must_use]
    pub fn age(&self) -> Duration {
        self.fetched_at.elapsed()
    }
}

/// Source of provider configurations
#[async_trait]
pub trait ConfigurationRetriever: Send + Sync + std::fmt::Debug {
    /// Fetch a complete configuration; never returns a partial one
    async fn retrieve(&self) -> Result<ProviderConfiguration>;
}

/// Retrieves the discovery document and JWKS over HTTP(S)
pub struct HttpConfigurationRetriever {
    issuer: Url,
    discovery_url: Url,
    require_https: bool,
    client: reqwest::Client,
}

impl std::fmt::Debug for HttpConfigurationRetriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpConfigurationRetriever")
            .field("issuer", &self.issuer)
            .field("discovery_url", &self.discovery_url)
            .field("require_https", &self.require_https)
            .finish_non_exhaustive()
    }
}

impl HttpConfigurationRetriever {
    pub fn new(options: &AuthenticationOptions, fetch_timeout: Duration) -> Result<Self> {
        let require_https = options.requires_https();

        let client = reqwest::Client::builder()
            .timeout(fetch_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .https_only(require_https)
            .build()
            .map_err(|e| AuthError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            issuer: options.issuer.clone(),
            discovery_url: options.discovery_url()?,
            require_https,
            client,
        })
    }

    #[must_use]
    pub const fn discovery_url(&self) -> &Url {
        &self.discovery_url
    }

    /// Keys for an https issuer must also come over https
    fn ensure_secure(&self, url: &Url) -> Result<()> {
        if self.require_https && url.scheme() != "https" {
            return Err(AuthError::Discovery(format!(
                "JWKS URI must use https, got '{url}'"
            )));
        }
        Ok(())
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| AuthError::Discovery(format!("GET {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::Discovery(format!("GET {url} returned {status}")));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| AuthError::Discovery(format!("GET {url} body read failed: {e}")))?;

        serde_json::from_slice(&body)
            .map_err(|e| AuthError::Discovery(format!("Malformed document at {url}: {e}")))
    }
}

#[async_trait]
impl ConfigurationRetriever for HttpConfigurationRetriever {
    async fn retrieve(&self) -> Result<ProviderConfiguration> {
        tracing::debug!(discovery_url = %self.discovery_url, "Fetching OIDC discovery document");

        let metadata: CoreProviderMetadata = self.get_json(&self.discovery_url).await?;

        let published_issuer = metadata.issuer().as_str();
        if normalize_issuer(published_issuer) != normalize_issuer(self.issuer.as_str()) {
            return Err(AuthError::Discovery(format!(
                "Discovery document issuer '{published_issuer}' does not match configured issuer '{}'",
                self.issuer
            )));
        }

        let jwks_uri = Url::parse(metadata.jwks_uri().as_str())
            .map_err(|e| AuthError::Discovery(format!("Invalid JWKS URI: {e}")))?;
        self.ensure_secure(&jwks_uri)?;

        tracing::debug!(jwks_uri = %jwks_uri, "Fetching JWKS");
        let jwks: JwkSet = self.get_json(&jwks_uri).await?;
        let keys = SigningKeySet::from_jwks(&jwks)?;
        if keys.is_empty() {
            return Err(AuthError::Discovery(format!(
                "JWKS at {jwks_uri} contains no usable signing keys"
            )));
        }

        Ok(ProviderConfiguration::new(self.issuer.clone(), jwks_uri, keys))
    }
}

#[derive(Debug, Default)]
struct FetchState {
    last_attempt: Option<Instant>,
    last_forced: Option<Instant>,
    last_failed: bool,
}

/// Process-wide cache of the provider configuration.
///
/// Construct once at startup and share via `Arc`.
pub struct ProviderConfigurationCache {
    retriever: Arc<dyn ConfigurationRetriever>,
    settings: ProviderCacheConfig,
    current: ArcSwapOption<ProviderConfiguration>,
    refresh_requested: AtomicBool,
    fetch_state: Mutex<FetchState>,
    fetch_lock: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for ProviderConfigurationCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfigurationCache")
            .field("retriever", &self.retriever)
            .field("settings", &self.settings)
            .field("cached", &self.current.load().is_some())
            .field(
                "refresh_requested",
                &self.refresh_requested.load(Ordering::Relaxed),
            )
            .finish_non_exhaustive()
    }
}

impl ProviderConfigurationCache {
    #[must_use]
    pub fn new(retriever: Arc<dyn ConfigurationRetriever>, settings: ProviderCacheConfig) -> Self {
        Self {
            retriever,
            settings,
            current: ArcSwapOption::empty(),
            refresh_requested: AtomicBool::new(false),
            fetch_state: Mutex::new(FetchState::default()),
            fetch_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Cache backed by the provider's discovery endpoint
    pub fn discover(
        options: &AuthenticationOptions,
        settings: ProviderCacheConfig,
    ) -> Result<Self> {
        let retriever = HttpConfigurationRetriever::new(options, settings.fetch_timeout)?;
        Ok(Self::new(Arc::new(retriever), settings))
    }

    /// Return the cached configuration, fetching it when missing, expired or
    /// invalidated by [`request_refresh`](Self::request_refresh).
    ///
    /// A failed fetch keeps serving the previous configuration. Only when
    /// nothing has ever been fetched does the error reach the caller.
    pub async fn get_configuration(&self) -> Result<Arc<ProviderConfiguration>> {
        if let Some(current) = self.fresh() {
            return Ok(current);
        }

        let seen = self.current.load_full();
        let _guard = self.fetch_lock.lock().await;

        // Another caller completed a fetch while we waited
        let previous = self.current.load_full();
        if let Some(current) = &previous
            && seen.as_ref().is_none_or(|seen| !Arc::ptr_eq(seen, current))
        {
            self.refresh_requested.store(false, Ordering::Release);
            return Ok(Arc::clone(current));
        }
        if let Some(current) = self.fresh() {
            return Ok(current);
        }

        let forced = self.refresh_requested.swap(false, Ordering::AcqRel);
        if let Some(previous) = &previous
            && self.in_cooldown(forced)
        {
            tracing::debug!(forced, "Provider configuration refresh suppressed by cooldown");
            return Ok(Arc::clone(previous));
        }

        {
            let now = Instant::now();
            let mut state = self.fetch_state.lock();
            state.last_attempt = Some(now);
            if forced {
                state.last_forced = Some(now);
            }
        }

        match self.retriever.retrieve().await {
            Ok(configuration) => {
                let configuration = Arc::new(configuration);
                self.current.store(Some(Arc::clone(&configuration)));
                self.fetch_state.lock().last_failed = false;

                #[cfg(feature = "metrics")]
                crate::observability::record_discovery_fetch(true);

                tracing::info!(
                    issuer = %configuration.issuer(),
                    keys_count = configuration.keys().len(),
                    "Provider configuration refreshed"
                );
                Ok(configuration)
            }
            Err(e) => {
                self.fetch_state.lock().last_failed = true;

                #[cfg(feature = "metrics")]
                crate::observability::record_discovery_fetch(false);

                match previous {
                    Some(previous) => {
                        tracing::warn!(
                            error = %e,
                            age_secs = previous.age().as_secs(),
                            "Provider configuration refresh failed, keeping previous configuration"
                        );
                        Ok(previous)
                    }
                    None => Err(e),
                }
            }
        }
    }

    /// Invalidate the cached configuration.
    ///
    /// Does not fetch; the next [`get_configuration`](Self::get_configuration)
    /// does. Repeated calls before that collapse into one fetch.
    pub fn request_refresh(&self) {
        self.refresh_requested.store(true, Ordering::Release);
    }

    /// Current configuration without triggering a fetch
    #[must_use]
    pub fn cached(&self) -> Option<Arc<ProviderConfiguration>> {
        self.current.load_full()
    }

    #[must_use]
    pub const fn settings(&self) -> &ProviderCacheConfig {
        &self.settings
    }

    fn fresh(&self) -> Option<Arc<ProviderConfiguration>> {
        if self.refresh_requested.load(Ordering::Acquire) {
            return None;
        }
        let current = self.current.load_full()?;
        (current.age() < self.settings.refresh_interval).then_some(current)
    }

    /// A failed fetch backs off any further fetch; a forced refresh is
    /// additionally limited to one per `refresh_cooldown`.
    fn in_cooldown(&self, forced: bool) -> bool {
        let state = self.fetch_state.lock();
        let backing_off = state.last_failed
            && state
                .last_attempt
                .is_some_and(|at| at.elapsed() < FAILED_FETCH_RETRY_DELAY);
        let throttled = forced
            && state
                .last_forced
                .is_some_and(|at| at.elapsed() < self.settings.refresh_cooldown);
        backing_off || throttled
    }
}
