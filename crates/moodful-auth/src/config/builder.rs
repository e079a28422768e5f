//! Configuration builder

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::Error;
use crate::auth::{AuthenticationOptions, ProviderCacheConfig};

/// Service configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub authentication: AuthenticationOptions,
    pub provider: ProviderCacheConfig,
    pub http: HttpConfig,
    pub telemetry: TelemetryConfig,
}

impl Config {
    #[must_use]
    pub const fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    #[must_use]
    pub const fn authentication(&self) -> &AuthenticationOptions {
        &self.authentication
    }

    #[must_use]
    pub const fn provider(&self) -> &ProviderCacheConfig {
        &self.provider
    }
}

/// HTTP listener configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    pub host: IpAddr,
    pub port: u16,
    /// Allowed CORS origin; `None` disables cross-origin requests
    pub cors_origin: Option<String>,
    pub request_timeout: Duration,
}

impl HttpConfig {
    pub const DEFAULT_PORT: u16 = 8080;
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    #[must_use]
    pub const fn new() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: Self::DEFAULT_PORT,
            cors_origin: None,
            request_timeout: Self::DEFAULT_REQUEST_TIMEOUT,
        }
    }

    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Default)]
pub struct TelemetryConfig {
    pub otlp_endpoint: Option<String>,
    pub service_name: String,
    pub log_level: String,
    pub json_logs: bool,
}

/// Configuration builder with fluent API
#[derive(Debug)]
pub struct ConfigBuilder {
    issuer: Option<String>,
    audience: Option<String>,
    debug: bool,
    clock_skew: Duration,
    provider: ProviderCacheConfig,
    http: HttpConfig,
    telemetry: TelemetryConfig,
}

impl ConfigBuilder {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            issuer: None,
            audience: None,
            debug: false,
            clock_skew: Duration::ZERO,
            provider: ProviderCacheConfig::new(),
            http: HttpConfig::new(),
            telemetry: TelemetryConfig {
                otlp_endpoint: None,
                service_name: String::new(),
                log_level: String::new(),
                json_logs: false,
            },
        }
    }

    #[must_use]
    pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    #[must_use]
    pub fn audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    /// Authenticate every request without checking it. Development only.
    #[must_use]
    pub const fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    #[must_use]
    pub const fn clock_skew(mut self, skew: Duration) -> Self {
        self.clock_skew = skew;
        self
    }

    #[must_use]
    pub const fn refresh_interval(mut self, interval: Duration) -> Self {
        self.provider.refresh_interval = interval;
        self
    }

    #[must_use]
    pub const fn refresh_cooldown(mut self, cooldown: Duration) -> Self {
        self.provider.refresh_cooldown = cooldown;
        self
    }

    #[must_use]
    pub const fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.provider.fetch_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn http_host(mut self, host: IpAddr) -> Self {
        self.http.host = host;
        self
    }

    #[must_use]
    pub const fn http_port(mut self, port: u16) -> Self {
        self.http.port = port;
        self
    }

    #[must_use]
    pub fn cors_origin(mut self, origin: Option<String>) -> Self {
        self.http.cors_origin = origin;
        self
    }

    #[must_use]
    pub const fn request_timeout(mut self, timeout: Duration) -> Self {
        self.http.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn otlp_endpoint(mut self, endpoint: Option<String>) -> Self {
        self.telemetry.otlp_endpoint = endpoint;
        self
    }

    #[must_use]
    pub fn service_name(mut self, name: String) -> Self {
        self.telemetry.service_name = name;
        self
    }

    #[must_use]
    pub fn log_level(mut self, level: String) -> Self {
        self.telemetry.log_level = level;
        self
    }

    #[must_use]
    pub const fn json_logs(mut self, enabled: bool) -> Self {
        self.telemetry.json_logs = enabled;
        self
    }

    /// Build the configuration
    pub fn build(self) -> crate::Result<Config> {
        let issuer = self
            .issuer
            .ok_or_else(|| Error::Config("issuer is required".into()))?;
        let audience = self
            .audience
            .ok_or_else(|| Error::Config("audience is required".into()))?;

        let authentication = AuthenticationOptions::new(&issuer, audience)
            .map_err(|e| Error::Config(e.to_string()))?
            .with_debug(self.debug)
            .with_clock_skew(self.clock_skew);

        if self.provider.fetch_timeout.is_zero() {
            return Err(Error::Config("fetch_timeout must be greater than zero".into()));
        }

        let service_name = if self.telemetry.service_name.is_empty() {
            "moodful-auth".to_string()
        } else {
            self.telemetry.service_name
        };

        let log_level = if self.telemetry.log_level.is_empty() {
            "info".to_string()
        } else {
            self.telemetry.log_level
        };

        Ok(Config {
            authentication,
            provider: self.provider,
            http: self.http,
            telemetry: TelemetryConfig {
                otlp_endpoint: self.telemetry.otlp_endpoint,
                service_name,
                log_level,
                json_logs: self.telemetry.json_logs,
            },
        })
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
