//! Environment variable loading for configuration

use std::env;
use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;

use super::builder::ConfigBuilder;
use crate::Result;

/// Environment variable names
mod vars {
    pub const MOODFUL_AUTH_ISSUER: &str = "MOODFUL_AUTH_ISSUER";
    pub const MOODFUL_AUTH_AUDIENCE: &str = "MOODFUL_AUTH_AUDIENCE";
    pub const MOODFUL_AUTH_DEBUG: &str = "MOODFUL_AUTH_DEBUG";
    pub const MOODFUL_AUTH_CLOCK_SKEW_SECS: &str = "MOODFUL_AUTH_CLOCK_SKEW_SECS";
    pub const MOODFUL_PROVIDER_REFRESH_INTERVAL_SECS: &str =
        "MOODFUL_PROVIDER_REFRESH_INTERVAL_SECS";
    pub const MOODFUL_PROVIDER_REFRESH_COOLDOWN_SECS: &str =
        "MOODFUL_PROVIDER_REFRESH_COOLDOWN_SECS";
    pub const MOODFUL_PROVIDER_FETCH_TIMEOUT_SECS: &str = "MOODFUL_PROVIDER_FETCH_TIMEOUT_SECS";
    pub const MOODFUL_HTTP_HOST: &str = "MOODFUL_HTTP_HOST";
    pub const MOODFUL_HTTP_PORT: &str = "MOODFUL_HTTP_PORT";
    pub const MOODFUL_CORS_ORIGIN: &str = "MOODFUL_CORS_ORIGIN";
    pub const OTEL_EXPORTER_OTLP_ENDPOINT: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";
    pub const OTEL_SERVICE_NAME: &str = "OTEL_SERVICE_NAME";
    pub const RUST_LOG: &str = "RUST_LOG";
    pub const MOODFUL_JSON_LOGS: &str = "MOODFUL_JSON_LOGS";
}

/// Serializes tests that read or write the process environment
#[cfg(test)]
pub(super) static ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

/// Load configuration from environment variables
pub fn load_from_env(mut builder: ConfigBuilder) -> Result<ConfigBuilder> {
    // Authentication
    if let Ok(issuer) = env::var(vars::MOODFUL_AUTH_ISSUER) {
        builder = builder.issuer(issuer);
    }

    if let Ok(audience) = env::var(vars::MOODFUL_AUTH_AUDIENCE) {
        builder = builder.audience(audience);
    }

    if let Ok(val) = env::var(vars::MOODFUL_AUTH_DEBUG) {
        builder = builder.debug(parse_bool(&val));
    }

    if let Some(secs) = parse_var::<u64>(vars::MOODFUL_AUTH_CLOCK_SKEW_SECS)? {
        builder = builder.clock_skew(Duration::from_secs(secs));
    }

    // Provider cache
    if let Some(secs) = parse_var::<u64>(vars::MOODFUL_PROVIDER_REFRESH_INTERVAL_SECS)? {
        builder = builder.refresh_interval(Duration::from_secs(secs));
    }

    if let Some(secs) = parse_var::<u64>(vars::MOODFUL_PROVIDER_REFRESH_COOLDOWN_SECS)? {
        builder = builder.refresh_cooldown(Duration::from_secs(secs));
    }

    if let Some(secs) = parse_var::<u64>(vars::MOODFUL_PROVIDER_FETCH_TIMEOUT_SECS)? {
        builder = builder.fetch_timeout(Duration::from_secs(secs));
    }

    // HTTP
    if let Some(host) = parse_var::<IpAddr>(vars::MOODFUL_HTTP_HOST)? {
        builder = builder.http_host(host);
    }

    if let Some(port) = parse_var::<u16>(vars::MOODFUL_HTTP_PORT)? {
        builder = builder.http_port(port);
    }

    if let Ok(origin) = env::var(vars::MOODFUL_CORS_ORIGIN) {
        builder = builder.cors_origin(Some(origin));
    }

    // Telemetry
    if let Ok(endpoint) = env::var(vars::OTEL_EXPORTER_OTLP_ENDPOINT) {
        builder = builder.otlp_endpoint(Some(endpoint));
    }

    if let Ok(name) = env::var(vars::OTEL_SERVICE_NAME) {
        builder = builder.service_name(name);
    }

    if let Ok(level) = env::var(vars::RUST_LOG) {
        builder = builder.log_level(level);
    }

    if let Ok(val) = env::var(vars::MOODFUL_JSON_LOGS) {
        builder = builder.json_logs(parse_bool(&val));
    }

    Ok(builder)
}

/// A set but unparsable value is an error, not a silent fallback to the default.
fn parse_var<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| crate::Error::Config(format!("Invalid {name}='{raw}': {e}"))),
        Err(_) => Ok(None),
    }
}

fn parse_bool(s: &str) -> bool {
    matches!(s.to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}
