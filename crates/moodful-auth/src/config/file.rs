//! TOML configuration file loading

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use super::builder::ConfigBuilder;
use crate::Result;

/// Configuration file locations checked in order
const CONFIG_PATHS: &[&str] = &[
    "./moodful-auth.toml",
    "~/.config/moodful-auth/config.toml",
    "/etc/moodful-auth/config.toml",
];

/// Find the first existing configuration file
pub fn find_config_file() -> Option<PathBuf> {
    for path_str in CONFIG_PATHS {
        let path = if path_str.starts_with('~') {
            if let Ok(home) = std::env::var("HOME") {
                PathBuf::from(path_str.replacen('~', &home, 1))
            } else {
                continue;
            }
        } else {
            PathBuf::from(path_str)
        };

        if path.exists() {
            return Some(path);
        }
    }
    None
}

/// Load configuration from a TOML file
pub fn load_from_file(path: &Path, builder: ConfigBuilder) -> Result<ConfigBuilder> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::Error::Config(format!(
            "Failed to read config file {}: {}",
            path.display(),
            e
        ))
    })?;

    let file_config: FileConfig = toml::from_str(&content).map_err(|e| {
        crate::Error::Config(format!(
            "Failed to parse config file {}: {}",
            path.display(),
            e
        ))
    })?;

    apply_file_config(builder, file_config)
}

fn apply_file_config(mut builder: ConfigBuilder, config: FileConfig) -> Result<ConfigBuilder> {
    if let Some(auth) = config.authentication {
        if let Some(issuer) = auth.issuer {
            builder = builder.issuer(issuer);
        }

        if let Some(audience) = auth.audience {
            builder = builder.audience(audience);
        }

        if let Some(debug) = auth.debug {
            builder = builder.debug(debug);
        }

        if let Some(secs) = auth.clock_skew_secs {
            builder = builder.clock_skew(Duration::from_secs(secs));
        }
    }

    if let Some(provider) = config.provider {
        if let Some(secs) = provider.refresh_interval_secs {
            builder = builder.refresh_interval(Duration::from_secs(secs));
        }

        if let Some(secs) = provider.refresh_cooldown_secs {
            builder = builder.refresh_cooldown(Duration::from_secs(secs));
        }

        if let Some(secs) = provider.fetch_timeout_secs {
            builder = builder.fetch_timeout(Duration::from_secs(secs));
        }
    }

    if let Some(http) = config.http {
        if let Some(host_str) = http.host {
            let host = host_str.parse::<IpAddr>().map_err(|e| {
                crate::Error::Config(format!("Invalid http.host '{host_str}': {e}"))
            })?;
            builder = builder.http_host(host);
        }

        if let Some(port) = http.port {
            builder = builder.http_port(port);
        }

        if let Some(origin) = http.cors_origin {
            builder = builder.cors_origin(Some(origin));
        }

        if let Some(secs) = http.request_timeout_secs {
            builder = builder.request_timeout(Duration::from_secs(secs));
        }
    }

    if let Some(telemetry) = config.telemetry {
        if let Some(endpoint) = telemetry.otlp_endpoint {
            builder = builder.otlp_endpoint(Some(endpoint));
        }

        if let Some(name) = telemetry.service_name {
            builder = builder.service_name(name);
        }

        if let Some(level) = telemetry.log_level {
            builder = builder.log_level(level);
        }

        if let Some(json) = telemetry.json_logs {
            builder = builder.json_logs(json);
        }
    }

    Ok(builder)
}

/// Root configuration file structure
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    authentication: Option<AuthenticationSection>,
    provider: Option<ProviderSection>,
    http: Option<HttpSection>,
    telemetry: Option<TelemetrySection>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AuthenticationSection {
    issuer: Option<String>,
    audience: Option<String>,
    debug: Option<bool>,
    clock_skew_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProviderSection {
    refresh_interval_secs: Option<u64>,
    refresh_cooldown_secs: Option<u64>,
    fetch_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct HttpSection {
    host: Option<String>,
    port: Option<u16>,
    cors_origin: Option<String>,
    request_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TelemetrySection {
    otlp_endpoint: Option<String>,
    service_name: Option<String>,
    log_level: Option<String>,
    json_logs: Option<bool>,
}
