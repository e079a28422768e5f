use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use moodful_auth::config::{self, ConfigBuilder};
use moodful_auth::observability::{init_observability, shutdown_observability};
use moodful_auth::{ProviderConfigurationCache, RequestAuthenticator};

#[derive(Parser, Debug)]
#[command(name = "moodful-auth")]
#[command(
    about = "Bearer token authentication gateway for an OpenID Connect provider",
    long_about = None
)]
#[command(version)]
struct Args {
    /// OIDC issuer URL (discovery at <issuer>/.well-known/openid-configuration)
    #[arg(short, long)]
    issuer: Option<String>,

    /// Expected token audience
    #[arg(short, long)]
    audience: Option<String>,

    /// Accept every request without a token (development only)
    #[arg(long)]
    debug_auth: bool,

    /// Tolerated clock skew for exp/nbf in seconds
    #[arg(long)]
    clock_skew: Option<u64>,

    /// Provider configuration refresh interval in seconds
    #[arg(long)]
    refresh_interval: Option<u64>,

    /// HTTP bind host
    #[arg(long)]
    http_host: Option<IpAddr>,

    /// HTTP bind port
    #[arg(long)]
    http_port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable JSON logging output
    #[arg(long)]
    json_logs: bool,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl Args {
    /// CLI values form the base layer; file and environment override them
    fn into_builder(self) -> ConfigBuilder {
        let mut builder = ConfigBuilder::new();

        if let Some(issuer) = self.issuer {
            builder = builder.issuer(issuer);
        }
        if let Some(audience) = self.audience {
            builder = builder.audience(audience);
        }
        if self.debug_auth {
            builder = builder.debug(true);
        }
        if let Some(secs) = self.clock_skew {
            builder = builder.clock_skew(Duration::from_secs(secs));
        }
        if let Some(secs) = self.refresh_interval {
            builder = builder.refresh_interval(Duration::from_secs(secs));
        }
        if let Some(host) = self.http_host {
            builder = builder.http_host(host);
        }
        if let Some(port) = self.http_port {
            builder = builder.http_port(port);
        }
        if self.verbose {
            builder = builder.log_level("debug".to_string());
        }
        if self.json_logs {
            builder = builder.json_logs(true);
        }

        builder
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config_path = args.config.clone();

    // Precedence: env > file > CLI > defaults
    let config = config::layer_sources(args.into_builder(), config_path.as_deref())?.build()?;

    init_observability(&config.telemetry)?;

    let options = Arc::new(config.authentication.clone());
    let cache = Arc::new(ProviderConfigurationCache::discover(&options, config.provider)?);

    tracing::info!(
        issuer = %options.issuer,
        audience = %options.audience,
        refresh_interval_secs = config.provider.refresh_interval.as_secs(),
        "Starting moodful-auth"
    );

    // Warm the cache; requests retry discovery if the provider is down now
    if !options.debug
        && let Err(e) = cache.get_configuration().await
    {
        tracing::warn!(
            error = %e,
            "Initial provider discovery failed, will retry on first request"
        );
    }

    let authenticator = Arc::new(RequestAuthenticator::new(options, cache));

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutdown signal received");
    };

    let result = moodful_auth::http::serve(authenticator, &config.http, shutdown).await;

    shutdown_observability();

    result.map_err(Into::into)
}
