//! HTTP server exposing owner-guarded routes

use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

use axum::extract::Path;
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use axum::{Extension, Router, middleware};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{AuthState, Identity, RequestAuthenticator, owner_guard};
use crate::config::HttpConfig;
use crate::{Error, Result};

/// Health check response
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Who the caller was authenticated as, for the owner in the path
#[derive(Debug, Serialize)]
struct SessionResponse {
    user_id: String,
    subject: Option<String>,
    expires_at: Option<i64>,
    debug_bypass: bool,
}

/// Build the application router
pub fn router(authenticator: Arc<RequestAuthenticator>, config: &HttpConfig) -> Router {
    let state = AuthState::new(authenticator);

    let owned = Router::new()
        .route("/users/{user_id}/session", get(session_handler))
        .route_layer(middleware::from_fn_with_state(state, owner_guard));

    #[allow(unused_mut)]
    let mut app = Router::new().route("/health", get(health_handler));

    #[cfg(feature = "metrics")]
    {
        app = app.route("/metrics", get(metrics_handler));
    }

    app.merge(owned)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.request_timeout,
        ))
        .layer(build_cors_layer(config))
}

/// Serve until `shutdown` resolves, then drain in-flight requests
pub async fn serve(
    authenticator: Arc<RequestAuthenticator>,
    config: &HttpConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let addr = config.socket_addr();
    emit_security_warnings(config.host, config, authenticator.is_debug());

    let app = router(authenticator, config);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Transport(format!("Failed to bind to {addr}: {e}")))?;

    tracing::info!("HTTP server listening on {addr}");

    let cancellation_token = CancellationToken::new();
    let token_clone = cancellation_token.clone();
    tokio::spawn(async move {
        shutdown.await;
        cancellation_token.cancel();
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(token_clone.cancelled_owned())
        .await
        .map_err(|e| Error::Transport(format!("HTTP server error: {e}")))?;

    tracing::info!("HTTP server shutdown complete");
    Ok(())
}

fn build_cors_layer(config: &HttpConfig) -> CorsLayer {
    let Some(origin) = config.cors_origin.as_deref() else {
        return CorsLayer::new();
    };

    match origin.parse::<HeaderValue>() {
        Ok(origin_value) => CorsLayer::new()
            .allow_origin(origin_value)
            .allow_methods([Method::GET, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
        Err(e) => {
            tracing::warn!(origin, error = %e, "Ignoring invalid CORS origin");
            CorsLayer::new()
        }
    }
}

fn emit_security_warnings(host: IpAddr, config: &HttpConfig, debug: bool) {
    let is_non_loopback = !host.is_loopback();
    let is_all_interfaces =
        host == IpAddr::V4(Ipv4Addr::UNSPECIFIED) || host == IpAddr::V6(Ipv6Addr::UNSPECIFIED);

    if is_all_interfaces {
        tracing::warn!(
            "HTTP server binding to all interfaces ({host}). \
             This exposes the server to all network interfaces."
        );
    } else if is_non_loopback {
        tracing::warn!(
            "HTTP server binding to non-loopback address ({host}). \
             Ensure network security policies are in place."
        );
    }

    if debug && is_non_loopback {
        tracing::warn!(
            "SECURITY WARNING: authentication debug mode is enabled on a network-reachable \
             address. Every request is accepted without a token."
        );
    }

    if config.cors_origin.is_none() {
        tracing::info!(
            "CORS origin not configured (MOODFUL_CORS_ORIGIN), cross-origin requests disabled"
        );
    }
}

async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn session_handler(
    Path(user_id): Path<String>,
    Extension(identity): Extension<Identity>,
) -> impl IntoResponse {
    let principal = identity.principal();
    Json(SessionResponse {
        user_id,
        subject: principal.map(|p| p.subject.clone()),
        expires_at: principal.map(|p| p.expires_at),
        debug_bypass: identity.is_debug_bypass(),
    })
}

#[cfg(feature = "metrics")]
async fn metrics_handler() -> impl IntoResponse {
    (
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        crate::observability::render_metrics(),
    )
}
