//! Per-request authentication entry point

use std::sync::Arc;

use axum::http::HeaderMap;

use super::claims::Principal;
use super::config::AuthenticationOptions;
use super::credentials::Credentials;
use super::error::{AuthError, Result};
use super::owner;
use super::provider::ProviderConfigurationCache;
use super::validator::TokenValidator;

/// Result of authenticating one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthenticationVerdict {
    Authenticated,
    Unauthenticated,
}

impl AuthenticationVerdict {
    #[must_use]
    pub const fn is_authenticated(self) -> bool {
        matches!(self, Self::Authenticated)
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Authenticated => "authenticated",
            Self::Unauthenticated => "unauthenticated",
        }
    }
}

impl From<bool> for AuthenticationVerdict {
    fn from(authenticated: bool) -> Self {
        if authenticated {
            Self::Authenticated
        } else {
            Self::Unauthenticated
        }
    }
}

/// Who a request was authenticated as
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Principal(Principal),
    /// Debug mode let the request through without looking at it
    DebugBypass,
}

impl Identity {
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        match self {
            Self::Principal(principal) => Some(principal.subject()),
            Self::DebugBypass => None,
        }
    }

    #[must_use]
    pub const fn principal(&self) -> Option<&Principal> {
        match self {
            Self::Principal(principal) => Some(principal),
            Self::DebugBypass => None,
        }
    }

    #[must_use]
    pub const fn is_debug_bypass(&self) -> bool {
        matches!(self, Self::DebugBypass)
    }
}

/// Extracts bearer credentials from request headers and validates them.
///
/// Cheap to clone; construct once at startup and share.
#[derive(Debug, Clone)]
pub struct RequestAuthenticator {
    validator: TokenValidator,
    debug: bool,
}

impl RequestAuthenticator {
    pub fn new(
        options: Arc<AuthenticationOptions>,
        cache: Arc<ProviderConfigurationCache>,
    ) -> Self {
        let debug = options.debug;
        if debug {
            tracing::warn!(
                "SECURITY WARNING: authentication debug mode is enabled. \
                 Every request is treated as authenticated. Never enable this outside development."
            );
        }
        Self {
            validator: TokenValidator::new(cache, options),
            debug,
        }
    }

    #[must_use]
    pub const fn validator(&self) -> &TokenValidator {
        &self.validator
    }

    #[must_use]
    pub const fn is_debug(&self) -> bool {
        self.debug
    }

    /// Resolve the caller's identity, or the reason it could not be established.
    pub async fn identify(&self, headers: &HeaderMap) -> Result<Identity> {
        if self.debug {
            tracing::debug!("Authentication bypassed by debug mode");
            #[cfg(feature = "metrics")]
            crate::observability::record_debug_bypass();
            return Ok(Identity::DebugBypass);
        }

        let credentials = Credentials::from_headers(headers)?;
        self.validator
            .try_validate(Some(&credentials))
            .await
            .map(Identity::Principal)
    }

    pub async fn authenticate(&self, headers: &HeaderMap) -> AuthenticationVerdict {
        let verdict = match self.identify(headers).await {
            Ok(_) => AuthenticationVerdict::Authenticated,
            Err(e) => {
                log_failure(&e);
                AuthenticationVerdict::Unauthenticated
            }
        };
        record(verdict)
    }

    /// Authenticate and require the token subject to equal `claimed_owner_id`.
    pub async fn authenticate_owner(
        &self,
        headers: &HeaderMap,
        claimed_owner_id: &str,
    ) -> AuthenticationVerdict {
        let verdict = self
            .owner_identity(headers, claimed_owner_id)
            .await
            .is_some()
            .into();
        record(verdict)
    }

    /// Identity of an owner-authorized caller, `None` on any failure.
    ///
    /// Failures are logged here; callers only need to refuse the request.
    pub async fn owner_identity(
        &self,
        headers: &HeaderMap,
        claimed_owner_id: &str,
    ) -> Option<Identity> {
        let identity = match self.identify(headers).await {
            Ok(identity) => identity,
            Err(e) => {
                log_failure(&e);
                return None;
            }
        };

        owner::authorize_identity(&identity, claimed_owner_id)
            .is_authenticated()
            .then_some(identity)
    }
}

fn log_failure(err: &AuthError) {
    match err {
        AuthError::HeaderParse(reason) => {
            tracing::debug!(reason = %reason, "Request without usable bearer credentials");
        }
        AuthError::Discovery(reason) => {
            // Only reaches here when no configuration was ever fetched
            tracing::error!(
                reason = %reason,
                "Identity provider configuration unavailable, refusing request"
            );
        }
        AuthError::UnknownSigningKey(kid) => {
            tracing::warn!(
                kid = kid.as_deref().unwrap_or("<none>"),
                "Token signing key not published by the provider"
            );
        }
        AuthError::TokenValidation(rejection) => {
            tracing::warn!(reason = rejection.label(), "Token validation failed");
        }
        AuthError::Config(reason) => {
            tracing::error!(reason = %reason, "Authentication misconfigured");
        }
    }
}

#[allow(clippy::missing_const_for_fn)]
fn record(verdict: AuthenticationVerdict) -> AuthenticationVerdict {
    #[cfg(feature = "metrics")]
    crate::observability::record_verdict(verdict.label());
    verdict
}
