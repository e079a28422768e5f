//! Bearer token validation against the provider's current key set

use std::sync::Arc;

use jsonwebtoken::{Validation, decode};

use super::claims::{Principal, TokenClaims};
use super::config::{AuthenticationOptions, normalize_issuer};
use super::credentials::{BearerToken, Credentials};
use super::error::{AuthError, Result, TokenRejection};
use super::provider::{ProviderConfiguration, ProviderConfigurationCache};

/// Outcome of checking a token against one provider configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationAttempt {
    Valid(Principal),
    /// No key in the set matches the token's kid (or algorithm, without a kid)
    UnknownKey(Option<String>),
    Rejected(TokenRejection),
}

/// Validate `token` against a single configuration.
///
/// Pure apart from reading the clock: it never fetches and never refreshes.
pub fn validate_with(
    token: &BearerToken,
    configuration: &ProviderConfiguration,
    options: &AuthenticationOptions,
) -> ValidationAttempt {
    let alg = token.algorithm();
    let keys = configuration.keys();
    let candidates: Vec<_> = match token.key_id() {
        Some(kid) => keys.with_kid(kid).collect(),
        None => keys.with_algorithm(alg).collect(),
    };
    if candidates.is_empty() {
        return ValidationAttempt::UnknownKey(token.key_id().map(ToString::to_string));
    }

    let validation = validation_for(token, options);
    let mut rejection = TokenRejection::InvalidSignature;

    for candidate in candidates {
        if candidate.algorithm != alg {
            rejection = TokenRejection::AlgorithmMismatch;
            continue;
        }
        match decode::<TokenClaims>(token.raw(), &candidate.key, &validation) {
            Ok(data) => return check_issuer(data.claims, options),
            Err(e) => match TokenRejection::from(e) {
                // Another key published under the same kid may still verify it
                TokenRejection::InvalidSignature => {
                    rejection = TokenRejection::InvalidSignature;
                }
                other => return ValidationAttempt::Rejected(other),
            },
        }
    }

    ValidationAttempt::Rejected(rejection)
}

fn validation_for(token: &BearerToken, options: &AuthenticationOptions) -> Validation {
    let mut validation = Validation::new(token.algorithm());
    validation.leeway = options.clock_skew.as_secs();
    validation.validate_exp = true;
    validation.validate_nbf = true;
    validation.set_audience(&[options.audience.as_str()]);
    // Issuer is compared after normalization, see check_issuer
    validation.iss = None;
    validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
    validation
}

fn check_issuer(claims: TokenClaims, options: &AuthenticationOptions) -> ValidationAttempt {
    if normalize_issuer(&claims.iss) == options.normalized_issuer() {
        ValidationAttempt::Valid(claims.into())
    } else {
        ValidationAttempt::Rejected(TokenRejection::InvalidIssuer)
    }
}

/// Validates bearer tokens, refreshing the provider configuration once when a
/// token is signed with a key the cache does not know yet.
#[derive(Debug, Clone)]
pub struct TokenValidator {
    cache: Arc<ProviderConfigurationCache>,
    options: Arc<AuthenticationOptions>,
}

impl TokenValidator {
    #[must_use]
    pub const fn new(
        cache: Arc<ProviderConfigurationCache>,
        options: Arc<AuthenticationOptions>,
    ) -> Self {
        Self { cache, options }
    }

    #[must_use]
    pub fn options(&self) -> &AuthenticationOptions {
        &self.options
    }

    #[must_use]
    pub const fn cache(&self) -> &Arc<ProviderConfigurationCache> {
        &self.cache
    }

    /// `Some` only for a token that passes every check.
    pub async fn validate(&self, credentials: Option<&Credentials>) -> Option<Principal> {
        match self.try_validate(credentials).await {
            Ok(principal) => Some(principal),
            Err(e) => {
                tracing::debug!(error = %e, "Bearer token not accepted");
                None
            }
        }
    }

    pub async fn try_validate(&self, credentials: Option<&Credentials>) -> Result<Principal> {
        let credentials = credentials
            .ok_or_else(|| AuthError::HeaderParse("missing Authorization header".into()))?;
        let token = credentials.bearer_token()?;
        self.validate_token(&token).await
    }

    /// At most two attempts: the second one only after an unknown key, and
    /// only after asking the cache for a refresh.
    pub async fn validate_token(&self, token: &BearerToken) -> Result<Principal> {
        let configuration = self.cache.get_configuration().await?;
        let kid = match validate_with(token, &configuration, &self.options) {
            ValidationAttempt::Valid(principal) => return Ok(principal),
            ValidationAttempt::Rejected(rejection) => return Err(reject(rejection)),
            ValidationAttempt::UnknownKey(kid) => kid,
        };

        tracing::info!(
            kid = kid.as_deref().unwrap_or("<none>"),
            "Token signed with unknown key, refreshing provider configuration"
        );
        #[cfg(feature = "metrics")]
        crate::observability::record_key_rotation_retry();

        self.cache.request_refresh();
        let configuration = self.cache.get_configuration().await?;

        match validate_with(token, &configuration, &self.options) {
            ValidationAttempt::Valid(principal) => Ok(principal),
            ValidationAttempt::Rejected(rejection) => Err(reject(rejection)),
            ValidationAttempt::UnknownKey(kid) => {
                #[cfg(feature = "metrics")]
                crate::observability::record_rejection("unknown_key");
                Err(AuthError::UnknownSigningKey(kid))
            }
        }
    }
}

fn reject(rejection: TokenRejection) -> AuthError {
    #[cfg(feature = "metrics")]
    crate::observability::record_rejection(rejection.label());
    AuthError::TokenValidation(rejection)
}
