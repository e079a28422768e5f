//! Authentication error types

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Reason a structurally present token was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenRejection {
    #[error("token expired")]
    Expired,

    #[error("token not yet valid")]
    NotYetValid,

    #[error("invalid issuer")]
    InvalidIssuer,

    #[error("invalid audience")]
    InvalidAudience,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("token algorithm does not match signing key")]
    AlgorithmMismatch,

    #[error("missing required claim: {0}")]
    MissingClaim(String),

    #[error("malformed token: {0}")]
    Malformed(String),
}

impl TokenRejection {
    /// Stable label used for logs and metrics.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Expired => "expired",
            Self::NotYetValid => "not_yet_valid",
            Self::InvalidIssuer => "invalid_issuer",
            Self::InvalidAudience => "invalid_audience",
            Self::InvalidSignature => "invalid_signature",
            Self::AlgorithmMismatch => "algorithm_mismatch",
            Self::MissingClaim(_) => "missing_claim",
            Self::Malformed(_) => "malformed",
        }
    }
}

impl From<jsonwebtoken::errors::Error> for TokenRejection {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::ImmatureSignature => Self::NotYetValid,
            ErrorKind::InvalidIssuer => Self::InvalidIssuer,
            ErrorKind::InvalidAudience => Self::InvalidAudience,
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            ErrorKind::InvalidAlgorithm => Self::AlgorithmMismatch,
            ErrorKind::MissingRequiredClaim(claim) => Self::MissingClaim(claim.clone()),
            _ => Self::Malformed(err.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("OIDC discovery failed: {0}")]
    Discovery(String),

    #[error("signing key not found: {}", .0.as_deref().unwrap_or("<no kid>"))]
    UnknownSigningKey(Option<String>),

    #[error("token validation failed: {0}")]
    TokenValidation(#[from] TokenRejection),

    #[error("invalid authorization header: {0}")]
    HeaderParse(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl AuthError {
    #[must_use]
    pub const fn is_discovery(&self) -> bool {
        matches!(self, Self::Discovery(_))
    }

    #[must_use]
    pub const fn is_unknown_signing_key(&self) -> bool {
        matches!(self, Self::UnknownSigningKey(_))
    }

    #[must_use]
    pub const fn rejection(&self) -> Option<&TokenRejection> {
        match self {
            Self::TokenValidation(rejection) => Some(rejection),
            _ => None,
        }
    }

    /// Every authentication failure is reported to the client as 401.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }
}

/// 401 with a `Bearer` challenge and no detail about why.
pub fn unauthorized_response() -> Response {
    let mut response = (StatusCode::UNAUTHORIZED, "authentication required").into_response();
    response.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Bearer"),
    );
    response
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        // Provider details stay in the logs, the client only learns it was refused
        unauthorized_response()
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
