//! `Authorization` header parsing and structural token decoding

use axum::http::{HeaderMap, header};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::{Algorithm, Header, decode_header};

use super::claims::UnverifiedClaims;
use super::error::{AuthError, Result, TokenRejection};

/// The only scheme this component accepts. Compared case-sensitively.
pub const BEARER_SCHEME: &str = "Bearer";

/// Scheme and parameter of an `Authorization` header value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub scheme: String,
    pub parameter: Option<String>,
}

impl Credentials {
    /// Split `<scheme> [parameter]` on the first run of whitespace.
    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim();
        if value.is_empty() {
            return Err(AuthError::HeaderParse("empty Authorization header".into()));
        }

        let (scheme, parameter) = match value.split_once(char::is_whitespace) {
            Some((scheme, rest)) => {
                let rest = rest.trim();
                (scheme, (!rest.is_empty()).then(|| rest.to_string()))
            }
            None => (value, None),
        };

        Ok(Self {
            scheme: scheme.to_string(),
            parameter,
        })
    }

    /// Read credentials from request headers.
    ///
    /// Fails when the header is absent, repeated or not visible ASCII.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self> {
        let mut values = headers.get_all(header::AUTHORIZATION).iter();
        let value = values
            .next()
            .ok_or_else(|| AuthError::HeaderParse("missing Authorization header".into()))?;
        if values.next().is_some() {
            return Err(AuthError::HeaderParse(
                "multiple Authorization headers".into(),
            ));
        }

        let value = value
            .to_str()
            .map_err(|_| AuthError::HeaderParse("Authorization header is not valid text".into()))?;
        Self::parse(value)
    }

    #[must_use]
    pub fn is_bearer(&self) -> bool {
        self.scheme == BEARER_SCHEME
    }

    /// Decode the parameter as a bearer token.
    ///
    /// Fails without touching the network when the scheme is not `Bearer`,
    /// the parameter is missing or the token is not a well-formed JWT.
    pub fn bearer_token(&self) -> Result<BearerToken> {
        if !self.is_bearer() {
            return Err(AuthError::HeaderParse(format!(
                "unsupported scheme '{}'",
                self.scheme
            )));
        }
        let parameter = self
            .parameter
            .as_deref()
            .ok_or_else(|| AuthError::HeaderParse("bearer token missing".into()))?;
        Ok(BearerToken::parse(parameter)?)
    }
}

/// Compact JWT with its header and payload decoded but not verified.
///
/// Lives for one request. The claims are only a structural view: access
/// decisions are made on the [`Principal`](super::claims::Principal) produced
/// by signature verification.
#[derive(Debug, Clone)]
pub struct BearerToken {
    raw: String,
    header: Header,
    claims: UnverifiedClaims,
}

impl BearerToken {
    pub fn parse(raw: &str) -> std::result::Result<Self, TokenRejection> {
        let header =
            decode_header(raw).map_err(|e| TokenRejection::Malformed(format!("header: {e}")))?;

        let mut segments = raw.split('.');
        let payload = match (segments.next(), segments.next(), segments.next(), segments.next()) {
            (Some(_), Some(payload), Some(_), None) => payload,
            _ => {
                return Err(TokenRejection::Malformed(
                    "expected three dot-separated segments".into(),
                ));
            }
        };

        let payload = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|e| TokenRejection::Malformed(format!("payload encoding: {e}")))?;
        let claims: UnverifiedClaims = serde_json::from_slice(&payload)
            .map_err(|e| TokenRejection::Malformed(format!("payload: {e}")))?;

        Ok(Self {
            raw: raw.to_string(),
            header,
            claims,
        })
    }

    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn key_id(&self) -> Option<&str> {
        self.header.kid.as_deref()
    }

    #[must_use]
    pub const fn algorithm(&self) -> Algorithm {
        self.header.alg
    }

    #[must_use]
    pub const fn unverified_claims(&self) -> &UnverifiedClaims {
        &self.claims
    }
}
