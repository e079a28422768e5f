//! JWT claims types

use serde::Deserialize;

/// Audience can be a single string or array of strings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Self::One(s) => vec![s.clone()],
            Self::Many(v) => v.clone(),
        }
    }
}

/// Claims of a token whose signature has been verified
#[derive(Debug, Clone, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub iss: String,
    #[serde(default)]
    pub aud: Option<OneOrMany>,
    pub exp: i64,
    #[serde(default)]
    pub nbf: Option<i64>,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Claims read from a token before any verification.
///
/// Every field is optional: this is a structural decode only and must never
/// be used to make an access decision.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnverifiedClaims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub iss: Option<String>,
    #[serde(default)]
    pub aud: Option<OneOrMany>,
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default)]
    pub nbf: Option<i64>,
    #[serde(default)]
    pub iat: Option<i64>,
}

/// Identity established by a validated bearer token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Subject (`sub` claim), the owner id of the caller's records
    pub subject: String,
    pub issuer: String,
    pub audience: Vec<String>,
    /// Expiry as seconds since the Unix epoch
    pub expires_at: i64,
    pub issued_at: Option<i64>,
    pub email: Option<String>,
    pub name: Option<String>,
}

impl Principal {
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }
}

impl From<TokenClaims> for Principal {
    fn from(claims: TokenClaims) -> Self {
        Self {
            subject: claims.sub,
            issuer: claims.iss,
            audience: claims.aud.map(|aud| aud.to_vec()).unwrap_or_default(),
            expires_at: claims.exp,
            issued_at: claims.iat,
            email: claims.email,
            name: claims.name,
        }
    }
}
