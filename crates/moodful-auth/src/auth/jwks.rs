//! Signing key set published by the identity provider

use jsonwebtoken::{Algorithm, DecodingKey};
use serde::Deserialize;

use super::error::{AuthError, Result};

/// JSON Web Key
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    /// Key ID
    #[serde(default)]
    pub kid: Option<String>,
    /// Key type (RSA, EC, OKP)
    pub kty: String,
    /// Algorithm
    #[serde(default)]
    pub alg: Option<String>,
    /// Key usage
    #[serde(default)]
    pub r#use: Option<String>,
    // RSA components
    #[serde(default)]
    pub n: Option<String>,
    #[serde(default)]
    pub e: Option<String>,
    // EC / OKP components
    #[serde(default)]
    pub crv: Option<String>,
    #[serde(default)]
    pub x: Option<String>,
    #[serde(default)]
    pub y: Option<String>,
}

/// JSON Web Key Set
#[derive(Debug, Clone, Deserialize)]
pub struct JwkSet {
    pub keys: Vec<Jwk>,
}

/// Verification key usable by the token validator
#[derive(Clone)]
pub struct SigningKey {
    pub kid: Option<String>,
    pub algorithm: Algorithm,
    pub key: DecodingKey,
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("kid", &self.kid)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

/// Ordered set of verification keys, in the order the provider published them
#[derive(Debug, Clone, Default)]
pub struct SigningKeySet {
    keys: Vec<SigningKey>,
}

impl SigningKeySet {
    #[must_use]
    pub const fn new(keys: Vec<SigningKey>) -> Self {
        Self { keys }
    }

    /// Convert a published JWKS, skipping keys that cannot sign tokens.
    pub fn from_jwks(jwks: &JwkSet) -> Result<Self> {
        let mut keys = Vec::with_capacity(jwks.keys.len());

        for jwk in &jwks.keys {
            if jwk.r#use.as_deref().is_some_and(|u| u != "sig") {
                tracing::debug!(kid = ?jwk.kid, "Skipping non-signing key");
                continue;
            }
            if let Some((key, algorithm)) = decode_jwk(jwk)? {
                keys.push(SigningKey {
                    kid: jwk.kid.clone(),
                    algorithm,
                    key,
                });
            }
        }

        Ok(Self { keys })
    }

    /// Keys published under `kid`
    pub fn with_kid<'a>(&'a self, kid: &'a str) -> impl Iterator<Item = &'a SigningKey> + 'a {
        self.keys
            .iter()
            .filter(move |entry| entry.kid.as_deref() == Some(kid))
    }

    /// Keys usable for `alg`, for tokens that carry no kid
    pub fn with_algorithm(&self, alg: Algorithm) -> impl Iterator<Item = &SigningKey> + '_ {
        self.keys.iter().filter(move |entry| entry.algorithm == alg)
    }

    #[must_use]
    pub fn contains_kid(&self, kid: &str) -> bool {
        self.with_kid(kid).next().is_some()
    }

    pub fn kids(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().filter_map(|entry| entry.kid.as_deref())
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

fn decode_jwk(jwk: &Jwk) -> Result<Option<(DecodingKey, Algorithm)>> {
    let alg = match jwk.alg.as_deref() {
        Some("RS256") => Algorithm::RS256,
        Some("RS384") => Algorithm::RS384,
        Some("RS512") => Algorithm::RS512,
        Some("PS256") => Algorithm::PS256,
        Some("PS384") => Algorithm::PS384,
        Some("PS512") => Algorithm::PS512,
        Some("ES256") => Algorithm::ES256,
        Some("ES384") => Algorithm::ES384,
        Some("EdDSA") => Algorithm::EdDSA,
        None => {
            // Infer from key type
            match jwk.kty.as_str() {
                "RSA" => Algorithm::RS256,
                "EC" => match jwk.crv.as_deref() {
                    Some("P-256") => Algorithm::ES256,
                    Some("P-384") => Algorithm::ES384,
                    _ => return Ok(None),
                },
                "OKP" if jwk.crv.as_deref() == Some("Ed25519") => Algorithm::EdDSA,
                _ => return Ok(None),
            }
        }
        Some(other) => {
            tracing::debug!(alg = other, "Skipping key with unsupported algorithm");
            return Ok(None);
        }
    };

    let key = match jwk.kty.as_str() {
        "RSA" => {
            let n = jwk
                .n
                .as_ref()
                .ok_or_else(|| AuthError::Discovery("Missing 'n' in RSA key".into()))?;
            let e = jwk
                .e
                .as_ref()
                .ok_or_else(|| AuthError::Discovery("Missing 'e' in RSA key".into()))?;
            DecodingKey::from_rsa_components(n, e)
                .map_err(|e| AuthError::Discovery(format!("Invalid RSA components: {e}")))?
        }
        "EC" => {
            let x = jwk
                .x
                .as_ref()
                .ok_or_else(|| AuthError::Discovery("Missing 'x' in EC key".into()))?;
            let y = jwk
                .y
                .as_ref()
                .ok_or_else(|| AuthError::Discovery("Missing 'y' in EC key".into()))?;
            DecodingKey::from_ec_components(x, y)
                .map_err(|e| AuthError::Discovery(format!("Invalid EC components: {e}")))?
        }
        "OKP" => {
            if jwk.crv.as_deref() != Some("Ed25519") {
                tracing::debug!(crv = ?jwk.crv, "Skipping unsupported OKP curve");
                return Ok(None);
            }
            let x = jwk
                .x
                .as_ref()
                .ok_or_else(|| AuthError::Discovery("Missing 'x' in OKP key".into()))?;
            DecodingKey::from_ed_components(x)
                .map_err(|e| AuthError::Discovery(format!("Invalid OKP components: {e}")))?
        }
        other => {
            tracing::debug!(kty = other, "Skipping unsupported key type");
            return Ok(None);
        }
    };

    Ok(Some((key, alg)))
}
