//! Token helpers: HS256 signing and verification, unverified payload decoding,
//! and credential providers feeding bearer-style auth descriptors.

use crate::auth::AuthDescriptor;
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use jsonwebtoken::{
    decode, encode, get_current_timestamp, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::time::Duration;

/// Lifetime of tokens produced by [`TokenSigner::sign`].
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

#[derive(thiserror::Error, Debug)]
pub enum TokenError {
    #[error("Failed to sign token: {0}")]
    Signing(String),

    /// Signature, expiry or not-before check failed.
    #[error("Invalid token: {0}")]
    Invalid(String),

    /// Not three dot-separated segments, or the payload is not base64url JSON.
    #[error("Malformed token: {0}")]
    Malformed(String),

    #[error("Credentials unavailable: {0}")]
    Unavailable(String),
}

/// Registered time claims plus arbitrary custom claims.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
    #[serde(flatten)]
    pub custom: Map<String, Value>,
}

impl TokenClaims {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_claim(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.custom.insert(name.into(), value.into());
        self
    }

    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.custom.get(name)
    }
}

/// Signs and verifies HS256 tokens with a shared secret.
///
/// ```
/// use outcall::token::{TokenClaims, TokenSigner};
///
/// let signer = TokenSigner::new("s3cret");
/// let token = signer.sign(&TokenClaims::new().with_claim("sub", "user-1"))?;
/// let claims = signer.verify(&token)?;
///
/// assert_eq!(claims.claim("sub").and_then(|v| v.as_str()), Some("user-1"));
/// # Ok::<(), outcall::token::TokenError>(())
/// ```
#[derive(Clone)]
pub struct TokenSigner {
    secret: Vec<u8>,
    lifetime: Duration,
}

impl TokenSigner {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
            lifetime: DEFAULT_TOKEN_LIFETIME,
        }
    }

    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Signs `claims`, stamping `iat` and `nbf` with the current time and
    /// `exp` with the current time plus the signer's lifetime.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Signing`] if encoding fails.
    pub fn sign(&self, claims: &TokenClaims) -> Result<String, TokenError> {
        let now = get_current_timestamp();
        let mut claims = claims.clone();
        claims.iat = Some(now);
        claims.nbf = Some(now);
        claims.exp = Some(now + self.lifetime.as_secs());

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&self.secret),
        )
        .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verifies signature, `exp` and `nbf`, returning the claims.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Invalid`] if any check fails.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_nbf = true;

        decode::<TokenClaims>(token, &DecodingKey::from_secret(&self.secret), &validation)
            .map(|data| data.claims)
            .map_err(|e| TokenError::Invalid(e.to_string()))
    }
}

impl fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSigner")
            .field("secret", &crate::auth::REDACTED)
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

/// Reads a token's claims without checking its signature or times.
///
/// Only for display and routing decisions; never for authorization.
///
/// # Errors
///
/// Returns [`TokenError::Malformed`] if the token cannot be decoded.
pub fn decode_unverified(token: &str) -> Result<TokenClaims, TokenError> {
    let segments: Vec<&str> = token.split('.').collect();
    let [_, payload, _] = segments.as_slice() else {
        return Err(TokenError::Malformed(format!(
            "expected 3 segments, found {}",
            segments.len()
        )));
    };

    let bytes = general_purpose::URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| TokenError::Malformed(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| TokenError::Malformed(e.to_string()))
}

/// Supplies token values for bearer-style auth.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn token(&self) -> Result<String, TokenError>;
}

/// Always returns the same token.
pub struct StaticCredentials {
    token: String,
}

impl StaticCredentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn token(&self) -> Result<String, TokenError> {
        Ok(self.token.clone())
    }
}

/// Signs a fresh token from fixed claims on every request.
#[derive(Debug, Clone)]
pub struct SigningCredentials {
    signer: TokenSigner,
    claims: TokenClaims,
}

impl SigningCredentials {
    pub fn new(signer: TokenSigner, claims: TokenClaims) -> Self {
        Self { signer, claims }
    }
}

#[async_trait]
impl CredentialProvider for SigningCredentials {
    async fn token(&self) -> Result<String, TokenError> {
        self.signer.sign(&self.claims)
    }
}

async fn token_or_empty(provider: &dyn CredentialProvider) -> String {
    match provider.token().await {
        Ok(token) => token,
        Err(e) => {
            tracing::warn!(error = %e, "Credential provider failed; sending no auth header");
            String::new()
        }
    }
}

impl AuthDescriptor {
    /// Builds a bearer descriptor from a provider. A failing provider yields an
    /// empty token, so the descriptor contributes no header.
    pub async fn bearer_from(provider: &dyn CredentialProvider) -> Self {
        AuthDescriptor::bearer(token_or_empty(provider).await)
    }

    /// Like [`AuthDescriptor::bearer_from`], tagged as OAuth2.
    pub async fn oauth2_from(provider: &dyn CredentialProvider) -> Self {
        AuthDescriptor::oauth2(token_or_empty(provider).await)
    }
}
