//! JWT token generation and validation.
//!
//! Access and refresh tokens are HS256 JWTs signed with the same shared secret.
//! Each token carries the identity id and its own random nonce, so two tokens
//! minted for the same identity within the same second are still distinct.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

use crate::config::AuthConfig;

/// Token type for distinguishing access vs refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Short-lived, verified statelessly on every protected request
    Access,
    /// Long-lived, must also be present in the identity's refresh token set
    Refresh,
}

/// JWT claims shared by both token kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (identity UUID)
    pub sub: String,
    /// Random per-token nonce
    pub nonce: u64,
    /// Email, only embedded in access tokens minted by federated login
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "typ")]
    pub token_type: TokenType,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Outcome of verifying a presented token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenVerdict {
    Valid(Claims),
    Expired,
    Malformed,
    SignatureMismatch,
}

impl TokenVerdict {
    pub fn into_claims(self) -> Option<Claims> {
        match self {
            TokenVerdict::Valid(claims) => Some(claims),
            _ => None,
        }
    }

    /// Short label for logging rejected tokens.
    pub fn label(&self) -> &'static str {
        match self {
            TokenVerdict::Valid(_) => "valid",
            TokenVerdict::Expired => "expired",
            TokenVerdict::Malformed => "malformed",
            TokenVerdict::SignatureMismatch => "signature_mismatch",
        }
    }
}

/// A freshly minted access/refresh token pair.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Clone)]
struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

/// Token issuer and verifier.
#[derive(Clone)]
pub struct JwtConfig {
    keys: Option<Keys>,
    access_ttl_secs: u64,
    refresh_ttl_secs: u64,
}

impl JwtConfig {
    pub fn new(config: &AuthConfig) -> Self {
        let keys = config.token_secret.as_deref().map(|secret| Keys {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        });

        Self {
            keys,
            access_ttl_secs: config.access_token_ttl.as_secs(),
            refresh_ttl_secs: config.refresh_token_ttl.as_secs(),
        }
    }

    /// Mint an access/refresh pair for an identity.
    /// Either both tokens are produced or neither is.
    pub fn issue_pair(
        &self,
        identity_id: &str,
        email: Option<&str>,
    ) -> Result<TokenPair, JwtError> {
        let keys = self.keys.as_ref().ok_or(JwtError::MissingSecret)?;
        let now = now_secs()?;

        let access = Claims {
            sub: identity_id.to_string(),
            nonce: rand::random(),
            email: email.map(str::to_string),
            token_type: TokenType::Access,
            iat: now,
            exp: now.saturating_add(self.access_ttl_secs),
        };

        let refresh = Claims {
            sub: identity_id.to_string(),
            nonce: rand::random(),
            email: None,
            token_type: TokenType::Refresh,
            iat: now,
            exp: now.saturating_add(self.refresh_ttl_secs),
        };

        let access_token = jsonwebtoken::encode(&Header::default(), &access, &keys.encoding)
            .map_err(JwtError::Encoding)?;
        let refresh_token = jsonwebtoken::encode(&Header::default(), &refresh, &keys.encoding)
            .map_err(JwtError::Encoding)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Verify an access token's signature and expiry.
    pub fn verify_access(&self, token: &str) -> Result<TokenVerdict, JwtError> {
        self.verify(token, TokenType::Access)
    }

    /// Verify a refresh token's signature and expiry. Set membership is checked by the caller.
    pub fn verify_refresh(&self, token: &str) -> Result<TokenVerdict, JwtError> {
        self.verify(token, TokenType::Refresh)
    }

    fn verify(&self, token: &str, expected: TokenType) -> Result<TokenVerdict, JwtError> {
        let keys = self.keys.as_ref().ok_or(JwtError::MissingSecret)?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let verdict = match jsonwebtoken::decode::<Claims>(token, &keys.decoding, &validation) {
            Ok(data) if data.claims.token_type == expected => TokenVerdict::Valid(data.claims),
            Ok(_) => TokenVerdict::Malformed,
            Err(e) => match e.kind() {
                ErrorKind::ExpiredSignature => TokenVerdict::Expired,
                ErrorKind::InvalidSignature => TokenVerdict::SignatureMismatch,
                _ => TokenVerdict::Malformed,
            },
        };
        Ok(verdict)
    }
}

fn now_secs() -> Result<u64, JwtError> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| JwtError::TimeError)?
        .as_secs())
}

/// Errors that can occur during JWT operations.
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Token secret is not configured")]
    MissingSecret,
    #[error("Failed to encode token: {0}")]
    Encoding(jsonwebtoken::errors::Error),
    #[error("System time error")]
    TimeError,
}
