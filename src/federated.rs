//! Verification of externally issued identity tokens (Google Sign-In).
//!
//! The verifier is an external collaborator: it either returns the identity the
//! provider vouches for, or an error that fails the whole federated login.

use futures::future::BoxFuture;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Google's token introspection endpoint.
pub const GOOGLE_TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

const GOOGLE_ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Identity asserted by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederatedIdentity {
    /// Provider subject id
    pub subject: String,
    pub email: String,
    pub picture: Option<String>,
}

#[derive(Debug, Error)]
pub enum FederatedError {
    #[error("Federated login is not configured")]
    NotConfigured,
    #[error("Identity provider request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Identity provider rejected the token (status {0})")]
    Rejected(u16),
    #[error("Token audience does not match the configured client id")]
    AudienceMismatch,
    #[error("Token issuer is not trusted")]
    IssuerMismatch,
    #[error("Token has no email claim")]
    MissingEmail,
}

/// Verifies an identity token's signature and audience.
pub trait IdTokenVerifier: Send + Sync {
    fn verify<'a>(
        &'a self,
        id_token: &'a str,
    ) -> BoxFuture<'a, Result<FederatedIdentity, FederatedError>>;
}

/// Claims returned by the tokeninfo endpoint. All values arrive as strings.
#[derive(Debug, Deserialize)]
struct TokenInfo {
    aud: String,
    iss: String,
    sub: String,
    email: Option<String>,
    picture: Option<String>,
}

/// Verifier backed by Google's tokeninfo endpoint, which checks the signature and expiry.
pub struct GoogleIdTokenVerifier {
    client: reqwest::Client,
    endpoint: Url,
    client_id: Option<String>,
}

impl GoogleIdTokenVerifier {
    pub fn new(client_id: Option<String>) -> Result<Self, FederatedError> {
        let endpoint = Url::parse(GOOGLE_TOKENINFO_URL).map_err(|_| FederatedError::NotConfigured)?;
        Self::with_endpoint(client_id, endpoint)
    }

    pub fn with_endpoint(client_id: Option<String>, endpoint: Url) -> Result<Self, FederatedError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            endpoint,
            client_id,
        })
    }

    async fn verify_inner(&self, id_token: &str) -> Result<FederatedIdentity, FederatedError> {
        let client_id = self
            .client_id
            .as_deref()
            .ok_or(FederatedError::NotConfigured)?;

        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[("id_token", id_token)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FederatedError::Rejected(response.status().as_u16()));
        }

        let info: TokenInfo = response.json().await?;
        check_token_info(info, client_id)
    }
}

impl IdTokenVerifier for GoogleIdTokenVerifier {
    fn verify<'a>(
        &'a self,
        id_token: &'a str,
    ) -> BoxFuture<'a, Result<FederatedIdentity, FederatedError>> {
        Box::pin(self.verify_inner(id_token))
    }
}

fn check_token_info(info: TokenInfo, client_id: &str) -> Result<FederatedIdentity, FederatedError> {
    if info.aud != client_id {
        return Err(FederatedError::AudienceMismatch);
    }
    if !GOOGLE_ISSUERS.contains(&info.iss.as_str()) {
        return Err(FederatedError::IssuerMismatch);
    }
    let email = info
        .email
        .filter(|e| !e.trim().is_empty())
        .ok_or(FederatedError::MissingEmail)?;

    Ok(FederatedIdentity {
        subject: info.sub,
        email,
        picture: info.picture.filter(|p| !p.is_empty()),
    })
}
