//! Immutable authentication configuration, built once at startup.

use std::time::Duration;

/// Default access token lifetime.
pub const DEFAULT_ACCESS_TOKEN_TTL: Duration = Duration::from_secs(15 * 60);

/// Default refresh token lifetime.
pub const DEFAULT_REFRESH_TOKEN_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Settings consumed by token issuance, request verification and federated login.
#[derive(Clone)]
pub struct AuthConfig {
    /// Shared HMAC secret for both token kinds. `None` disables issuance.
    pub token_secret: Option<Vec<u8>>,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    /// OAuth client id that federated identity tokens must be issued for.
    pub google_client_id: Option<String>,
}

impl AuthConfig {
    pub fn new(token_secret: impl Into<Vec<u8>>) -> Self {
        Self {
            token_secret: Some(token_secret.into()),
            access_token_ttl: DEFAULT_ACCESS_TOKEN_TTL,
            refresh_token_ttl: DEFAULT_REFRESH_TOKEN_TTL,
            google_client_id: None,
        }
    }

    pub fn with_ttls(mut self, access: Duration, refresh: Duration) -> Self {
        self.access_token_ttl = access;
        self.refresh_token_ttl = refresh;
        self
    }

    pub fn with_google_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.google_client_id = Some(client_id.into());
        self
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token_secret", &self.token_secret.as_ref().map(|_| "<redacted>"))
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field("google_client_id", &self.google_client_id)
            .finish()
    }
}
