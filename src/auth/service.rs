//! Login, federated login, refresh rotation, logout and registration.
//!
//! Every operation that touches an identity's refresh token set goes through
//! the atomic primitives of [`TokenStore`](crate::db::TokenStore); nothing here
//! reads the set, edits it in memory and writes it back.

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::errors::{AuthError, required};
use crate::db::{Database, NewUser, Rotation, User, is_unique_violation};
use crate::federated::IdTokenVerifier;
use crate::jwt::{Claims, JwtConfig, TokenPair, TokenVerdict};
use crate::password::{hash_password, verify_password};
use crate::upload::{PictureUploader, UploadedFile};

/// Input for creating a password account.
#[derive(Debug, Default)]
pub struct Registration {
    pub email: Option<String>,
    pub user_name: Option<String>,
    pub password: Option<String>,
    pub file: Option<UploadedFile>,
}

/// A successful login: the identity and its new session tokens.
#[derive(Debug)]
pub struct Session {
    pub user: User,
    pub tokens: TokenPair,
}

#[derive(Clone)]
pub struct AuthService {
    db: Database,
    jwt: Arc<JwtConfig>,
    verifier: Arc<dyn IdTokenVerifier>,
    uploader: Option<PictureUploader>,
}

impl AuthService {
    pub fn new(
        db: Database,
        jwt: Arc<JwtConfig>,
        verifier: Arc<dyn IdTokenVerifier>,
        uploader: Option<PictureUploader>,
    ) -> Self {
        Self {
            db,
            jwt,
            verifier,
            uploader,
        }
    }

    pub fn jwt(&self) -> &Arc<JwtConfig> {
        &self.jwt
    }

    /// Create a password account. A failed picture upload does not fail registration.
    pub async fn register(&self, registration: Registration) -> Result<User, AuthError> {
        const MISSING: &str = "Email, username, and password required";
        let email = required(registration.email.as_deref(), MISSING)?;
        let user_name = required(registration.user_name.as_deref(), MISSING)?;
        let password = required(registration.password.as_deref(), MISSING)?;

        let password_hash = hash_password(password.to_string()).await?;

        let profile_picture_url = match (registration.file, &self.uploader) {
            (Some(file), Some(uploader)) => match uploader.upload(file).await {
                Ok(url) => Some(url),
                Err(e) => {
                    warn!(error = %e, "Profile picture upload failed, continuing without it");
                    None
                }
            },
            (Some(_), None) => {
                debug!("No upload service configured, ignoring profile picture");
                None
            }
            (None, _) => None,
        };

        let uuid = uuid::Uuid::new_v4().to_string();
        let new_user = NewUser {
            uuid: &uuid,
            email,
            user_name,
            password_hash: Some(&password_hash),
            profile_picture_url: profile_picture_url.as_deref(),
            google_id: None,
        };

        let id = self.db.users().create(&new_user).await.map_err(|e| {
            if is_unique_violation(&e) {
                AuthError::EmailTaken
            } else {
                AuthError::Database(e)
            }
        })?;

        info!(identity = %uuid, "Registered identity");

        Ok(User {
            id,
            uuid,
            email: email.to_string(),
            user_name: user_name.to_string(),
            password_hash: Some(password_hash),
            profile_picture_url,
            google_id: None,
        })
    }

    /// Password login. Appends one refresh token to the identity's set.
    pub async fn login(
        &self,
        email: Option<&str>,
        password: Option<&str>,
    ) -> Result<Session, AuthError> {
        const MISSING: &str = "Email and password required";
        let email = required(email, MISSING)?;
        let password = required(password, MISSING)?;

        let user = self
            .db
            .users()
            .get_by_email(email)
            .await?
            .ok_or(AuthError::UnknownEmail)?;

        // Federation-only accounts have no password to match.
        let Some(hash) = user.password_hash.clone() else {
            return Err(AuthError::WrongPassword);
        };
        if !verify_password(password.to_string(), hash).await? {
            return Err(AuthError::WrongPassword);
        }

        let tokens = self.start_session(&user, None).await?;
        info!(identity = %user.uuid, "Password login");
        Ok(Session { user, tokens })
    }

    /// Login with a provider-issued identity token, provisioning the identity on first use.
    pub async fn google_sign_in(&self, credential: Option<&str>) -> Result<Session, AuthError> {
        let credential = required(credential, "Credential required")?;

        let identity = self.verifier.verify(credential).await?;

        let uuid = uuid::Uuid::new_v4().to_string();
        let user = self
            .db
            .users()
            .find_or_create_by_email(&NewUser {
                uuid: &uuid,
                email: &identity.email,
                user_name: default_user_name(&identity.email),
                password_hash: None,
                profile_picture_url: identity.picture.as_deref(),
                google_id: Some(&identity.subject),
            })
            .await?;

        let created = user.uuid == uuid;
        let tokens = self.start_session(&user, Some(&user.email)).await?;
        info!(identity = %user.uuid, created, "Federated login");
        Ok(Session { user, tokens })
    }

    /// Exchange a live refresh token for a new pair.
    ///
    /// A validly signed token missing from its identity's set is treated as a
    /// replay: every session of that identity is revoked and the call fails.
    pub async fn refresh(&self, refresh_token: Option<&str>) -> Result<TokenPair, AuthError> {
        let presented = required(refresh_token, "Refresh token required")?.trim();
        let claims = self.verify_refresh(presented)?;

        let user = self
            .db
            .users()
            .get_by_uuid(&claims.sub)
            .await?
            .ok_or(AuthError::NotFound)?;

        let tokens = self.jwt.issue_pair(&user.uuid, None)?;

        match self
            .db
            .tokens()
            .rotate(user.id, presented, &tokens.refresh_token)
            .await?
        {
            Rotation::Rotated => {
                debug!(identity = %user.uuid, "Rotated refresh token");
                Ok(tokens)
            }
            Rotation::ReplayDetected { revoked } => {
                warn!(
                    identity = %user.uuid,
                    revoked,
                    "Refresh token reuse detected, revoked all sessions"
                );
                Err(AuthError::ReplayDetected)
            }
        }
    }

    /// Revoke one refresh token. Repeating the call with the same token succeeds.
    pub async fn logout(&self, refresh_token: Option<&str>) -> Result<(), AuthError> {
        let presented = required(refresh_token, "Refresh token required")?.trim();
        let claims = self.verify_refresh(presented)?;

        let user = self
            .db
            .users()
            .get_by_uuid(&claims.sub)
            .await?
            .ok_or(AuthError::NotFound)?;

        let removed = self.db.tokens().remove(user.id, presented).await?;
        info!(identity = %user.uuid, removed, "Logout");
        Ok(())
    }

    fn verify_refresh(&self, token: &str) -> Result<Claims, AuthError> {
        match self.jwt.verify_refresh(token)? {
            TokenVerdict::Valid(claims) => Ok(claims),
            other => {
                debug!(verdict = other.label(), "Rejected refresh token");
                Err(AuthError::InvalidToken(other.label()))
            }
        }
    }

    async fn start_session(
        &self,
        user: &User,
        email: Option<&str>,
    ) -> Result<TokenPair, AuthError> {
        let tokens = self.jwt.issue_pair(&user.uuid, email)?;
        self.db
            .tokens()
            .append(user.id, &tokens.refresh_token)
            .await?;
        Ok(tokens)
    }
}

/// Display name for a federated account: the email's local part.
fn default_user_name(email: &str) -> &str {
    match email.split_once('@') {
        Some((local, _)) if !local.is_empty() => local,
        _ => email,
    }
}
