//! Bearer-token gate for protected routes.
//!
//! Verification is stateless: only the signature and expiry of the access
//! token are checked, the user store is never consulted. A deleted identity's
//! access token keeps working until it expires.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

use super::errors::AuthError;
use crate::api::ApiError;
use crate::jwt::{JwtConfig, TokenVerdict};

/// Identity attached to a request by [`require_auth`].
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// Identity UUID from the token subject
    pub id: String,
    /// Email, when the access token carries one
    pub email: Option<String>,
}

/// Extract the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return None;
    }
    Some(token)
}

/// Middleware rejecting requests without a valid access token.
/// On success the [`AuthenticatedUser`] is inserted into the request extensions.
pub async fn require_auth(
    State(jwt): State<Arc<JwtConfig>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers()).ok_or(AuthError::MissingBearer)?;

    match jwt.verify_access(token).map_err(AuthError::from)? {
        TokenVerdict::Valid(claims) => {
            request.extensions_mut().insert(AuthenticatedUser {
                id: claims.sub,
                email: claims.email,
            });
            Ok(next.run(request).await)
        }
        other => {
            debug!(verdict = other.label(), "Rejected access token");
            Err(AuthError::InvalidToken(other.label()).into())
        }
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| AuthError::MissingBearer.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_bearer_token_simple() {
        assert_eq!(bearer_token(&headers("Bearer abc.def.ghi")), Some("abc.def.ghi"));
    }

    #[test]
    fn test_bearer_scheme_case_insensitive() {
        assert_eq!(bearer_token(&headers("bearer abc")), Some("abc"));
    }

    #[test]
    fn test_bearer_token_missing() {
        assert_eq!(bearer_token(&HeaderMap::new()), None);
        assert_eq!(bearer_token(&headers("Bearer")), None);
        assert_eq!(bearer_token(&headers("Bearer   ")), None);
        assert_eq!(bearer_token(&headers("Basic dXNlcjpwdw==")), None);
    }
}
