//! Shared error handling for API endpoints.

use axum::{
    Json,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{error, warn};

use crate::auth::AuthError;
use crate::federated::FederatedError;

/// API error type with automatic response conversion.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Client-facing messages stay generic. "Unknown email" and "wrong password"
/// share one message so responses do not reveal which accounts exist.
impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Validation(msg) => ApiError::BadRequest(msg.to_string()),
            AuthError::UnknownEmail | AuthError::WrongPassword => {
                warn!(reason = %e, "Credential login rejected");
                ApiError::BadRequest("Wrong email or password".into())
            }
            AuthError::MissingBearer => ApiError::Unauthorized("Access denied".into()),
            AuthError::InvalidToken(_) => ApiError::Forbidden("Invalid token".into()),
            AuthError::ReplayDetected => ApiError::BadRequest("Invalid refresh token".into()),
            AuthError::NotFound => ApiError::NotFound("Invalid token".into()),
            AuthError::EmailTaken => ApiError::Conflict("Email already registered".into()),
            AuthError::Federated(
                FederatedError::Request(_) | FederatedError::NotConfigured,
            ) => {
                error!(error = %e, "Federated login unavailable");
                ApiError::Internal("Error signing in".into())
            }
            AuthError::Federated(_) => {
                warn!(error = %e, "Federated credential rejected");
                ApiError::BadRequest("Invalid credential".into())
            }
            AuthError::Issuance(_) => {
                error!(error = %e, "Token issuance failed");
                ApiError::Internal("Error generating tokens".into())
            }
            AuthError::Password(_) | AuthError::Database(_) => {
                error!(error = %e, "Internal error");
                ApiError::Internal("Internal server error".into())
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::Internal(msg) => msg,
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

/// JSON body extractor whose rejections are `ApiError::BadRequest`, so a
/// missing content type or a mistyped field gets the same `{"error"}` shape
/// as every other failure.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AuthError::Validation("x"), StatusCode::BAD_REQUEST),
            (AuthError::UnknownEmail, StatusCode::BAD_REQUEST),
            (AuthError::WrongPassword, StatusCode::BAD_REQUEST),
            (AuthError::MissingBearer, StatusCode::UNAUTHORIZED),
            (AuthError::InvalidToken("expired"), StatusCode::FORBIDDEN),
            (AuthError::ReplayDetected, StatusCode::BAD_REQUEST),
            (AuthError::NotFound, StatusCode::NOT_FOUND),
            (AuthError::EmailTaken, StatusCode::CONFLICT),
            (
                AuthError::Federated(FederatedError::MissingEmail),
                StatusCode::BAD_REQUEST,
            ),
            (
                AuthError::Federated(FederatedError::NotConfigured),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                AuthError::Issuance(crate::jwt::JwtError::MissingSecret),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn test_login_failures_share_message() {
        let unknown = ApiError::from(AuthError::UnknownEmail);
        let wrong = ApiError::from(AuthError::WrongPassword);
        match (unknown, wrong) {
            (ApiError::BadRequest(a), ApiError::BadRequest(b)) => assert_eq!(a, b),
            _ => panic!("both should be bad requests"),
        }
    }
}
