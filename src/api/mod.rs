mod auth;
mod error;

use axum::Router;

use crate::auth::AuthService;

pub use error::ApiError;

/// Create the API router.
pub fn create_api_router(service: AuthService) -> Router {
    auth::router(service)
}
