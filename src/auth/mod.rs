//! Authentication and session token lifecycle.
//!
//! Short-lived access tokens are verified statelessly by [`require_auth`].
//! Long-lived refresh tokens are additionally tracked per identity and rotate
//! on every use; presenting one that has already been used revokes all of the
//! identity's sessions.

mod errors;
mod middleware;
mod service;

pub use errors::{AuthError, required};
pub use middleware::{AuthenticatedUser, bearer_token, require_auth};
pub use service::{AuthService, Registration, Session};
