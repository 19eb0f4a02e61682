pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod db;
pub mod federated;
pub mod jwt;
pub mod password;
pub mod upload;

use api::create_api_router;
use auth::AuthService;
use axum::Router;
use config::AuthConfig;
use db::Database;
use federated::{FederatedError, GoogleIdTokenVerifier, IdTokenVerifier};
use jwt::JwtConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use upload::{PictureUploader, UploadError};
use url::Url;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// Token secret, lifetimes and federated client id
    pub auth: AuthConfig,
    /// Storage service endpoint for profile pictures. Uploads are skipped when unset.
    pub upload_url: Option<Url>,
}

/// Failure to build the HTTP clients the application depends on.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Failed to create federated verifier: {0}")]
    Federated(#[from] FederatedError),
    #[error("Failed to create upload client: {0}")]
    Upload(#[from] UploadError),
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Result<Router, StartupError> {
    let verifier = GoogleIdTokenVerifier::new(config.auth.google_client_id.clone())?;
    create_app_with_verifier(config, Arc::new(verifier))
}

/// Create the application router with a custom federated token verifier.
pub fn create_app_with_verifier(
    config: &ServerConfig,
    verifier: Arc<dyn IdTokenVerifier>,
) -> Result<Router, StartupError> {
    let jwt = Arc::new(JwtConfig::new(&config.auth));

    let uploader = config
        .upload_url
        .clone()
        .map(PictureUploader::new)
        .transpose()?;

    let service = AuthService::new(config.db.clone(), jwt, verifier, uploader);
    Ok(create_api_router(service))
}

/// Run the server on the given listener. This function blocks until the server exits.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config).map_err(std::io::Error::other)?;
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}
