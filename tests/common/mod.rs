#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use futures::future::BoxFuture;
use postauth::{
    ServerConfig,
    config::AuthConfig,
    create_app_with_verifier,
    db::Database,
    federated::{FederatedError, FederatedIdentity, IdTokenVerifier},
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;
use url::Url;

pub const TEST_SECRET: &[u8] = b"integration-test-secret-0123456789";

/// Federated verifier that accepts a fixed set of credentials.
pub struct StubVerifier;

impl IdTokenVerifier for StubVerifier {
    fn verify<'a>(
        &'a self,
        id_token: &'a str,
    ) -> BoxFuture<'a, Result<FederatedIdentity, FederatedError>> {
        Box::pin(async move {
            match id_token {
                "google-alice" => Ok(FederatedIdentity {
                    subject: "google-sub-alice".to_string(),
                    email: "alice@gmail.com".to_string(),
                    picture: Some("https://example.com/alice.png".to_string()),
                }),
                "google-no-email" => Err(FederatedError::MissingEmail),
                _ => Err(FederatedError::AudienceMismatch),
            }
        })
    }
}

pub struct TestApp {
    pub router: Router,
    pub db: Database,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(AuthConfig::new(TEST_SECRET.to_vec()), None).await
    }

    pub async fn with_config(auth: AuthConfig, upload_url: Option<Url>) -> Self {
        let db = Database::open(":memory:")
            .await
            .expect("Failed to open test database");
        let config = ServerConfig {
            db: db.clone(),
            auth,
            upload_url,
        };
        let router = create_app_with_verifier(&config, Arc::new(StubVerifier))
            .expect("Failed to create app");
        Self { router, db }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body.to_vec())
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let (status, bytes) = self
            .send(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await;
        (status, parse_body(&bytes))
    }

    pub async fn get_session(&self, authorization: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method("GET").uri("/session");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        let (status, bytes) = self.send(builder.body(Body::empty()).unwrap()).await;
        (status, parse_body(&bytes))
    }

    /// Register a password account through the JSON endpoint.
    pub async fn register(&self, email: &str, user_name: &str, password: &str) {
        let (status, _) = self
            .post_json(
                "/register",
                serde_json::json!({"email": email, "userName": user_name, "password": password}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    /// Log in and return the full response body.
    pub async fn login(&self, email: &str, password: &str) -> Value {
        let (status, body) = self
            .post_json(
                "/login",
                serde_json::json!({"email": email, "password": password}),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        body
    }
}

/// JSON bodies parse to a value; plain text bodies become a JSON string.
fn parse_body(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

pub fn bearer(token: &Value) -> String {
    format!("Bearer {}", token.as_str().expect("token should be a string"))
}
