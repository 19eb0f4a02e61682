mod common;

use axum::http::StatusCode;
use common::{TEST_SECRET, TestApp, bearer};
use jsonwebtoken::{EncodingKey, Header};
use postauth::jwt::{Claims, TokenType};
use std::time::{SystemTime, UNIX_EPOCH};

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

fn sign(claims: &Claims, secret: &[u8]) -> String {
    jsonwebtoken::encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret),
    )
    .unwrap()
}

fn access_claims(sub: &str, iat: u64, exp: u64) -> Claims {
    Claims {
        sub: sub.to_string(),
        nonce: 7,
        email: None,
        token_type: TokenType::Access,
        iat,
        exp,
    }
}

#[tokio::test]
async fn test_missing_header_is_unauthorized() {
    let app = TestApp::new().await;

    let (status, body) = app.get_session(None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Access denied");
}

#[tokio::test]
async fn test_non_bearer_scheme_is_unauthorized() {
    let app = TestApp::new().await;

    let (status, _) = app.get_session(Some("Basic dXNlcjpwYXNz")).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_malformed_token_is_forbidden() {
    let app = TestApp::new().await;

    let (status, body) = app.get_session(Some("Bearer not.a.jwt")).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Invalid token");
}

#[tokio::test]
async fn test_expired_token_is_forbidden() {
    let app = TestApp::new().await;
    let token = sign(&access_claims("someone", now() - 120, now() - 60), TEST_SECRET);

    let (status, _) = app.get_session(Some(&format!("Bearer {}", token))).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_foreign_signature_is_forbidden() {
    let app = TestApp::new().await;
    let token = sign(
        &access_claims("someone", now(), now() + 600),
        b"some-other-secret-that-is-long-enough",
    );

    let (status, _) = app.get_session(Some(&format!("Bearer {}", token))).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_refresh_token_is_not_an_access_token() {
    let app = TestApp::new().await;
    app.register("a@x.com", "alice", "pw1").await;
    let login = app.login("a@x.com", "pw1").await;

    let (status, _) = app
        .get_session(Some(&bearer(&login["refreshToken"])))
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_verification_is_stateless() {
    let app = TestApp::new().await;
    app.register("a@x.com", "alice", "pw1").await;
    let login = app.login("a@x.com", "pw1").await;

    let user = app.db.users().get_by_email("a@x.com").await.unwrap().unwrap();
    app.db.users().delete(user.id).await.unwrap();

    // The identity is gone but its access token is still honoured until expiry
    let (status, body) = app.get_session(Some(&bearer(&login["accessToken"]))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], login["id"]);
}

#[tokio::test]
async fn test_logout_does_not_revoke_access_token() {
    let app = TestApp::new().await;
    app.register("a@x.com", "alice", "pw1").await;
    let login = app.login("a@x.com", "pw1").await;

    let (status, _) = app
        .post_json(
            "/logout",
            serde_json::json!({"refreshToken": login["refreshToken"]}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get_session(Some(&bearer(&login["accessToken"]))).await;
    assert_eq!(status, StatusCode::OK);
}
