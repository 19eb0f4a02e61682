//! Authentication endpoints.

use axum::{
    Json, Router,
    extract::{FromRequest, Multipart, Request, State},
    http::header,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use super::error::{ApiError, JsonBody};
use crate::auth::{AuthService, AuthenticatedUser, Registration, Session, require_auth};
use crate::upload::UploadedFile;

pub fn router(service: AuthService) -> Router {
    let protected = Router::new()
        .route("/session", get(session))
        .route_layer(middleware::from_fn_with_state(
            service.jwt().clone(),
            require_auth,
        ));

    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/google-signin", post(google_signin))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .with_state(service)
        .merge(protected)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest {
    email: Option<String>,
    user_name: Option<String>,
    password: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterResponse {
    user_name: String,
    email: String,
    profile_picture_url: Option<String>,
}

async fn register(
    State(service): State<AuthService>,
    request: Request,
) -> Result<impl IntoResponse, ApiError> {
    let registration = if is_multipart(&request) {
        let multipart = Multipart::from_request(request, &service)
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        read_registration_form(multipart).await?
    } else {
        let JsonBody(body) = JsonBody::<RegisterRequest>::from_request(request, &service).await?;
        Registration {
            email: body.email,
            user_name: body.user_name,
            password: body.password,
            file: None,
        }
    };

    let user = service.register(registration).await?;

    Ok(Json(RegisterResponse {
        user_name: user.user_name,
        email: user.email,
        profile_picture_url: user.profile_picture_url,
    }))
}

fn is_multipart(request: &Request) -> bool {
    request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"))
}

async fn read_registration_form(mut multipart: Multipart) -> Result<Registration, ApiError> {
    let mut registration = Registration::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" | "profilePicture" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(e.body_text()))?;
                if !bytes.is_empty() {
                    registration.file = Some(UploadedFile {
                        file_name,
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            "email" | "userName" | "password" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(e.body_text()))?;
                match name.as_str() {
                    "email" => registration.email = Some(value),
                    "userName" => registration.user_name = Some(value),
                    _ => registration.password = Some(value),
                }
            }
            _ => {}
        }
    }

    Ok(registration)
}

#[derive(Deserialize)]
struct LoginRequest {
    email: Option<String>,
    password: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    user_name: String,
    email: String,
    id: String,
    access_token: String,
    refresh_token: String,
}

impl From<Session> for SessionResponse {
    fn from(session: Session) -> Self {
        Self {
            user_name: session.user.user_name,
            email: session.user.email,
            id: session.user.uuid,
            access_token: session.tokens.access_token,
            refresh_token: session.tokens.refresh_token,
        }
    }
}

async fn login(
    State(service): State<AuthService>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = service
        .login(payload.email.as_deref(), payload.password.as_deref())
        .await?;
    Ok(Json(session.into()))
}

#[derive(Deserialize)]
struct GoogleSignInRequest {
    credential: Option<String>,
}

async fn google_signin(
    State(service): State<AuthService>,
    JsonBody(payload): JsonBody<GoogleSignInRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = service.google_sign_in(payload.credential.as_deref()).await?;
    Ok(Json(session.into()))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshTokenRequest {
    refresh_token: Option<String>,
}

async fn refresh(
    State(service): State<AuthService>,
    JsonBody(payload): JsonBody<RefreshTokenRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let tokens = service.refresh(payload.refresh_token.as_deref()).await?;
    Ok(Json(tokens))
}

async fn logout(
    State(service): State<AuthService>,
    JsonBody(payload): JsonBody<RefreshTokenRequest>,
) -> Result<impl IntoResponse, ApiError> {
    service.logout(payload.refresh_token.as_deref()).await?;
    Ok("Logged out")
}

#[derive(Serialize)]
struct SessionProbe {
    id: String,
}

async fn session(user: AuthenticatedUser) -> Json<SessionProbe> {
    Json(SessionProbe { id: user.id })
}
