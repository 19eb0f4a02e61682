//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use crate::config::AuthConfig;
use crate::db::Database;
use clap::Parser;
use std::time::Duration;
use tracing::{error, info, warn};
use url::Url;

const MIN_TOKEN_SECRET_LENGTH: usize = 32;
const TOKEN_SECRET_ENV: &str = "TOKEN_SECRET";

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "postauth",
    about = "Account registration, login and session tokens"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "3000")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, default_value = "postauth.db")]
    pub database: String,

    /// Access token lifetime (e.g. "15m", "1h")
    #[arg(long, env = "ACCESS_TOKEN_EXPIRATION", default_value = "15m", value_parser = parse_ttl)]
    pub access_token_ttl: Duration,

    /// Refresh token lifetime (e.g. "7d")
    #[arg(long, env = "REFRESH_TOKEN_EXPIRATION", default_value = "7d", value_parser = parse_ttl)]
    pub refresh_token_ttl: Duration,

    /// OAuth client id that Google identity tokens must be issued for
    #[arg(long, env = "GOOGLE_CLIENT_ID")]
    pub google_client_id: Option<String>,

    /// Storage service endpoint that receives profile pictures
    #[arg(long, env = "UPLOAD_URL")]
    pub upload_url: Option<Url>,

    /// Path to file containing the token secret. Prefer using TOKEN_SECRET env var instead
    #[arg(long)]
    pub token_secret_file: Option<String>,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

fn parse_ttl(s: &str) -> Result<Duration, String> {
    let ttl = humantime::parse_duration(s).map_err(|e| format!("Invalid duration '{}': {}", s, e))?;
    if ttl.as_secs() == 0 {
        return Err(format!("Duration must be at least one second: {}", s));
    }
    Ok(ttl)
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load the token secret from environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_token_secret(token_secret_file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var(TOKEN_SECRET_ENV) {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var(TOKEN_SECRET_ENV) };
        secret
    } else if let Some(path) = token_secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read token secret file");
                return None;
            }
        }
    } else {
        error!(
            "Token secret is required. Set TOKEN_SECRET environment variable (recommended) or use --token-secret-file"
        );
        return None;
    };

    validate_token_secret(secret)
}

fn validate_token_secret(secret: String) -> Option<String> {
    if secret.len() < MIN_TOKEN_SECRET_LENGTH {
        error!(
            "Token secret is shorter than {} characters. Use a longer secret",
            MIN_TOKEN_SECRET_LENGTH
        );
        return None;
    }
    Some(secret)
}

/// Build ServerConfig from validated arguments.
pub fn build_config(args: &Args, db: Database, token_secret: String) -> ServerConfig {
    let mut auth = AuthConfig::new(token_secret.into_bytes())
        .with_ttls(args.access_token_ttl, args.refresh_token_ttl);

    match &args.google_client_id {
        Some(client_id) => auth = auth.with_google_client_id(client_id.clone()),
        None => warn!("GOOGLE_CLIENT_ID not set, Google sign-in is disabled"),
    }

    if args.upload_url.is_none() {
        info!("UPLOAD_URL not set, profile pictures will be ignored");
    }

    ServerConfig {
        db,
        auth,
        upload_url: args.upload_url.clone(),
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}
