// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Provider credentials are optional: a missing email/SMS provider disables
//! that delivery channel, and missing Razorpay keys make the billing
//! endpoints answer 503.

use std::env;

/// Which document store backs the repositories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseBackend {
    Firestore,
    Memory,
}

impl std::str::FromStr for DatabaseBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firestore" => Ok(Self::Firestore),
            "memory" => Ok(Self::Memory),
            _ => Err(ConfigError::Invalid("DATABASE_BACKEND")),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Dashboard URL allowed by CORS
    pub frontend_url: String,
    /// GCP project ID (Firestore)
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Document store backend
    pub database_backend: DatabaseBackend,
    /// "production" hides internal error details from responses
    pub app_env: String,
    /// Number of digits in an OTP
    pub otp_length: usize,
    /// OTP lifetime in minutes
    pub otp_expiry_minutes: i64,
    /// Directory where uploaded report files are written
    pub upload_dir: String,
    /// Sender address for OTP emails
    pub email_from: String,
    /// Twilio sender number
    pub twilio_phone_number: Option<String>,
    /// Razorpay key id (public half of the key pair)
    pub razorpay_key_id: Option<String>,

    // --- Secrets ---
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// Resend API key
    pub resend_api_key: Option<String>,
    /// Twilio account SID
    pub twilio_account_sid: Option<String>,
    /// Twilio auth token
    pub twilio_auth_token: Option<String>,
    /// Razorpay key secret
    pub razorpay_key_secret: Option<String>,
    /// Razorpay webhook signing secret
    pub razorpay_webhook_secret: Option<String>,
}

impl Config {
    /// Config for tests: in-memory store, no delivery or billing providers.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            database_backend: DatabaseBackend::Memory,
            app_env: "test".to_string(),
            otp_length: 6,
            otp_expiry_minutes: 10,
            upload_dir: env::temp_dir()
                .join(format!("atkans-med-uploads-{}", uuid::Uuid::new_v4()))
                .to_string_lossy()
                .into_owned(),
            email_from: "Atkans Med <otp@example.com>".to_string(),
            twilio_phone_number: None,
            razorpay_key_id: None,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            resend_api_key: None,
            twilio_account_sid: None,
            twilio_auth_token: None,
            razorpay_key_secret: None,
            razorpay_webhook_secret: Some("test_webhook_secret".to_string()),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            database_backend: env::var("DATABASE_BACKEND")
                .unwrap_or_else(|_| "firestore".to_string())
                .parse()?,
            app_env: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            otp_length: parse_or("OTP_LENGTH", 6)?,
            otp_expiry_minutes: parse_or("OTP_EXPIRY_MINUTES", 10)?,
            upload_dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string()),
            email_from: env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "Atkans Med <onboarding@resend.dev>".to_string()),
            twilio_phone_number: optional("TWILIO_PHONE_NUMBER"),
            razorpay_key_id: optional("RAZORPAY_KEY_ID"),

            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
            resend_api_key: optional("RESEND_API_KEY"),
            twilio_account_sid: optional("TWILIO_ACCOUNT_SID"),
            twilio_auth_token: optional("TWILIO_AUTH_TOKEN"),
            razorpay_key_secret: optional("RAZORPAY_KEY_SECRET"),
            razorpay_webhook_secret: optional("RAZORPAY_WEBHOOK_SECRET"),
        })
    }

    pub fn is_production(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("production")
    }
}

/// Read a trimmed, non-empty variable.
fn optional(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_or<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
