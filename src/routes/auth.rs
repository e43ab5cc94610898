// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OTP registration and login routes.
//!
//! Registration (`send-otp` / `verify-otp`) creates the user on first contact
//! and marks it verified. Login (`request-login-otp` / `verify-login-otp`)
//! uses a separate challenge on an existing user. Both mint a session JWT.

use axum::{
    extract::State,
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use super::validate_body;
use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, AuthUser, SESSION_COOKIE};
use crate::models::{DoctorProfile, OtpChallenge, PatientProfile, Role, User, UserView};
use crate::services::{Caller, Contact, DeliveryMethod, OtpVerdict};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/send-otp", post(send_otp))
        .route("/api/auth/verify-otp", post(verify_otp))
        .route("/api/auth/request-login-otp", post(request_login_otp))
        .route("/api/auth/verify-login-otp", post(verify_login_otp))
        .route("/api/auth/logout", post(logout))
}

/// Routes that need a session. Mounted behind `require_auth`.
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/auth/me", get(get_me))
}

#[derive(Debug, Deserialize)]
pub struct SendOtpRequest {
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub method: DeliveryMethod,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyOtpRequest {
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub otp: String,
    #[validate(length(max = 120))]
    pub name: Option<String>,
    #[serde(default)]
    pub method: DeliveryMethod,
}

#[derive(Debug, Deserialize)]
pub struct LoginOtpRequest {
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub method: DeliveryMethod,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpSentResponse {
    pub success: bool,
    pub message: String,
    /// Minutes until the code expires
    pub expires_in: i64,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub success: bool,
    pub message: String,
    pub token: String,
    pub user: UserView,
}

async fn find_user(state: &AppState, contact: &Contact) -> Result<Option<User>> {
    match contact {
        Contact::Email(email) => state.db.find_user_by_email(email).await,
        Contact::Phone(phone) => state.db.find_user_by_phone(phone).await,
    }
}

fn issue(state: &AppState, contact: &Contact) -> Result<(String, OtpChallenge)> {
    Ok(state.otp.issue(contact.as_str(), Utc::now())?)
}

/// Session cookie carrying the same JWT as the response body.
fn session_cookie(state: &AppState, token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(state.config.is_production())
        .same_site(SameSite::Lax)
        .build()
}

fn mint_session(state: &AppState, user_id: &str) -> Result<String> {
    create_jwt(user_id, &state.config.jwt_signing_key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))
}

/// Issue a registration OTP, creating the user on first contact.
async fn send_otp(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SendOtpRequest>,
) -> Result<Json<OtpSentResponse>> {
    let contact = Contact::from_request(req.method, req.email.as_deref(), req.phone.as_deref())?;

    if req.role == Role::Admin {
        return Err(AppError::BadRequest(
            "Admin accounts cannot be self-registered.".to_string(),
        ));
    }

    let (code, challenge) = issue(&state, &contact)?;

    let user = match find_user(&state, &contact).await? {
        Some(existing) => {
            state
                .db
                .update_user(&existing.id, |user| {
                    user.otp = Some(challenge.clone());
                    Ok(user.clone())
                })
                .await?
        }
        None => {
            let (email, phone) = match &contact {
                Contact::Email(e) => (Some(e.clone()), None),
                Contact::Phone(p) => (None, Some(p.clone())),
            };
            tracing::info!(contact = %contact.as_str(), role = %req.role, "Creating user");
            let mut user = User::new(email, phone, req.role);
            user.otp = Some(challenge);
            state.db.upsert_user(&user).await?;
            user
        }
    };

    state.notifier.send_otp(&contact, &code).await?;
    tracing::info!(user_id = %user.id, "Registration OTP issued");

    Ok(Json(OtpSentResponse {
        success: true,
        message: format!("OTP sent successfully to {}", contact.as_str()),
        expires_in: state.otp.ttl_minutes(),
    }))
}

/// Consume a registration OTP, verify the user and open a session.
async fn verify_otp(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(req): Json<VerifyOtpRequest>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    validate_body(&req)?;
    let contact = Contact::from_request(req.method, req.email.as_deref(), req.phone.as_deref())?;
    if req.otp.trim().is_empty() {
        return Err(AppError::BadRequest("OTP is required.".to_string()));
    }

    let found = find_user(&state, &contact)
        .await?
        .ok_or_else(|| AppError::BadRequest("User not found. Send OTP first.".to_string()))?;

    // Checked and cleared in one transaction so a code opens one session.
    let now = Utc::now();
    let name = req.name.as_deref().map(str::trim).filter(|n| !n.is_empty());
    let user = state
        .db
        .update_user(&found.id, |user| {
            let verdict = state
                .otp
                .verify(user.otp.as_ref(), contact.as_str(), &req.otp, now);
            if verdict != OtpVerdict::Valid {
                tracing::info!(user_id = %user.id, ?verdict, "Registration OTP rejected");
                return Err(AppError::BadRequest(verdict.message().to_string()));
            }

            user.otp = None;
            user.is_verified = true;
            user.last_login_at = Some(now);
            if let Some(name) = name {
                user.name.get_or_insert_with(|| name.to_string());
            }
            Ok(user.clone())
        })
        .await?;

    ensure_profile(&state, &user).await?;

    let token = mint_session(&state, &user.id)?;
    tracing::info!(user_id = %user.id, "User verified");

    Ok((
        jar.add(session_cookie(&state, token.clone())),
        Json(SessionResponse {
            success: true,
            message: OtpVerdict::Valid.message().to_string(),
            token,
            user: UserView::from(&user),
        }),
    ))
}

/// Create the role's profile on first verification.
async fn ensure_profile(state: &AppState, user: &User) -> Result<()> {
    let name = user
        .name
        .clone()
        .or_else(|| user.email.as_ref().and_then(|e| e.split('@').next()).map(str::to_string))
        .unwrap_or_default();

    match user.role {
        Role::Patient => {
            if state.db.find_patient_by_user(&user.id).await?.is_none() {
                let mut profile = PatientProfile::new(&user.id, name);
                profile.phone = user.phone.clone();
                profile.email = user.email.clone();
                state.db.upsert_patient(&profile).await?;
                tracing::info!(user_id = %user.id, patient_id = %profile.id, "Patient profile created");
            }
        }
        Role::Doctor => {
            if state.db.find_doctor_by_user(&user.id).await?.is_none() {
                let mut profile = DoctorProfile::new(&user.id, name);
                profile.phone = user.phone.clone();
                profile.email = user.email.clone();
                state.db.upsert_doctor(&profile).await?;
                tracing::info!(user_id = %user.id, doctor_id = %profile.id, "Doctor profile created");
            }
        }
        Role::Admin => {}
    }
    Ok(())
}

/// Issue a login OTP to an existing user.
async fn request_login_otp(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginOtpRequest>,
) -> Result<Json<OtpSentResponse>> {
    let contact = Contact::from_request(req.method, req.email.as_deref(), req.phone.as_deref())?;

    let found = find_user(&state, &contact)
        .await?
        .ok_or_else(|| AppError::BadRequest("User not found.".to_string()))?;

    let (code, challenge) = issue(&state, &contact)?;
    let user = state
        .db
        .update_user(&found.id, |user| {
            user.login_otp = Some(challenge.clone());
            Ok(user.clone())
        })
        .await?;

    state.notifier.send_otp(&contact, &code).await?;
    tracing::info!(user_id = %user.id, "Login OTP issued");

    Ok(Json(OtpSentResponse {
        success: true,
        message: format!("Login OTP sent to {}", contact.as_str()),
        expires_in: state.otp.ttl_minutes(),
    }))
}

/// Consume a login OTP and open a session. Failures are 401.
async fn verify_login_otp(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(req): Json<VerifyOtpRequest>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let contact = Contact::from_request(req.method, req.email.as_deref(), req.phone.as_deref())?;
    if req.otp.trim().is_empty() {
        return Err(AppError::BadRequest("OTP is required.".to_string()));
    }

    let found = find_user(&state, &contact)
        .await?
        .ok_or_else(|| AppError::BadRequest("User not found.".to_string()))?;

    let now = Utc::now();
    let user = state
        .db
        .update_user(&found.id, |user| {
            match state
                .otp
                .verify(user.login_otp.as_ref(), contact.as_str(), &req.otp, now)
            {
                OtpVerdict::Valid => {}
                OtpVerdict::AlreadyUsedOrExpired => {
                    return Err(AppError::LoginRejected(
                        "Login OTP already verified or expired. Please request a new one."
                            .to_string(),
                    ));
                }
                verdict => {
                    tracing::info!(user_id = %user.id, ?verdict, "Login OTP rejected");
                    return Err(AppError::LoginRejected(verdict.message().to_string()));
                }
            }

            user.login_otp = None;
            user.last_login_at = Some(now);
            Ok(user.clone())
        })
        .await?;

    let token = mint_session(&state, &user.id)?;
    tracing::info!(user_id = %user.id, "Login successful");

    Ok((
        jar.add(session_cookie(&state, token.clone())),
        Json(SessionResponse {
            success: true,
            message: "Login successful!".to_string(),
            token,
            user: UserView::from(&user),
        }),
    ))
}

/// Clear the session cookie. Bearer tokens simply expire.
async fn logout(jar: CookieJar) -> (CookieJar, Json<serde_json::Value>) {
    (
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        Json(serde_json::json!({ "success": true, "message": "Logged out" })),
    )
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub success: bool,
    pub user: UserView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient: Option<PatientProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doctor: Option<DoctorProfile>,
}

/// Current user with their role profile.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<MeResponse>> {
    let caller = Caller::load(&state.db, &auth).await?;
    Ok(Json(MeResponse {
        success: true,
        user: UserView::from(&caller.user),
        patient: caller.patient,
        doctor: caller.doctor,
    }))
}
