// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Admin user management.
//!
//! Responses use `UserView`, so OTP challenges never leave the server, and
//! the update body has no field for `id`, `createdAt` or OTP state.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::{Validate, ValidationError};

use super::validate_body;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Role, User, UserView};
use crate::services::notifier::is_e164;
use crate::services::Caller;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/users", get(list_users).post(create_user))
        .route(
            "/api/users/{id}",
            get(get_user).put(update_user).delete(delete_user),
        )
}

async fn require_admin(state: &AppState, auth: &AuthUser) -> Result<Caller> {
    let caller = Caller::load(&state.db, auth).await?;
    caller.require_role(&[Role::Admin])?;
    Ok(caller)
}

fn validate_phone(phone: &str) -> std::result::Result<(), ValidationError> {
    if is_e164(phone) {
        Ok(())
    } else {
        Err(ValidationError::new("e164"))
    }
}

async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<UserView>>> {
    require_admin(&state, &auth).await?;
    let users = state.db.list_users().await?;
    Ok(Json(users.iter().map(UserView::from).collect()))
}

async fn get_user(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<UserView>> {
    require_admin(&state, &auth).await?;
    let user = state
        .db
        .get_user(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(Json(UserView::from(&user)))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[validate(custom(function = "validate_phone"))]
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
}

async fn create_user(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserView>)> {
    validate_body(&req)?;
    let admin = require_admin(&state, &auth).await?;

    if req.phone.is_none() && req.email.is_none() {
        return Err(AppError::BadRequest(
            "Please provide either an email or a phone number.".to_string(),
        ));
    }
    if let Some(phone) = &req.phone {
        if state.db.find_user_by_phone(phone).await?.is_some() {
            return Err(AppError::BadRequest(
                "User with this phone number already exists".to_string(),
            ));
        }
    }

    let email = req.email.map(|e| e.trim().to_ascii_lowercase());
    let mut user = User::new(email, req.phone, req.role);
    user.name = req.name;
    state.db.upsert_user(&user).await?;

    tracing::info!(admin_id = %admin.user.id, user_id = %user.id, role = %user.role, "User created");
    Ok((StatusCode::CREATED, Json(UserView::from(&user))))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[validate(custom(function = "validate_phone"))]
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub role: Option<Role>,
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    #[validate(url)]
    pub profile_image: Option<String>,
    pub is_verified: Option<bool>,
}

async fn update_user(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<UserView>> {
    validate_body(&req)?;
    let admin = require_admin(&state, &auth).await?;

    let current = state
        .db
        .get_user(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if let Some(phone) = &req.phone {
        if current.phone.as_ref() != Some(phone)
            && state.db.find_user_by_phone(phone).await?.is_some()
        {
            return Err(AppError::BadRequest(
                "User with this phone number already exists".to_string(),
            ));
        }
    }

    // Applied to the stored user so a challenge issued meanwhile is kept.
    let user = state
        .db
        .update_user(&id, |user| {
            if let Some(phone) = &req.phone {
                user.phone = Some(phone.clone());
            }
            if let Some(email) = &req.email {
                user.email = Some(email.trim().to_ascii_lowercase());
            }
            if let Some(role) = req.role {
                user.role = role;
            }
            if req.name.is_some() {
                user.name = req.name.clone();
            }
            if req.profile_image.is_some() {
                user.profile_image = req.profile_image.clone();
            }
            if let Some(verified) = req.is_verified {
                user.is_verified = verified;
            }
            Ok(user.clone())
        })
        .await?;
    tracing::info!(admin_id = %admin.user.id, user_id = %user.id, "User updated");
    Ok(Json(UserView::from(&user)))
}

#[derive(Serialize)]
pub struct DeleteUserResponse {
    pub message: String,
}

async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<DeleteUserResponse>> {
    let admin = require_admin(&state, &auth).await?;
    if admin.user.id == id {
        return Err(AppError::BadRequest(
            "Admins cannot delete their own account".to_string(),
        ));
    }

    if state.db.get_user(&id).await?.is_none() {
        return Err(AppError::NotFound("User not found".to_string()));
    }
    state.db.delete_user(&id).await?;

    tracing::info!(admin_id = %admin.user.id, user_id = %id, "User deleted");
    Ok(Json(DeleteUserResponse {
        message: "User deleted successfully".to_string(),
    }))
}
