// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Generic access-request listing and creation.

use axum::{extract::State, http::StatusCode, routing::get, Extension, Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use super::validate_body;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{AccessRequest, AuditAction, AuditEntry, Role};
use crate::services::Caller;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route(
        "/api/access-requests",
        get(list_access_requests).post(create_access_request),
    )
}

/// Requests visible to the caller: a doctor's own, those addressed to a
/// patient, or everything for admins.
async fn list_access_requests(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<AccessRequest>>> {
    let caller = Caller::load(&state.db, &auth).await?;
    let all = state.db.list_access_requests().await?;

    let visible = match caller.role() {
        Role::Admin => all,
        Role::Doctor => {
            let doctor_id = caller.doctor.as_ref().map(|d| d.id.as_str());
            all.into_iter()
                .filter(|r| Some(r.doctor_id.as_str()) == doctor_id)
                .collect()
        }
        Role::Patient => {
            let profile_id = caller.patient.as_ref().map(|p| p.id.as_str());
            let phone = caller.user.phone.as_deref();
            all.into_iter()
                .filter(|r| r.targets(profile_id, phone))
                .collect()
        }
    };

    Ok(Json(visible))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccessRequestBody {
    #[validate(length(min = 1))]
    pub patient_id: String,
    pub doctor_id: Option<String>,
    #[validate(length(min = 1, max = 500))]
    pub reason: Option<String>,
    /// Requested access window in hours
    #[validate(range(min = 1, max = 8760))]
    pub duration: Option<u32>,
}

/// Create a pending request for a known patient profile.
///
/// Doctors always request for themselves; admins may name any doctor.
async fn create_access_request(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<CreateAccessRequestBody>,
) -> Result<(StatusCode, Json<AccessRequest>)> {
    validate_body(&req)?;
    let caller = Caller::load(&state.db, &auth).await?;
    caller.require_role(&[Role::Doctor, Role::Admin])?;

    let doctor_id = match (&caller.doctor, req.doctor_id) {
        (Some(own), None) => own.id.clone(),
        (Some(own), Some(requested)) if requested == own.id => requested,
        (Some(_), Some(_)) => {
            return Err(AppError::Forbidden(
                "Doctors can only request access for themselves".to_string(),
            ))
        }
        (None, Some(requested)) if caller.role() == Role::Admin => {
            if state.db.get_doctor(&requested).await?.is_none() {
                return Err(AppError::NotFound("Doctor not found".to_string()));
            }
            requested
        }
        (None, _) => return Err(AppError::NotFound("Doctor profile not found".to_string())),
    };

    let patient = state
        .db
        .get_patient(&req.patient_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Patient not found".to_string()))?;

    let mut request = AccessRequest::pending(doctor_id, Some(patient.id.clone()), None);
    if let Some(reason) = req.reason {
        request.reason = reason;
    }
    if let Some(hours) = req.duration {
        request.duration_hours = hours;
    }
    state.db.create_access_request(&request).await?;

    state
        .db
        .record_audit_best_effort(AuditEntry::new(
            &caller.user.id,
            AuditAction::AccessRequested,
            "AccessRequest",
            &request.id,
        ))
        .await;

    Ok((StatusCode::CREATED, Json(request)))
}
