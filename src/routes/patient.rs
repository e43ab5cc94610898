// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Patient routes: profile, access requests addressed to the patient,
//! approve/reject and revoke.

use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use super::validate_body;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::patient::Gender;
use crate::models::{
    AccessRequest, AccessRequestStatus, AuditAction, AuditEntry, AuthorizedDoctor,
    DoctorSummary, Insurance, PatientProfile, Role,
};
use crate::services::access::{self, Caller, Decision};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/patient/access-requests", get(get_access_requests))
        .route("/api/patient/profile", put(update_profile))
        .route("/api/patient/revoke-access", post(revoke_access))
        .route("/api/patient/respond-access", post(respond_access))
        .route("/api/patient/{id}", get(get_patient))
}

// ─── Profile ─────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientUserInfo {
    pub id: String,
    pub phone: Option<String>,
    pub is_verified: bool,
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct PatientResponse {
    #[serde(flatten)]
    pub profile: PatientProfile,
    pub user: Option<PatientUserInfo>,
}

/// Profile by profile id, falling back to the owning user's id.
async fn get_patient(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<PatientResponse>> {
    let caller = Caller::load(&state.db, &auth).await?;

    let profile = match state.db.get_patient(&id).await? {
        Some(p) => p,
        None => state
            .db
            .find_patient_by_user(&id)
            .await?
            .ok_or_else(|| AppError::NotFound("Patient not found".to_string()))?,
    };

    caller.ensure_can_read(&profile)?;

    if caller.role() == Role::Doctor {
        state
            .db
            .record_audit_best_effort(AuditEntry::new(
                &caller.user.id,
                AuditAction::ViewRecord,
                "Patient",
                &profile.id,
            ))
            .await;
    }

    let user = state
        .db
        .get_user(&profile.user_id)
        .await?
        .map(|u| PatientUserInfo {
            id: u.id,
            phone: u.phone,
            is_verified: u.is_verified,
            role: u.role,
        });

    Ok(Json(PatientResponse { profile, user }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalInfoUpdate {
    pub allergies: Option<Vec<String>>,
    pub conditions: Option<Vec<String>>,
    pub surgeries: Option<Vec<String>>,
    pub family_history: Option<Vec<String>>,
}

/// Partial profile update. Absent fields are left unchanged.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    #[validate(range(max = 150))]
    pub age: Option<u32>,
    pub gender: Option<Gender>,
    #[validate(length(max = 8))]
    pub blood_group: Option<String>,
    #[validate(length(max = 32))]
    pub height: Option<String>,
    #[validate(length(max = 32))]
    pub weight: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
    pub medical_info: Option<MedicalInfoUpdate>,
    pub insurance: Option<Insurance>,
}

/// Update the caller's own profile, creating it if missing.
async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<PatientProfile>> {
    validate_body(&req)?;
    let caller = Caller::load(&state.db, &auth).await?;
    caller.require_role(&[Role::Patient])?;

    let now = Utc::now();
    let profile = match caller.patient {
        // Applied to the stored profile so a concurrent grant or revoke survives.
        Some(existing) => {
            state
                .db
                .update_patient(&existing.id, |profile| {
                    apply_profile_update(profile, &req, now);
                    Ok(profile.clone())
                })
                .await?
        }
        None => {
            let name = req
                .name
                .clone()
                .or_else(|| caller.user.name.clone())
                .unwrap_or_default();
            let mut profile = PatientProfile::new(&caller.user.id, name);
            profile.phone = caller.user.phone.clone();
            profile.email = caller.user.email.clone();
            apply_profile_update(&mut profile, &req, now);
            state.db.upsert_patient(&profile).await?;
            profile
        }
    };
    tracing::info!(patient_id = %profile.id, "Patient profile updated");

    Ok(Json(profile))
}

fn apply_profile_update(profile: &mut PatientProfile, req: &UpdateProfileRequest, now: DateTime<Utc>) {
    if let Some(name) = &req.name {
        profile.name = name.clone();
    }
    if req.age.is_some() {
        profile.age = req.age;
    }
    if req.gender.is_some() {
        profile.gender = req.gender;
    }
    if req.blood_group.is_some() {
        profile.blood_group = req.blood_group.clone();
    }
    if req.height.is_some() {
        profile.height = req.height.clone();
    }
    if req.weight.is_some() {
        profile.weight = req.weight.clone();
    }
    if req.address.is_some() {
        profile.address = req.address.clone();
    }
    if let Some(info) = &req.medical_info {
        let current = &mut profile.medical_info;
        if let Some(v) = &info.allergies {
            current.allergies = v.clone();
        }
        if let Some(v) = &info.conditions {
            current.conditions = v.clone();
        }
        if let Some(v) = &info.surgeries {
            current.surgeries = v.clone();
        }
        if let Some(v) = &info.family_history {
            current.family_history = v.clone();
        }
    }
    if req.insurance.is_some() {
        profile.insurance = req.insurance.clone();
    }
    profile.updated_at = now;
}

// ─── Access Requests ─────────────────────────────────────────

/// Access request with the requesting doctor's details.
#[derive(Debug, Serialize)]
pub struct PopulatedAccessRequest {
    #[serde(flatten)]
    pub request: AccessRequest,
    pub doctor: Option<DoctorSummary>,
}

/// Pending requests addressed to the caller by profile id or phone.
async fn get_access_requests(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<PopulatedAccessRequest>>> {
    let caller = Caller::load(&state.db, &auth).await?;
    caller.require_role(&[Role::Patient])?;

    let profile_id = caller.patient.as_ref().map(|p| p.id.as_str());
    let phone = caller.user.phone.as_deref();

    let mine: Vec<AccessRequest> = state
        .db
        .pending_access_requests()
        .await?
        .into_iter()
        .filter(|r| r.targets(profile_id, phone))
        .collect();

    let doctors = state
        .db
        .get_doctors(mine.iter().map(|r| r.doctor_id.as_str()))
        .await?;

    Ok(Json(
        mine.into_iter()
            .map(|request| PopulatedAccessRequest {
                doctor: doctors.get(&request.doctor_id).map(DoctorSummary::from),
                request,
            })
            .collect(),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondAccessRequest {
    pub request_id: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct RespondAccessResponse {
    pub message: String,
    pub request: AccessRequest,
}

fn parse_decision(status: &str) -> Result<Decision> {
    match status {
        "approved" => Ok(Decision::Approved),
        "rejected" => Ok(Decision::Rejected),
        _ => Err(AppError::BadRequest(
            "Status must be \"approved\" or \"rejected\".".to_string(),
        )),
    }
}

/// Approve or reject a pending request addressed to the caller.
async fn respond_access(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<RespondAccessRequest>,
) -> Result<Json<RespondAccessResponse>> {
    let decision = parse_decision(&req.status)?;
    let caller = Caller::load(&state.db, &auth).await?;
    caller.require_role(&[Role::Patient])?;
    let patient_id = caller.patient_profile()?.id.clone();

    let request = state
        .db
        .get_access_request(&req.request_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Request not found".to_string()))?;

    if !request.targets(Some(&patient_id), caller.user.phone.as_deref()) {
        return Err(AppError::Forbidden(
            "Not authorized to respond to this request".to_string(),
        ));
    }

    let now = Utc::now();
    let (request, patient) = state
        .db
        .update_request_and_patient(&request.id, &patient_id, |request, patient| {
            access::apply_decision(request, patient, decision, now)?;
            Ok((request.clone(), patient.clone()))
        })
        .await?;

    let action = match request.status {
        AccessRequestStatus::Approved => AuditAction::AccessApproved,
        _ => AuditAction::AccessRejected,
    };
    state
        .db
        .record_audit_best_effort(
            AuditEntry::new(&caller.user.id, action, "AccessRequest", &request.id)
                .with_details(format!("doctor {}", request.doctor_id)),
        )
        .await;

    tracing::info!(
        request_id = %request.id,
        patient_id = %patient.id,
        doctor_id = %request.doctor_id,
        status = request.status.as_str(),
        "Access request resolved"
    );

    Ok(Json(RespondAccessResponse {
        message: format!("Request {}", request.status.as_str()),
        request,
    }))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RevokeAccessRequest {
    #[validate(length(min = 1))]
    pub doctor_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevokeAccessResponse {
    pub message: String,
    pub authorized_doctors: Vec<AuthorizedDoctor>,
}

/// Remove one doctor from the caller's authorization list.
async fn revoke_access(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<RevokeAccessRequest>,
) -> Result<Json<RevokeAccessResponse>> {
    validate_body(&req)?;
    let caller = Caller::load(&state.db, &auth).await?;
    caller.require_role(&[Role::Patient])?;
    let patient_id = caller.patient_profile()?.id.clone();

    let now = Utc::now();
    let (removed, patient) = state
        .db
        .update_patient(&patient_id, |patient| {
            Ok((access::revoke(patient, &req.doctor_id, now), patient.clone()))
        })
        .await?;

    if removed {
        state
            .db
            .record_audit_best_effort(
                AuditEntry::new(
                    &caller.user.id,
                    AuditAction::AccessRevoked,
                    "Patient",
                    &patient.id,
                )
                .with_details(format!("doctor {}", req.doctor_id)),
            )
            .await;
        tracing::info!(patient_id = %patient.id, doctor_id = %req.doctor_id, "Access revoked");
    }

    Ok(Json(RevokeAccessResponse {
        message: "Access revoked".to_string(),
        authorized_doctors: patient.authorized_doctors,
    }))
}
