// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Doctor routes: access requests by phone and prescriptions.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use super::validate_body;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{
    new_id, AccessRequest, AuditAction, AuditEntry, DoctorSummary, Medicine, Prescription, Role,
};
use crate::services::notifier::is_e164;
use crate::services::Caller;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/doctor/request-access", post(request_access))
        .route("/api/doctor/prescription", post(add_prescription))
        .route("/api/doctor/prescriptions/{patient_id}", get(get_prescriptions))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RequestAccessBody {
    pub patient_phone: String,
    #[validate(length(min = 1, max = 500))]
    pub reason: Option<String>,
}

/// Ask a patient, identified by phone, for access to their records.
///
/// The request is bound to the patient's profile when one exists; otherwise
/// it waits for a patient with that phone to answer it.
async fn request_access(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<RequestAccessBody>,
) -> Result<(StatusCode, Json<AccessRequest>)> {
    validate_body(&req)?;
    let caller = Caller::load(&state.db, &auth).await?;
    caller.require_role(&[Role::Doctor])?;
    let doctor = caller.doctor_profile()?;

    let phone = req.patient_phone.trim();
    if !is_e164(phone) {
        return Err(AppError::BadRequest(
            "Invalid phone format. Use E.164 format: +country_code_number".to_string(),
        ));
    }

    let patient_id = match state.db.find_user_by_phone(phone).await? {
        Some(user) if user.role == Role::Patient => state
            .db
            .find_patient_by_user(&user.id)
            .await?
            .map(|p| p.id),
        _ => None,
    };

    let mut request = AccessRequest::pending(doctor.id.clone(), patient_id, Some(phone.to_string()));
    if let Some(reason) = req.reason {
        request.reason = reason;
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

    tracing::info!(
        request_id = %request.id,
        doctor_id = %doctor.id,
        patient_known = request.patient_id.is_some(),
        "Access requested"
    );

    Ok((StatusCode::CREATED, Json(request)))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddPrescriptionBody {
    #[validate(length(min = 1))]
    pub patient_id: String,
    #[validate(length(min = 1), nested)]
    pub medicines: Vec<Medicine>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// Write a prescription for an authorized patient.
async fn add_prescription(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<AddPrescriptionBody>,
) -> Result<(StatusCode, Json<Prescription>)> {
    validate_body(&req)?;
    let caller = Caller::load(&state.db, &auth).await?;
    caller.require_role(&[Role::Doctor, Role::Admin])?;

    let patient = state
        .db
        .get_patient(&req.patient_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Patient not found".to_string()))?;

    caller.ensure_can_write(&patient)?;

    // Admins write under their own user id; they have no doctor profile.
    let author = caller
        .doctor
        .as_ref()
        .map(|d| d.id.clone())
        .unwrap_or_else(|| caller.user.id.clone());

    let prescription = Prescription {
        id: new_id(),
        patient_id: patient.id.clone(),
        doctor_id: author,
        medicines: req.medicines,
        notes: req.notes,
        date: Utc::now(),
        is_locked: false,
    };
    state.db.create_prescription(&prescription).await?;

    state
        .db
        .record_audit_best_effort(
            AuditEntry::new(
                &caller.user.id,
                AuditAction::AddPrescription,
                "Prescription",
                &prescription.id,
            )
            .with_details(format!("patient {}", patient.id)),
        )
        .await;

    tracing::info!(
        prescription_id = %prescription.id,
        patient_id = %patient.id,
        medicines = prescription.medicines.len(),
        "Prescription added"
    );

    Ok((StatusCode::CREATED, Json(prescription)))
}

/// Prescription with the prescribing doctor's details.
#[derive(Debug, Serialize)]
pub struct PopulatedPrescription {
    #[serde(flatten)]
    pub prescription: Prescription,
    pub doctor: Option<DoctorSummary>,
}

/// Prescriptions for a patient, newest first.
async fn get_prescriptions(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(patient_id): Path<String>,
) -> Result<Json<Vec<PopulatedPrescription>>> {
    let caller = Caller::load(&state.db, &auth).await?;
    let patient = caller.readable_patient(&state.db, &patient_id).await?;

    let prescriptions = state.db.prescriptions_for_patient(&patient.id).await?;
    let doctors = state
        .db
        .get_doctors(prescriptions.iter().map(|p| p.doctor_id.as_str()))
        .await?;

    Ok(Json(
        prescriptions
            .into_iter()
            .map(|prescription| PopulatedPrescription {
                doctor: doctors.get(&prescription.doctor_id).map(DoctorSummary::from),
                prescription,
            })
            .collect(),
    ))
}
