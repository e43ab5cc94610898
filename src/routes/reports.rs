// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Report upload (multipart) and listing.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::Utc;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{new_id, AuditAction, AuditEntry, PatientProfile, Report, ReportType, Role};
use crate::services::{Caller, ReportStorage};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/reports", post(upload_report))
        .route("/api/reports/{patient_id}", get(get_reports))
}

/// Decoded multipart form.
#[derive(Default)]
struct UploadForm {
    file: Option<UploadedFile>,
    report_type: Option<String>,
    title: Option<String>,
    patient_id: Option<String>,
    tags: Option<String>,
}

struct UploadedFile {
    name: String,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

fn bad_multipart(e: impl std::fmt::Display) -> AppError {
    AppError::BadRequest(format!("Invalid multipart body: {}", e))
}

async fn read_form(mut multipart: Multipart) -> Result<UploadForm> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(bad_multipart)?;
                form.file = Some(UploadedFile {
                    name: file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            "type" => form.report_type = Some(field.text().await.map_err(bad_multipart)?),
            "title" => form.title = Some(field.text().await.map_err(bad_multipart)?),
            "patientId" => form.patient_id = Some(field.text().await.map_err(bad_multipart)?),
            "tags" => form.tags = Some(field.text().await.map_err(bad_multipart)?),
            other => tracing::debug!(field = other, "Ignoring unknown multipart field"),
        }
    }

    Ok(form)
}

fn split_tags(raw: Option<&str>) -> Vec<String> {
    raw.map(|t| {
        t.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// Patient the upload is filed under, after permission checks.
async fn upload_target(
    state: &AppState,
    caller: &Caller,
    patient_id: Option<&str>,
) -> Result<PatientProfile> {
    if caller.role() == Role::Patient {
        return Ok(caller.patient_profile()?.clone());
    }

    let patient_id = patient_id
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::BadRequest("Patient ID required".to_string()))?;
    let patient = state
        .db
        .get_patient(patient_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Patient not found".to_string()))?;
    caller.ensure_can_write(&patient)?;
    Ok(patient)
}

/// Store an uploaded report file and its record.
async fn upload_report(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Report>)> {
    let form = read_form(multipart).await?;
    let file = form
        .file
        .ok_or_else(|| AppError::BadRequest("No file uploaded".to_string()))?;
    ReportStorage::validate(&file.name, file.content_type.as_deref())?;

    let caller = Caller::load(&state.db, &auth).await?;
    let patient = upload_target(&state, &caller, form.patient_id.as_deref()).await?;

    let stored = state
        .storage
        .save(&file.name, file.content_type.as_deref(), &file.bytes)
        .await?;

    let title = form
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| file.name.clone());

    let report = Report {
        id: new_id(),
        patient_id: patient.id.clone(),
        uploaded_by: caller.user.id.clone(),
        title,
        report_type: form
            .report_type
            .as_deref()
            .map(ReportType::from_label)
            .unwrap_or_default(),
        file_url: stored.url,
        tags: split_tags(form.tags.as_deref()),
        date: Utc::now(),
    };
    state.db.create_report(&report).await?;

    state
        .db
        .record_audit_best_effort(
            AuditEntry::new(&caller.user.id, AuditAction::UploadReport, "Report", &report.id)
                .with_details(format!("patient {}", patient.id)),
        )
        .await;

    tracing::info!(
        report_id = %report.id,
        patient_id = %patient.id,
        size = file.bytes.len(),
        "Report uploaded"
    );

    Ok((StatusCode::CREATED, Json(report)))
}

/// Reports for a patient, newest first.
async fn get_reports(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(patient_id): Path<String>,
) -> Result<Json<Vec<Report>>> {
    let caller = Caller::load(&state.db, &auth).await?;
    let patient = caller.readable_patient(&state.db, &patient_id).await?;
    Ok(Json(state.db.reports_for_patient(&patient.id).await?))
}
