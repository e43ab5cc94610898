// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Access-grant workflow and per-request permission checks.
//!
//! A doctor may read a patient's records when the patient's
//! `authorizedDoctors` list names the doctor's profile, and may write when
//! that entry carries `write` access. Admins bypass the list. The list is
//! only changed by approving a request or by the patient revoking an entry.

use crate::db::Database;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{
    AccessLevel, AccessRequest, AccessRequestStatus, AuthorizedDoctor, DoctorProfile,
    PatientProfile, Role, User,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Patient's answer to an access request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approved,
    Rejected,
}

impl From<Decision> for AccessRequestStatus {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Approved => AccessRequestStatus::Approved,
            Decision::Rejected => AccessRequestStatus::Rejected,
        }
    }
}

pub fn authorization<'a>(
    patient: &'a PatientProfile,
    doctor_id: &str,
) -> Option<&'a AuthorizedDoctor> {
    patient
        .authorized_doctors
        .iter()
        .find(|entry| entry.doctor == doctor_id)
}

/// Whether the doctor may read this patient's records.
pub fn can_read(patient: &PatientProfile, doctor_id: &str) -> bool {
    authorization(patient, doctor_id).is_some()
}

/// Whether the doctor may add records for this patient.
pub fn can_write(patient: &PatientProfile, doctor_id: &str) -> bool {
    authorization(patient, doctor_id).is_some_and(|a| a.access_level == AccessLevel::Write)
}

/// Add a write grant. Returns false when the doctor is already listed.
pub fn grant(patient: &mut PatientProfile, doctor_id: &str, now: DateTime<Utc>) -> bool {
    if can_read(patient, doctor_id) {
        return false;
    }
    patient.authorized_doctors.push(AuthorizedDoctor {
        doctor: doctor_id.to_string(),
        granted_at: now,
        access_level: AccessLevel::Write,
    });
    patient.updated_at = now;
    true
}

/// Remove exactly this doctor's entry. Returns false when none existed.
pub fn revoke(patient: &mut PatientProfile, doctor_id: &str, now: DateTime<Utc>) -> bool {
    let before = patient.authorized_doctors.len();
    patient.authorized_doctors.retain(|entry| entry.doctor != doctor_id);
    let removed = patient.authorized_doctors.len() != before;
    if removed {
        patient.updated_at = now;
    }
    removed
}

/// Apply a decision to a pending request in memory.
///
/// Returns whether the patient profile changed and must be written back.
pub fn apply_decision(
    request: &mut AccessRequest,
    patient: &mut PatientProfile,
    decision: Decision,
    now: DateTime<Utc>,
) -> Result<bool> {
    if request.status != AccessRequestStatus::Pending {
        return Err(AppError::Conflict(format!(
            "Request {} has already been {}",
            request.id,
            request.status.as_str()
        )));
    }

    request.status = decision.into();
    request.responded_at = Some(now);
    // Bind a phone-only request to the profile that answered it.
    if request.patient_id.is_none() {
        request.patient_id = Some(patient.id.clone());
    }

    Ok(match decision {
        Decision::Approved => grant(patient, &request.doctor_id, now),
        Decision::Rejected => false,
    })
}

/// The authenticated user with the profile matching their role.
#[derive(Debug, Clone)]
pub struct Caller {
    pub user: User,
    pub patient: Option<PatientProfile>,
    pub doctor: Option<DoctorProfile>,
}

impl Caller {
    /// Re-derive role and profile from storage for this request.
    pub async fn load(db: &Database, auth: &AuthUser) -> Result<Self> {
        let user = db
            .get_user(&auth.user_id)
            .await?
            .ok_or(AppError::InvalidToken)?;

        let (patient, doctor) = match user.role {
            Role::Patient => (db.find_patient_by_user(&user.id).await?, None),
            Role::Doctor => (None, db.find_doctor_by_user(&user.id).await?),
            Role::Admin => (None, None),
        };

        Ok(Self {
            user,
            patient,
            doctor,
        })
    }

    pub fn role(&self) -> Role {
        self.user.role
    }

    pub fn require_role(&self, allowed: &[Role]) -> Result<()> {
        if allowed.contains(&self.user.role) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "User role {} is not authorized to access this route",
                self.user.role
            )))
        }
    }

    pub fn patient_profile(&self) -> Result<&PatientProfile> {
        self.patient
            .as_ref()
            .ok_or_else(|| AppError::NotFound("Patient profile not found".to_string()))
    }

    pub fn doctor_profile(&self) -> Result<&DoctorProfile> {
        self.doctor
            .as_ref()
            .ok_or_else(|| AppError::NotFound("Doctor profile not found".to_string()))
    }

    /// Check read access to a patient's records.
    pub fn ensure_can_read(&self, patient: &PatientProfile) -> Result<()> {
        match self.user.role {
            Role::Admin => Ok(()),
            Role::Patient if patient.user_id == self.user.id => Ok(()),
            Role::Patient => Err(AppError::Forbidden("Not authorized".to_string())),
            Role::Doctor => match &self.doctor {
                Some(doctor) if can_read(patient, &doctor.id) => Ok(()),
                _ => Err(AppError::Forbidden(
                    "Access denied. Request access first.".to_string(),
                )),
            },
        }
    }

    /// Load a patient profile the caller is allowed to read.
    ///
    /// Patients only ever get their own profile; anything else is 403 without
    /// revealing whether the id exists.
    pub async fn readable_patient(&self, db: &Database, patient_id: &str) -> Result<PatientProfile> {
        if self.user.role == Role::Patient {
            return match &self.patient {
                Some(own) if own.id == patient_id => Ok(own.clone()),
                _ => Err(AppError::Forbidden("Not authorized".to_string())),
            };
        }

        let patient = db
            .get_patient(patient_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Patient not found".to_string()))?;
        self.ensure_can_read(&patient)?;
        Ok(patient)
    }

    /// Check that a doctor (or admin) may add records for a patient.
    pub fn ensure_can_write(&self, patient: &PatientProfile) -> Result<()> {
        match self.user.role {
            Role::Admin => Ok(()),
            Role::Doctor => match &self.doctor {
                Some(doctor) if can_write(patient, &doctor.id) => Ok(()),
                _ => Err(AppError::Forbidden(
                    "Access denied. You are not authorized to write for this patient.".to_string(),
                )),
            },
            Role::Patient => Err(AppError::Forbidden("Not authorized".to_string())),
        }
    }
}
