// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Doctor-initiated request for access to a patient's records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_REASON: &str = "Medical consultation";
pub const DEFAULT_DURATION_HOURS: u32 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessRequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl AccessRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessRequestStatus::Pending => "pending",
            AccessRequestStatus::Approved => "approved",
            AccessRequestStatus::Rejected => "rejected",
        }
    }
}

/// Stored access request. Terminal once `status` leaves `Pending`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessRequest {
    /// Document ID
    pub id: String,
    /// Doctor profile ID
    pub doctor_id: String,
    /// Patient profile ID, when the patient was known at request time
    #[serde(default)]
    pub patient_id: Option<String>,
    /// Raw phone number the doctor asked for
    #[serde(default)]
    pub patient_phone: Option<String>,
    pub reason: String,
    pub duration_hours: u32,
    pub status: AccessRequestStatus,
    pub requested_at: DateTime<Utc>,
    #[serde(default)]
    pub responded_at: Option<DateTime<Utc>>,
}

impl AccessRequest {
    pub fn pending(
        doctor_id: String,
        patient_id: Option<String>,
        patient_phone: Option<String>,
    ) -> Self {
        Self {
            id: super::new_id(),
            doctor_id,
            patient_id,
            patient_phone,
            reason: DEFAULT_REASON.to_string(),
            duration_hours: DEFAULT_DURATION_HOURS,
            status: AccessRequestStatus::Pending,
            requested_at: Utc::now(),
            responded_at: None,
        }
    }

    /// Whether this request targets the given patient, by profile or phone.
    pub fn targets(&self, patient_profile_id: Option<&str>, phone: Option<&str>) -> bool {
        let by_profile = matches!(
            (self.patient_id.as_deref(), patient_profile_id),
            (Some(a), Some(b)) if a == b
        );
        let by_phone = matches!(
            (self.patient_phone.as_deref(), phone),
            (Some(a), Some(b)) if a == b
        );
        by_profile || by_phone
    }
}
