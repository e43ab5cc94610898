//! Doctor profile.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SPECIALTY: &str = "General";

/// Doctor profile, 1:1 with a verified doctor user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorProfile {
    /// Document ID
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub specialty: String,
    #[serde(default)]
    pub hospital: Option<String>,
    #[serde(default)]
    pub experience_years: Option<u32>,
    #[serde(default)]
    pub license_number: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl DoctorProfile {
    pub fn new(user_id: &str, name: String) -> Self {
        Self {
            id: super::new_id(),
            user_id: user_id.to_string(),
            name,
            specialty: DEFAULT_SPECIALTY.to_string(),
            hospital: None,
            experience_years: None,
            license_number: None,
            phone: None,
            email: None,
            created_at: Utc::now(),
        }
    }
}

/// Doctor details embedded in prescription and access-request listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorSummary {
    pub name: String,
    pub specialty: String,
    pub hospital: Option<String>,
}

impl From<&DoctorProfile> for DoctorSummary {
    fn from(doctor: &DoctorProfile) -> Self {
        Self {
            name: doctor.name.clone(),
            specialty: doctor.specialty.clone(),
            hospital: doctor.hospital.clone(),
        }
    }
}
