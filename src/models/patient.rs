//! Patient profile and the doctor authorization list.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    Read,
    #[default]
    Write,
}

/// One entry of `authorizedDoctors`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizedDoctor {
    /// Doctor profile ID
    pub doctor: String,
    pub granted_at: DateTime<Utc>,
    #[serde(default)]
    pub access_level: AccessLevel,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalInfo {
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default)]
    pub surgeries: Vec<String>,
    #[serde(default)]
    pub family_history: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insurance {
    pub provider: Option<String>,
    pub policy_number: Option<String>,
    pub expiry_date: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Other,
}

/// Patient profile, 1:1 with a verified patient user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientProfile {
    /// Document ID
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub blood_group: Option<String>,
    #[serde(default)]
    pub height: Option<String>,
    #[serde(default)]
    pub weight: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub medical_info: MedicalInfo,
    #[serde(default)]
    pub insurance: Option<Insurance>,
    #[serde(default)]
    pub authorized_doctors: Vec<AuthorizedDoctor>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PatientProfile {
    pub fn new(user_id: &str, name: String) -> Self {
        let now = Utc::now();
        Self {
            id: super::new_id(),
            user_id: user_id.to_string(),
            name,
            phone: None,
            email: None,
            age: None,
            gender: None,
            blood_group: None,
            height: None,
            weight: None,
            address: None,
            medical_info: MedicalInfo::default(),
            insurance: None,
            authorized_doctors: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}
