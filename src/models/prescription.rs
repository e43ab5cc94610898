//! Prescriptions written by doctors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Medicine {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 200))]
    pub dosage: String,
    /// e.g. "1-0-1"
    #[serde(default)]
    pub frequency: Option<String>,
    /// e.g. "5 days"
    #[serde(default)]
    pub duration: Option<String>,
    /// e.g. "After food"
    #[serde(default)]
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    /// Document ID
    pub id: String,
    /// Patient profile ID
    pub patient_id: String,
    /// Doctor profile ID
    pub doctor_id: String,
    pub medicines: Vec<Medicine>,
    #[serde(default)]
    pub notes: Option<String>,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub is_locked: bool,
}
