//! Uploaded medical report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ReportType {
    #[serde(rename = "Blood Test")]
    BloodTest,
    #[serde(rename = "X-Ray")]
    XRay,
    #[serde(rename = "MRI")]
    Mri,
    #[serde(rename = "CT Scan")]
    CtScan,
    Pathology,
    Prescription,
    #[default]
    Other,
}

impl ReportType {
    /// Lenient parse of a form value; unknown labels become `Other`.
    pub fn from_label(label: &str) -> Self {
        serde_json::from_value(serde_json::Value::String(label.trim().to_string()))
            .unwrap_or_default()
    }
}

/// Report record; the file itself lives on local disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Document ID
    pub id: String,
    /// Patient profile ID
    pub patient_id: String,
    /// User ID of the uploader (patient or doctor)
    pub uploaded_by: String,
    pub title: String,
    #[serde(rename = "type", default)]
    pub report_type: ReportType,
    /// Public path under `/uploads`
    pub file_url: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub date: DateTime<Utc>,
}
