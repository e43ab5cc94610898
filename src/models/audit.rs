//! Audit trail of record-level actions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    AccessRequested,
    AccessApproved,
    AccessRejected,
    AccessRevoked,
    ViewRecord,
    AddPrescription,
    UploadReport,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    /// Document ID
    pub id: String,
    /// Acting user ID
    #[serde(default)]
    pub user_id: Option<String>,
    pub action: AuditAction,
    /// e.g. "Patient", "Report"
    #[serde(default)]
    pub target_model: Option<String>,
    #[serde(default)]
    pub target_id: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(user_id: &str, action: AuditAction, target_model: &str, target_id: &str) -> Self {
        Self {
            id: super::new_id(),
            user_id: Some(user_id.to_string()),
            action,
            target_model: Some(target_model.to_string()),
            target_id: Some(target_id.to_string()),
            details: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}
