//! Dashboard counters.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Document counts per collection, taken at call time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "admin-dashboard/src/generated/")
)]
pub struct Stats {
    pub total_users: usize,
    /// Users that completed OTP verification
    pub active_users: usize,
    pub patients: usize,
    pub doctors: usize,
    pub reports: usize,
    pub prescriptions: usize,
    pub access_requests: usize,
    pub subscriptions: usize,
    /// RFC3339 time the counts were taken
    pub timestamp: String,
}
