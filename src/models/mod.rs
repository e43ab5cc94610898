// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.
//!
//! Every document carries its own `id` and is stored in camelCase so the
//! shape matches what the dashboard reads.

pub mod access_request;
pub mod audit;
pub mod doctor;
pub mod patient;
pub mod prescription;
pub mod report;
pub mod stats;
pub mod subscription;
pub mod user;

pub use access_request::{AccessRequest, AccessRequestStatus};
pub use audit::{AuditAction, AuditEntry};
pub use doctor::{DoctorProfile, DoctorSummary};
pub use patient::{AccessLevel, AuthorizedDoctor, Insurance, MedicalInfo, PatientProfile};
pub use prescription::{Medicine, Prescription};
pub use report::{Report, ReportType};
pub use stats::Stats;
pub use subscription::{Subscription, SubscriptionStatus};
pub use user::{OtpChallenge, Role, User, UserView};

/// Generate a fresh document id.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
