// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Typed per-entity operations.
//!
//! Provides high-level operations for:
//! - Users (identity and OTP challenges)
//! - Patient and doctor profiles
//! - Access requests (approve/reject applied transactionally with the patient)
//! - Reports, prescriptions, subscriptions and the audit log

use super::{collections, Database};
use crate::error::AppError;
use crate::models::{
    AccessRequest, AccessRequestStatus, AuditEntry, DoctorProfile, PatientProfile, Prescription,
    Report, Stats, Subscription, User,
};
use crate::time_utils::format_utc_rfc3339;
use futures_util::{stream, StreamExt};
use std::collections::{HashMap, HashSet};

const MAX_CONCURRENT_DB_OPS: usize = 16;

impl Database {
    // ─── User Operations ─────────────────────────────────────────

    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        self.get(collections::USERS, id).await
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .find_by(collections::USERS, "email", email)
            .await?
            .into_iter()
            .next())
    }

    pub async fn find_user_by_phone(&self, phone: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .find_by(collections::USERS, "phone", phone)
            .await?
            .into_iter()
            .next())
    }

    /// Create or update a user.
    pub async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        self.put(collections::USERS, &user.id, user).await
    }

    /// Transactional read-modify-write of a stored user.
    ///
    /// Used wherever a change depends on the user's current state, such as
    /// consuming an OTP challenge exactly once.
    pub async fn update_user<R, F>(&self, id: &str, mut apply: F) -> Result<R, AppError>
    where
        R: Send,
        F: FnMut(&mut User) -> Result<R, AppError> + Send,
    {
        self.transact(
            (collections::USERS, id),
            None,
            |user: &mut Option<User>, _: &mut Option<User>| {
                let user = user
                    .as_mut()
                    .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
                apply(user)
            },
        )
        .await
    }

    pub async fn delete_user(&self, id: &str) -> Result<(), AppError> {
        self.remove(collections::USERS, id).await
    }

    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let mut users: Vec<User> = self.list(collections::USERS).await?;
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    // ─── Profile Operations ──────────────────────────────────────

    pub async fn get_patient(&self, id: &str) -> Result<Option<PatientProfile>, AppError> {
        self.get(collections::PATIENTS, id).await
    }

    /// Patient profile owned by a user, if one was created.
    pub async fn find_patient_by_user(
        &self,
        user_id: &str,
    ) -> Result<Option<PatientProfile>, AppError> {
        Ok(self
            .find_by(collections::PATIENTS, "userId", user_id)
            .await?
            .into_iter()
            .next())
    }

    pub async fn upsert_patient(&self, patient: &PatientProfile) -> Result<(), AppError> {
        self.put(collections::PATIENTS, &patient.id, patient).await
    }

    /// Transactional read-modify-write of a stored patient profile.
    pub async fn update_patient<R, F>(&self, id: &str, mut apply: F) -> Result<R, AppError>
    where
        R: Send,
        F: FnMut(&mut PatientProfile) -> Result<R, AppError> + Send,
    {
        self.transact(
            (collections::PATIENTS, id),
            None,
            |patient: &mut Option<PatientProfile>, _: &mut Option<PatientProfile>| {
                let patient = patient
                    .as_mut()
                    .ok_or_else(|| AppError::NotFound("Patient profile not found".to_string()))?;
                apply(patient)
            },
        )
        .await
    }

    pub async fn get_doctor(&self, id: &str) -> Result<Option<DoctorProfile>, AppError> {
        self.get(collections::DOCTORS, id).await
    }

    pub async fn find_doctor_by_user(
        &self,
        user_id: &str,
    ) -> Result<Option<DoctorProfile>, AppError> {
        Ok(self
            .find_by(collections::DOCTORS, "userId", user_id)
            .await?
            .into_iter()
            .next())
    }

    pub async fn upsert_doctor(&self, doctor: &DoctorProfile) -> Result<(), AppError> {
        self.put(collections::DOCTORS, &doctor.id, doctor).await
    }

    /// Batched lookup of doctor profiles; missing ids are simply absent.
    pub async fn get_doctors<'a, I>(&self, ids: I) -> Result<HashMap<String, DoctorProfile>, AppError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let unique: HashSet<String> = ids.into_iter().map(str::to_string).collect();

        let found = stream::iter(unique)
            .map(|id| async move { self.get_doctor(&id).await })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<Option<DoctorProfile>, AppError>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<_>, AppError>>()?;

        Ok(found
            .into_iter()
            .flatten()
            .map(|doctor| (doctor.id.clone(), doctor))
            .collect())
    }

    // ─── Access Request Operations ───────────────────────────────

    pub async fn get_access_request(&self, id: &str) -> Result<Option<AccessRequest>, AppError> {
        self.get(collections::ACCESS_REQUESTS, id).await
    }

    pub async fn create_access_request(&self, request: &AccessRequest) -> Result<(), AppError> {
        self.put(collections::ACCESS_REQUESTS, &request.id, request)
            .await
    }

    pub async fn list_access_requests(&self) -> Result<Vec<AccessRequest>, AppError> {
        let mut requests: Vec<AccessRequest> = self.list(collections::ACCESS_REQUESTS).await?;
        requests.sort_by(|a, b| b.requested_at.cmp(&a.requested_at));
        Ok(requests)
    }

    pub async fn pending_access_requests(&self) -> Result<Vec<AccessRequest>, AppError> {
        let mut requests: Vec<AccessRequest> = self
            .find_by(
                collections::ACCESS_REQUESTS,
                "status",
                AccessRequestStatus::Pending.as_str(),
            )
            .await?;
        requests.sort_by(|a, b| b.requested_at.cmp(&a.requested_at));
        Ok(requests)
    }

    /// Update an access request and a patient profile in one transaction.
    ///
    /// `apply` runs against the stored documents, not a caller's earlier
    /// snapshot, so concurrent approvals and revocations compose. Either
    /// document missing is `NotFound`; an error from `apply` writes nothing.
    pub async fn update_request_and_patient<R, F>(
        &self,
        request_id: &str,
        patient_id: &str,
        mut apply: F,
    ) -> Result<R, AppError>
    where
        R: Send,
        F: FnMut(&mut AccessRequest, &mut PatientProfile) -> Result<R, AppError> + Send,
    {
        self.transact(
            (collections::ACCESS_REQUESTS, request_id),
            Some((collections::PATIENTS, patient_id)),
            |request: &mut Option<AccessRequest>, patient: &mut Option<PatientProfile>| {
                let request = request
                    .as_mut()
                    .ok_or_else(|| AppError::NotFound("Request not found".to_string()))?;
                let patient = patient
                    .as_mut()
                    .ok_or_else(|| AppError::NotFound("Patient profile not found".to_string()))?;
                apply(request, patient)
            },
        )
        .await
    }

    // ─── Report & Prescription Operations ────────────────────────

    pub async fn create_report(&self, report: &Report) -> Result<(), AppError> {
        self.put(collections::REPORTS, &report.id, report).await
    }

    /// Reports for a patient profile, newest first.
    pub async fn reports_for_patient(&self, patient_id: &str) -> Result<Vec<Report>, AppError> {
        let mut reports: Vec<Report> = self
            .find_by(collections::REPORTS, "patientId", patient_id)
            .await?;
        reports.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(reports)
    }

    pub async fn create_prescription(&self, prescription: &Prescription) -> Result<(), AppError> {
        self.put(collections::PRESCRIPTIONS, &prescription.id, prescription)
            .await
    }

    /// Prescriptions for a patient profile, newest first.
    pub async fn prescriptions_for_patient(
        &self,
        patient_id: &str,
    ) -> Result<Vec<Prescription>, AppError> {
        let mut prescriptions: Vec<Prescription> = self
            .find_by(collections::PRESCRIPTIONS, "patientId", patient_id)
            .await?;
        prescriptions.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(prescriptions)
    }

    // ─── Subscription Operations ─────────────────────────────────

    pub async fn upsert_subscription(&self, subscription: &Subscription) -> Result<(), AppError> {
        self.put(collections::SUBSCRIPTIONS, &subscription.id, subscription)
            .await
    }

    pub async fn find_subscription_by_gateway_id(
        &self,
        razorpay_subscription_id: &str,
    ) -> Result<Option<Subscription>, AppError> {
        Ok(self
            .find_by(
                collections::SUBSCRIPTIONS,
                "razorpaySubscriptionId",
                razorpay_subscription_id,
            )
            .await?
            .into_iter()
            .next())
    }

    /// Most recently started subscription of a user.
    pub async fn latest_subscription_for_user(
        &self,
        user_id: &str,
    ) -> Result<Option<Subscription>, AppError> {
        let subscriptions: Vec<Subscription> = self
            .find_by(collections::SUBSCRIPTIONS, "userId", user_id)
            .await?;
        Ok(subscriptions.into_iter().max_by_key(|s| s.start_date))
    }

    // ─── Audit Log ───────────────────────────────────────────────

    pub async fn record_audit(&self, entry: &AuditEntry) -> Result<(), AppError> {
        self.put(collections::AUDIT_LOGS, &entry.id, entry).await
    }

    /// Write an audit entry, logging instead of failing the request.
    pub async fn record_audit_best_effort(&self, entry: AuditEntry) {
        if let Err(e) = self.record_audit(&entry).await {
            tracing::warn!(error = %e, action = ?entry.action, "Failed to write audit entry");
        }
    }

    pub async fn list_audit_entries(&self) -> Result<Vec<AuditEntry>, AppError> {
        let mut entries: Vec<AuditEntry> = self.list(collections::AUDIT_LOGS).await?;
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(entries)
    }

    // ─── Stats ───────────────────────────────────────────────────

    /// Count documents in every collection.
    pub async fn stats(&self) -> Result<Stats, AppError> {
        let (users, patients, doctors, reports, prescriptions, access_requests, subscriptions) =
            tokio::try_join!(
                self.list::<User>(collections::USERS),
                self.count(collections::PATIENTS),
                self.count(collections::DOCTORS),
                self.count(collections::REPORTS),
                self.count(collections::PRESCRIPTIONS),
                self.count(collections::ACCESS_REQUESTS),
                self.count(collections::SUBSCRIPTIONS),
            )?;

        Ok(Stats {
            total_users: users.len(),
            active_users: users.iter().filter(|u| u.is_verified).count(),
            patients,
            doctors,
            reports,
            prescriptions,
            access_requests,
            subscriptions,
            timestamp: format_utc_rfc3339(chrono::Utc::now()),
        })
    }
}
