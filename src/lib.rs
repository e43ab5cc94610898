// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Atkans Med: healthcare records API
//!
//! This crate provides the backend API for OTP sign-in, patient and doctor
//! profiles, doctor access grants, medical reports, prescriptions and
//! Razorpay subscriptions.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::Database;
use services::{BillingService, Notifier, OtpService, ReportStorage};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub otp: OtpService,
    pub notifier: Notifier,
    pub billing: BillingService,
    pub storage: ReportStorage,
}

impl AppState {
    /// Assemble state around an already-connected database and notifier.
    pub fn new(config: Config, db: Database, notifier: Notifier) -> anyhow::Result<Self> {
        let otp = OtpService::new(
            &config.jwt_signing_key,
            config.otp_length,
            config.otp_expiry_minutes,
        )?;
        let billing = BillingService::from_config(&config);
        let storage = ReportStorage::new(&config.upload_dir);

        Ok(Self {
            config,
            db,
            otp,
            notifier,
            billing,
            storage,
        })
    }
}
