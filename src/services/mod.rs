// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod access;
pub mod billing;
pub mod notifier;
pub mod otp;
pub mod storage;

pub use access::{Caller, Decision};
pub use billing::BillingService;
pub use notifier::{Contact, DeliveryMethod, Notifier};
pub use otp::{OtpService, OtpVerdict};
pub use storage::ReportStorage;
