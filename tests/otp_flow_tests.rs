// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OTP registration and login flow tests.
//!
//! These tests verify that:
//! 1. A code can be consumed exactly once
//! 2. Re-sending replaces the previous code
//! 3. Expired codes are rejected even when they match
//! 4. Login OTP failures are 401, registration failures 400

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use serde_json::json;

mod common;

const PHONE: &str = "+911234567890";

async fn send_sms_otp(app: &axum::Router) {
    let (status, body) = common::send_json(
        app,
        "POST",
        "/api/auth/send-otp",
        None,
        Some(json!({ "phone": PHONE, "method": "sms" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "send-otp failed: {}", body);
    assert_eq!(body["success"], true);
    assert_eq!(body["expiresIn"], 10);
}

async fn verify(app: &axum::Router, code: &str) -> (StatusCode, serde_json::Value) {
    common::send_json(
        app,
        "POST",
        "/api/auth/verify-otp",
        None,
        Some(json!({ "phone": PHONE, "otp": code, "method": "sms", "name": "Asha" })),
    )
    .await
}

#[tokio::test]
async fn test_otp_is_single_use() {
    let (app, state) = common::create_test_app();

    send_sms_otp(&app).await;
    let code = state.notifier.last_code(PHONE).expect("code recorded");

    let (status, body) = verify(&app, &code).await;
    assert_eq!(status, StatusCode::OK, "verify failed: {}", body);
    assert!(!body["token"].as_str().unwrap().is_empty());
    assert_eq!(body["user"]["phone"], PHONE);
    assert_eq!(body["user"]["isVerified"], true);
    assert!(body["user"].get("otp").is_none());

    let (status, body) = verify(&app, &code).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "OTP already verified or expired. Please request a new one."
    );
}

#[tokio::test]
async fn test_resend_invalidates_previous_code() {
    let (app, state) = common::create_test_app();

    send_sms_otp(&app).await;
    let first = state.notifier.last_code(PHONE).unwrap();

    // Codes are random; resend until a different one is issued.
    let second = loop {
        send_sms_otp(&app).await;
        let code = state.notifier.last_code(PHONE).unwrap();
        if code != first {
            break code;
        }
    };

    let (status, body) = verify(&app, &first).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid OTP. Please try again.");

    let (status, _) = verify(&app, &second).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_expired_code_rejected() {
    let (app, state) = common::create_test_app();

    send_sms_otp(&app).await;
    let code = state.notifier.last_code(PHONE).unwrap();

    let mut user = state.db.find_user_by_phone(PHONE).await.unwrap().unwrap();
    let challenge = user.otp.as_mut().unwrap();
    challenge.expires_at = Utc::now() - Duration::minutes(1);
    state.db.upsert_user(&user).await.unwrap();

    let (status, body) = verify(&app, &code).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "OTP has expired. Request a new one.");
}

#[tokio::test]
async fn test_verify_creates_patient_profile() {
    let (app, state) = common::create_test_app();

    send_sms_otp(&app).await;
    let code = state.notifier.last_code(PHONE).unwrap();
    let (_, body) = verify(&app, &code).await;
    let token = body["token"].as_str().unwrap().to_string();

    let (status, me) = common::send_json(&app, "GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["user"]["role"], "patient");
    assert_eq!(me["patient"]["name"], "Asha");
    assert_eq!(me["patient"]["phone"], PHONE);
    assert_eq!(me["patient"]["authorizedDoctors"], json!([]));
}

#[tokio::test]
async fn test_send_otp_requires_contact() {
    let (app, _) = common::create_test_app();

    let (status, body) =
        common::send_json(&app, "POST", "/api/auth/send-otp", None, Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "Please provide either an email or a phone number."
    );

    let (status, _) = common::send_json(
        &app,
        "POST",
        "/api/auth/send-otp",
        None,
        Some(json!({ "phone": "12345", "method": "sms" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_email_registration() {
    let (app, state) = common::create_test_app();

    let (status, _) = common::send_json(
        &app,
        "POST",
        "/api/auth/send-otp",
        None,
        Some(json!({ "email": "Doc@Example.com", "role": "doctor" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let code = state.notifier.last_code("doc@example.com").unwrap();
    let (status, body) = common::send_json(
        &app,
        "POST",
        "/api/auth/verify-otp",
        None,
        Some(json!({ "email": "doc@example.com", "otp": code, "name": "Dr. Rao" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["role"], "doctor");

    let user = state
        .db
        .find_user_by_email("doc@example.com")
        .await
        .unwrap()
        .unwrap();
    let doctor = state.db.find_doctor_by_user(&user.id).await.unwrap().unwrap();
    assert_eq!(doctor.specialty, "General");
    assert_eq!(doctor.name, "Dr. Rao");
}

#[tokio::test]
async fn test_admin_role_cannot_self_register() {
    let (app, _) = common::create_test_app();

    let (status, _) = common::send_json(
        &app,
        "POST",
        "/api/auth/send-otp",
        None,
        Some(json!({ "phone": PHONE, "method": "sms", "role": "admin" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_otp_flow() {
    let (app, state) = common::create_test_app();
    let login_body = json!({ "phone": PHONE, "method": "sms" });

    // Unknown user
    let (status, body) = common::send_json(
        &app,
        "POST",
        "/api/auth/request-login-otp",
        None,
        Some(login_body.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "User not found.");

    common::seed_patient(&state, PHONE).await;

    let (status, _) = common::send_json(
        &app,
        "POST",
        "/api/auth/request-login-otp",
        None,
        Some(login_body),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let code = state.notifier.last_code(PHONE).unwrap();
    let wrong = if code == "000000" { "111111" } else { "000000" };

    let verify_login = |otp: String| {
        let app = app.clone();
        async move {
            common::send_json(
                &app,
                "POST",
                "/api/auth/verify-login-otp",
                None,
                Some(json!({ "phone": PHONE, "otp": otp, "method": "sms" })),
            )
            .await
        }
    };

    let (status, body) = verify_login(wrong.to_string()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid OTP. Please try again.");

    let (status, body) = verify_login(code.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Login successful!");

    let (status, body) = verify_login(code).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        body["message"],
        "Login OTP already verified or expired. Please request a new one."
    );

    // The registration challenge is untouched by login.
    let user = state.db.find_user_by_phone(PHONE).await.unwrap().unwrap();
    assert!(user.otp.is_none());
    assert!(user.login_otp.is_none());
    assert!(user.last_login_at.is_some());
}
