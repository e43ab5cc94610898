// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Patient profile reads and partial updates.

use axum::http::StatusCode;
use serde_json::json;

mod common;

#[tokio::test]
async fn test_partial_profile_update() {
    let (app, state) = common::create_test_app();
    let (_, patient, token) = common::seed_patient(&state, "+911234567890").await;

    let (status, body) = common::send_json(
        &app,
        "PUT",
        "/api/patient/profile",
        Some(&token),
        Some(json!({
            "age": 34,
            "bloodGroup": "O+",
            "medicalInfo": { "allergies": ["Penicillin"] }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "update failed: {}", body);
    assert_eq!(body["id"], patient.id.as_str());
    assert_eq!(body["age"], 34);
    assert_eq!(body["bloodGroup"], "O+");
    assert_eq!(body["medicalInfo"]["allergies"], json!(["Penicillin"]));
    // Untouched fields keep their values
    assert_eq!(body["name"], patient.name.as_str());
    assert_eq!(body["medicalInfo"]["conditions"], json!([]));

    let (status, _) = common::send_json(
        &app,
        "PUT",
        "/api/patient/profile",
        Some(&token),
        Some(json!({ "age": 400 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_profile_update_is_patient_only() {
    let (app, state) = common::create_test_app();
    let (_, _, doctor_token) = common::seed_doctor(&state, "+15550000001").await;

    let (status, _) = common::send_json(
        &app,
        "PUT",
        "/api/patient/profile",
        Some(&doctor_token),
        Some(json!({ "age": 40 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_get_patient_by_profile_or_user_id() {
    let (app, state) = common::create_test_app();
    let (user, patient, token) = common::seed_patient(&state, "+911234567890").await;
    let (_, admin_token) = common::seed_admin(&state).await;

    for id in [&patient.id, &user.id] {
        let uri = format!("/api/patient/{}", id);
        let (status, body) = common::send_json(&app, "GET", &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], patient.id.as_str());
        assert_eq!(body["user"]["isVerified"], true);
        assert_eq!(body["user"]["role"], "patient");
    }

    let (status, _) =
        common::send_json(&app, "GET", "/api/patient/unknown", Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Another patient is refused
    let (_, _, other_token) = common::seed_patient(&state, "+919999999999").await;
    let uri = format!("/api/patient/{}", patient.id);
    let (status, _) = common::send_json(&app, "GET", &uri, Some(&other_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
