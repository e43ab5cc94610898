// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use atkans_med::config::Config;
use atkans_med::db::{Database, FirestoreStore};
use atkans_med::middleware::auth::create_jwt;
use atkans_med::models::{DoctorProfile, PatientProfile, Role, User};
use atkans_med::routes::create_router;
use atkans_med::services::Notifier;
use atkans_med::AppState;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use std::sync::Arc;
use tower::ServiceExt;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a database connected to the Firestore emulator.
#[allow(dead_code)]
pub async fn test_db() -> Database {
    let store = FirestoreStore::connect("test-project")
        .await
        .expect("Failed to connect to Firestore emulator");
    Database::firestore(store)
}

/// Create a test app over the in-memory store with a recording notifier.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    create_test_app_with(Config::test_default())
}

#[allow(dead_code)]
pub fn create_test_app_with(config: Config) -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(
        AppState::new(config, Database::memory(), Notifier::recording())
            .expect("Failed to build test state"),
    );
    (create_router(state.clone()), state)
}

/// Session token for a user id, signed with the test key.
#[allow(dead_code)]
pub fn token_for(state: &AppState, user_id: &str) -> String {
    create_jwt(user_id, &state.config.jwt_signing_key).unwrap()
}

/// Verified patient with a profile. Returns the user, profile and a token.
#[allow(dead_code)]
pub async fn seed_patient(state: &AppState, phone: &str) -> (User, PatientProfile, String) {
    let mut user = User::new(None, Some(phone.to_string()), Role::Patient);
    user.is_verified = true;
    state.db.upsert_user(&user).await.unwrap();

    let mut profile = PatientProfile::new(&user.id, format!("Patient {}", phone));
    profile.phone = Some(phone.to_string());
    state.db.upsert_patient(&profile).await.unwrap();

    let token = token_for(state, &user.id);
    (user, profile, token)
}

/// Verified doctor with a profile. Returns the user, profile and a token.
#[allow(dead_code)]
pub async fn seed_doctor(state: &AppState, phone: &str) -> (User, DoctorProfile, String) {
    let mut user = User::new(None, Some(phone.to_string()), Role::Doctor);
    user.is_verified = true;
    state.db.upsert_user(&user).await.unwrap();

    let mut profile = DoctorProfile::new(&user.id, format!("Dr. {}", phone));
    profile.hospital = Some("City Hospital".to_string());
    state.db.upsert_doctor(&profile).await.unwrap();

    let token = token_for(state, &user.id);
    (user, profile, token)
}

/// Verified admin. Returns the user and a token.
#[allow(dead_code)]
pub async fn seed_admin(state: &AppState) -> (User, String) {
    let mut user = User::new(Some("admin@example.com".to_string()), None, Role::Admin);
    user.is_verified = true;
    state.db.upsert_user(&user).await.unwrap();
    let token = token_for(state, &user.id);
    (user, token)
}

/// Send a JSON request and decode the JSON response.
#[allow(dead_code)]
pub async fn send_json(
    app: &axum::Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };
    (status, json)
}
