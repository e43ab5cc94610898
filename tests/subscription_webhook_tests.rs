// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Razorpay subscription creation and webhook handling.
//!
//! These tests verify that:
//! 1. Webhooks are only accepted with a valid HMAC signature
//! 2. Activation and cancellation events update the stored subscription
//! 3. Creation fails cleanly when the gateway is not configured

use atkans_med::config::Config;
use atkans_med::models::{new_id, Subscription, SubscriptionStatus};
use atkans_med::services::billing;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

mod common;

const WEBHOOK_SECRET: &[u8] = b"test_webhook_secret";

fn event_body(event: &str, gateway_id: &str, current_end: Option<i64>) -> Vec<u8> {
    json!({
        "entity": "event",
        "event": event,
        "payload": {
            "subscription": {
                "entity": { "id": gateway_id, "status": "active", "current_end": current_end }
            }
        }
    })
    .to_string()
    .into_bytes()
}

async fn post_webhook(
    app: &axum::Router,
    body: Vec<u8>,
    signature: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/subscription/webhook")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(signature) = signature {
        builder = builder.header("x-razorpay-signature", signature);
    }

    let response = app
        .clone()
        .oneshot(builder.body(Body::from(body)).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn seed_subscription(state: &atkans_med::AppState, user_id: &str) -> Subscription {
    let subscription = Subscription {
        id: new_id(),
        user_id: user_id.to_string(),
        plan: "plan_basic".to_string(),
        razorpay_subscription_id: "sub_test_123".to_string(),
        status: SubscriptionStatus::Inactive,
        start_date: Utc::now(),
        end_date: None,
    };
    state.db.upsert_subscription(&subscription).await.unwrap();
    subscription
}

#[tokio::test]
async fn test_webhook_rejects_bad_signature() {
    let (app, state) = common::create_test_app();
    let (user, _, _) = common::seed_patient(&state, "+911234567890").await;
    seed_subscription(&state, &user.id).await;

    let body = event_body("subscription.activated", "sub_test_123", None);

    let (status, _) = post_webhook(&app, body.clone(), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body_json) = post_webhook(&app, body.clone(), Some("deadbeef")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body_json["message"], "Invalid webhook signature");

    // Signed with the wrong secret
    let forged = billing::sign(b"not_the_secret", &body);
    let (status, _) = post_webhook(&app, body, Some(&forged)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let stored = state
        .db
        .find_subscription_by_gateway_id("sub_test_123")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, SubscriptionStatus::Inactive);
}

#[tokio::test]
async fn test_webhook_activation_and_cancellation() {
    let (app, state) = common::create_test_app();
    let (user, _, token) = common::seed_patient(&state, "+911234567890").await;
    seed_subscription(&state, &user.id).await;

    let current_end = Utc::now().timestamp() + 30 * 24 * 3600;
    let body = event_body("subscription.activated", "sub_test_123", Some(current_end));
    let signature = billing::sign(WEBHOOK_SECRET, &body);

    let (status, ack) = post_webhook(&app, body, Some(&signature)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["status"], "ok");

    let stored = state
        .db
        .find_subscription_by_gateway_id("sub_test_123")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, SubscriptionStatus::Active);
    assert_eq!(
        stored.end_date,
        Utc.timestamp_opt(current_end, 0).single()
    );

    let (status, me) =
        common::send_json(&app, "GET", "/api/subscription/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["active"], true);
    assert_eq!(me["subscription"]["status"], "active");

    let body = event_body("subscription.cancelled", "sub_test_123", None);
    let signature = billing::sign(WEBHOOK_SECRET, &body);
    let (status, _) = post_webhook(&app, body, Some(&signature)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, me) =
        common::send_json(&app, "GET", "/api/subscription/me", Some(&token), None).await;
    assert_eq!(me["active"], false);
    assert_eq!(me["subscription"]["status"], "cancelled");
}

#[tokio::test]
async fn test_webhook_unknown_subscription_and_event() {
    let (app, state) = common::create_test_app();
    let (user, _, _) = common::seed_patient(&state, "+911234567890").await;
    seed_subscription(&state, &user.id).await;

    let body = event_body("subscription.activated", "sub_missing", None);
    let signature = billing::sign(WEBHOOK_SECRET, &body);
    let (status, _) = post_webhook(&app, body, Some(&signature)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Unhandled events are acknowledged without changes
    let body = event_body("subscription.pending", "sub_test_123", None);
    let signature = billing::sign(WEBHOOK_SECRET, &body);
    let (status, _) = post_webhook(&app, body, Some(&signature)).await;
    assert_eq!(status, StatusCode::OK);

    let stored = state
        .db
        .find_subscription_by_gateway_id("sub_test_123")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, SubscriptionStatus::Inactive);

    let body = b"not json".to_vec();
    let signature = billing::sign(WEBHOOK_SECRET, &body);
    let (status, _) = post_webhook(&app, body, Some(&signature)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_webhook_acknowledges_non_subscription_events() {
    let (app, state) = common::create_test_app();
    let (user, _, _) = common::seed_patient(&state, "+911234567890").await;
    seed_subscription(&state, &user.id).await;

    for body in [
        json!({
            "entity": "event",
            "event": "payment.captured",
            "payload": { "payment": { "entity": { "id": "pay_123", "amount": 49900 } } }
        }),
        json!({ "entity": "event", "event": "invoice.paid" }),
    ] {
        let body = body.to_string().into_bytes();
        let signature = billing::sign(WEBHOOK_SECRET, &body);
        let (status, ack) = post_webhook(&app, body, Some(&signature)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ack["status"], "ok");
    }

    let stored = state
        .db
        .find_subscription_by_gateway_id("sub_test_123")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, SubscriptionStatus::Inactive);
}

#[tokio::test]
async fn test_webhook_rejected_without_configured_secret() {
    let mut config = Config::test_default();
    config.razorpay_webhook_secret = None;
    let (app, _) = common::create_test_app_with(config);

    let body = event_body("subscription.activated", "sub_test_123", None);
    let signature = billing::sign(WEBHOOK_SECRET, &body);
    let (status, _) = post_webhook(&app, body, Some(&signature)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_create_without_gateway_keys() {
    let (app, state) = common::create_test_app();
    let (_, _, token) = common::seed_patient(&state, "+911234567890").await;

    let (status, body) = common::send_json(
        &app,
        "POST",
        "/api/subscription/create",
        Some(&token),
        Some(json!({ "plan": "plan_basic" })),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["message"], "Payment service not configured");
}

#[tokio::test]
async fn test_create_for_other_user_requires_admin() {
    let mut config = Config::test_default();
    config.razorpay_key_id = Some("rzp_test_key".to_string());
    config.razorpay_key_secret = Some("rzp_test_secret".to_string());
    let (app, state) = common::create_test_app_with(config);

    let (_, _, token) = common::seed_patient(&state, "+911234567890").await;
    let (other, _, _) = common::seed_patient(&state, "+919999999999").await;

    let (status, _) = common::send_json(
        &app,
        "POST",
        "/api/subscription/create",
        Some(&token),
        Some(json!({ "plan": "plan_basic", "userId": other.id })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = common::send_json(
        &app,
        "POST",
        "/api/subscription/create",
        Some(&token),
        Some(json!({ "plan": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_my_subscription_when_none() {
    let (app, state) = common::create_test_app();
    let (_, _, token) = common::seed_patient(&state, "+911234567890").await;

    let (status, me) =
        common::send_json(&app, "GET", "/api/subscription/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["active"], false);
    assert!(me["subscription"].is_null());
}
