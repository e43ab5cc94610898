// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Razorpay subscription routes.

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use super::validate_body;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{new_id, Role, Subscription, SubscriptionStatus};
use crate::services::billing::{self, WebhookEvent};
use crate::services::Caller;
use crate::AppState;

/// Header carrying the webhook HMAC.
pub const SIGNATURE_HEADER: &str = "x-razorpay-signature";

/// Webhook route. Authenticated by signature, not session.
pub fn webhook_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/subscription/webhook", post(handle_webhook))
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/subscription/create", post(create_subscription))
        .route("/api/subscription/me", get(get_my_subscription))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubscriptionRequest {
    /// Razorpay plan ID
    #[validate(length(min = 1, max = 64))]
    pub plan: String,
    /// Defaults to the caller; only admins may name another user.
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubscriptionResponse {
    pub subscription_id: String,
}

async fn create_subscription(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<CreateSubscriptionRequest>,
) -> Result<Json<CreateSubscriptionResponse>> {
    validate_body(&req)?;

    let client = state
        .billing
        .client()
        .ok_or_else(|| AppError::ServiceUnavailable("Payment service not configured".to_string()))?;

    let caller = Caller::load(&state.db, &auth).await?;
    let user_id = req.user_id.unwrap_or_else(|| caller.user.id.clone());
    if user_id != caller.user.id && caller.role() != Role::Admin {
        return Err(AppError::Forbidden(
            "Cannot create a subscription for another user".to_string(),
        ));
    }

    let user = state
        .db
        .get_user(&user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let gateway = client.create_subscription(&req.plan).await?;

    let subscription = Subscription {
        id: new_id(),
        user_id: user.id.clone(),
        plan: req.plan,
        razorpay_subscription_id: gateway.id.clone(),
        status: SubscriptionStatus::Inactive,
        start_date: Utc::now(),
        end_date: None,
    };
    state.db.upsert_subscription(&subscription).await?;

    tracing::info!(
        user_id = %user.id,
        subscription_id = %subscription.id,
        razorpay_id = %gateway.id,
        "Subscription created"
    );

    Ok(Json(CreateSubscriptionResponse {
        subscription_id: gateway.id,
    }))
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub status: &'static str,
}

/// Razorpay event callback. The signature covers the raw body bytes.
async fn handle_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if !state.billing.verify_webhook_signature(&body, signature) {
        tracing::warn!("Invalid webhook signature");
        return Err(AppError::Forbidden("Invalid webhook signature".to_string()));
    }

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid webhook payload: {}", e)))?;

    let gateway_id = match event.gateway_subscription_id() {
        Some(id) if event.is_handled() => id,
        _ => {
            tracing::debug!(event = %event.event, "Unhandled webhook event");
            return Ok(Json(WebhookAck { status: "ok" }));
        }
    };

    tracing::info!(event = %event.event, razorpay_id = %gateway_id, "Received webhook");

    let mut subscription = state
        .db
        .find_subscription_by_gateway_id(gateway_id)
        .await?
        .ok_or_else(|| {
            tracing::error!(razorpay_id = %gateway_id, "Webhook for unknown subscription");
            AppError::NotFound(format!("Subscription {} not found", gateway_id))
        })?;

    if billing::apply_event(&mut subscription, &event) {
        state.db.upsert_subscription(&subscription).await?;
        tracing::info!(
            subscription_id = %subscription.id,
            status = ?subscription.status,
            "Subscription updated"
        );
    }

    Ok(Json(WebhookAck { status: "ok" }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MySubscriptionResponse {
    pub active: bool,
    pub subscription: Option<Subscription>,
}

/// Caller's most recent subscription.
async fn get_my_subscription(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<MySubscriptionResponse>> {
    let subscription = state.db.latest_subscription_for_user(&auth.user_id).await?;
    let active = subscription
        .as_ref()
        .is_some_and(|s| s.is_active(Utc::now()));
    Ok(Json(MySubscriptionResponse {
        active,
        subscription,
    }))
}
