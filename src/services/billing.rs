// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Razorpay subscriptions: gateway client and webhook handling.

use crate::config::Config;
use crate::error::AppError;
use crate::models::{Subscription, SubscriptionStatus};
use crate::time_utils::from_unix_seconds;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::OnceLock;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Billing cycles requested for a new subscription.
const DEFAULT_TOTAL_COUNT: u32 = 12;

/// Razorpay REST client.
#[derive(Clone)]
pub struct RazorpayClient {
    http: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

#[derive(Serialize)]
struct CreateSubscriptionRequest<'a> {
    plan_id: &'a str,
    total_count: u32,
    customer_notify: u8,
}

/// Subscription object returned by the gateway.
#[derive(Debug, Deserialize)]
pub struct GatewaySubscription {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
}

impl RazorpayClient {
    pub fn new(key_id: String, key_secret: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: "https://api.razorpay.com/v1".to_string(),
            key_id,
            key_secret,
        }
    }

    /// Create a gateway subscription for a plan.
    pub async fn create_subscription(&self, plan_id: &str) -> Result<GatewaySubscription, AppError> {
        let response = self
            .http
            .post(format!("{}/subscriptions", self.base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&CreateSubscriptionRequest {
                plan_id,
                total_count: DEFAULT_TOTAL_COUNT,
                customer_notify: 1,
            })
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Razorpay request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%status, body = %body, "Razorpay rejected subscription");
            if status.is_client_error() {
                return Err(AppError::BadRequest(format!(
                    "Payment gateway rejected plan {}",
                    plan_id
                )));
            }
            return Err(AppError::Upstream(format!("Razorpay returned HTTP {}", status)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Invalid Razorpay response: {}", e)))
    }
}

/// Lazily builds the gateway client and checks webhook signatures.
pub struct BillingService {
    credentials: Option<(String, String)>,
    webhook_secret: Option<String>,
    client: OnceLock<RazorpayClient>,
}

impl BillingService {
    pub fn from_config(config: &Config) -> Self {
        let credentials = config
            .razorpay_key_id
            .clone()
            .zip(config.razorpay_key_secret.clone());
        Self {
            credentials,
            webhook_secret: config.razorpay_webhook_secret.clone(),
            client: OnceLock::new(),
        }
    }

    /// Gateway client, built on first use. `None` when keys are absent.
    pub fn client(&self) -> Option<&RazorpayClient> {
        let (key_id, key_secret) = self.credentials.as_ref()?;
        Some(self.client.get_or_init(|| {
            tracing::info!("Initializing Razorpay client");
            RazorpayClient::new(key_id.clone(), key_secret.clone())
        }))
    }

    /// Check `x-razorpay-signature` (hex HMAC-SHA256 of the raw body).
    pub fn verify_webhook_signature(&self, body: &[u8], signature: &str) -> bool {
        let Some(secret) = &self.webhook_secret else {
            tracing::warn!("RAZORPAY_WEBHOOK_SECRET not set; rejecting webhook");
            return false;
        };
        let expected = sign(secret.as_bytes(), body);
        expected
            .as_bytes()
            .ct_eq(signature.trim().to_ascii_lowercase().as_bytes())
            .into()
    }
}

/// Hex HMAC-SHA256 signature as Razorpay computes it.
pub fn sign(secret: &[u8], body: &[u8]) -> String {
    // HMAC accepts keys of any length.
    let mut mac = match HmacSha256::new_from_slice(secret) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Webhook envelope; only the fields acted on are decoded.
///
/// Razorpay sends payment, invoice and other entity events to the same
/// endpoint, so the subscription entity is optional.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    #[serde(default)]
    pub payload: WebhookPayload,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub subscription: Option<WebhookEntity>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEntity {
    pub entity: WebhookSubscription,
}

#[derive(Debug, Deserialize)]
pub struct WebhookSubscription {
    pub id: String,
    #[serde(default)]
    pub current_end: Option<i64>,
}

/// Subscription lifecycle events that change the stored record.
const HANDLED_EVENTS: &[&str] = &[
    "subscription.activated",
    "subscription.charged",
    "subscription.halted",
    "subscription.cancelled",
];

impl WebhookEvent {
    fn subscription(&self) -> Option<&WebhookSubscription> {
        self.payload.subscription.as_ref().map(|s| &s.entity)
    }

    /// Gateway subscription id, when the event carries a subscription.
    pub fn gateway_subscription_id(&self) -> Option<&str> {
        self.subscription().map(|s| s.id.as_str())
    }

    /// Whether this event updates a stored subscription.
    pub fn is_handled(&self) -> bool {
        HANDLED_EVENTS.contains(&self.event.as_str()) && self.subscription().is_some()
    }
}

/// Apply a webhook event to the stored subscription.
///
/// Returns false for events that do not change the subscription.
pub fn apply_event(subscription: &mut Subscription, event: &WebhookEvent) -> bool {
    if !event.is_handled() {
        return false;
    }

    let end_date = event
        .subscription()
        .and_then(|s| s.current_end)
        .and_then(from_unix_seconds);

    match event.event.as_str() {
        "subscription.activated" => {
            subscription.status = SubscriptionStatus::Active;
            if end_date.is_some() {
                subscription.end_date = end_date;
            }
            true
        }
        "subscription.charged" => {
            if end_date.is_some() {
                subscription.end_date = end_date;
            }
            true
        }
        "subscription.halted" | "subscription.cancelled" => {
            subscription.status = SubscriptionStatus::Cancelled;
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn event(name: &str, current_end: Option<i64>) -> WebhookEvent {
        serde_json::from_value(serde_json::json!({
            "event": name,
            "payload": {
                "subscription": {
                    "entity": { "id": "sub_123", "current_end": current_end }
                }
            }
        }))
        .unwrap()
    }

    fn subscription() -> Subscription {
        Subscription {
            id: "s1".to_string(),
            user_id: "u1".to_string(),
            plan: "plan_basic".to_string(),
            razorpay_subscription_id: "sub_123".to_string(),
            status: SubscriptionStatus::Inactive,
            start_date: Utc::now(),
            end_date: None,
        }
    }

    #[test]
    fn test_activation_sets_status_and_end_date() {
        let mut sub = subscription();
        assert!(apply_event(&mut sub, &event("subscription.activated", Some(1_704_103_200))));
        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert_eq!(sub.end_date, from_unix_seconds(1_704_103_200));
    }

    #[test]
    fn test_halt_cancels() {
        let mut sub = subscription();
        sub.status = SubscriptionStatus::Active;
        assert!(apply_event(&mut sub, &event("subscription.halted", None)));
        assert_eq!(sub.status, SubscriptionStatus::Cancelled);
    }

    #[test]
    fn test_unknown_event_ignored() {
        let mut sub = subscription();
        assert!(!apply_event(&mut sub, &event("subscription.paused", Some(1))));
        assert_eq!(sub.status, SubscriptionStatus::Inactive);
        assert!(sub.end_date.is_none());
    }

    #[test]
    fn test_payment_event_without_subscription_decodes() {
        let event: WebhookEvent = serde_json::from_value(serde_json::json!({
            "event": "payment.captured",
            "payload": { "payment": { "entity": { "id": "pay_123" } } }
        }))
        .unwrap();

        assert!(!event.is_handled());
        assert_eq!(event.gateway_subscription_id(), None);

        let mut sub = subscription();
        assert!(!apply_event(&mut sub, &event));
        assert_eq!(sub.status, SubscriptionStatus::Inactive);
    }

    #[test]
    fn test_signature_check() {
        let mut config = Config::test_default();
        config.razorpay_webhook_secret = Some("whsec".to_string());
        let billing = BillingService::from_config(&config);

        let body = br#"{"event":"subscription.charged"}"#;
        let good = sign(b"whsec", body);

        assert!(billing.verify_webhook_signature(body, &good));
        assert!(billing.verify_webhook_signature(body, &good.to_uppercase()));
        assert!(!billing.verify_webhook_signature(body, &sign(b"other", body)));
        assert!(!billing.verify_webhook_signature(b"{}", &good));
    }

    #[test]
    fn test_client_requires_keys() {
        let billing = BillingService::from_config(&Config::test_default());
        assert!(billing.client().is_none());

        let mut config = Config::test_default();
        config.razorpay_key_id = Some("rzp_test".to_string());
        config.razorpay_key_secret = Some("secret".to_string());
        let billing = BillingService::from_config(&config);
        assert!(billing.client().is_some());
    }
}
