// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OTP delivery over email (Resend) or SMS (Twilio).
//!
//! A channel without credentials is disabled: the code is logged and the
//! send is treated as successful, which keeps local development usable.

use crate::config::Config;
use crate::error::AppError;
use dashmap::DashMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, LazyLock};
use validator::ValidateEmail;

static E164: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+\d{1,3}\d{1,14}$").expect("E.164 pattern is valid")
});

/// Delivery channel requested by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMethod {
    #[default]
    Email,
    Sms,
}

/// A validated address for a delivery channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Contact {
    Email(String),
    Phone(String),
}

impl Contact {
    /// Pick the address matching `method` from the request fields.
    pub fn from_request(
        method: DeliveryMethod,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> Result<Self, AppError> {
        let email = email.map(str::trim).filter(|e| !e.is_empty());
        let phone = phone.map(str::trim).filter(|p| !p.is_empty());

        if email.is_none() && phone.is_none() {
            return Err(AppError::BadRequest(
                "Please provide either an email or a phone number.".to_string(),
            ));
        }

        match method {
            DeliveryMethod::Email => {
                let email = email.ok_or_else(|| {
                    AppError::BadRequest("Email is required when method is \"email\".".to_string())
                })?;
                if !email.validate_email() {
                    return Err(AppError::BadRequest("Invalid email address.".to_string()));
                }
                Ok(Contact::Email(email.to_ascii_lowercase()))
            }
            DeliveryMethod::Sms => {
                let phone = phone.ok_or_else(|| {
                    AppError::BadRequest("Phone is required when method is \"sms\".".to_string())
                })?;
                if !is_e164(phone) {
                    return Err(AppError::BadRequest(
                        "Invalid phone format. Use E.164 format: +country_code_number".to_string(),
                    ));
                }
                Ok(Contact::Phone(phone.to_string()))
            }
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Contact::Email(e) => e,
            Contact::Phone(p) => p,
        }
    }
}

pub fn is_e164(phone: &str) -> bool {
    E164.is_match(phone)
}

#[derive(Clone)]
struct ResendSettings {
    api_key: String,
    from: String,
}

#[derive(Clone)]
struct TwilioSettings {
    account_sid: String,
    auth_token: String,
    from: String,
}

#[derive(Clone)]
enum Delivery {
    /// Real providers; a channel without settings logs the code instead.
    Providers {
        resend: Option<ResendSettings>,
        twilio: Option<TwilioSettings>,
    },
    /// Delivers nothing; keeps the last code per contact.
    Recording(Arc<DashMap<String, String>>),
}

/// Sends OTP codes through the configured providers.
#[derive(Clone)]
pub struct Notifier {
    http: reqwest::Client,
    delivery: Delivery,
    expiry_minutes: i64,
}

#[derive(Serialize)]
struct ResendEmail<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: String,
    text: String,
}

impl Notifier {
    pub fn from_config(config: &Config) -> Self {
        let resend = config.resend_api_key.clone().map(|api_key| ResendSettings {
            api_key,
            from: config.email_from.clone(),
        });

        let twilio = match (
            &config.twilio_account_sid,
            &config.twilio_auth_token,
            &config.twilio_phone_number,
        ) {
            (Some(sid), Some(token), Some(from)) => Some(TwilioSettings {
                account_sid: sid.clone(),
                auth_token: token.clone(),
                from: from.clone(),
            }),
            _ => None,
        };

        if resend.is_none() {
            tracing::warn!("RESEND_API_KEY not set; email OTP delivery disabled");
        }
        if twilio.is_none() {
            tracing::warn!("Twilio not configured; SMS OTP delivery disabled");
        }

        Self {
            http: reqwest::Client::new(),
            delivery: Delivery::Providers { resend, twilio },
            expiry_minutes: config.otp_expiry_minutes,
        }
    }

    /// Notifier that delivers nothing and remembers every code it was given.
    pub fn recording() -> Self {
        Self {
            http: reqwest::Client::new(),
            delivery: Delivery::Recording(Arc::new(DashMap::new())),
            expiry_minutes: 10,
        }
    }

    /// Last code handed to a recording notifier for this contact.
    pub fn last_code(&self, contact: &str) -> Option<String> {
        match &self.delivery {
            Delivery::Recording(outbox) => outbox.get(contact).map(|c| c.value().clone()),
            Delivery::Providers { .. } => None,
        }
    }

    /// Deliver a code to the contact over its channel.
    pub async fn send_otp(&self, contact: &Contact, code: &str) -> Result<(), AppError> {
        let (resend, twilio) = match &self.delivery {
            Delivery::Recording(outbox) => {
                outbox.insert(contact.as_str().to_string(), code.to_string());
                return Ok(());
            }
            Delivery::Providers { resend, twilio } => (resend, twilio),
        };

        match contact {
            Contact::Email(email) => match resend {
                Some(resend) => self.send_email(resend, email, code).await,
                None => {
                    tracing::warn!(contact = %email, code, "Email delivery disabled; OTP logged");
                    Ok(())
                }
            },
            Contact::Phone(phone) => match twilio {
                Some(twilio) => self.send_sms(twilio, phone, code).await,
                None => {
                    tracing::warn!(contact = %phone, code, "SMS delivery disabled; OTP logged");
                    Ok(())
                }
            },
        }
    }

    async fn send_email(
        &self,
        resend: &ResendSettings,
        email: &str,
        code: &str,
    ) -> Result<(), AppError> {
        let user_name = email.split('@').next().unwrap_or("User");
        let body = ResendEmail {
            from: &resend.from,
            to: [email],
            subject: "Your ATKANS MED Verification Code",
            html: format!(
                "<div style=\"font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;\">\
                 <h2>Hello {},</h2>\
                 <p>Your verification code for ATKANS MED is:</p>\
                 <p style=\"font-size: 32px; font-weight: bold; letter-spacing: 5px;\">{}</p>\
                 <p>This code will expire in {} minutes.</p>\
                 <p>If you didn't request this code, please ignore this email.</p>\
                 </div>",
                user_name, code, self.expiry_minutes
            ),
            text: format!(
                "Your ATKANS MED verification code is: {}\n\nThis code will expire in {} minutes.\n\nIf you didn't request this code, please ignore this email.",
                code, self.expiry_minutes
            ),
        };

        let response = self
            .http
            .post("https://api.resend.com/emails")
            .bearer_auth(&resend.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to send OTP email: {}", e)))?;

        check_response(response, "Resend").await?;
        tracing::info!(contact = %email, "OTP email sent");
        Ok(())
    }

    async fn send_sms(
        &self,
        twilio: &TwilioSettings,
        phone: &str,
        code: &str,
    ) -> Result<(), AppError> {
        let url = format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
            urlencoding::encode(&twilio.account_sid)
        );
        let body = format!(
            "Your ATKANS MED verification code is: {}\n\nThis code expires in {} minutes.",
            code, self.expiry_minutes
        );

        let response = self
            .http
            .post(&url)
            .basic_auth(&twilio.account_sid, Some(&twilio.auth_token))
            .form(&[
                ("To", phone),
                ("From", twilio.from.as_str()),
                ("Body", body.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to send OTP SMS: {}", e)))?;

        check_response(response, "Twilio").await?;
        tracing::info!(contact = %phone, "OTP SMS sent");
        Ok(())
    }
}

/// Check response status and return error if not successful.
async fn check_response(response: reqwest::Response, provider: &str) -> Result<(), AppError> {
    if response.status().is_success() {
        return Ok(());
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    tracing::error!(provider, %status, body = %body, "OTP delivery rejected");
    Err(AppError::Upstream(format!("{} returned HTTP {}", provider, status)))
}
