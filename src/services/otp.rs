// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! One-time password issuance and verification.
//!
//! Codes are numeric, drawn from the OS CSPRNG. Only a keyed hash of the
//! code is stored: HMAC-SHA256 over `contact|code` with a key derived (HKDF)
//! from the session signing secret, so a leaked user document cannot be
//! brute-forced offline and a code for one contact is useless for another.

use crate::models::OtpChallenge;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

const HKDF_SALT: &[u8] = b"atkans-med/otp/v1";
const HKDF_INFO: &[u8] = b"otp-hash-key";

/// Outcome of checking a submitted code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpVerdict {
    Valid,
    /// No challenge stored: never issued, or already consumed.
    AlreadyUsedOrExpired,
    Invalid,
    Expired,
}

impl OtpVerdict {
    pub fn message(&self) -> &'static str {
        match self {
            OtpVerdict::Valid => "OTP verified successfully!",
            OtpVerdict::AlreadyUsedOrExpired => {
                "OTP already verified or expired. Please request a new one."
            }
            OtpVerdict::Invalid => "Invalid OTP. Please try again.",
            OtpVerdict::Expired => "OTP has expired. Request a new one.",
        }
    }
}

/// Issues and checks OTP challenges.
pub struct OtpService {
    mac: HmacSha256,
    rng: SystemRandom,
    length: usize,
    ttl: Duration,
}

impl OtpService {
    pub fn new(signing_secret: &[u8], length: usize, ttl_minutes: i64) -> anyhow::Result<Self> {
        anyhow::ensure!((4..=10).contains(&length), "OTP length must be 4-10 digits");
        anyhow::ensure!(ttl_minutes > 0, "OTP expiry must be positive");

        let mut key = [0u8; 32];
        Hkdf::<Sha256>::new(Some(HKDF_SALT), signing_secret)
            .expand(HKDF_INFO, &mut key)
            .map_err(|e| anyhow::anyhow!("HKDF expand failed: {}", e))?;

        let mac = HmacSha256::new_from_slice(&key)
            .map_err(|e| anyhow::anyhow!("HMAC init failed: {}", e))?;

        Ok(Self {
            mac,
            rng: SystemRandom::new(),
            length,
            ttl: Duration::minutes(ttl_minutes),
        })
    }

    pub fn ttl_minutes(&self) -> i64 {
        self.ttl.num_minutes()
    }

    /// Draw a numeric code of the configured length.
    pub fn generate_code(&self) -> anyhow::Result<String> {
        let mut code = String::with_capacity(self.length);
        let mut buf = [0u8; 16];

        while code.len() < self.length {
            self.rng
                .fill(&mut buf)
                .map_err(|_| anyhow::anyhow!("System RNG failure"))?;
            // Reject 250..=255 so every digit is equally likely.
            for b in buf.iter().filter(|b| **b < 250) {
                if code.len() == self.length {
                    break;
                }
                code.push(char::from(b'0' + b % 10));
            }
        }

        Ok(code)
    }

    /// Keyed hash binding the code to the contact it was sent to.
    pub fn hash(&self, contact: &str, code: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(contact.as_bytes());
        mac.update(b"|");
        mac.update(code.trim().as_bytes());
        URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
    }

    /// New code and the challenge to store. Replaces any earlier challenge.
    pub fn issue(&self, contact: &str, now: DateTime<Utc>) -> anyhow::Result<(String, OtpChallenge)> {
        let code = self.generate_code()?;
        let challenge = OtpChallenge {
            hash: self.hash(contact, &code),
            expires_at: now + self.ttl,
        };
        Ok((code, challenge))
    }

    /// Check a submitted code. The caller clears the challenge on `Valid`.
    pub fn verify(
        &self,
        challenge: Option<&OtpChallenge>,
        contact: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> OtpVerdict {
        let Some(challenge) = challenge else {
            return OtpVerdict::AlreadyUsedOrExpired;
        };

        let submitted = self.hash(contact, code);
        if !bool::from(submitted.as_bytes().ct_eq(challenge.hash.as_bytes())) {
            return OtpVerdict::Invalid;
        }

        if now > challenge.expires_at {
            return OtpVerdict::Expired;
        }

        OtpVerdict::Valid
    }
}
