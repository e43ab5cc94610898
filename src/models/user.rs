//! User model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of an account. Permissions are re-derived from this on every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Patient,
    Doctor,
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Role::Patient => "patient",
            Role::Doctor => "doctor",
            Role::Admin => "admin",
        })
    }
}

/// A pending one-time password: keyed hash of the code plus its deadline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpChallenge {
    pub hash: String,
    pub expires_at: DateTime<Utc>,
}

/// Authentication identity stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Document ID
    pub id: String,
    pub email: Option<String>,
    /// E.164 phone number
    pub phone: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub profile_image: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub is_verified: bool,
    /// Registration challenge, cleared once consumed
    #[serde(default)]
    pub otp: Option<OtpChallenge>,
    /// Login challenge, cleared once consumed
    #[serde(default)]
    pub login_otp: Option<OtpChallenge>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_login_at: Option<DateTime<Utc>>,
}

impl User {
    /// New unverified user identified by email or phone.
    pub fn new(email: Option<String>, phone: Option<String>, role: Role) -> Self {
        Self {
            id: super::new_id(),
            email,
            phone,
            name: None,
            profile_image: None,
            role,
            is_verified: false,
            otp: None,
            login_otp: None,
            created_at: Utc::now(),
            last_login_at: None,
        }
    }
}

/// User as returned by the API. Never carries OTP material.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub name: Option<String>,
    pub profile_image: Option<String>,
    pub role: Role,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            name: user.name.clone(),
            profile_image: user.profile_image.clone(),
            role: user.role,
            is_verified: user.is_verified,
            created_at: user.created_at,
            last_login_at: user.last_login_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_hides_otp() {
        let mut user = User::new(None, Some("+911234567890".to_string()), Role::Doctor);
        user.otp = Some(OtpChallenge {
            hash: "secret".to_string(),
            expires_at: Utc::now(),
        });

        let json = serde_json::to_value(UserView::from(&user)).unwrap();
        assert!(json.get("otp").is_none());
        assert!(json.get("loginOtp").is_none());
        assert_eq!(json["role"], "doctor");
        assert_eq!(json["phone"], "+911234567890");
    }
}
