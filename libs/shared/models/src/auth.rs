use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub name: Option<String>,
    pub iat: Option<u64>,
}

/// Console roles recognised by the clinic backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    #[serde(alias = "admin")]
    Admin,
    #[serde(alias = "super_admin")]
    SuperAdmin,
    #[serde(alias = "doctor")]
    Doctor,
    #[serde(alias = "patient")]
    Patient,
}

impl UserRole {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "admin" => Some(UserRole::Admin),
            "super_admin" | "superadmin" => Some(UserRole::SuperAdmin),
            "doctor" => Some(UserRole::Doctor),
            "patient" => Some(UserRole::Patient),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub role: Option<UserRole>,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    /// Admins and doctors may act on appointments; patients only read them.
    pub fn can_manage_appointments(&self) -> bool {
        matches!(
            self.role,
            Some(UserRole::Admin) | Some(UserRole::SuperAdmin) | Some(UserRole::Doctor)
        )
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub valid: bool,
    pub user_id: String,
    pub email: Option<String>,
    pub role: Option<UserRole>,
}
