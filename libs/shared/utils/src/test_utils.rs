use std::sync::Arc;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use base64::{Engine as _, engine::general_purpose};
use serde_json::json;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{User, UserRole};

pub struct TestConfig {
    pub jwt_secret: String,
    pub backend_base_url: String,
    pub backend_api_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            backend_base_url: "http://localhost:8080".to_string(),
            backend_api_key: "test-api-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn with_backend(backend_base_url: &str) -> Self {
        Self {
            backend_base_url: backend_base_url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            backend_base_url: self.backend_base_url.clone(),
            backend_api_key: self.backend_api_key.clone(),
            jwt_secret: self.jwt_secret.clone(),
            ..AppConfig::default()
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: UserRole,
}

impl Default for TestUser {
    fn default() -> Self {
        Self::new("admin@clinic.test", UserRole::Admin)
    }
}

impl TestUser {
    pub fn new(email: &str, role: UserRole) -> Self {
        Self {
            // the backend keys users by integer id; keep ids unique per test run
            id: (Uuid::new_v4().as_u128() % 1_000_000).to_string(),
            email: email.to_string(),
            role,
        }
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, UserRole::Doctor)
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, UserRole::Patient)
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, UserRole::Admin)
    }

    fn role_claim(&self) -> &'static str {
        match self.role {
            UserRole::Admin => "admin",
            UserRole::SuperAdmin => "super_admin",
            UserRole::Doctor => "doctor",
            UserRole::Patient => "patient",
        }
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            full_name: None,
            role: Some(self.role),
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role_claim(),
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

pub struct MockBackendResponses;

impl MockBackendResponses {
    /// Appointment body as the clinic backend serializes it.
    pub fn appointment_response(
        id: i64,
        status: &str,
        modality: &str,
        start: chrono::DateTime<Utc>,
        duration_minutes: i64,
        doctor_id: Option<i64>,
    ) -> serde_json::Value {
        json!({
            "id": id,
            "patientId": 501,
            "doctorId": doctor_id,
            "startDateTime": start.to_rfc3339(),
            "durationMinutes": duration_minutes,
            "type": modality,
            "status": status,
            "rejectionReason": null,
            "completionNotes": null
        })
    }

    pub fn video_token_response(channel: &str, uid: u32) -> serde_json::Value {
        json!({
            "appId": "test-app-id",
            "channelName": channel,
            "token": "short-lived-token",
            "uid": uid
        })
    }

    pub fn error_response(message: &str) -> serde_json::Value {
        json!({
            "message": message
        })
    }
}
