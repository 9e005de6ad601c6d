use std::sync::Arc;
use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use base64::{Engine as _, engine::general_purpose};
use serde_json::json;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            push_gateway_url: String::new(),
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: "patient".to_string(),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, "patient")
    }

    pub fn clinic(email: &str) -> Self {
        Self::new(email, "clinic")
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            metadata: None,
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
            "role": user.role,
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

/// Canned PostgREST rows for the `appointments` table, shaped exactly like
/// the negotiation cell's aggregate serialization.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    /// A freshly created booking request: status pending, version 0.
    pub fn pending_appointment_row(appointment_id: &str, patient_id: &str, clinic_id: &str) -> serde_json::Value {
        json!({
            "id": appointment_id,
            "patient_id": patient_id,
            "clinic_id": clinic_id,
            "status": "pending",
            "original_request": {
                "date": "2030-05-20",
                "time": "10:00:00",
                "service_type": "cleaning",
                "duration_minutes": 30
            },
            "counter_offer": null,
            "confirmed_details": null,
            "duration_minutes": 30,
            "messages": [],
            "last_activity_at": "2030-05-01T09:00:00Z",
            "created_at": "2030-05-01T09:00:00Z",
            "version": 0
        })
    }

    /// A counter-offered appointment awaiting the patient's answer.
    pub fn counter_offered_appointment_row(
        appointment_id: &str,
        patient_id: &str,
        clinic_id: &str,
        date: NaiveDate,
        time: NaiveTime,
    ) -> serde_json::Value {
        json!({
            "id": appointment_id,
            "patient_id": patient_id,
            "clinic_id": clinic_id,
            "status": "counter_offered",
            "original_request": {
                "date": "2030-05-20",
                "time": "10:00:00",
                "service_type": "cleaning",
                "duration_minutes": 30
            },
            "counter_offer": {
                "date": date,
                "time": time,
                "duration_minutes": null
            },
            "confirmed_details": null,
            "duration_minutes": 30,
            "messages": [],
            "last_activity_at": "2030-05-01T10:00:00Z",
            "created_at": "2030-05-01T09:00:00Z",
            "version": 1
        })
    }

    /// A confirmed appointment settled on the given slot.
    pub fn confirmed_appointment_row(
        appointment_id: &str,
        patient_id: &str,
        clinic_id: &str,
        date: NaiveDate,
        time: NaiveTime,
    ) -> serde_json::Value {
        json!({
            "id": appointment_id,
            "patient_id": patient_id,
            "clinic_id": clinic_id,
            "status": "confirmed",
            "original_request": {
                "date": date,
                "time": time,
                "service_type": "cleaning",
                "duration_minutes": 30
            },
            "counter_offer": null,
            "confirmed_details": {
                "date": date,
                "time": time,
                "duration_minutes": 30
            },
            "duration_minutes": 30,
            "messages": [],
            "last_activity_at": "2030-05-01T10:00:00Z",
            "created_at": "2030-05-01T09:00:00Z",
            "version": 1
        })
    }

    pub fn error_response(message: &str, code: &str) -> serde_json::Value {
        json!({
            "error": {
                "message": message,
                "code": code
            }
        })
    }
}
