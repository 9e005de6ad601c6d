use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use chrono::{Utc, TimeZone};
use tracing::debug;

use shared_models::auth::{JwtClaims, User};

type HmacSha256 = Hmac<Sha256>;

/// Validate a Supabase-issued HS256 token and extract the authenticated user.
/// The signature is checked before any claim is trusted.
pub fn validate_token(token: &str, jwt_secret: &str) -> Result<User, String> {
    if jwt_secret.is_empty() {
        return Err("JWT secret is not set".to_string());
    }

    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err("Invalid token format".to_string());
    }

    let (header_b64, claims_b64, signature_b64) = (parts[0], parts[1], parts[2]);

    let signature = URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|e| {
            debug!("Failed to decode signature: {}", e);
            "Invalid signature encoding".to_string()
        })?;

    let mut mac = HmacSha256::new_from_slice(jwt_secret.as_bytes())
        .map_err(|_| "Failed to create HMAC".to_string())?;
    mac.update(format!("{}.{}", header_b64, claims_b64).as_bytes());

    if mac.verify_slice(&signature).is_err() {
        debug!("Token signature verification failed");
        return Err("Invalid token signature".to_string());
    }

    let claims_bytes = URL_SAFE_NO_PAD
        .decode(claims_b64)
        .map_err(|_| "Invalid claims encoding".to_string())?;
    let claims: JwtClaims = serde_json::from_slice(&claims_bytes)
        .map_err(|e| {
            debug!("Failed to parse claims: {}", e);
            "Invalid claims format".to_string()
        })?;

    if let Some(exp) = claims.exp {
        let now = Utc::now().timestamp() as u64;
        if exp < now {
            debug!("Token expired at {} (now: {})", exp, now);
            return Err("Token expired".to_string());
        }
    }

    let created_at = claims.iat
        .and_then(|ts| Utc.timestamp_opt(ts as i64, 0).single());

    let user = User {
        id: claims.sub,
        email: claims.email,
        role: claims.role,
        metadata: claims.user_metadata,
        created_at,
    };

    debug!("Token validated successfully for user: {}", user.id);
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{JwtTestUtils, TestUser};

    const SECRET: &str = "test-secret-key-for-jwt-validation-must-be-long-enough";

    #[test]
    fn valid_token_yields_user_with_role() {
        let test_user = TestUser::clinic("front-desk@brightsmile.example");
        let token = JwtTestUtils::create_test_token(&test_user, SECRET, Some(1));

        let user = validate_token(&token, SECRET).expect("token should validate");
        assert_eq!(user.id, test_user.id);
        assert_eq!(user.role.as_deref(), Some("clinic"));
    }

    #[test]
    fn expired_token_is_rejected() {
        let test_user = TestUser::patient("patient@example.com");
        let token = JwtTestUtils::create_expired_token(&test_user, SECRET);

        let err = validate_token(&token, SECRET).unwrap_err();
        assert_eq!(err, "Token expired");
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let test_user = TestUser::patient("patient@example.com");
        let token = JwtTestUtils::create_invalid_signature_token(&test_user);

        let err = validate_token(&token, SECRET).unwrap_err();
        assert_eq!(err, "Invalid token signature");
    }

    #[test]
    fn malformed_token_is_rejected() {
        assert!(validate_token("not-a-jwt", SECRET).is_err());
        assert!(validate_token("", SECRET).is_err());
    }
}
