use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SecurityConfig;
use crate::database::models::{Role, User};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("JWT secret not configured")]
    InvalidSecret,

    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Invalid JWT token: {0}")]
    InvalidToken(String),

    #[error("Password hashing failed: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Username
    pub sub: String,
    pub user_id: i64,
    pub role: Role,
    pub tenant: String,
    pub iss: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user: &User, tenant: &str, security: &SecurityConfig) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::hours(security.jwt_expiry_hours as i64)).timestamp();

        Self {
            sub: user.username.clone(),
            user_id: user.id,
            role: user.role,
            tenant: tenant.to_string(),
            iss: security.jwt_issuer.clone(),
            exp,
            iat: now.timestamp(),
        }
    }
}

pub fn generate_jwt(claims: &Claims, security: &SecurityConfig) -> Result<String, AuthError> {
    if security.jwt_secret.is_empty() {
        return Err(AuthError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(security.jwt_secret.as_bytes());
    encode(&Header::new(Algorithm::HS256), claims, &encoding_key)
        .map_err(|e| AuthError::TokenGeneration(e.to_string()))
}

/// Check signature, expiry and issuer
pub fn validate_jwt(token: &str, security: &SecurityConfig) -> Result<Claims, AuthError> {
    if security.jwt_secret.is_empty() {
        return Err(AuthError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(security.jwt_secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[security.jwt_issuer.as_str()]);

    decode::<Claims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| AuthError::InvalidToken(e.to_string()))
}

/// bcrypt hash at the given work factor, in modular crypt format
pub fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    Ok(bcrypt::hash(password, cost)?)
}

/// False for a wrong password and for anything that is not a bcrypt hash
pub fn verify_password(password: &str, stored: &str) -> bool {
    bcrypt::verify(password, stored).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn user() -> User {
        User {
            id: 7,
            first_name: "Ali".to_string(),
            last_name: "Valiyev".to_string(),
            username: "ali".to_string(),
            email: "ali@example.com".to_string(),
            password: String::new(),
            role: Role::Admin,
            image_id: None,
            created_at: crate::database::models::timestamp(),
            updated_at: None,
        }
    }

    // bcrypt keeps its MIN_COST private; mirror its value (4).
    const BCRYPT_MIN_COST: u32 = 4;

    #[test]
    fn password_hash_round_trip() {
        let stored = hash_password("secret123", BCRYPT_MIN_COST).unwrap();
        assert!(stored.starts_with("$2"));
        assert!(verify_password("secret123", &stored));
        assert!(!verify_password("secret124", &stored));
        assert!(!verify_password("secret123", "not-a-hash"));
        // fresh salt per hash
        assert_ne!(stored, hash_password("secret123", BCRYPT_MIN_COST).unwrap());
    }

    #[test]
    fn rejects_work_factor_out_of_range() {
        assert!(matches!(hash_password("secret123", 3), Err(AuthError::PasswordHash(_))));
    }

    #[test]
    fn jwt_round_trip_checks_issuer() {
        let security = AppConfig::development().security;
        let claims = Claims::new(&user(), "zamin", &security);
        let token = generate_jwt(&claims, &security).unwrap();

        let decoded = validate_jwt(&token, &security).unwrap();
        assert_eq!(decoded.user_id, 7);
        assert_eq!(decoded.role, Role::Admin);
        assert_eq!(decoded.tenant, "zamin");

        let mut other = security.clone();
        other.jwt_issuer = "someone-else".to_string();
        assert!(validate_jwt(&token, &other).is_err());

        let mut wrong_key = security.clone();
        wrong_key.jwt_secret = "another-secret".to_string();
        assert!(validate_jwt(&token, &wrong_key).is_err());
    }

    #[test]
    fn empty_secret_is_rejected() {
        let mut security = AppConfig::development().security;
        security.jwt_secret.clear();
        let claims = Claims::new(&user(), "zamin", &security);
        assert!(matches!(generate_jwt(&claims, &security), Err(AuthError::InvalidSecret)));
    }
}
