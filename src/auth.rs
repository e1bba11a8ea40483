//! Authentication module.

use crate::db::{UserPublic, UserStore, now_timestamp};
use crate::error::{AppError, Result};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Hash a password using Argon2.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

/// Verify a password against a hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(format!("Invalid password hash: {}", e)))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// JWT claims carried by every issued token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    /// User email.
    pub email: String,
    /// Expiration time (Unix timestamp).
    pub exp: u64,
    /// Issued at time (Unix timestamp).
    pub iat: u64,
}

/// Successful login payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Signed bearer token.
    pub access_token: String,
    /// The logged-in user, without the password hash.
    pub user: UserPublic,
}

/// Authentication service issuing and validating bearer tokens.
pub struct AuthService {
    users: Arc<dyn UserStore>,
    secret: String,
    token_hours: u64,
}

impl AuthService {
    /// Create a new auth service.
    pub fn new(users: Arc<dyn UserStore>, secret: String, token_hours: u64) -> Self {
        Self {
            users,
            secret,
            token_hours,
        }
    }

    /// Login with email and password, returning a signed token.
    pub fn login(&self, email: &str, password: &str) -> Result<TokenResponse> {
        let user = self
            .users
            .find_by_email(email)?
            .ok_or_else(|| AppError::Unauthorized("Invalid email or password".to_string()))?;

        if !verify_password(password, &user.password_hash)? {
            return Err(AppError::Unauthorized(
                "Invalid email or password".to_string(),
            ));
        }

        let now = now_timestamp() as u64;
        let claims = Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            exp: now + self.token_hours * 60 * 60,
            iat: now,
        };

        let key = EncodingKey::from_secret(self.secret.as_bytes());
        let access_token = encode(&Header::default(), &claims, &key)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))?;

        Ok(TokenResponse {
            access_token,
            user: user.to_public(),
        })
    }

    /// Verify a bearer token and return its claims.
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let key = DecodingKey::from_secret(self.secret.as_bytes());

        decode::<Claims>(token, &key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, User, UserRepository};

    #[test]
    fn test_password_hash_and_verify() {
        let password = "test_password_123";
        let hash = hash_password(password).unwrap();

        assert!(verify_password(password, &hash).unwrap());
        assert!(!verify_password("wrong_password", &hash).unwrap());
    }

    fn test_auth() -> AuthService {
        let db = Database::open_memory().unwrap();
        let users = Arc::new(UserRepository::new(db));
        AuthService::new(users, "test-secret".to_string(), 24)
    }

    #[test]
    fn test_token_roundtrip() {
        let auth = test_auth();
        let user = User {
            id: "user-1".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: "hash".to_string(),
            name: "Alice".to_string(),
            phone: None,
            dni: None,
            city: None,
            birth_date: None,
            registration_date: now_timestamp(),
        };

        let now = now_timestamp() as u64;
        let claims = Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            exp: now + 3600,
            iat: now,
        };
        let key = EncodingKey::from_secret("test-secret".as_bytes());
        let token = encode(&Header::default(), &claims, &key).unwrap();

        let decoded = auth.verify_token(&token).unwrap();
        assert_eq!(decoded.sub, "user-1");
        assert_eq!(decoded.email, "alice@example.com");
    }

    #[test]
    fn test_invalid_token_rejected() {
        let auth = test_auth();
        assert!(auth.verify_token("not-a-token").is_err());

        let other_key = EncodingKey::from_secret("other-secret".as_bytes());
        let now = now_timestamp() as u64;
        let claims = Claims {
            sub: "user-1".to_string(),
            email: "alice@example.com".to_string(),
            exp: now + 3600,
            iat: now,
        };
        let forged = encode(&Header::default(), &claims, &other_key).unwrap();
        assert!(auth.verify_token(&forged).is_err());
    }
}
