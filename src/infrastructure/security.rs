use argon2::Argon2;
use argon2::password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

// Argon2 parameters for 50-150ms target latency
const ARGON2_M_COST: u32 = 19456; // 19 MB
const ARGON2_T_COST: u32 = 2;
const ARGON2_P_COST: u32 = 1;

const TOKEN_TTL_SECS: usize = 3600;

// argon2 errors do not implement std::error::Error without the `std`
// feature, so they are carried as values rather than sources.
#[derive(Error, Debug)]
pub enum HashError {
    #[error("argon2: {0}")]
    Argon2(argon2::password_hash::Error),
    #[error("argon2 parameters: {0}")]
    Params(argon2::Error),
}

impl From<argon2::password_hash::Error> for HashError {
    fn from(err: argon2::password_hash::Error) -> Self {
        HashError::Argon2(err)
    }
}

impl From<argon2::Error> for HashError {
    fn from(err: argon2::Error) -> Self {
        HashError::Params(err)
    }
}

/// Turns a plaintext password into the value stored next to an account, and
/// checks a candidate password against it.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String, HashError>;
    fn verify(&self, password: &str, stored: &str) -> Result<bool, HashError>;
}

/// Salted Argon2id in PHC string format.
///
/// Stored values that are not PHC strings are checked as [`LegacyEncoding`],
/// so accounts written by the first version of the demo can still log in.
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2Hasher;

impl Argon2Hasher {
    fn argon2(&self) -> Result<Argon2<'static>, HashError> {
        Ok(Argon2::new(
            argon2::Algorithm::Argon2id,
            argon2::Version::V0x13,
            argon2::Params::new(ARGON2_M_COST, ARGON2_T_COST, ARGON2_P_COST, None)?,
        ))
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String, HashError> {
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = self.argon2()?.hash_password(password.as_bytes(), &salt)?;
        Ok(password_hash.to_string())
    }

    fn verify(&self, password: &str, stored: &str) -> Result<bool, HashError> {
        let Ok(parsed_hash) = PasswordHash::new(stored) else {
            return LegacyEncoding.verify(password, stored);
        };
        match self.argon2()?.verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(_) => Ok(false),
        }
    }
}

/// Plain base64 of the password bytes, as written by the first version of the
/// demo. Reversible and unsalted; only useful to read old data files.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyEncoding;

impl PasswordHasher for LegacyEncoding {
    fn hash(&self, password: &str) -> Result<String, HashError> {
        Ok(BASE64.encode(password.as_bytes()))
    }

    fn verify(&self, password: &str, stored: &str) -> Result<bool, HashError> {
        Ok(BASE64.encode(password.as_bytes()) == stored)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String, // user_id
    exp: usize,
    iat: usize,
    jti: String,
}

pub fn generate_token(user_id: &str, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as usize)
        .unwrap_or_default();

    let claims = Claims {
        sub: user_id.to_string(),
        exp: now + TOKEN_TTL_SECS,
        iat: now,
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
}

/// Returns the user id a token was issued for.
pub fn validate_token(token: &str, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 60;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &validation,
    )?;

    Ok(token_data.claims.sub)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argon2_hash_is_phc_string() {
        let hash = Argon2Hasher.hash("test_password_123").unwrap();

        assert_ne!(hash, "test_password_123");
        assert!(hash.starts_with("$argon2id$"));
    }

    #[test]
    fn test_argon2_same_password_produces_different_hashes() {
        let hash1 = Argon2Hasher.hash("same_password").unwrap();
        let hash2 = Argon2Hasher.hash("same_password").unwrap();

        // Random salt
        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_argon2_verify_correct_and_incorrect_password() {
        let hash = Argon2Hasher.hash("correct_password").unwrap();

        assert!(Argon2Hasher.verify("correct_password", &hash).unwrap());
        assert!(!Argon2Hasher.verify("wrong_password", &hash).unwrap());
    }

    #[test]
    fn test_argon2_verify_treats_non_phc_value_as_mismatch() {
        assert!(!Argon2Hasher.verify("pw", "not_a_valid_hash").unwrap());
    }

    #[test]
    fn test_argon2_verify_accepts_legacy_encoded_value() {
        assert!(Argon2Hasher.verify("pw", "cHc=").unwrap());
        assert!(!Argon2Hasher.verify("wrong", "cHc=").unwrap());
    }

    #[test]
    fn test_hash_error_keeps_argon2_message() {
        let err = argon2::Params::new(0, 0, 0, None).unwrap_err();
        let message = err.to_string();

        let wrapped = HashError::from(err);
        assert_eq!(wrapped.to_string(), format!("argon2 parameters: {}", message));
    }

    #[test]
    fn test_argon2_verify_with_unicode() {
        let hash = Argon2Hasher.hash("пароль123").unwrap();
        assert!(Argon2Hasher.verify("пароль123", &hash).unwrap());
    }

    #[test]
    fn test_legacy_encoding_matches_btoa() {
        assert_eq!(LegacyEncoding.hash("pw").unwrap(), "cHc=");
        assert!(LegacyEncoding.verify("pw", "cHc=").unwrap());
        assert!(!LegacyEncoding.verify("PW", "cHc=").unwrap());
    }

    #[test]
    fn test_token_round_trip() {
        let token = generate_token("user_456", "test_secret").unwrap();

        assert_eq!(token.split('.').count(), 3);
        assert_eq!(validate_token(&token, "test_secret").unwrap(), "user_456");
    }

    #[test]
    fn test_validate_token_rejects_wrong_secret() {
        let token = generate_token("user_1", "correct_secret").unwrap();
        assert!(validate_token(&token, "wrong_secret").is_err());
    }

    #[test]
    fn test_validate_token_rejects_garbage() {
        assert!(validate_token("invalid.token.here", "secret").is_err());
    }

    #[test]
    fn test_tokens_for_same_user_are_distinct() {
        let token1 = generate_token("user_1", "secret").unwrap();
        let token2 = generate_token("user_1", "secret").unwrap();
        assert_ne!(token1, token2);
    }
}
