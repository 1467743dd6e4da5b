use crate::config::AuthConfig;
use crate::models::user::{Claims, Role};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand_core::OsRng;

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(password_hash.to_string())
}

/// Verify a password against a hash
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(password_hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Issues and verifies signed, time-bounded JWTs.
///
/// Access and refresh tokens use separate signing secrets so neither can be
/// forged from a leak of the other. Expiry is embedded in the signed payload,
/// making verification self-contained. Secrets come from [`AuthConfig`] at
/// construction, so tests and environments can swap them freely.
#[derive(Clone)]
pub struct TokenService {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl: chrono::Duration,
    refresh_ttl: chrono::Duration,
}

impl TokenService {
    pub fn new(config: &AuthConfig) -> Self {
        TokenService {
            access_encoding: EncodingKey::from_secret(config.access_secret.as_ref()),
            access_decoding: DecodingKey::from_secret(config.access_secret.as_ref()),
            refresh_encoding: EncodingKey::from_secret(config.refresh_secret.as_ref()),
            refresh_decoding: DecodingKey::from_secret(config.refresh_secret.as_ref()),
            access_ttl: config.access_ttl,
            refresh_ttl: config.refresh_ttl,
        }
    }

    pub fn issue_access_token(
        &self,
        user_id: &str,
        role: Role,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        Self::issue(&self.access_encoding, self.access_ttl, user_id, role)
    }

    pub fn issue_refresh_token(
        &self,
        user_id: &str,
        role: Role,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        Self::issue(&self.refresh_encoding, self.refresh_ttl, user_id, role)
    }

    pub fn verify_access_token(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        Self::verify(&self.access_decoding, token)
    }

    pub fn verify_refresh_token(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        Self::verify(&self.refresh_decoding, token)
    }

    fn issue(
        key: &EncodingKey,
        ttl: chrono::Duration,
        user_id: &str,
        role: Role,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = chrono::Utc::now();
        let claims = Claims {
            sub: user_id.to_owned(),
            role,
            exp: (now + ttl).timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        encode(&Header::default(), &claims, key)
    }

    fn verify(key: &DecodingKey, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let token_data = decode::<Claims>(token, key, &Validation::default())?;
        Ok(token_data.claims)
    }
}
