//! Credentials and session tokens

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use kindred_common::{ActorId, KindredError, KindredResult, Profile};
use serde::{Deserialize, Serialize};

/// Hashes and checks passwords. Implementations are CPU-bound; callers run
/// them off the async executor.
pub trait CredentialVerifier: Send + Sync + 'static {
    /// Hash `password` for storage
    fn hash(&self, password: &str) -> KindredResult<String>;

    /// Whether `password` matches the stored `hash`
    fn verify(&self, password: &str, hash: &str) -> KindredResult<bool>;
}

/// Argon2id with default parameters, PHC string output
#[derive(Debug, Clone, Default)]
pub struct Argon2Verifier;

impl CredentialVerifier for Argon2Verifier {
    fn hash(&self, password: &str) -> KindredResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| KindredError::Internal(format!("failed to hash password: {e}")))
    }

    fn verify(&self, password: &str, hash: &str) -> KindredResult<bool> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| KindredError::Internal(format!("stored credential is malformed: {e}")))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }
}

/// JWT claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Actor id
    pub sub: ActorId,
    /// Login email
    pub email: String,
    /// Expiry, seconds since the epoch
    pub exp: i64,
}

/// Issued session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionToken {
    /// Signed JWT
    pub token: String,
    /// Expiry instant
    pub expires_at: DateTime<Utc>,
}

/// Issues and verifies HS256 session tokens
#[derive(Clone)]
pub struct SessionIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SessionIssuer {
    /// Issuer signing with `secret`; tokens live `ttl`
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    /// Token for `profile`, valid from `now`
    pub fn issue(&self, profile: &Profile, now: DateTime<Utc>) -> KindredResult<SessionToken> {
        let expires_at = now + self.ttl;
        let claims = Claims {
            sub: profile.id,
            email: profile.email.clone(),
            exp: expires_at.timestamp(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| KindredError::Internal(format!("failed to sign token: {e}")))?;
        Ok(SessionToken { token, expires_at })
    }

    /// Claims of a valid token. Expiry is checked against `now` rather than
    /// the wall clock so an injected clock governs sessions too.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> KindredResult<Claims> {
        let mut validation = Validation::default();
        validation.validate_exp = false;

        let claims = decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|e| {
                tracing::debug!(error = %e, "session token rejected");
                KindredError::InvalidCredentials
            })?
            .claims;

        if claims.exp <= now.timestamp() {
            tracing::debug!(actor = %claims.sub, "session token expired");
            return Err(KindredError::InvalidCredentials);
        }
        Ok(claims)
    }
}
