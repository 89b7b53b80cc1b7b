//! HS256 session tokens.
//!
//! The token names the address it was issued to. Its `role` claim is a
//! snapshot for clients; authorization always re-reads the role from the
//! identity store, so a role change takes effect on the next request.

use std::sync::Arc;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use poap_types::{Clock, Identity, IdentityAddress, Role, Timestamp};

use crate::IdentityError;

/// 24 hours.
pub const DEFAULT_SESSION_TTL_SECS: u64 = 24 * 60 * 60;

const MIN_SECRET_LEN: usize = 16;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub role: Role,
    pub iat: u64,
    pub exp: u64,
}

#[derive(Clone, Debug)]
pub struct SessionToken {
    pub token: String,
    pub expires_at: Timestamp,
}

pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: u64,
    clock: Arc<dyn Clock>,
}

impl SessionKeys {
    pub fn new(secret: &[u8], ttl_secs: u64, clock: Arc<dyn Clock>) -> Result<Self, IdentityError> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(IdentityError::InvalidInput(format!(
                "session secret must be at least {MIN_SECRET_LEN} bytes"
            )));
        }
        if ttl_secs == 0 {
            return Err(IdentityError::InvalidInput(
                "session ttl must be positive".into(),
            ));
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl_secs,
            clock,
        })
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    pub fn issue(&self, identity: &Identity) -> Result<SessionToken, IdentityError> {
        let now = self.clock.now();
        let expires_at = now.saturating_add(self.ttl_secs);
        let claims = SessionClaims {
            sub: identity.address().to_string(),
            role: identity.role(),
            iat: now.as_secs(),
            exp: expires_at.as_secs(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| IdentityError::Token(e.to_string()))?;
        Ok(SessionToken { token, expires_at })
    }

    /// Check signature and expiry, returning the session's address.
    ///
    /// Expiry is judged against the injected clock rather than the system time.
    pub fn verify(&self, token: &str) -> Result<IdentityAddress, IdentityError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;

        let claims = decode::<SessionClaims>(token, &self.decoding, &validation)
            .map_err(|e| IdentityError::Unauthorized(format!("invalid session token: {e}")))?
            .claims;

        if self.clock.now().as_secs() >= claims.exp {
            return Err(IdentityError::Unauthorized("session expired".into()));
        }
        IdentityAddress::parse(&claims.sub)
            .map_err(|e| IdentityError::Unauthorized(format!("invalid session subject: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use poap_nullables::NullClock;
    use poap_types::RoleProfile;

    const SECRET: &[u8] = b"test-secret-0123456789";

    fn lecturer() -> Identity {
        Identity::new(
            IdentityAddress::from_bytes(&[4; 20]),
            "Grace",
            RoleProfile::empty(Role::Lecturer),
            Timestamp::new(0),
        )
    }

    #[test]
    fn issued_token_verifies_until_expiry() {
        let clock = Arc::new(NullClock::new(1_000));
        let keys = SessionKeys::new(SECRET, 60, clock.clone()).unwrap();
        let session = keys.issue(&lecturer()).unwrap();
        assert_eq!(session.expires_at, Timestamp::new(1_060));

        assert_eq!(&keys.verify(&session.token).unwrap(), lecturer().address());
        clock.advance(60);
        assert!(matches!(
            keys.verify(&session.token),
            Err(IdentityError::Unauthorized(_))
        ));
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let clock: Arc<dyn Clock> = Arc::new(NullClock::new(1_000));
        let a = SessionKeys::new(SECRET, 60, clock.clone()).unwrap();
        let b = SessionKeys::new(b"another-secret-abcdefgh", 60, clock).unwrap();
        let session = a.issue(&lecturer()).unwrap();
        assert!(b.verify(&session.token).is_err());
        assert!(a.verify("not.a.token").is_err());
    }

    #[test]
    fn short_secret_rejected() {
        let clock: Arc<dyn Clock> = Arc::new(NullClock::new(0));
        assert!(SessionKeys::new(b"short", 60, clock).is_err());
    }
}
