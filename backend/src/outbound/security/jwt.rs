//! HS256 bearer tokens.
//!
//! Expiry is checked against the caller-supplied clock rather than the
//! system time so services stay deterministic under test.

use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::ports::{TokenService, TokenServiceError};
use crate::domain::{IssuedToken, Role, TokenClaims, User, UserId};

pub const DEFAULT_TOKEN_LIFETIME_DAYS: i64 = 90;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    role: Role,
    iat: i64,
    exp: i64,
    jti: String,
}

/// [`TokenService`] signing JWTs with a shared secret.
#[derive(Clone)]
pub struct JwtTokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime: TimeDelta,
}

impl JwtTokenService {
    pub fn new(secret: &[u8], lifetime: TimeDelta) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            lifetime,
        }
    }

    pub fn lifetime(&self) -> TimeDelta {
        self.lifetime
    }

    fn validation() -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["sub", "exp"]);
        validation
    }
}

fn timestamp(seconds: i64) -> Result<DateTime<Utc>, TokenServiceError> {
    DateTime::from_timestamp(seconds, 0)
        .ok_or_else(|| TokenServiceError::invalid(format!("timestamp out of range: {seconds}")))
}

impl TokenService for JwtTokenService {
    fn issue(&self, user: &User, now: DateTime<Utc>) -> Result<IssuedToken, TokenServiceError> {
        let expires_at = now + self.lifetime;
        let claims = Claims {
            sub: user.id.to_string(),
            role: user.role,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|err| TokenServiceError::signing(err.to_string()))?;
        Ok(IssuedToken { token, expires_at })
    }

    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenServiceError> {
        let claims = decode::<Claims>(token, &self.decoding, &Self::validation())
            .map_err(|err| TokenServiceError::invalid(err.to_string()))?
            .claims;
        if claims.exp <= now.timestamp() {
            return Err(TokenServiceError::expired());
        }
        let user_id = claims
            .sub
            .parse::<UserId>()
            .map_err(|err| TokenServiceError::invalid(err.to_string()))?;
        Ok(TokenClaims {
            user_id,
            issued_at: timestamp(claims.iat)?,
            expires_at: timestamp(claims.exp)?,
        })
    }
}
