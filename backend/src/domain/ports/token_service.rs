//! Driven port for signed bearer tokens.

use chrono::{DateTime, Utc};

use crate::domain::{IssuedToken, TokenClaims, User};

use super::define_port_error;

define_port_error! {
    /// Errors surfaced by token adapters.
    pub enum TokenServiceError {
        /// Signing failed.
        Signing { message: String } => "token signing failed: {message}",
        /// Signature, format or claims are invalid.
        Invalid { message: String } => "invalid token: {message}",
        /// The token is past its expiry.
        Expired => "token has expired",
    }
}

#[cfg_attr(test, mockall::automock)]
pub trait TokenService: Send + Sync {
    /// Sign a token for `user` issued at `now`.
    fn issue(&self, user: &User, now: DateTime<Utc>) -> Result<IssuedToken, TokenServiceError>;

    /// Verify signature and expiry against `now`.
    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenServiceError>;
}
