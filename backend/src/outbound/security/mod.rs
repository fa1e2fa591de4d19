//! Credential hashing and bearer-token adapters.

mod argon2_hasher;
mod jwt;

pub use argon2_hasher::Argon2Hasher;
pub use jwt::{DEFAULT_TOKEN_LIFETIME_DAYS, JwtTokenService};
