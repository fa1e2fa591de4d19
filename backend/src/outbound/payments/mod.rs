//! Hosted payment provider adapter (Stripe-compatible HTTP API).

mod dto;
mod signature;
mod stripe;

pub use signature::{DEFAULT_TOLERANCE_SECONDS, SIGNATURE_HEADER, sign_payload, verify_event};
pub use stripe::{StripeConfig, StripeGateway};
