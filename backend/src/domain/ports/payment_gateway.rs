//! Driven port for the hosted payment provider.
//!
//! The provider owns card handling; the domain only asks for a hosted
//! checkout session and consumes signed completion events.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{CheckoutRequest, CheckoutSession, PaymentEvent};

use super::define_port_error;

/// Request header carrying a webhook delivery's signature.
pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

define_port_error! {
    /// Errors surfaced by payment provider adapters.
    pub enum PaymentGatewayError {
        /// Network transport failed before a response arrived.
        Transport { message: String } => "payment provider transport failed: {message}",
        /// The provider answered with an error status.
        Rejected { status: u16, message: String } =>
            "payment provider rejected request ({status}): {message}",
        /// A webhook signature did not verify.
        InvalidSignature { message: String } => "invalid webhook signature: {message}",
        /// A verified webhook payload could not be interpreted.
        MalformedEvent { message: String } => "malformed webhook event: {message}",
    }
}

/// Port for creating checkout sessions and verifying provider events.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Ask the provider for a hosted checkout session.
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentGatewayError>;

    /// Verify a webhook delivery and decode its event.
    ///
    /// `signature` is the raw signature header value; `now` bounds the
    /// accepted timestamp window.
    fn verify_event(
        &self,
        payload: &[u8],
        signature: &str,
        now: DateTime<Utc>,
    ) -> Result<PaymentEvent, PaymentGatewayError>;
}
