//! Wire shapes for checkout sessions and webhook events.

use std::collections::HashMap;

use serde::Deserialize;

use crate::domain::ports::PaymentGatewayError;
use crate::domain::{CheckoutSession, PaymentEvent, TourId, UserId};

pub(super) const CHECKOUT_COMPLETED: &str = "checkout.session.completed";

#[derive(Debug, Deserialize)]
pub(super) struct CheckoutSessionDto {
    id: String,
    url: Option<String>,
}

impl CheckoutSessionDto {
    pub(super) fn into_domain(self) -> Result<CheckoutSession, PaymentGatewayError> {
        let url = self.url.ok_or_else(|| {
            PaymentGatewayError::rejected(200_u16, "checkout session has no hosted URL")
        })?;
        Ok(CheckoutSession { id: self.id, url })
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct EventDto {
    #[serde(rename = "type")]
    kind: String,
    data: EventDataDto,
}

#[derive(Debug, Deserialize)]
struct EventDataDto {
    object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct CompletedSessionDto {
    id: String,
    client_reference_id: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, String>,
    amount_total: Option<u32>,
}

fn malformed(message: impl Into<String>) -> PaymentGatewayError {
    PaymentGatewayError::malformed_event(message)
}

impl EventDto {
    pub(super) fn into_domain(self) -> Result<PaymentEvent, PaymentGatewayError> {
        if self.kind != CHECKOUT_COMPLETED {
            return Ok(PaymentEvent::Ignored { kind: self.kind });
        }
        let session: CompletedSessionDto = serde_json::from_value(self.data.object)
            .map_err(|err| malformed(format!("checkout session: {err}")))?;
        let tour_id = session
            .metadata
            .get("tour_id")
            .or(session.client_reference_id.as_ref())
            .ok_or_else(|| malformed("checkout session carries no tour reference"))?
            .parse::<TourId>()
            .map_err(|err| malformed(err.to_string()))?;
        let user_id = session
            .metadata
            .get("user_id")
            .ok_or_else(|| malformed("checkout session carries no user reference"))?
            .parse::<UserId>()
            .map_err(|err| malformed(err.to_string()))?;
        let amount_total = session
            .amount_total
            .ok_or_else(|| malformed("checkout session has no amount_total"))?;
        Ok(PaymentEvent::CheckoutCompleted {
            session_id: session.id,
            tour_id,
            user_id,
            amount_total,
        })
    }
}

pub(super) fn parse_event(payload: &[u8]) -> Result<PaymentEvent, PaymentGatewayError> {
    let event: EventDto =
        serde_json::from_slice(payload).map_err(|err| malformed(format!("event: {err}")))?;
    event.into_domain()
}
