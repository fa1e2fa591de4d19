//! Reqwest-backed checkout session client and webhook verifier.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode, Url};
use zeroize::Zeroizing;

use super::dto::CheckoutSessionDto;
use super::signature::{DEFAULT_TOLERANCE_SECONDS, verify_event};
use crate::domain::ports::{PaymentGateway, PaymentGatewayError};
use crate::domain::{CheckoutRequest, CheckoutSession, PaymentEvent};

/// Provider endpoint and credentials.
#[derive(Clone)]
pub struct StripeConfig {
    pub api_base: Url,
    pub secret_key: Zeroizing<String>,
    pub webhook_secret: Zeroizing<String>,
    pub tolerance_seconds: i64,
}

impl StripeConfig {
    pub fn new(
        api_base: Url,
        secret_key: impl Into<String>,
        webhook_secret: impl Into<String>,
    ) -> Self {
        Self {
            api_base,
            secret_key: Zeroizing::new(secret_key.into()),
            webhook_secret: Zeroizing::new(webhook_secret.into()),
            tolerance_seconds: DEFAULT_TOLERANCE_SECONDS,
        }
    }
}

/// [`PaymentGateway`] speaking the Stripe checkout API.
pub struct StripeGateway {
    client: Client,
    config: StripeConfig,
}

impl StripeGateway {
    /// Build the adapter with a client-level request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(config: StripeConfig, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, config })
    }

    fn sessions_url(&self) -> Result<Url, PaymentGatewayError> {
        self.config
            .api_base
            .join("v1/checkout/sessions")
            .map_err(|err| PaymentGatewayError::transport(err.to_string()))
    }
}

/// Form fields for one hosted checkout session.
fn checkout_form(request: &CheckoutRequest) -> Vec<(String, String)> {
    let item = &request.line_item;
    let mut form = vec![
        ("mode".to_owned(), "payment".to_owned()),
        ("success_url".to_owned(), request.success_url.clone()),
        ("cancel_url".to_owned(), request.cancel_url.clone()),
        ("customer_email".to_owned(), request.customer_email.clone()),
        ("client_reference_id".to_owned(), request.tour_id.to_string()),
        ("metadata[tour_id]".to_owned(), request.tour_id.to_string()),
        ("metadata[user_id]".to_owned(), request.user_id.to_string()),
        ("line_items[0][quantity]".to_owned(), item.quantity.to_string()),
        (
            "line_items[0][price_data][currency]".to_owned(),
            item.currency.clone(),
        ),
        (
            "line_items[0][price_data][unit_amount]".to_owned(),
            item.unit_amount.to_string(),
        ),
        (
            "line_items[0][price_data][product_data][name]".to_owned(),
            item.name.clone(),
        ),
        (
            "line_items[0][price_data][product_data][description]".to_owned(),
            item.description.clone(),
        ),
    ];
    if let Some(image) = &item.image {
        form.push((
            "line_items[0][price_data][product_data][images][0]".to_owned(),
            image.clone(),
        ));
    }
    form
}

fn map_transport_error(error: reqwest::Error) -> PaymentGatewayError {
    PaymentGatewayError::transport(error.to_string())
}

fn map_status_error(status: StatusCode, body: &[u8]) -> PaymentGatewayError {
    const PREVIEW_CHAR_LIMIT: usize = 160;
    let preview: String = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(PREVIEW_CHAR_LIMIT)
        .collect();
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        PaymentGatewayError::transport(format!("status {}: {preview}", status.as_u16()))
    } else {
        PaymentGatewayError::rejected(status.as_u16(), preview)
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentGatewayError> {
        let response = self
            .client
            .post(self.sessions_url()?)
            .bearer_auth(self.config.secret_key.as_str())
            .form(&checkout_form(request))
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }
        let session: CheckoutSessionDto = serde_json::from_slice(body.as_ref()).map_err(|err| {
            PaymentGatewayError::rejected(status.as_u16(), format!("undecodable session: {err}"))
        })?;
        session.into_domain()
    }

    fn verify_event(
        &self,
        payload: &[u8],
        signature: &str,
        now: DateTime<Utc>,
    ) -> Result<PaymentEvent, PaymentGatewayError> {
        verify_event(
            self.config.webhook_secret.as_str(),
            payload,
            signature,
            now,
            self.config.tolerance_seconds,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CheckoutLineItem, TourId, UserId};
    use rstest::rstest;

    fn request(image: Option<&str>) -> CheckoutRequest {
        CheckoutRequest {
            tour_id: TourId::random(),
            user_id: UserId::random(),
            customer_email: "miles@example.com".to_owned(),
            line_item: CheckoutLineItem {
                name: "The Forest Hiker Tour".to_owned(),
                description: "Breathtaking hike".to_owned(),
                image: image.map(str::to_owned),
                unit_amount: 39_700,
                currency: "usd".to_owned(),
                quantity: 1,
            },
            success_url: "https://tours.example/dashboard".to_owned(),
            cancel_url: "https://tours.example/tour/1".to_owned(),
        }
    }

    fn field<'a>(form: &'a [(String, String)], name: &str) -> Option<&'a str> {
        form.iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    #[rstest]
    fn form_carries_references_and_line_item() {
        let request = request(Some("https://media.example/tours/cover.jpg"));
        let form = checkout_form(&request);
        let tour_id = request.tour_id.to_string();
        let user_id = request.user_id.to_string();
        assert_eq!(field(&form, "client_reference_id"), Some(tour_id.as_str()));
        assert_eq!(field(&form, "metadata[user_id]"), Some(user_id.as_str()));
        assert_eq!(
            field(&form, "line_items[0][price_data][unit_amount]"),
            Some("39700")
        );
        assert_eq!(
            field(&form, "line_items[0][price_data][product_data][images][0]"),
            Some("https://media.example/tours/cover.jpg")
        );
    }

    #[rstest]
    fn form_omits_missing_images() {
        let form = checkout_form(&request(None));
        assert_eq!(
            field(&form, "line_items[0][price_data][product_data][images][0]"),
            None
        );
    }

    #[rstest]
    #[case(StatusCode::BAD_REQUEST, false)]
    #[case(StatusCode::UNAUTHORIZED, false)]
    #[case(StatusCode::TOO_MANY_REQUESTS, true)]
    #[case(StatusCode::BAD_GATEWAY, true)]
    fn statuses_split_into_outages_and_rejections(
        #[case] status: StatusCode,
        #[case] outage: bool,
    ) {
        let err = map_status_error(status, b"{\"error\": {\"message\": \"nope\"}}");
        assert_eq!(
            matches!(err, PaymentGatewayError::Transport { .. }),
            outage,
            "{err}"
        );
    }
}
