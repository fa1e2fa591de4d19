//! Recording stand-ins for the payment provider and the media host.
//!
//! Integration suites cannot reach the crate's `cfg(test)` automocks, so
//! these doubles keep a log of calls and answer deterministically.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::ports::{
    ImageUpload, MediaFolder, MediaStore, MediaStoreError, PaymentGateway, PaymentGatewayError,
};
use crate::domain::{CheckoutRequest, CheckoutSession, PaymentEvent, TourId, UserId};
use crate::outbound::payments::{DEFAULT_TOLERANCE_SECONDS, sign_payload, verify_event};

use super::TEST_WEBHOOK_SECRET;

/// Base URL of every [`RecordingMediaStore`] upload.
pub const MEDIA_TEST_BASE: &str = "https://media.test";

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Payment gateway that hands out numbered sessions and verifies webhooks
/// against [`TEST_WEBHOOK_SECRET`].
#[derive(Default)]
pub struct RecordingPaymentGateway {
    requests: Mutex<Vec<CheckoutRequest>>,
}

impl RecordingPaymentGateway {
    /// Checkout requests received so far.
    pub fn requests(&self) -> Vec<CheckoutRequest> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl PaymentGateway for RecordingPaymentGateway {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentGatewayError> {
        let mut requests = lock(&self.requests);
        requests.push(request.clone());
        let id = format!("cs_test_{}", requests.len());
        Ok(CheckoutSession {
            url: format!("https://checkout.test/pay/{id}"),
            id,
        })
    }

    fn verify_event(
        &self,
        payload: &[u8],
        signature: &str,
        now: DateTime<Utc>,
    ) -> Result<PaymentEvent, PaymentGatewayError> {
        verify_event(
            TEST_WEBHOOK_SECRET,
            payload,
            signature,
            now,
            DEFAULT_TOLERANCE_SECONDS,
        )
    }
}

/// Signature header for `payload` as the provider would send it at `now`.
pub fn sign_webhook(payload: &[u8], now: DateTime<Utc>) -> String {
    sign_payload(TEST_WEBHOOK_SECRET, now.timestamp(), payload)
        .unwrap_or_else(|err| panic!("HMAC accepts any key length: {err}"))
}

/// `checkout.session.completed` body for `(tour, user)` paying `amount`.
pub fn checkout_completed_payload(tour_id: TourId, user_id: UserId, amount: u32) -> String {
    serde_json::json!({
        "id": "evt_test",
        "type": "checkout.session.completed",
        "data": {
            "object": {
                "id": "cs_test_completed",
                "client_reference_id": tour_id.to_string(),
                "metadata": {
                    "tour_id": tour_id.to_string(),
                    "user_id": user_id.to_string(),
                },
                "amount_total": amount,
            }
        }
    })
    .to_string()
}

/// Media store that accepts everything and remembers what it stored.
#[derive(Default)]
pub struct RecordingMediaStore {
    uploads: Mutex<Vec<ImageUpload>>,
    deletions: Mutex<Vec<String>>,
}

impl RecordingMediaStore {
    pub fn uploads(&self) -> Vec<ImageUpload> {
        lock(&self.uploads).clone()
    }

    /// `folder/public_id` paths removed so far.
    pub fn deletions(&self) -> Vec<String> {
        lock(&self.deletions).clone()
    }
}

#[async_trait]
impl MediaStore for RecordingMediaStore {
    async fn upload(&self, upload: ImageUpload) -> Result<String, MediaStoreError> {
        let url = format!(
            "{MEDIA_TEST_BASE}/{}/{}.jpg",
            upload.folder.as_str(),
            upload.public_id
        );
        lock(&self.uploads).push(upload);
        Ok(url)
    }

    async fn delete(&self, folder: MediaFolder, public_id: &str) -> Result<(), MediaStoreError> {
        lock(&self.deletions).push(format!("{}/{public_id}", folder.as_str()));
        Ok(())
    }
}
