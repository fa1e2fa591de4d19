//! Builders for the HTTP state's ports.
//!
//! Repositories are Diesel-backed when a pool is configured and in-memory
//! otherwise. Outbound HTTP adapters fall back to stand-ins that report the
//! provider as unavailable when their credentials are missing.

use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::{Clock, DefaultClock};
use reqwest::Url;
use tracing::warn;
use zeroize::Zeroizing;

use tourbook::domain::ports::{
    BookingRepository, ImageUpload, MediaFolder, MediaStore, MediaStoreError, PaymentGateway,
    PaymentGatewayError, ReviewRepository, TourRepository, UserRepository,
};
use tourbook::domain::{CheckoutRequest, CheckoutSession, PaymentEvent};
use tourbook::inbound::http::state::{HttpState, HttpStatePorts, HttpStateSettings};
use tourbook::outbound::media::{CloudinaryConfig, CloudinaryStore};
use tourbook::outbound::memory::InMemoryStore;
use tourbook::outbound::payments::{StripeConfig, StripeGateway};
use tourbook::outbound::persistence::{
    DbPool, DieselBookingRepository, DieselReviewRepository, DieselTourRepository,
    DieselUserRepository,
};
use tourbook::outbound::security::{Argon2Hasher, JwtTokenService};

use super::{AppSettings, ServerConfig};

const PAYMENTS_UNCONFIGURED: &str = "payment provider credentials are not configured";
const MEDIA_UNCONFIGURED: &str = "media host credentials are not configured";

/// Payment gateway used when no provider credentials are set.
struct UnconfiguredPaymentGateway;

#[async_trait]
impl PaymentGateway for UnconfiguredPaymentGateway {
    async fn create_checkout_session(
        &self,
        _request: &CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentGatewayError> {
        Err(PaymentGatewayError::transport(PAYMENTS_UNCONFIGURED))
    }

    fn verify_event(
        &self,
        _payload: &[u8],
        _signature: &str,
        _now: DateTime<Utc>,
    ) -> Result<PaymentEvent, PaymentGatewayError> {
        Err(PaymentGatewayError::invalid_signature(PAYMENTS_UNCONFIGURED))
    }
}

/// Media store used when no host credentials are set.
struct UnconfiguredMediaStore;

#[async_trait]
impl MediaStore for UnconfiguredMediaStore {
    async fn upload(&self, _upload: ImageUpload) -> Result<String, MediaStoreError> {
        Err(MediaStoreError::transport(MEDIA_UNCONFIGURED))
    }

    async fn delete(&self, _folder: MediaFolder, _public_id: &str) -> Result<(), MediaStoreError> {
        Err(MediaStoreError::transport(MEDIA_UNCONFIGURED))
    }
}

struct Repositories {
    users: Arc<dyn UserRepository>,
    tours: Arc<dyn TourRepository>,
    bookings: Arc<dyn BookingRepository>,
    reviews: Arc<dyn ReviewRepository>,
}

fn build_repositories(pool: Option<&DbPool>) -> Repositories {
    match pool {
        Some(pool) => Repositories {
            users: Arc::new(DieselUserRepository::new(pool.clone())),
            tours: Arc::new(DieselTourRepository::new(pool.clone())),
            bookings: Arc::new(DieselBookingRepository::new(pool.clone())),
            reviews: Arc::new(DieselReviewRepository::new(pool.clone())),
        },
        None => {
            warn!("no database configured; data lives in memory and is lost on exit");
            let store = InMemoryStore::default();
            Repositories {
                users: Arc::new(store.users()),
                tours: Arc::new(store.tours()),
                bookings: Arc::new(store.bookings()),
                reviews: Arc::new(store.reviews()),
            }
        }
    }
}

fn parse_url(raw: &str, name: &str) -> io::Result<Url> {
    Url::parse(raw).map_err(|err| io::Error::other(format!("invalid {name} '{raw}': {err}")))
}

pub(crate) fn build_payment_gateway(settings: &AppSettings) -> io::Result<Arc<dyn PaymentGateway>> {
    let Some(payment) = settings.payment() else {
        warn!("{PAYMENTS_UNCONFIGURED}; checkout and webhooks are disabled");
        return Ok(Arc::new(UnconfiguredPaymentGateway));
    };
    let config = StripeConfig::new(
        parse_url(&payment.api_base, "payment API base")?,
        payment.secret_key,
        payment.webhook_secret,
    );
    let gateway = StripeGateway::new(config, settings.outbound_timeout())
        .map_err(|err| io::Error::other(format!("payment client: {err}")))?;
    Ok(Arc::new(gateway))
}

pub(crate) fn build_media_store(
    settings: &AppSettings,
    clock: Arc<dyn Clock>,
) -> io::Result<Arc<dyn MediaStore>> {
    let Some(media) = settings.media() else {
        warn!("{MEDIA_UNCONFIGURED}; image uploads are disabled");
        return Ok(Arc::new(UnconfiguredMediaStore));
    };
    let config = CloudinaryConfig {
        api_base: parse_url(&media.api_base, "media API base")?,
        cloud_name: media.cloud_name,
        api_key: media.api_key,
        api_secret: Zeroizing::new(media.api_secret),
    };
    let store = CloudinaryStore::new(config, settings.outbound_timeout(), clock)
        .map_err(|err| io::Error::other(format!("media client: {err}")))?;
    Ok(Arc::new(store))
}

/// Wire every port and domain service for the HTTP layer.
///
/// # Errors
///
/// Fails when a configured outbound URL is malformed or an HTTP client cannot
/// be built.
pub(crate) fn build_http_state(config: &ServerConfig) -> io::Result<HttpState> {
    let settings = &config.settings;
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let Repositories {
        users,
        tours,
        bookings,
        reviews,
    } = build_repositories(config.db_pool.as_ref());
    let ports = HttpStatePorts {
        users,
        tours,
        bookings,
        reviews,
        hasher: Arc::new(Argon2Hasher::default()),
        tokens: Arc::new(JwtTokenService::new(
            &config.auth_key,
            settings.token_lifetime(),
        )),
        payments: build_payment_gateway(settings)?,
        media: build_media_store(settings, clock.clone())?,
        clock,
    };
    Ok(HttpState::new(
        ports,
        HttpStateSettings {
            environment: settings.environment().to_owned(),
            frontend_url: settings.frontend_url().to_owned(),
            media_base_url: settings.media_base_url(),
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tourbook::domain::ports::ImageTransform;

    fn empty_settings() -> AppSettings {
        AppSettings::default()
    }

    #[rstest]
    #[tokio::test]
    async fn missing_media_credentials_disable_uploads() {
        let store = build_media_store(&empty_settings(), Arc::new(DefaultClock)).expect("store");
        let err = store
            .upload(ImageUpload {
                folder: MediaFolder::Users,
                public_id: "user-1".to_owned(),
                bytes: vec![1, 2, 3],
                transform: ImageTransform::USER_PHOTO,
            })
            .await
            .expect_err("unconfigured");
        assert!(matches!(err, MediaStoreError::Transport { .. }));
    }

    #[rstest]
    fn malformed_payment_base_is_rejected() {
        let settings = AppSettings {
            payment_api_base: Some("not a url".to_owned()),
            payment_secret_key: Some("sk_test".to_owned()),
            payment_webhook_secret: Some("whsec".to_owned()),
            ..empty_settings()
        };
        assert!(build_payment_gateway(&settings).is_err());
    }

    #[rstest]
    fn in_memory_state_builds_without_a_database() {
        let config = ServerConfig::new(empty_settings(), vec![7; 32]);
        let state = build_http_state(&config).expect("state");
        assert_eq!(state.environment, "development");
    }
}
