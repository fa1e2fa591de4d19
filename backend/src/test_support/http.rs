//! In-memory HTTP harness for handler tests.
//!
//! [`TestApp`] wires [`HttpState`] over the in-memory repositories and the
//! recording doubles, with the clock pinned at [`fixture_now`].

use std::sync::Arc;

use actix_web::body::MessageBody;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::http::header::{AUTHORIZATION, CONTENT_TYPE};
use actix_web::test::TestRequest;
use actix_web::{App, web};

use crate::domain::ports::{Repository, TokenService};
use crate::domain::{Role, Tour, User};
use crate::inbound::http::configure_api;
use crate::inbound::http::state::{HttpState, HttpStatePorts, HttpStateSettings};
use crate::outbound::memory::InMemoryStore;
use crate::test_support::{
    MEDIA_TEST_BASE, MutableClock, PlaintextHasher, RecordingMediaStore, RecordingPaymentGateway,
    fixture_now, sample_tour, sample_user, test_token_service,
};
use crate::Trace;

/// Frontend origin used for checkout redirects in tests.
pub const TEST_FRONTEND_URL: &str = "https://tourbook.test";

/// Handles onto every adapter behind a test [`HttpState`].
pub struct TestApp {
    pub store: InMemoryStore,
    pub payments: Arc<RecordingPaymentGateway>,
    pub media: Arc<RecordingMediaStore>,
    pub clock: Arc<MutableClock>,
    state: web::Data<HttpState>,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    pub fn new() -> Self {
        let store = InMemoryStore::default();
        let payments = Arc::new(RecordingPaymentGateway::default());
        let media = Arc::new(RecordingMediaStore::default());
        let clock = Arc::new(MutableClock::new(fixture_now()));
        let ports = HttpStatePorts {
            users: Arc::new(store.users()),
            tours: Arc::new(store.tours()),
            bookings: Arc::new(store.bookings()),
            reviews: Arc::new(store.reviews()),
            hasher: Arc::new(PlaintextHasher),
            tokens: Arc::new(test_token_service()),
            payments: payments.clone(),
            media: media.clone(),
            clock: clock.clone(),
        };
        let settings = HttpStateSettings {
            environment: "test".to_owned(),
            frontend_url: TEST_FRONTEND_URL.to_owned(),
            media_base_url: MEDIA_TEST_BASE.to_owned(),
        };
        Self {
            store,
            payments,
            media,
            clock,
            state: web::Data::new(HttpState::new(ports, settings)),
        }
    }

    pub fn data(&self) -> web::Data<HttpState> {
        self.state.clone()
    }

    /// Full API mounted the way the server mounts it.
    pub fn app(
        &self,
    ) -> App<
        impl ServiceFactory<
            ServiceRequest,
            Config = (),
            Response = ServiceResponse<impl MessageBody + use<>>,
            Error = actix_web::Error,
            InitError = (),
        > + use<>,
    > {
        App::new()
            .app_data(self.data())
            .wrap(Trace)
            .configure(configure_api)
    }

    /// Store an active user and sign a token for them.
    pub async fn seed_user(&self, name: &str, email: &str, role: Role) -> (User, String) {
        let user = sample_user(name, email, role);
        self.store
            .users()
            .insert(&user)
            .await
            .unwrap_or_else(|err| panic!("seed user {email}: {err}"));
        let token = test_token_service()
            .issue(&user, fixture_now())
            .unwrap_or_else(|err| panic!("sign token: {err}"));
        (user, token.token)
    }

    pub async fn seed_tour(&self, name: &str) -> Tour {
        let tour = sample_tour(name);
        self.store
            .tours()
            .insert(&tour)
            .await
            .unwrap_or_else(|err| panic!("seed tour {name}: {err}"));
        tour
    }
}

/// `Authorization` header pair for `token`.
pub fn bearer(token: &str) -> (actix_web::http::header::HeaderName, String) {
    (AUTHORIZATION, format!("Bearer {token}"))
}

const MULTIPART_BOUNDARY: &str = "tourbook-test-boundary";

/// One part of a hand-built `multipart/form-data` body.
#[derive(Debug, Clone, Copy)]
pub struct MultipartPart<'a> {
    pub name: &'a str,
    pub content_type: &'a str,
    pub bytes: &'a [u8],
}

impl<'a> MultipartPart<'a> {
    /// JPEG file part.
    pub fn image(name: &'a str, bytes: &'a [u8]) -> Self {
        Self {
            name,
            content_type: "image/jpeg",
            bytes,
        }
    }

    pub fn text(name: &'a str, value: &'a str) -> Self {
        Self {
            name,
            content_type: "text/plain",
            bytes: value.as_bytes(),
        }
    }
}

/// Attach a multipart body built from `parts` to `req`.
pub fn multipart_request(req: TestRequest, parts: &[MultipartPart<'_>]) -> TestRequest {
    let mut body = Vec::new();
    for (index, part) in parts.iter().enumerate() {
        body.extend_from_slice(
            format!(
                concat!(
                    "--{}\r\n",
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"upload-{}\"\r\n",
                    "Content-Type: {}\r\n\r\n",
                ),
                MULTIPART_BOUNDARY, part.name, index, part.content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(part.bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}--\r\n").as_bytes());
    req.insert_header((
        CONTENT_TYPE,
        format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
    ))
    .set_payload(body)
}
