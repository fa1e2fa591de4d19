//! Checkout, payment webhook and booking administration.
//!
//! ```text
//! GET    /api/v1/bookings/checkout-session/{tourId}
//! POST   /api/v1/bookings/webhook-checkout   (provider-signed)
//! GET    /api/v1/bookings/my-bookings
//! GET    /api/v1/bookings                    (admin, lead-guide)
//! POST   /api/v1/bookings                    (admin, lead-guide)
//! GET    /api/v1/bookings/{id}               (admin, lead-guide)
//! PATCH  /api/v1/bookings/{id}               (admin, lead-guide)
//! DELETE /api/v1/bookings/{id}               (admin, lead-guide)
//! ```

use actix_web::{HttpRequest, HttpResponse, delete, get, patch, post, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::ToSchema;

use crate::domain::ports::SIGNATURE_HEADER;
use crate::domain::{
    Booking, BookingDraft, BookingId, BookingWithTour, CheckoutSession, Error, TourId, UserId,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::AuthContext;
use crate::inbound::http::envelope::{Envelope, Wrapped};
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::tours::{TourSummaryDto, tour_id};
use crate::inbound::http::validation::{
    FieldName, PageQuery, non_negative, parse_id, parse_optional_id,
};

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookingDto {
    #[schema(value_type = String)]
    pub id: BookingId,
    #[schema(value_type = String)]
    pub tour_id: TourId,
    #[schema(value_type = String)]
    pub user_id: UserId,
    /// USD cents.
    pub price: u32,
    pub paid: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&Booking> for BookingDto {
    fn from(booking: &Booking) -> Self {
        Self {
            id: booking.id,
            tour_id: booking.tour_id,
            user_id: booking.user_id,
            price: booking.price,
            paid: booking.paid,
            created_at: booking.created_at,
        }
    }
}

/// Booking with the tour it refers to; `tour` is null once the tour is gone.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MyBookingDto {
    #[serde(flatten)]
    pub booking: BookingDto,
    pub tour: Option<TourSummaryDto>,
}

impl From<&BookingWithTour> for MyBookingDto {
    fn from(value: &BookingWithTour) -> Self {
        Self {
            booking: BookingDto::from(&value.booking),
            tour: value.tour.as_ref().map(TourSummaryDto::from),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MyBookings {
    pub bookings: Vec<MyBookingDto>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutSessionDto {
    #[schema(example = "cs_test_a1b2c3")]
    pub id: String,
    pub url: String,
}

impl From<CheckoutSession> for CheckoutSessionDto {
    fn from(session: CheckoutSession) -> Self {
        Self {
            id: session.id,
            url: session.url,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutResponse {
    #[schema(value_type = String, example = "success")]
    pub status: &'static str,
    pub session: CheckoutSessionDto,
}

/// Acknowledgement returned to the payment provider.
#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookAck {
    pub received: bool,
}

/// Admin booking fields. `tour` and `user` are accepted as aliases.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookingBody {
    #[serde(alias = "tour")]
    pub tour_id: Option<String>,
    #[serde(alias = "user")]
    pub user_id: Option<String>,
    pub price: Option<i64>,
    pub paid: Option<bool>,
}

impl TryFrom<BookingBody> for BookingDraft {
    type Error = Error;

    fn try_from(body: BookingBody) -> Result<Self, Self::Error> {
        Ok(Self {
            tour_id: parse_optional_id(body.tour_id.as_deref(), FieldName::new("tourId"))?,
            user_id: parse_optional_id(body.user_id.as_deref(), FieldName::new("userId"))?,
            price: body
                .price
                .map(|price| non_negative(price, FieldName::new("price")))
                .transpose()?,
            paid: body.paid,
        })
    }
}

fn booking_id(raw: &str) -> ApiResult<BookingId> {
    parse_id(raw, FieldName::new("id"))
}

fn one(booking: &Booking) -> web::Json<Envelope<Wrapped<BookingDto>>> {
    web::Json(Envelope::one(BookingDto::from(booking)))
}

/// Start a hosted checkout for one tour.
#[utoipa::path(
    get,
    path = "/api/v1/bookings/checkout-session/{tourId}",
    params(("tourId" = String, Path, description = "Tour to book")),
    responses(
        (status = 200, description = "Checkout session created", body = CheckoutResponse),
        (status = 400, description = "Already booked", body = ErrorSchema),
        (status = 401, description = "Not logged in", body = ErrorSchema),
        (status = 404, description = "No tour found with that ID", body = ErrorSchema),
        (status = 503, description = "Payment provider unavailable", body = ErrorSchema)
    ),
    tags = ["bookings"],
    operation_id = "createCheckoutSession"
)]
#[get("/bookings/checkout-session/{tourId}")]
pub async fn checkout_session(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<CheckoutResponse>> {
    let tour = tour_id(&path)?;
    let session = state
        .bookings
        .create_checkout_session(&auth.actor(), tour)
        .await?;
    Ok(web::Json(CheckoutResponse {
        status: "success",
        session: session.into(),
    }))
}

/// Receive a signed payment event. The raw body is verified before parsing.
#[utoipa::path(
    post,
    path = "/api/v1/bookings/webhook-checkout",
    request_body(
        content = String,
        content_type = "application/json",
        description = "Provider event"
    ),
    params(("Stripe-Signature" = String, Header, description = "t=<unix>,v1=<hex>")),
    responses(
        (status = 200, description = "Event accepted", body = WebhookAck),
        (status = 400, description = "Malformed event", body = ErrorSchema),
        (status = 401, description = "Bad signature", body = ErrorSchema)
    ),
    tags = ["bookings"],
    operation_id = "paymentWebhook",
    security([])
)]
#[post("/bookings/webhook-checkout")]
pub async fn payment_webhook(
    state: web::Data<HttpState>,
    req: HttpRequest,
    body: web::Bytes,
) -> ApiResult<web::Json<WebhookAck>> {
    let signature = req
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| Error::unauthenticated("Missing webhook signature"))?;
    let recorded = state
        .bookings
        .handle_payment_event(&body, signature)
        .await?;
    if let Some(recorded) = recorded {
        debug!(booking_id = %recorded.booking.id, created = recorded.created, "webhook processed");
    }
    Ok(web::Json(WebhookAck { received: true }))
}

/// The caller's bookings with tour summaries.
#[utoipa::path(
    get,
    path = "/api/v1/bookings/my-bookings",
    responses(
        (status = 200, description = "Bookings", body = Envelope<MyBookings>),
        (status = 401, description = "Not logged in", body = ErrorSchema)
    ),
    tags = ["bookings"],
    operation_id = "listMyBookings"
)]
#[get("/bookings/my-bookings")]
pub async fn my_bookings(
    state: web::Data<HttpState>,
    auth: AuthContext,
) -> ApiResult<web::Json<Envelope<MyBookings>>> {
    let bookings = state.bookings.list_my_bookings(&auth.actor()).await?;
    let count = bookings.len();
    Ok(web::Json(
        Envelope::new(MyBookings {
            bookings: bookings.iter().map(MyBookingDto::from).collect(),
        })
        .with_results(count),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/bookings",
    params(PageQuery),
    responses(
        (status = 200, description = "Bookings", body = Envelope<Wrapped<Vec<BookingDto>>>),
        (status = 403, description = "Forbidden", body = ErrorSchema)
    ),
    tags = ["bookings"],
    operation_id = "listBookings"
)]
#[get("/bookings")]
pub async fn list_bookings(
    state: web::Data<HttpState>,
    auth: AuthContext,
    query: web::Query<PageQuery>,
) -> ApiResult<web::Json<Envelope<Wrapped<Vec<BookingDto>>>>> {
    let bookings = state
        .bookings
        .list_bookings(&auth.actor(), query.into_inner().into())
        .await?;
    Ok(web::Json(Envelope::many(
        bookings.iter().map(BookingDto::from).collect(),
    )))
}

/// Record a booking by hand. Only booking managers may set `paid`.
#[utoipa::path(
    post,
    path = "/api/v1/bookings",
    request_body = BookingBody,
    responses(
        (status = 201, description = "Booking created", body = Envelope<Wrapped<BookingDto>>),
        (status = 400, description = "Missing fields or duplicate booking", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema)
    ),
    tags = ["bookings"],
    operation_id = "createBooking"
)]
#[post("/bookings")]
pub async fn create_booking(
    state: web::Data<HttpState>,
    auth: AuthContext,
    payload: web::Json<BookingBody>,
) -> ApiResult<HttpResponse> {
    let draft = BookingDraft::try_from(payload.into_inner())?;
    let booking = state.bookings.create_booking(&auth.actor(), draft).await?;
    Ok(HttpResponse::Created().json(Envelope::one(BookingDto::from(&booking))))
}

#[utoipa::path(
    get,
    path = "/api/v1/bookings/{id}",
    params(("id" = String, Path, description = "Booking id")),
    responses(
        (status = 200, description = "Booking", body = Envelope<Wrapped<BookingDto>>),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 404, description = "No booking found with that ID", body = ErrorSchema)
    ),
    tags = ["bookings"],
    operation_id = "getBooking"
)]
#[get("/bookings/{id}")]
pub async fn get_booking(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<Envelope<Wrapped<BookingDto>>>> {
    let booking = state
        .bookings
        .get_booking(&auth.actor(), booking_id(&path)?)
        .await?;
    Ok(one(&booking))
}

/// Edit a booking; absent fields keep stored values.
#[utoipa::path(
    patch,
    path = "/api/v1/bookings/{id}",
    params(("id" = String, Path, description = "Booking id")),
    request_body = BookingBody,
    responses(
        (status = 200, description = "Booking updated", body = Envelope<Wrapped<BookingDto>>),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 404, description = "No booking found with that ID", body = ErrorSchema)
    ),
    tags = ["bookings"],
    operation_id = "updateBooking"
)]
#[patch("/bookings/{id}")]
pub async fn update_booking(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<String>,
    payload: web::Json<BookingBody>,
) -> ApiResult<web::Json<Envelope<Wrapped<BookingDto>>>> {
    let id = booking_id(&path)?;
    let draft = BookingDraft::try_from(payload.into_inner())?;
    let booking = state
        .bookings
        .update_booking(&auth.actor(), id, draft)
        .await?;
    Ok(one(&booking))
}

#[utoipa::path(
    delete,
    path = "/api/v1/bookings/{id}",
    params(("id" = String, Path, description = "Booking id")),
    responses(
        (status = 204, description = "Booking deleted"),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 404, description = "No booking found with that ID", body = ErrorSchema)
    ),
    tags = ["bookings"],
    operation_id = "deleteBooking"
)]
#[delete("/bookings/{id}")]
pub async fn delete_booking(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let id = booking_id(&path)?;
    state.bookings.delete_booking(&auth.actor(), id).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;
    use crate::test_support::http::{TEST_FRONTEND_URL, TestApp, bearer};
    use crate::test_support::{checkout_completed_payload, fixture_now, sign_webhook};
    use actix_web::http::StatusCode;
    use actix_web::test;
    use rstest::{fixture, rstest};
    use serde_json::{Value, json};

    #[fixture]
    fn harness() -> TestApp {
        TestApp::new()
    }

    #[rstest]
    #[actix_web::test]
    async fn checkout_returns_the_provider_session(harness: TestApp) {
        let (user, token) = harness.seed_user("Ada", "ada@example.com", Role::User).await;
        let tour = harness.seed_tour("The Forest Hiker").await;
        let app = test::init_service(harness.app()).await;
        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/bookings/checkout-session/{}", tour.id))
            .insert_header(bearer(&token))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["session"]["id"], "cs_test_1");
        assert_eq!(body["session"]["url"], "https://checkout.test/pay/cs_test_1");

        let requests = harness.payments.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.customer_email, user.email.as_str());
        assert_eq!(request.line_item.name, "The Forest Hiker Tour");
        assert_eq!(request.line_item.unit_amount, 49_700);
        assert_eq!(request.cancel_url, format!("{TEST_FRONTEND_URL}/tour/{}", tour.id));
        assert_eq!(harness.store.booking_count(), 0);
    }

    #[rstest]
    #[actix_web::test]
    async fn checkout_for_a_booked_tour_skips_the_provider(harness: TestApp) {
        let (user, token) = harness.seed_user("Ada", "ada@example.com", Role::User).await;
        let tour = harness.seed_tour("The Forest Hiker").await;
        harness
            .data()
            .bookings
            .record_booking(tour.id, user.id, 49_700)
            .await
            .expect("seed booking");
        let app = test::init_service(harness.app()).await;
        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/bookings/checkout-session/{}", tour.id))
            .insert_header(bearer(&token))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["code"], "already_booked");
        assert_eq!(body["message"], "You have already booked this tour");
        assert!(harness.payments.requests().is_empty());
    }

    #[rstest]
    #[actix_web::test]
    async fn signed_webhooks_record_one_booking(harness: TestApp) {
        let (user, token) = harness.seed_user("Ada", "ada@example.com", Role::User).await;
        let tour = harness.seed_tour("The Forest Hiker").await;
        let app = test::init_service(harness.app()).await;
        let payload = checkout_completed_payload(tour.id, user.id, 49_700);
        let signature = sign_webhook(payload.as_bytes(), fixture_now());
        for _ in 0..2 {
            let req = test::TestRequest::post()
                .uri("/api/v1/bookings/webhook-checkout")
                .insert_header((SIGNATURE_HEADER, signature.clone()))
                .set_payload(payload.clone())
                .to_request();
            let res = test::call_service(&app, req).await;
            assert_eq!(res.status(), StatusCode::OK);
        }
        assert_eq!(harness.store.booking_count(), 1);

        let req = test::TestRequest::get()
            .uri("/api/v1/bookings/my-bookings")
            .insert_header(bearer(&token))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["results"], 1);
        let booking = &body["data"]["bookings"][0];
        assert_eq!(booking["paid"], true);
        assert_eq!(booking["tour"]["name"], "The Forest Hiker");
    }

    #[rstest]
    #[case(None)]
    #[case(Some("t=1748779200,v1=deadbeef"))]
    #[actix_web::test]
    async fn unsigned_or_forged_webhooks_record_nothing(
        harness: TestApp,
        #[case] signature: Option<&'static str>,
    ) {
        let user = harness.seed_user("Ada", "ada@example.com", Role::User).await.0;
        let tour = harness.seed_tour("The Forest Hiker").await;
        let app = test::init_service(harness.app()).await;
        let mut req = test::TestRequest::post()
            .uri("/api/v1/bookings/webhook-checkout")
            .set_payload(checkout_completed_payload(tour.id, user.id, 49_700));
        if let Some(signature) = signature {
            req = req.insert_header((SIGNATURE_HEADER, signature));
        }
        let res = test::call_service(&app, req.to_request()).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(harness.store.booking_count(), 0);
    }

    #[rstest]
    #[actix_web::test]
    async fn admins_manage_bookings_and_payment_status(harness: TestApp) {
        let (_, admin) = harness.seed_user("Root", "root@example.com", Role::Admin).await;
        let (user, _) = harness.seed_user("Ada", "ada@example.com", Role::User).await;
        let tour = harness.seed_tour("The Forest Hiker").await;
        let app = test::init_service(harness.app()).await;
        let req = test::TestRequest::post()
            .uri("/api/v1/bookings")
            .insert_header(bearer(&admin))
            .set_json(json!({
                "tour": tour.id.to_string(),
                "user": user.id.to_string(),
                "price": 49_700,
                "paid": false
            }))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(res).await;
        let id = body["data"]["data"]["id"].as_str().expect("id").to_owned();

        let req = test::TestRequest::patch()
            .uri(&format!("/api/v1/bookings/{id}"))
            .insert_header(bearer(&admin))
            .set_json(json!({ "paid": true }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["data"]["paid"], true);
        assert_eq!(body["data"]["data"]["price"], 49_700);

        let req = test::TestRequest::post()
            .uri("/api/v1/bookings")
            .insert_header(bearer(&admin))
            .set_json(json!({
                "tourId": tour.id.to_string(),
                "userId": user.id.to_string(),
                "price": 10
            }))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["code"], "duplicate_key");
    }

    #[rstest]
    #[case(Role::User)]
    #[case(Role::Guide)]
    #[actix_web::test]
    async fn booking_administration_is_forbidden_to_other_roles(
        harness: TestApp,
        #[case] role: Role,
    ) {
        let (_, token) = harness.seed_user("Ada", "ada@example.com", role).await;
        let app = test::init_service(harness.app()).await;
        let req = test::TestRequest::get()
            .uri("/api/v1/bookings")
            .insert_header(bearer(&token))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }
}
