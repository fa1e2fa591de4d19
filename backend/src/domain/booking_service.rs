//! Checkout, booking confirmation and booking administration.
//!
//! A booking moves from *requested* (caller asks to book) to
//! *session-created* (the provider hosts checkout; nothing is stored) to
//! *recorded* (a signed completion event arrives and the booking row is
//! written). Recording is idempotent per `(user, tour)`.

use std::sync::Arc;

use mockable::Clock;
use tracing::{info, warn};

use super::crud::{CrudService, map_repository_error, not_found};
use super::ports::{
    BookingRepository, PageRequest, PaymentGateway, PaymentGatewayError, RepositoryError,
    TourRepository, UserRepository,
};
use super::user::is_absolute_url;
use super::{
    Actor, Booking, BookingDraft, BookingId, BookingWithTour, Capability, CheckoutLineItem,
    CheckoutRequest, CheckoutSession, Error, PaymentEvent, RecordedBooking, Tour, TourId, User,
    UserId,
};

/// Frontend locations the provider redirects to after checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutUrls {
    frontend_url: String,
}

impl CheckoutUrls {
    pub fn new(frontend_url: impl Into<String>) -> Self {
        let mut frontend_url = frontend_url.into();
        while frontend_url.ends_with('/') {
            frontend_url.pop();
        }
        Self { frontend_url }
    }

    /// `{CHECKOUT_SESSION_ID}` is substituted by the provider.
    pub fn success_url(&self) -> String {
        format!(
            "{}/dashboard?checkout=success&session_id={{CHECKOUT_SESSION_ID}}",
            self.frontend_url
        )
    }

    pub fn cancel_url(&self, tour_id: TourId) -> String {
        format!("{}/tour/{tour_id}", self.frontend_url)
    }
}

fn map_payment_error(error: PaymentGatewayError) -> Error {
    warn!(kind = error.kind(), %error, "payment provider call failed");
    match error {
        PaymentGatewayError::Transport { .. } => {
            Error::service_unavailable("Payment provider is currently unavailable")
        }
        PaymentGatewayError::Rejected { status, message } => {
            Error::internal(format!("payment provider rejected request ({status}): {message}"))
        }
        PaymentGatewayError::InvalidSignature { .. } => {
            Error::unauthenticated("Webhook signature verification failed")
        }
        PaymentGatewayError::MalformedEvent { message } => {
            Error::invalid_request(format!("Malformed webhook event: {message}"))
        }
    }
}

#[derive(Clone)]
pub struct BookingService {
    crud: CrudService<Booking, dyn BookingRepository>,
    tours: Arc<dyn TourRepository>,
    users: Arc<dyn UserRepository>,
    payments: Arc<dyn PaymentGateway>,
    urls: CheckoutUrls,
    clock: Arc<dyn Clock>,
}

impl BookingService {
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        tours: Arc<dyn TourRepository>,
        users: Arc<dyn UserRepository>,
        payments: Arc<dyn PaymentGateway>,
        urls: CheckoutUrls,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            crud: CrudService::new(bookings),
            tours,
            users,
            payments,
            urls,
            clock,
        }
    }

    fn bookings(&self) -> &Arc<dyn BookingRepository> {
        self.crud.repository()
    }

    async fn existing_booking(
        &self,
        user_id: UserId,
        tour_id: TourId,
    ) -> Result<Option<Booking>, Error> {
        self.bookings()
            .find_for_user_and_tour(user_id, tour_id)
            .await
            .map_err(map_repository_error::<Booking>)
    }

    async fn load_tour(&self, id: TourId) -> Result<Tour, Error> {
        self.tours
            .find_by_id(id)
            .await
            .map_err(map_repository_error::<Tour>)?
            .ok_or_else(not_found::<Tour>)
    }

    async fn load_user(&self, id: UserId) -> Result<User, Error> {
        self.users
            .find_by_id(id)
            .await
            .map_err(map_repository_error::<User>)?
            .ok_or_else(not_found::<User>)
    }

    /// Ask the provider for a hosted checkout for one tour.
    ///
    /// An existing booking short-circuits before the provider is contacted.
    pub async fn create_checkout_session(
        &self,
        actor: &Actor,
        tour_id: TourId,
    ) -> Result<CheckoutSession, Error> {
        actor.require(Capability::BookTours)?;
        if self.existing_booking(actor.id, tour_id).await?.is_some() {
            return Err(Error::already_booked());
        }
        let tour = self.load_tour(tour_id).await?;
        let user = self.load_user(actor.id).await?;
        let image = Some(tour.details.image_cover.clone()).filter(|url| is_absolute_url(url));
        let request = CheckoutRequest {
            tour_id,
            user_id: user.id,
            customer_email: user.email.as_str().to_owned(),
            line_item: CheckoutLineItem {
                name: format!("{} Tour", tour.details.name),
                description: tour.details.summary.clone(),
                image,
                unit_amount: tour.details.price,
                currency: "usd".to_owned(),
                quantity: 1,
            },
            success_url: self.urls.success_url(),
            cancel_url: self.urls.cancel_url(tour_id),
        };
        let session = self
            .payments
            .create_checkout_session(&request)
            .await
            .map_err(map_payment_error)?;
        info!(%tour_id, user_id = %user.id, session_id = %session.id, "checkout session created");
        Ok(session)
    }

    /// Persist a paid booking, returning the stored one if it already exists.
    pub async fn record_booking(
        &self,
        tour_id: TourId,
        user_id: UserId,
        price: u32,
    ) -> Result<RecordedBooking, Error> {
        if let Some(booking) = self.existing_booking(user_id, tour_id).await? {
            return Ok(RecordedBooking {
                booking,
                created: false,
            });
        }
        let booking = Booking::new(tour_id, user_id, price, true, self.clock.utc());
        match self.bookings().insert(&booking).await {
            Ok(()) => {
                info!(booking_id = %booking.id, %tour_id, %user_id, "booking recorded");
                Ok(RecordedBooking {
                    booking,
                    created: true,
                })
            }
            Err(RepositoryError::DuplicateKey { .. }) => {
                let booking = self
                    .existing_booking(user_id, tour_id)
                    .await?
                    .ok_or_else(|| Error::internal("booking vanished after unique conflict"))?;
                Ok(RecordedBooking {
                    booking,
                    created: false,
                })
            }
            Err(error) => Err(map_repository_error::<Booking>(error)),
        }
    }

    /// Verify a provider delivery and record the booking it confirms.
    ///
    /// Returns `None` for event types that need no action.
    pub async fn handle_payment_event(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<Option<RecordedBooking>, Error> {
        let event = self
            .payments
            .verify_event(payload, signature, self.clock.utc())
            .map_err(map_payment_error)?;
        match event {
            PaymentEvent::CheckoutCompleted {
                session_id,
                tour_id,
                user_id,
                amount_total,
            } => {
                info!(%session_id, %tour_id, %user_id, "checkout completed");
                self.record_booking(tour_id, user_id, amount_total)
                    .await
                    .map(Some)
            }
            PaymentEvent::Ignored { kind } => {
                info!(%kind, "ignoring payment event");
                Ok(None)
            }
        }
    }

    /// The caller's bookings joined with tour summaries.
    pub async fn list_my_bookings(&self, actor: &Actor) -> Result<Vec<BookingWithTour>, Error> {
        actor.require(Capability::BookTours)?;
        self.bookings()
            .list_for_user(actor.id)
            .await
            .map_err(map_repository_error::<Booking>)
    }

    pub async fn get_booking(&self, actor: &Actor, id: BookingId) -> Result<Booking, Error> {
        actor.require(Capability::ManageBookings)?;
        self.crud.get_one(id).await
    }

    pub async fn list_bookings(
        &self,
        actor: &Actor,
        page: PageRequest,
    ) -> Result<Vec<Booking>, Error> {
        actor.require(Capability::ManageBookings)?;
        self.crud.get_all(page).await
    }

    /// Create a booking manually; `paid` defaults to `true`.
    ///
    /// Booking managers are the only roles allowed to set `paid`, so the
    /// capability check covers the payment flag as well.
    pub async fn create_booking(
        &self,
        actor: &Actor,
        draft: BookingDraft,
    ) -> Result<Booking, Error> {
        actor.require(Capability::ManageBookings)?;
        let tour_id = draft
            .tour_id
            .ok_or_else(|| Error::invalid_request("Booking must belong to a Tour!"))?;
        let user_id = draft
            .user_id
            .ok_or_else(|| Error::invalid_request("Booking must belong to a User!"))?;
        let price = draft
            .price
            .ok_or_else(|| Error::invalid_request("Booking must have a price."))?;
        let paid = draft.paid.unwrap_or(true);
        let booking = Booking::new(tour_id, user_id, price, paid, self.clock.utc());
        self.crud.create(booking).await
    }

    /// Edit a booking, keeping stored values for absent fields.
    pub async fn update_booking(
        &self,
        actor: &Actor,
        id: BookingId,
        draft: BookingDraft,
    ) -> Result<Booking, Error> {
        actor.require(Capability::ManageBookings)?;
        let mut booking = self.crud.get_one(id).await?;
        booking.tour_id = draft.tour_id.unwrap_or(booking.tour_id);
        booking.user_id = draft.user_id.unwrap_or(booking.user_id);
        booking.price = draft.price.unwrap_or(booking.price);
        booking.paid = draft.paid.unwrap_or(booking.paid);
        self.crud.update(booking).await
    }

    pub async fn delete_booking(&self, actor: &Actor, id: BookingId) -> Result<(), Error> {
        actor.require(Capability::ManageBookings)?;
        self.crud.delete(id).await
    }
}

#[cfg(test)]
#[path = "booking_service_tests.rs"]
mod tests;
