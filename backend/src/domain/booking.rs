//! Bookings tie a user to a tour they paid for.

use chrono::{DateTime, Utc};

use super::{BookingId, TourId, TourSummary, UserId};

/// A recorded booking.
///
/// ## Invariants
/// - At most one booking exists per `(user_id, tour_id)`.
/// - `price` is in USD cents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Booking {
    pub id: BookingId,
    pub tour_id: TourId,
    pub user_id: UserId,
    pub price: u32,
    pub paid: bool,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    pub fn new(
        tour_id: TourId,
        user_id: UserId,
        price: u32,
        paid: bool,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: BookingId::random(),
            tour_id,
            user_id,
            price,
            paid,
            created_at,
        }
    }
}

/// Booking joined with its tour; `tour` is `None` once the tour is gone.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingWithTour {
    pub booking: Booking,
    pub tour: Option<TourSummary>,
}

/// Outcome of recording a confirmed payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedBooking {
    pub booking: Booking,
    /// `false` when an existing booking was returned.
    pub created: bool,
}

/// Input for checkout session creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub tour_id: TourId,
    pub user_id: UserId,
    pub customer_email: String,
    pub line_item: CheckoutLineItem,
    pub success_url: String,
    pub cancel_url: String,
}

/// The single line item charged at checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutLineItem {
    pub name: String,
    pub description: String,
    pub image: Option<String>,
    /// USD cents.
    pub unit_amount: u32,
    pub currency: String,
    pub quantity: u32,
}

/// Hosted payment session returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// Verified provider notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentEvent {
    CheckoutCompleted {
        session_id: String,
        tour_id: TourId,
        user_id: UserId,
        amount_total: u32,
    },
    /// Any event type the service does not act on.
    Ignored { kind: String },
}

/// Admin-side booking fields. Absent fields keep stored values on update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingDraft {
    pub tour_id: Option<TourId>,
    pub user_id: Option<UserId>,
    pub price: Option<u32>,
    pub paid: Option<bool>,
}
