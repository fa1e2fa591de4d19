//! Port abstraction for booking persistence.
use async_trait::async_trait;

use crate::domain::{Booking, BookingWithTour, TourId, UserId};

use super::{Repository, RepositoryError};

#[async_trait]
pub trait BookingRepository: Repository<Booking> {
    /// The booking for a `(user, tour)` pair, if any.
    async fn find_for_user_and_tour(
        &self,
        user_id: UserId,
        tour_id: TourId,
    ) -> Result<Option<Booking>, RepositoryError>;

    /// Bookings made by `user_id`, newest first, joined with their tours.
    async fn list_for_user(&self, user_id: UserId)
    -> Result<Vec<BookingWithTour>, RepositoryError>;
}
