//! Port abstraction for review persistence.
use async_trait::async_trait;

use crate::domain::{Review, ReviewWithTour, TourId, UserId};

use super::{Repository, RepositoryError};

#[async_trait]
pub trait ReviewRepository: Repository<Review> {
    /// Reviews of one tour, newest first.
    async fn list_for_tour(&self, tour_id: TourId) -> Result<Vec<Review>, RepositoryError>;

    /// Reviews written by `user_id`, newest first, joined with their tours.
    async fn list_for_user(&self, user_id: UserId)
    -> Result<Vec<ReviewWithTour>, RepositoryError>;
}
