//! Port abstraction for the tour catalogue.
use async_trait::async_trait;

use crate::domain::{RatingSummary, Tour, TourId, TourSummary};

use super::{Repository, RepositoryError};

#[async_trait]
pub trait TourRepository: Repository<Tour> {
    /// Overwrite the stored rating aggregate.
    async fn set_ratings(&self, id: TourId, ratings: RatingSummary)
    -> Result<(), RepositoryError>;

    /// Summaries for the given tours; unknown ids are skipped.
    async fn summaries(&self, ids: &[TourId]) -> Result<Vec<TourSummary>, RepositoryError>;
}
