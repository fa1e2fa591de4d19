//! Review submission and moderation.
//!
//! Duplicate reviews are caught by the unique `(user, tour)` index alone.
//! Every successful write recomputes the reviewed tour's rating aggregate.

use std::sync::Arc;

use mockable::Clock;
use tracing::info;

use super::crud::{CrudService, map_repository_error, not_found};
use super::ports::{PageRequest, ReviewRepository, TourRepository};
use super::{
    Actor, Capability, Error, Rating, RatingSummary, Review, ReviewId, ReviewPatch, ReviewText,
    ReviewWithTour, Tour, TourId,
};

#[derive(Clone)]
pub struct ReviewService {
    crud: CrudService<Review, dyn ReviewRepository>,
    tours: Arc<dyn TourRepository>,
    clock: Arc<dyn Clock>,
}

impl ReviewService {
    pub fn new(
        reviews: Arc<dyn ReviewRepository>,
        tours: Arc<dyn TourRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            crud: CrudService::new(reviews),
            tours,
            clock,
        }
    }

    fn reviews(&self) -> &Arc<dyn ReviewRepository> {
        self.crud.repository()
    }

    /// Recompute and store the tour's rating aggregate.
    async fn refresh_ratings(&self, tour_id: TourId) -> Result<(), Error> {
        let reviews = self
            .reviews()
            .list_for_tour(tour_id)
            .await
            .map_err(map_repository_error::<Review>)?;
        let summary = RatingSummary::from_ratings(reviews.iter().map(|r| r.rating.get()));
        self.tours
            .set_ratings(tour_id, summary)
            .await
            .map_err(map_repository_error::<Tour>)?;
        Ok(())
    }

    fn ensure_author_or_moderator(actor: &Actor, review: &Review) -> Result<(), Error> {
        if review.user_id == actor.id || actor.can(Capability::ModerateReviews) {
            Ok(())
        } else {
            Err(Error::forbidden("You can only change your own reviews"))
        }
    }

    /// Submit a review of `tour_id` as the caller.
    pub async fn create_review(
        &self,
        actor: &Actor,
        tour_id: TourId,
        rating: Rating,
        text: ReviewText,
    ) -> Result<Review, Error> {
        actor.require(Capability::WriteReviews)?;
        let tour_exists = self
            .tours
            .find_by_id(tour_id)
            .await
            .map_err(map_repository_error::<Tour>)?
            .is_some();
        if !tour_exists {
            return Err(not_found::<Tour>());
        }
        let review = Review::new(tour_id, actor.id, rating, text, self.clock.utc());
        let review = self.crud.create(review).await?;
        info!(review_id = %review.id, %tour_id, user_id = %actor.id, "review created");
        self.refresh_ratings(tour_id).await?;
        Ok(review)
    }

    pub async fn get_review(&self, id: ReviewId) -> Result<Review, Error> {
        self.crud.get_one(id).await
    }

    /// All reviews, or those of one tour when `tour_id` is given.
    pub async fn list_reviews(
        &self,
        tour_id: Option<TourId>,
        page: PageRequest,
    ) -> Result<Vec<Review>, Error> {
        match tour_id {
            Some(tour_id) => self
                .reviews()
                .list_for_tour(tour_id)
                .await
                .map(|reviews| {
                    reviews
                        .into_iter()
                        .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
                        .take(page.limit() as usize)
                        .collect()
                })
                .map_err(map_repository_error::<Review>),
            None => self.crud.get_all(page).await,
        }
    }

    /// The caller's reviews, newest first, with tour names.
    pub async fn list_my_reviews(&self, actor: &Actor) -> Result<Vec<ReviewWithTour>, Error> {
        self.reviews()
            .list_for_user(actor.id)
            .await
            .map_err(map_repository_error::<Review>)
    }

    pub async fn update_review(
        &self,
        actor: &Actor,
        id: ReviewId,
        patch: ReviewPatch,
    ) -> Result<Review, Error> {
        let mut review = self.crud.get_one(id).await?;
        Self::ensure_author_or_moderator(actor, &review)?;
        if let Some(rating) = patch.rating {
            review.rating = rating;
        }
        if let Some(text) = patch.text {
            review.text = text;
        }
        let review = self.crud.update(review).await?;
        self.refresh_ratings(review.tour_id).await?;
        Ok(review)
    }

    pub async fn delete_review(&self, actor: &Actor, id: ReviewId) -> Result<(), Error> {
        let review = self.crud.get_one(id).await?;
        Self::ensure_author_or_moderator(actor, &review)?;
        self.crud.delete(id).await?;
        info!(review_id = %id, deleted_by = %actor.id, "review deleted");
        self.refresh_ratings(review.tour_id).await
    }
}

#[cfg(test)]
#[path = "review_service_tests.rs"]
mod tests;
