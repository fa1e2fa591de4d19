//! PostgreSQL-backed `ReviewRepository`.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{PageRequest, Repository, RepositoryError, ReviewRepository};
use crate::domain::{Review, ReviewId, ReviewWithTour, TourId, TourSummary, UserId};

use super::diesel_error_mapping::{map_diesel_error, map_pool_error, offset};
use super::models::{ReviewRow, TourSummaryRow};
use super::pool::DbPool;
use super::schema::{reviews, tours};

/// Diesel-backed implementation of the [`ReviewRepository`] port.
#[derive(Clone)]
pub struct DieselReviewRepository {
    pool: DbPool,
}

impl DieselReviewRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn decode(rows: Vec<ReviewRow>) -> Result<Vec<Review>, RepositoryError> {
    rows.into_iter().map(Review::try_from).collect()
}

#[async_trait]
impl Repository<Review> for DieselReviewRepository {
    async fn find_by_id(&self, id: ReviewId) -> Result<Option<Review>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        reviews::table
            .find(id.as_uuid())
            .select(ReviewRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?
            .map(Review::try_from)
            .transpose()
    }

    async fn list(&self, page: PageRequest) -> Result<Vec<Review>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows = reviews::table
            .order((reviews::created_at.desc(), reviews::id.desc()))
            .limit(i64::from(page.limit()))
            .offset(offset(page))
            .select(ReviewRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        decode(rows)
    }

    async fn insert(&self, review: &Review) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(reviews::table)
            .values(&ReviewRow::from(review))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(())
    }

    async fn update(&self, review: &Review) -> Result<bool, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let updated = diesel::update(reviews::table.find(review.id.as_uuid()))
            .set(&ReviewRow::from(review))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(updated > 0)
    }

    async fn delete(&self, id: ReviewId) -> Result<bool, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let deleted = diesel::delete(reviews::table.find(id.as_uuid()))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(deleted > 0)
    }
}

#[async_trait]
impl ReviewRepository for DieselReviewRepository {
    async fn list_for_tour(&self, tour_id: TourId) -> Result<Vec<Review>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows = reviews::table
            .filter(reviews::tour_id.eq(tour_id.as_uuid()))
            .order((reviews::created_at.desc(), reviews::id.desc()))
            .select(ReviewRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        decode(rows)
    }

    async fn list_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ReviewWithTour>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<(ReviewRow, Option<TourSummaryRow>)> = reviews::table
            .left_join(tours::table.on(tours::id.eq(reviews::tour_id)))
            .filter(reviews::user_id.eq(user_id.as_uuid()))
            .order((reviews::created_at.desc(), reviews::id.desc()))
            .select((
                ReviewRow::as_select(),
                Option::<TourSummaryRow>::as_select(),
            ))
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        rows.into_iter()
            .map(|(review, tour)| {
                Ok(ReviewWithTour {
                    review: Review::try_from(review)?,
                    tour: tour.map(TourSummary::try_from).transpose()?,
                })
            })
            .collect()
    }
}
