//! PostgreSQL-backed `TourRepository`.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::domain::ports::{PageRequest, Repository, RepositoryError, TourRepository};
use crate::domain::{RatingSummary, Tour, TourId, TourSummary};

use super::diesel_error_mapping::{map_diesel_error, map_pool_error, offset};
use super::models::{TourRecord, TourRow, TourSummaryRow};
use super::pool::DbPool;
use super::schema::tours;

/// Diesel-backed implementation of the [`TourRepository`] port.
#[derive(Clone)]
pub struct DieselTourRepository {
    pool: DbPool,
}

impl DieselTourRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository<Tour> for DieselTourRepository {
    async fn find_by_id(&self, id: TourId) -> Result<Option<Tour>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        tours::table
            .find(id.as_uuid())
            .select(TourRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?
            .map(Tour::try_from)
            .transpose()
    }

    async fn list(&self, page: PageRequest) -> Result<Vec<Tour>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows = tours::table
            .order((tours::created_at.desc(), tours::id.desc()))
            .limit(i64::from(page.limit()))
            .offset(offset(page))
            .select(TourRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        rows.into_iter().map(Tour::try_from).collect()
    }

    async fn insert(&self, tour: &Tour) -> Result<(), RepositoryError> {
        let record = TourRecord::try_from(tour)?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(tours::table)
            .values(&record)
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(())
    }

    async fn update(&self, tour: &Tour) -> Result<bool, RepositoryError> {
        let record = TourRecord::try_from(tour)?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let updated = diesel::update(tours::table.find(tour.id.as_uuid()))
            .set(&record)
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(updated > 0)
    }

    async fn delete(&self, id: TourId) -> Result<bool, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let deleted = diesel::delete(tours::table.find(id.as_uuid()))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(deleted > 0)
    }
}

#[async_trait]
impl TourRepository for DieselTourRepository {
    async fn set_ratings(
        &self,
        id: TourId,
        ratings: RatingSummary,
    ) -> Result<(), RepositoryError> {
        let quantity = i32::try_from(ratings.quantity)
            .map_err(|_| RepositoryError::query("ratings_quantity exceeds column range"))?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::update(tours::table.find(id.as_uuid()))
            .set((
                tours::ratings_average.eq(ratings.average),
                tours::ratings_quantity.eq(quantity),
            ))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(())
    }

    async fn summaries(&self, ids: &[TourId]) -> Result<Vec<TourSummary>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let uuids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows = tours::table
            .filter(tours::id.eq_any(uuids))
            .select(TourSummaryRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        rows.into_iter().map(TourSummary::try_from).collect()
    }
}
