//! PostgreSQL-backed `BookingRepository`.
//!
//! Bookings hold a plain tour reference; listings left-join the tour so a
//! booking of a deleted tour still appears, without its summary.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{BookingRepository, PageRequest, Repository, RepositoryError};
use crate::domain::{Booking, BookingId, BookingWithTour, TourId, TourSummary, UserId};

use super::diesel_error_mapping::{map_diesel_error, map_pool_error, offset};
use super::models::{BookingRow, TourSummaryRow};
use super::pool::DbPool;
use super::schema::{bookings, tours};

/// Diesel-backed implementation of the [`BookingRepository`] port.
#[derive(Clone)]
pub struct DieselBookingRepository {
    pool: DbPool,
}

impl DieselBookingRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository<Booking> for DieselBookingRepository {
    async fn find_by_id(&self, id: BookingId) -> Result<Option<Booking>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        bookings::table
            .find(id.as_uuid())
            .select(BookingRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?
            .map(Booking::try_from)
            .transpose()
    }

    async fn list(&self, page: PageRequest) -> Result<Vec<Booking>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows = bookings::table
            .order((bookings::created_at.desc(), bookings::id.desc()))
            .limit(i64::from(page.limit()))
            .offset(offset(page))
            .select(BookingRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        rows.into_iter().map(Booking::try_from).collect()
    }

    async fn insert(&self, booking: &Booking) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(bookings::table)
            .values(&BookingRow::from(booking))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(())
    }

    async fn update(&self, booking: &Booking) -> Result<bool, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let updated = diesel::update(bookings::table.find(booking.id.as_uuid()))
            .set(&BookingRow::from(booking))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(updated > 0)
    }

    async fn delete(&self, id: BookingId) -> Result<bool, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let deleted = diesel::delete(bookings::table.find(id.as_uuid()))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(deleted > 0)
    }
}

#[async_trait]
impl BookingRepository for DieselBookingRepository {
    async fn find_for_user_and_tour(
        &self,
        user_id: UserId,
        tour_id: TourId,
    ) -> Result<Option<Booking>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        bookings::table
            .filter(bookings::user_id.eq(user_id.as_uuid()))
            .filter(bookings::tour_id.eq(tour_id.as_uuid()))
            .select(BookingRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?
            .map(Booking::try_from)
            .transpose()
    }

    async fn list_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<BookingWithTour>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<(BookingRow, Option<TourSummaryRow>)> = bookings::table
            .left_join(tours::table.on(tours::id.eq(bookings::tour_id)))
            .filter(bookings::user_id.eq(user_id.as_uuid()))
            .order((bookings::created_at.desc(), bookings::id.desc()))
            .select((
                BookingRow::as_select(),
                Option::<TourSummaryRow>::as_select(),
            ))
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        rows.into_iter()
            .map(|(booking, tour)| {
                Ok(BookingWithTour {
                    booking: Booking::try_from(booking)?,
                    tour: tour.map(TourSummary::try_from).transpose()?,
                })
            })
            .collect()
    }
}
