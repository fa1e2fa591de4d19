//! PostgreSQL-backed `UserRepository`.
//!
//! Deleting a user clears `active`; every read filters on it so a
//! deactivated account behaves as missing while its email stays reserved.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{PageRequest, Repository, RepositoryError, UserRepository};
use crate::domain::{EmailAddress, User, UserId};

use super::diesel_error_mapping::{map_diesel_error, map_pool_error, offset};
use super::models::{UserRecord, UserRow};
use super::pool::DbPool;
use super::schema::users;

/// Diesel-backed implementation of the [`UserRepository`] port.
#[derive(Clone)]
pub struct DieselUserRepository {
    pool: DbPool,
}

impl DieselUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn decode(rows: Vec<UserRow>) -> Result<Vec<User>, RepositoryError> {
    rows.into_iter().map(User::try_from).collect()
}

#[async_trait]
impl Repository<User> for DieselUserRepository {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        users::table
            .filter(users::id.eq(id.as_uuid()))
            .filter(users::active.eq(true))
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?
            .map(User::try_from)
            .transpose()
    }

    async fn list(&self, page: PageRequest) -> Result<Vec<User>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows = users::table
            .filter(users::active.eq(true))
            .order((users::created_at.desc(), users::id.desc()))
            .limit(i64::from(page.limit()))
            .offset(offset(page))
            .select(UserRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        decode(rows)
    }

    async fn insert(&self, user: &User) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(users::table)
            .values(&UserRecord::from(user))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(())
    }

    async fn update(&self, user: &User) -> Result<bool, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let updated = diesel::update(
            users::table
                .filter(users::id.eq(user.id.as_uuid()))
                .filter(users::active.eq(true)),
        )
        .set(&UserRecord::from(user))
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error)?;
        Ok(updated > 0)
    }

    async fn delete(&self, id: UserId) -> Result<bool, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let deactivated = diesel::update(
            users::table
                .filter(users::id.eq(id.as_uuid()))
                .filter(users::active.eq(true)),
        )
        .set(users::active.eq(false))
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error)?;
        Ok(deactivated > 0)
    }
}

#[async_trait]
impl UserRepository for DieselUserRepository {
    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<User>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        users::table
            .filter(users::email.eq(email.as_str()))
            .filter(users::active.eq(true))
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?
            .map(User::try_from)
            .transpose()
    }
}
