//! PostgreSQL persistence adapters using Diesel.
//!
//! Repositories translate between row structs (`models`) and domain
//! aggregates; no business rules live here. Rows and the `schema` module are
//! private to this layer. All Diesel and pool failures are mapped to
//! [`RepositoryError`](crate::domain::ports::RepositoryError).
//!
//! ```no_run
//! # async fn connect() -> Result<(), tourbook::outbound::persistence::PoolError> {
//! use tourbook::outbound::persistence::{DbPool, DieselTourRepository, PoolConfig, run_migrations};
//!
//! let url = "postgres://localhost/tourbook";
//! run_migrations(url).await?;
//! let pool = DbPool::new(PoolConfig::new(url)).await?;
//! let tours = DieselTourRepository::new(pool);
//! # let _ = tours;
//! # Ok(())
//! # }
//! ```

mod diesel_booking_repository;
mod diesel_error_mapping;
mod diesel_review_repository;
mod diesel_tour_repository;
mod diesel_user_repository;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_booking_repository::DieselBookingRepository;
pub use diesel_review_repository::DieselReviewRepository;
pub use diesel_tour_repository::DieselTourRepository;
pub use diesel_user_repository::DieselUserRepository;
pub use migrations::run_migrations;
pub use pool::{DbPool, PoolConfig, PoolError};
