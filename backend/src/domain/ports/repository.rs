//! Generic persistence port shared by every aggregate.
//!
//! [`Repository<E>`] covers the uniform get-one/get-all/create/update/delete
//! operations. Aggregate-specific ports extend it with their extra queries.

use std::fmt;

use async_trait::async_trait;

use crate::domain::{Booking, BookingId, Review, ReviewId, Tour, TourId, User, UserId};

use super::define_port_error;

/// Default and maximum page size for list queries.
pub const MAX_PAGE_LIMIT: u32 = 100;

define_port_error! {
    /// Persistence errors raised by repository adapters.
    pub enum RepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "repository query failed: {message}",
        /// A unique index rejected the write.
        DuplicateKey { constraint: String } => "unique constraint violated: {constraint}",
    }
}

/// Aggregate stored through [`Repository`].
pub trait Entity: Clone + Send + Sync + 'static {
    type Id: Copy + Eq + fmt::Display + Send + Sync + 'static;

    /// Lowercase noun used in user-facing messages.
    const LABEL: &'static str;
    /// Message returned when the aggregate's unique index rejects a write.
    const DUPLICATE_MESSAGE: &'static str;

    fn id(&self) -> Self::Id;

    /// Field constraints re-checked on every create and update.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

impl Entity for User {
    type Id = UserId;
    const LABEL: &'static str = "user";
    const DUPLICATE_MESSAGE: &'static str = "Email address is already registered";

    fn id(&self) -> UserId {
        self.id
    }
}

impl Entity for Tour {
    type Id = TourId;
    const LABEL: &'static str = "tour";
    const DUPLICATE_MESSAGE: &'static str = "A tour with this name already exists";

    fn id(&self) -> TourId {
        self.id
    }

    fn validate(&self) -> Result<(), String> {
        self.details.validate().map_err(|err| err.to_string())
    }
}

impl Entity for Booking {
    type Id = BookingId;
    const LABEL: &'static str = "booking";
    const DUPLICATE_MESSAGE: &'static str = "This user has already booked this tour";

    fn id(&self) -> BookingId {
        self.id
    }
}

impl Entity for Review {
    type Id = ReviewId;
    const LABEL: &'static str = "review";
    const DUPLICATE_MESSAGE: &'static str = "You have already reviewed this tour";

    fn id(&self) -> ReviewId {
        self.id
    }
}

/// One-based page selection for list queries.
///
/// # Examples
/// ```
/// use tourbook::domain::ports::PageRequest;
///
/// let page = PageRequest::new(Some(3), Some(500));
/// assert_eq!(page.limit(), 100);
/// assert_eq!(page.offset(), 200);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

impl PageRequest {
    /// Clamp raw query values: page at least 1, limit within `1..=100`.
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(MAX_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT),
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }

    /// The following page.
    pub fn next(&self) -> Self {
        Self {
            page: self.page.saturating_add(1),
            limit: self.limit,
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Uniform CRUD persistence for an aggregate.
///
/// `list` returns newest first. `update` and `delete` report whether a
/// stored row was affected.
#[async_trait]
pub trait Repository<E: Entity>: Send + Sync {
    async fn find_by_id(&self, id: E::Id) -> Result<Option<E>, RepositoryError>;

    async fn list(&self, page: PageRequest) -> Result<Vec<E>, RepositoryError>;

    async fn insert(&self, entity: &E) -> Result<(), RepositoryError>;

    async fn update(&self, entity: &E) -> Result<bool, RepositoryError>;

    async fn delete(&self, id: E::Id) -> Result<bool, RepositoryError>;
}
