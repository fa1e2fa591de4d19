//! Internal Diesel row structs and their domain conversions.
//!
//! Rows never leave the persistence layer. Decoding a row that breaks a
//! domain invariant surfaces as a query error rather than a panic.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::ports::RepositoryError;
use crate::domain::{
    Booking, BookingId, Difficulty, EmailAddress, Location, PasswordHash, Rating, RatingSummary,
    Review, ReviewId, ReviewText, Role, Tour, TourDetails, TourId, TourSummary, User, UserId,
    UserName,
};

use super::schema::{bookings, reviews, tours, users};

fn corrupt(table: &str, detail: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::query(format!("corrupt {table} row: {detail}"))
}

fn to_u32(table: &str, column: &str, value: impl TryInto<u32>) -> Result<u32, RepositoryError> {
    value
        .try_into()
        .map_err(|_| corrupt(table, format_args!("{column} out of range")))
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub active: bool,
    pub photo: String,
    pub password_hash: String,
    pub password_changed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: UserId::from_uuid(row.id),
            name: UserName::new(&row.name).map_err(|err| corrupt("users", err))?,
            email: EmailAddress::new(&row.email).map_err(|err| corrupt("users", err))?,
            role: row
                .role
                .parse::<Role>()
                .map_err(|err| corrupt("users", err))?,
            active: row.active,
            photo: row.photo,
            password_hash: PasswordHash::from_encoded(row.password_hash),
            password_changed_at: row.password_changed_at,
            created_at: row.created_at,
        })
    }
}

/// Full user row for inserts and whole-record updates.
#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = users)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct UserRecord<'a> {
    pub id: Uuid,
    pub name: &'a str,
    pub email: &'a str,
    pub role: &'a str,
    pub active: bool,
    pub photo: &'a str,
    pub password_hash: &'a str,
    pub password_changed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl<'a> From<&'a User> for UserRecord<'a> {
    fn from(user: &'a User) -> Self {
        Self {
            id: *user.id.as_uuid(),
            name: user.name.as_str(),
            email: user.email.as_str(),
            role: user.role.as_str(),
            active: user.active,
            photo: &user.photo,
            password_hash: user.password_hash.as_str(),
            password_changed_at: user.password_changed_at,
            created_at: user.created_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Tours
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = tours)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct TourRow {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub duration_days: i32,
    pub max_group_size: i32,
    pub difficulty: String,
    pub price: i64,
    pub price_discount: Option<i64>,
    pub summary: String,
    pub description: Option<String>,
    pub image_cover: String,
    pub images: Vec<String>,
    pub start_dates: Vec<DateTime<Utc>>,
    pub start_location: Option<serde_json::Value>,
    pub locations: serde_json::Value,
    pub guides: Vec<Uuid>,
    pub ratings_average: f64,
    pub ratings_quantity: i32,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<TourRow> for Tour {
    type Error = RepositoryError;

    fn try_from(row: TourRow) -> Result<Self, Self::Error> {
        let start_location = row
            .start_location
            .map(serde_json::from_value::<Location>)
            .transpose()
            .map_err(|err| corrupt("tours", err))?;
        let locations: Vec<Location> =
            serde_json::from_value(row.locations).map_err(|err| corrupt("tours", err))?;
        let details = TourDetails {
            name: row.name,
            duration_days: to_u32("tours", "duration_days", row.duration_days)?,
            max_group_size: to_u32("tours", "max_group_size", row.max_group_size)?,
            difficulty: row
                .difficulty
                .parse::<Difficulty>()
                .map_err(|err| corrupt("tours", err))?,
            price: to_u32("tours", "price", row.price)?,
            price_discount: row
                .price_discount
                .map(|discount| to_u32("tours", "price_discount", discount))
                .transpose()?,
            summary: row.summary,
            description: row.description,
            image_cover: row.image_cover,
            images: row.images,
            start_dates: row.start_dates,
            start_location,
            locations,
            guides: row.guides.into_iter().map(UserId::from_uuid).collect(),
        };
        Ok(Self {
            id: TourId::from_uuid(row.id),
            slug: row.slug,
            details,
            ratings: RatingSummary {
                average: row.ratings_average,
                quantity: to_u32("tours", "ratings_quantity", row.ratings_quantity)?,
            },
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = tours)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct TourRecord<'a> {
    pub id: Uuid,
    pub name: &'a str,
    pub slug: &'a str,
    pub duration_days: i32,
    pub max_group_size: i32,
    pub difficulty: &'a str,
    pub price: i64,
    pub price_discount: Option<i64>,
    pub summary: &'a str,
    pub description: Option<&'a str>,
    pub image_cover: &'a str,
    pub images: Vec<String>,
    pub start_dates: Vec<DateTime<Utc>>,
    pub start_location: Option<serde_json::Value>,
    pub locations: serde_json::Value,
    pub guides: Vec<Uuid>,
    pub ratings_average: f64,
    pub ratings_quantity: i32,
    pub created_at: DateTime<Utc>,
}

fn to_i32(column: &str, value: u32) -> Result<i32, RepositoryError> {
    i32::try_from(value)
        .map_err(|_| RepositoryError::query(format!("{column} exceeds column range")))
}

impl<'a> TryFrom<&'a Tour> for TourRecord<'a> {
    type Error = RepositoryError;

    fn try_from(tour: &'a Tour) -> Result<Self, Self::Error> {
        let details = &tour.details;
        let encode = |err: serde_json::Error| RepositoryError::query(err.to_string());
        Ok(Self {
            id: *tour.id.as_uuid(),
            name: &details.name,
            slug: &tour.slug,
            duration_days: to_i32("duration_days", details.duration_days)?,
            max_group_size: to_i32("max_group_size", details.max_group_size)?,
            difficulty: details.difficulty.as_str(),
            price: i64::from(details.price),
            price_discount: details.price_discount.map(i64::from),
            summary: &details.summary,
            description: details.description.as_deref(),
            image_cover: &details.image_cover,
            images: details.images.clone(),
            start_dates: details.start_dates.clone(),
            start_location: details
                .start_location
                .as_ref()
                .map(serde_json::to_value)
                .transpose()
                .map_err(encode)?,
            locations: serde_json::to_value(&details.locations).map_err(encode)?,
            guides: details.guides.iter().map(|id| *id.as_uuid()).collect(),
            ratings_average: tour.ratings.average,
            ratings_quantity: to_i32("ratings_quantity", tour.ratings.quantity)?,
            created_at: tour.created_at,
        })
    }
}

/// Columns joined onto bookings and reviews.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = tours)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct TourSummaryRow {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub image_cover: String,
    pub start_dates: Vec<DateTime<Utc>>,
    pub duration_days: i32,
    pub difficulty: String,
    pub price: i64,
}

impl TryFrom<TourSummaryRow> for TourSummary {
    type Error = RepositoryError;

    fn try_from(row: TourSummaryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: TourId::from_uuid(row.id),
            name: row.name,
            slug: row.slug,
            image_cover: row.image_cover,
            start_dates: row.start_dates,
            duration_days: to_u32("tours", "duration_days", row.duration_days)?,
            difficulty: row
                .difficulty
                .parse::<Difficulty>()
                .map_err(|err| corrupt("tours", err))?,
            price: to_u32("tours", "price", row.price)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Bookings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = bookings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct BookingRow {
    pub id: Uuid,
    pub tour_id: Uuid,
    pub user_id: Uuid,
    pub price: i64,
    pub paid: bool,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = RepositoryError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: BookingId::from_uuid(row.id),
            tour_id: TourId::from_uuid(row.tour_id),
            user_id: UserId::from_uuid(row.user_id),
            price: to_u32("bookings", "price", row.price)?,
            paid: row.paid,
            created_at: row.created_at,
        })
    }
}

impl From<&Booking> for BookingRow {
    fn from(booking: &Booking) -> Self {
        Self {
            id: *booking.id.as_uuid(),
            tour_id: *booking.tour_id.as_uuid(),
            user_id: *booking.user_id.as_uuid(),
            price: i64::from(booking.price),
            paid: booking.paid,
            created_at: booking.created_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Reviews
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = reviews)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ReviewRow {
    pub id: Uuid,
    pub tour_id: Uuid,
    pub user_id: Uuid,
    pub rating: i16,
    pub review: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ReviewRow> for Review {
    type Error = RepositoryError;

    fn try_from(row: ReviewRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ReviewId::from_uuid(row.id),
            tour_id: TourId::from_uuid(row.tour_id),
            user_id: UserId::from_uuid(row.user_id),
            rating: Rating::new(i64::from(row.rating)).map_err(|err| corrupt("reviews", err))?,
            text: ReviewText::new(&row.review).map_err(|err| corrupt("reviews", err))?,
            created_at: row.created_at,
        })
    }
}

impl From<&Review> for ReviewRow {
    fn from(review: &Review) -> Self {
        Self {
            id: *review.id.as_uuid(),
            tour_id: *review.tour_id.as_uuid(),
            user_id: *review.user_id.as_uuid(),
            rating: i16::from(review.rating.get()),
            review: review.text.as_str().to_owned(),
            created_at: review.created_at,
        }
    }
}
