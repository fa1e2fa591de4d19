//! Tour reviews and their validated rating.

use std::fmt;

use chrono::{DateTime, Utc};

use super::{ReviewId, TourId, TourSummary, UserId};

/// Label shown when a reviewed tour has been removed.
pub const MISSING_TOUR_LABEL: &str = "Tour no longer available";

/// Validation failures for review fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewValidationError {
    RatingOutOfRange { value: i64 },
    EmptyText,
}

impl fmt::Display for ReviewValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RatingOutOfRange { value } => {
                write!(f, "Rating must be between 1 and 5, got {value}")
            }
            Self::EmptyText => write!(f, "Review can not be empty!"),
        }
    }
}

impl std::error::Error for ReviewValidationError {}

/// Star rating in `1..=5`.
///
/// # Examples
/// ```
/// use tourbook::domain::Rating;
///
/// assert_eq!(Rating::new(4).unwrap().get(), 4);
/// assert!(Rating::new(6).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Rating(u8);

impl Rating {
    pub fn new(value: i64) -> Result<Self, ReviewValidationError> {
        u8::try_from(value)
            .ok()
            .filter(|v| (1..=5).contains(v))
            .map(Self)
            .ok_or(ReviewValidationError::RatingOutOfRange { value })
    }

    pub const fn get(self) -> u8 {
        self.0
    }
}

/// Non-empty review body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewText(String);

impl ReviewText {
    pub fn new(value: impl AsRef<str>) -> Result<Self, ReviewValidationError> {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ReviewValidationError::EmptyText);
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Persisted review.
///
/// ## Invariants
/// - At most one review exists per `(user_id, tour_id)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Review {
    pub id: ReviewId,
    pub tour_id: TourId,
    pub user_id: UserId,
    pub rating: Rating,
    pub text: ReviewText,
    pub created_at: DateTime<Utc>,
}

impl Review {
    pub fn new(
        tour_id: TourId,
        user_id: UserId,
        rating: Rating,
        text: ReviewText,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ReviewId::random(),
            tour_id,
            user_id,
            rating,
            text,
            created_at,
        }
    }
}

/// Review joined with its tour for "my reviews".
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewWithTour {
    pub review: Review,
    pub tour: Option<TourSummary>,
}

impl ReviewWithTour {
    /// Tour name, or [`MISSING_TOUR_LABEL`] when the tour is gone.
    pub fn tour_name(&self) -> &str {
        self.tour
            .as_ref()
            .map_or(MISSING_TOUR_LABEL, |tour| tour.name.as_str())
    }
}

/// Partial review update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewPatch {
    pub rating: Option<Rating>,
    pub text: Option<ReviewText>,
}
