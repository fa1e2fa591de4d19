//! Tour catalogue entities.
//!
//! A [`Tour`] is assembled from caller-supplied [`TourDetails`] plus fields
//! the system owns: the identifier, the slug derived from the name, and the
//! rating aggregate recomputed from reviews.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::slug::is_valid_slug;
use super::{TourId, UserId, slugify};

pub const TOUR_NAME_MIN: usize = 10;
pub const TOUR_NAME_MAX: usize = 40;
/// Rating average reported for tours without reviews.
pub const DEFAULT_RATING_AVERAGE: f64 = 4.5;

/// Validation failures for tour fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TourValidationError {
    NameLength { min: usize, max: usize },
    NameWithoutSlug,
    NonPositive { field: &'static str },
    DiscountNotBelowPrice,
    EmptySummary,
    EmptyImageCover,
    UnknownDifficulty(String),
    CoordinatesOutOfRange,
    EmptyLocationDescription,
}

impl fmt::Display for TourValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NameLength { min, max } => write!(
                f,
                "A tour name must have between {min} and {max} characters"
            ),
            Self::NameWithoutSlug => write!(f, "A tour name must contain letters or digits"),
            Self::NonPositive { field } => write!(f, "A tour {field} must be greater than zero"),
            Self::DiscountNotBelowPrice => {
                write!(f, "Discount price should be below regular price")
            }
            Self::EmptySummary => write!(f, "A tour must have a summary"),
            Self::EmptyImageCover => write!(f, "A tour must have a cover image"),
            Self::UnknownDifficulty(value) => write!(
                f,
                "difficulty '{value}' is not one of easy, medium, difficult"
            ),
            Self::CoordinatesOutOfRange => {
                write!(f, "coordinates must be [longitude, latitude] within range")
            }
            Self::EmptyLocationDescription => write!(f, "a location needs a description"),
        }
    }
}

impl std::error::Error for TourValidationError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Difficult,
}

impl Difficulty {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Difficult => "difficult",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = TourValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "difficult" => Ok(Self::Difficult),
            other => Err(TourValidationError::UnknownDifficulty(other.to_owned())),
        }
    }
}

/// Coordinate pair serialised as `[longitude, latitude]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct GeoPoint {
    pub longitude: f64,
    pub latitude: f64,
}

impl GeoPoint {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }

    fn in_range(&self) -> bool {
        (-180.0..=180.0).contains(&self.longitude) && (-90.0..=90.0).contains(&self.latitude)
    }
}

impl From<[f64; 2]> for GeoPoint {
    fn from([longitude, latitude]: [f64; 2]) -> Self {
        Self::new(longitude, latitude)
    }
}

impl From<GeoPoint> for [f64; 2] {
    fn from(point: GeoPoint) -> Self {
        [point.longitude, point.latitude]
    }
}

/// Start location or waypoint. `day` is set for waypoints only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<u32>,
    pub coordinates: GeoPoint,
}

impl Location {
    fn validate(&self) -> Result<(), TourValidationError> {
        if self.description.trim().is_empty() {
            return Err(TourValidationError::EmptyLocationDescription);
        }
        if !self.coordinates.in_range() {
            return Err(TourValidationError::CoordinatesOutOfRange);
        }
        Ok(())
    }
}

/// Caller-editable tour fields.
#[derive(Debug, Clone, PartialEq)]
pub struct TourDetails {
    pub name: String,
    pub duration_days: u32,
    pub max_group_size: u32,
    pub difficulty: Difficulty,
    /// Price in USD cents.
    pub price: u32,
    pub price_discount: Option<u32>,
    pub summary: String,
    pub description: Option<String>,
    pub image_cover: String,
    pub images: Vec<String>,
    pub start_dates: Vec<DateTime<Utc>>,
    pub start_location: Option<Location>,
    pub locations: Vec<Location>,
    pub guides: Vec<UserId>,
}

impl TourDetails {
    /// Check every field constraint.
    pub fn validate(&self) -> Result<(), TourValidationError> {
        let name_len = self.name.trim().chars().count();
        if !(TOUR_NAME_MIN..=TOUR_NAME_MAX).contains(&name_len) {
            return Err(TourValidationError::NameLength {
                min: TOUR_NAME_MIN,
                max: TOUR_NAME_MAX,
            });
        }
        if !is_valid_slug(&slugify(&self.name)) {
            return Err(TourValidationError::NameWithoutSlug);
        }
        for (field, value) in [
            ("duration", self.duration_days),
            ("group size", self.max_group_size),
            ("price", self.price),
        ] {
            if value == 0 {
                return Err(TourValidationError::NonPositive { field });
            }
        }
        if self
            .price_discount
            .is_some_and(|discount| discount >= self.price)
        {
            return Err(TourValidationError::DiscountNotBelowPrice);
        }
        if self.summary.trim().is_empty() {
            return Err(TourValidationError::EmptySummary);
        }
        if self.image_cover.trim().is_empty() {
            return Err(TourValidationError::EmptyImageCover);
        }
        self.start_location
            .iter()
            .chain(&self.locations)
            .try_for_each(Location::validate)
    }
}

/// Partial update of [`TourDetails`]; absent fields keep stored values.
///
/// `price_discount: Some(None)` clears the discount.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TourPatch {
    pub name: Option<String>,
    pub duration_days: Option<u32>,
    pub max_group_size: Option<u32>,
    pub difficulty: Option<Difficulty>,
    pub price: Option<u32>,
    pub price_discount: Option<Option<u32>>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub image_cover: Option<String>,
    pub images: Option<Vec<String>>,
    pub start_dates: Option<Vec<DateTime<Utc>>>,
    pub start_location: Option<Location>,
    pub locations: Option<Vec<Location>>,
    pub guides: Option<Vec<UserId>>,
}

impl TourPatch {
    /// Overlay the patch on `details`.
    pub fn apply(self, mut details: TourDetails) -> TourDetails {
        macro_rules! overlay {
            ($($field:ident),*) => {
                $(if let Some(value) = self.$field {
                    details.$field = value;
                })*
            };
        }
        overlay!(
            name,
            duration_days,
            max_group_size,
            difficulty,
            price,
            price_discount,
            summary,
            image_cover,
            images,
            start_dates,
            locations,
            guides
        );
        if let Some(description) = self.description {
            details.description = Some(description);
        }
        if let Some(location) = self.start_location {
            details.start_location = Some(location);
        }
        details
    }
}

/// Review aggregate held on each tour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingSummary {
    pub average: f64,
    pub quantity: u32,
}

impl Default for RatingSummary {
    fn default() -> Self {
        Self {
            average: DEFAULT_RATING_AVERAGE,
            quantity: 0,
        }
    }
}

impl RatingSummary {
    /// Aggregate from raw ratings; empty input yields the default.
    ///
    /// # Examples
    /// ```
    /// use tourbook::domain::RatingSummary;
    ///
    /// let summary = RatingSummary::from_ratings([4, 5, 5]);
    /// assert_eq!(summary.average, 4.7);
    /// assert_eq!(summary.quantity, 3);
    /// ```
    pub fn from_ratings(ratings: impl IntoIterator<Item = u8>) -> Self {
        let (sum, count) = ratings
            .into_iter()
            .fold((0_u64, 0_u32), |(sum, count), rating| {
                (sum + u64::from(rating), count + 1)
            });
        if count == 0 {
            return Self::default();
        }
        let mean = sum as f64 / f64::from(count);
        Self {
            average: (mean * 10.0).round() / 10.0,
            quantity: count,
        }
    }
}

/// Persisted tour.
///
/// ## Invariants
/// - `details.name` is unique; `slug` is always `slugify(details.name)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Tour {
    pub id: TourId,
    pub slug: String,
    pub details: TourDetails,
    pub ratings: RatingSummary,
    pub created_at: DateTime<Utc>,
}

impl Tour {
    /// Build a new tour with default ratings.
    pub fn new(details: TourDetails, created_at: DateTime<Utc>) -> Self {
        Self {
            id: TourId::random(),
            slug: slugify(&details.name),
            details,
            ratings: RatingSummary::default(),
            created_at,
        }
    }

    /// Replace the details, keeping the slug in step with the name.
    pub fn with_details(mut self, details: TourDetails) -> Self {
        self.slug = slugify(&details.name);
        self.details = details;
        self
    }

    /// Minimal view joined onto bookings and reviews.
    pub fn summary(&self) -> TourSummary {
        TourSummary {
            id: self.id,
            name: self.details.name.clone(),
            slug: self.slug.clone(),
            image_cover: self.details.image_cover.clone(),
            start_dates: self.details.start_dates.clone(),
            duration_days: self.details.duration_days,
            difficulty: self.details.difficulty,
            price: self.details.price,
        }
    }
}

/// Tour fields shown alongside bookings and reviews.
#[derive(Debug, Clone, PartialEq)]
pub struct TourSummary {
    pub id: TourId,
    pub name: String,
    pub slug: String,
    pub image_cover: String,
    pub start_dates: Vec<DateTime<Utc>>,
    pub duration_days: u32,
    pub difficulty: Difficulty,
    pub price: u32,
}
