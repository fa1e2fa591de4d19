//! Domain primitives, aggregates and services.
//!
//! Purpose: hold the tour-booking rules independently of HTTP and storage.
//! Services depend only on the ports in [`ports`]; adapters live under
//! `inbound` and `outbound`.
//!
//! Public surface:
//! - Error / ErrorCode: API error payload and stable identifiers.
//! - User, Tour, Booking, Review: persisted aggregates.
//! - Capability / authorize: the role gate.
//! - CrudService: uniform CRUD over any repository.
//! - AccountService, UserService, TourService, BookingService,
//!   ReviewService, MediaMaintenanceService: use-cases driven by handlers.

pub mod auth;
pub mod booking;
pub mod crud;
pub mod error;
pub mod ids;
pub mod ports;
pub mod review;
pub mod slug;
pub mod tour;
pub mod trace_id;
pub mod user;

mod account_service;
mod booking_service;
mod media_maintenance;
mod review_service;
mod tour_service;
mod user_service;

pub use self::account_service::{AccountService, Authenticated, SignupRequest};
pub use self::auth::{
    Actor, Capability, CredentialValidationError, IssuedToken, LoginCredentials, NewPassword,
    PASSWORD_MIN_LEN, TokenClaims, authorize,
};
pub use self::booking::{
    Booking, BookingDraft, BookingWithTour, CheckoutLineItem, CheckoutRequest, CheckoutSession,
    PaymentEvent, RecordedBooking,
};
pub use self::booking_service::{BookingService, CheckoutUrls};
pub use self::crud::CrudService;
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::ids::{BookingId, InvalidId, ReviewId, TourId, UserId};
pub use self::media_maintenance::{MediaMaintenanceService, MediaMigrationReport, rewrite_reference};
pub use self::review::{
    MISSING_TOUR_LABEL, Rating, Review, ReviewPatch, ReviewText, ReviewValidationError,
    ReviewWithTour,
};
pub use self::review_service::ReviewService;
pub use self::slug::slugify;
pub use self::tour::{
    DEFAULT_RATING_AVERAGE, Difficulty, GeoPoint, Location, RatingSummary, TOUR_NAME_MAX,
    TOUR_NAME_MIN, Tour, TourDetails, TourPatch, TourSummary, TourValidationError,
};
pub use self::tour_service::{MAX_GALLERY_IMAGES, TourImages, TourService};
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};
pub use self::user::{
    DEFAULT_PHOTO, EmailAddress, PasswordHash, Role, USER_NAME_MAX, User, UserName,
    UserValidationError,
};
pub use self::user_service::{NewUser, ProfileUpdate, UserPatch, UserService};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use actix_web::HttpResponse;
/// use tourbook::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<HttpResponse> {
///     Err(Error::forbidden("nope"))
/// }
/// ```
pub type ApiResult<T> = Result<T, Error>;
