//! Shared HTTP adapter state.
//!
//! Handlers receive this through `web::Data` and only talk to domain
//! services, so they stay testable against in-memory adapters.

use std::sync::Arc;

use mockable::Clock;

use crate::domain::ports::{
    BookingRepository, CredentialHasher, MediaStore, PaymentGateway, ReviewRepository,
    TokenService, TourRepository, UserRepository,
};
use crate::domain::{
    AccountService, BookingService, CheckoutUrls, MediaMaintenanceService, ReviewService,
    TourService, UserService,
};

/// Parameter object bundling every port the HTTP surface needs.
#[derive(Clone)]
pub struct HttpStatePorts {
    pub users: Arc<dyn UserRepository>,
    pub tours: Arc<dyn TourRepository>,
    pub bookings: Arc<dyn BookingRepository>,
    pub reviews: Arc<dyn ReviewRepository>,
    pub hasher: Arc<dyn CredentialHasher>,
    pub tokens: Arc<dyn TokenService>,
    pub payments: Arc<dyn PaymentGateway>,
    pub media: Arc<dyn MediaStore>,
    pub clock: Arc<dyn Clock>,
}

/// Deployment values handlers echo or build URLs from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpStateSettings {
    /// Reported by the health endpoint, e.g. `development`.
    pub environment: String,
    /// Origin of the web client; checkout redirects point here.
    pub frontend_url: String,
    /// Prefix legacy media references are rewritten under.
    pub media_base_url: String,
}

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub accounts: Arc<AccountService>,
    pub users: Arc<UserService>,
    pub tours: Arc<TourService>,
    pub bookings: Arc<BookingService>,
    pub reviews: Arc<ReviewService>,
    pub maintenance: Arc<MediaMaintenanceService>,
    pub clock: Arc<dyn Clock>,
    pub environment: String,
}

impl HttpState {
    /// Wire every domain service from one set of ports.
    pub fn new(ports: HttpStatePorts, settings: HttpStateSettings) -> Self {
        let HttpStatePorts {
            users,
            tours,
            bookings,
            reviews,
            hasher,
            tokens,
            payments,
            media,
            clock,
        } = ports;
        let accounts = AccountService::new(users.clone(), hasher.clone(), tokens, clock.clone());
        let user_service = UserService::new(users.clone(), hasher, media.clone(), clock.clone());
        let tour_service = TourService::new(tours.clone(), media, clock.clone());
        let booking_service = BookingService::new(
            bookings,
            tours.clone(),
            users.clone(),
            payments,
            CheckoutUrls::new(settings.frontend_url),
            clock.clone(),
        );
        let review_service = ReviewService::new(reviews, tours.clone(), clock.clone());
        let maintenance = MediaMaintenanceService::new(tours, users, settings.media_base_url);
        Self {
            accounts: Arc::new(accounts),
            users: Arc::new(user_service),
            tours: Arc::new(tour_service),
            bookings: Arc::new(booking_service),
            reviews: Arc::new(review_service),
            maintenance: Arc::new(maintenance),
            clock,
            environment: settings.environment,
        }
    }
}
