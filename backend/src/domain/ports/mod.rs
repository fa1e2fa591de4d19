//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod booking_repository;
mod credential_hasher;
mod media_store;
mod payment_gateway;
mod repository;
mod review_repository;
mod token_service;
mod tour_repository;
mod user_repository;

pub use booking_repository::BookingRepository;
#[cfg(test)]
pub use credential_hasher::MockCredentialHasher;
pub use credential_hasher::{CredentialHasher, CredentialHasherError};
#[cfg(test)]
pub use media_store::MockMediaStore;
pub use media_store::{ImageTransform, ImageUpload, MediaFolder, MediaStore, MediaStoreError};
#[cfg(test)]
pub use payment_gateway::MockPaymentGateway;
pub use payment_gateway::{PaymentGateway, PaymentGatewayError, SIGNATURE_HEADER};
pub use repository::{Entity, MAX_PAGE_LIMIT, PageRequest, Repository, RepositoryError};
pub use review_repository::ReviewRepository;
#[cfg(test)]
pub use token_service::MockTokenService;
pub use token_service::{TokenService, TokenServiceError};
pub use tour_repository::TourRepository;
pub use user_repository::UserRepository;
