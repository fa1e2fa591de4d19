//! Outbound adapters implementing the domain ports.
//!
//! - **persistence**: PostgreSQL repositories on Diesel.
//! - **memory**: in-process repositories for tests and database-less runs.
//! - **payments**: Stripe-compatible checkout sessions and webhook checks.
//! - **media**: Cloudinary-compatible signed image uploads.
//! - **security**: Argon2 credential hashing and JWT bearer tokens.
//!
//! Adapters translate between domain types and wire or row formats. They
//! contain no business rules.

pub mod media;
pub mod memory;
pub mod payments;
pub mod persistence;
pub mod security;
