//! Tour booking backend.
//!
//! Hexagonal layout: [`domain`] holds the rules and the ports they need,
//! [`inbound`] adapts HTTP onto domain services and [`outbound`] implements
//! the ports over PostgreSQL, the payment provider and the media host.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use middleware::Trace;
