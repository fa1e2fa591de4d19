//! OpenAPI schema definitions for domain types.
//!
//! Domain types remain framework-agnostic by not deriving `ToSchema`. The
//! wrappers here mirror their wire shape and are registered with utoipa under
//! the domain type's name.

use utoipa::ToSchema;

/// OpenAPI schema for [`crate::domain::ErrorCode`].
#[derive(ToSchema)]
#[schema(as = crate::domain::ErrorCode)]
pub enum ErrorCodeSchema {
    /// The request is malformed or fails validation.
    #[schema(rename = "invalid_request")]
    InvalidRequest,
    /// A unique field already holds this value.
    #[schema(rename = "duplicate_key")]
    DuplicateKey,
    /// The caller already booked the tour.
    #[schema(rename = "already_booked")]
    AlreadyBooked,
    /// The bearer token is missing, invalid or expired.
    #[schema(rename = "unauthenticated")]
    Unauthenticated,
    /// Authenticated but not permitted to perform this action.
    #[schema(rename = "forbidden")]
    Forbidden,
    /// The requested resource does not exist.
    #[schema(rename = "not_found")]
    NotFound,
    /// The database or a provider is unreachable.
    #[schema(rename = "service_unavailable")]
    ServiceUnavailable,
    /// An unexpected error occurred on the server.
    #[schema(rename = "internal_error")]
    InternalError,
}

/// OpenAPI schema for [`crate::domain::Error`].
#[derive(ToSchema)]
#[schema(as = crate::domain::Error)]
#[schema(rename_all = "camelCase")]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct ErrorSchema {
    /// Stable machine-readable error code.
    #[schema(example = "not_found")]
    code: ErrorCodeSchema,
    /// Human-readable message returned to clients.
    #[schema(example = "No tour found with that ID")]
    message: String,
    /// Correlation identifier echoed in the `trace-id` header.
    #[schema(example = "3fa85f64-5717-4562-b3fc-2c963f66afa6")]
    trace_id: Option<String>,
    /// Supplementary error details for clients.
    details: Option<serde_json::Value>,
}

/// OpenAPI schema for [`crate::domain::Role`].
#[derive(ToSchema)]
#[schema(as = crate::domain::Role)]
pub enum RoleSchema {
    #[schema(rename = "user")]
    User,
    #[schema(rename = "guide")]
    Guide,
    #[schema(rename = "lead-guide")]
    LeadGuide,
    #[schema(rename = "admin")]
    Admin,
}

/// OpenAPI schema for [`crate::domain::Difficulty`].
#[derive(ToSchema)]
#[schema(as = crate::domain::Difficulty)]
pub enum DifficultySchema {
    #[schema(rename = "easy")]
    Easy,
    #[schema(rename = "medium")]
    Medium,
    #[schema(rename = "difficult")]
    Difficult,
}

/// OpenAPI schema for [`crate::domain::Location`].
#[derive(ToSchema)]
#[schema(as = crate::domain::Location)]
#[schema(rename_all = "camelCase")]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct LocationSchema {
    #[schema(example = "Banff National Park")]
    description: String,
    address: Option<String>,
    /// Tour day on which the stop is visited.
    day: Option<u32>,
    /// `[longitude, latitude]`.
    coordinates: [f64; 2],
}
