//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] gathers every `/api/v1` handler plus the health probes. Domain
//! enums are documented through the wrappers in
//! [`crate::inbound::http::schemas`], so the domain stays free of utoipa.
//!
//! Served by Swagger UI at `/docs` in debug builds and printed by the
//! `openapi-dump` binary.

use crate::inbound::http::accounts::{AuthResponse, LoginBody, SignupBody, UpdatePasswordBody};
use crate::inbound::http::admin::MigrationResponse;
use crate::inbound::http::bookings::{
    BookingBody, BookingDto, CheckoutResponse, MyBookingDto, WebhookAck,
};
use crate::inbound::http::health::ApiHealth;
use crate::inbound::http::reviews::{MyReviewDto, ReviewBody, ReviewDto};
use crate::inbound::http::schemas::{
    DifficultySchema, ErrorCodeSchema, ErrorSchema, LocationSchema, RoleSchema,
};
use crate::inbound::http::tours::{CreateTourBody, TourDto, TourSummaryDto, UpdateTourBody};
use crate::inbound::http::users::{CreateUserBody, UpdateMeBody, UpdateUserBody, UserDto};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Registers the bearer token scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "BearerToken",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .description(Some("Token returned by signup, login or password change."))
                    .build(),
            ),
        );
    }
}

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Tourbook API",
        description = "Tour catalogue, bookings with hosted checkout, and reviews."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("BearerToken" = [])),
    paths(
        crate::inbound::http::accounts::signup,
        crate::inbound::http::accounts::login,
        crate::inbound::http::accounts::update_my_password,
        crate::inbound::http::users::get_me,
        crate::inbound::http::users::update_me,
        crate::inbound::http::users::delete_me,
        crate::inbound::http::users::upload_my_photo,
        crate::inbound::http::users::list_users,
        crate::inbound::http::users::create_user,
        crate::inbound::http::users::get_user,
        crate::inbound::http::users::update_user,
        crate::inbound::http::users::delete_user,
        crate::inbound::http::tours::list_tours,
        crate::inbound::http::tours::get_tour,
        crate::inbound::http::tours::create_tour,
        crate::inbound::http::tours::update_tour,
        crate::inbound::http::tours::delete_tour,
        crate::inbound::http::tours::upload_tour_images,
        crate::inbound::http::bookings::checkout_session,
        crate::inbound::http::bookings::payment_webhook,
        crate::inbound::http::bookings::my_bookings,
        crate::inbound::http::bookings::list_bookings,
        crate::inbound::http::bookings::create_booking,
        crate::inbound::http::bookings::get_booking,
        crate::inbound::http::bookings::update_booking,
        crate::inbound::http::bookings::delete_booking,
        crate::inbound::http::reviews::list_reviews,
        crate::inbound::http::reviews::create_review,
        crate::inbound::http::reviews::my_reviews,
        crate::inbound::http::reviews::get_review,
        crate::inbound::http::reviews::update_review,
        crate::inbound::http::reviews::delete_review,
        crate::inbound::http::reviews::list_tour_reviews,
        crate::inbound::http::reviews::create_tour_review,
        crate::inbound::http::admin::update_database,
        crate::inbound::http::health::api_health,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        ErrorSchema,
        ErrorCodeSchema,
        RoleSchema,
        DifficultySchema,
        LocationSchema,
        UserDto,
        TourDto,
        TourSummaryDto,
        BookingDto,
        MyBookingDto,
        ReviewDto,
        MyReviewDto,
        SignupBody,
        LoginBody,
        UpdatePasswordBody,
        UpdateMeBody,
        CreateUserBody,
        UpdateUserBody,
        CreateTourBody,
        UpdateTourBody,
        BookingBody,
        ReviewBody,
        AuthResponse,
        CheckoutResponse,
        WebhookAck,
        MigrationResponse,
        ApiHealth,
    )),
    tags(
        (name = "accounts", description = "Signup, login and password changes"),
        (name = "users", description = "Profiles and user administration"),
        (name = "tours", description = "Tour catalogue"),
        (name = "bookings", description = "Checkout, payment webhook and bookings"),
        (name = "reviews", description = "Tour reviews"),
        (name = "admin", description = "Maintenance tasks"),
        (name = "health", description = "Status and probes")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use utoipa::openapi::RefOr;
    use utoipa::openapi::schema::Schema;

    // utoipa replaces :: with . in schema names
    const ERROR_SCHEMA_NAME: &str = "crate.domain.Error";

    fn assert_object_schema_has_field(schema: &RefOr<Schema>, field: &str) {
        match schema {
            RefOr::T(Schema::Object(obj)) => {
                assert!(
                    obj.properties.contains_key(field),
                    "schema should have field '{field}'"
                );
            }
            _ => panic!("expected Object schema"),
        }
    }

    #[rstest]
    fn error_schema_uses_camel_case_fields() {
        let doc = ApiDoc::openapi();
        let schemas = &doc.components.as_ref().expect("components").schemas;
        let error_schema = schemas.get(ERROR_SCHEMA_NAME).expect("Error schema");
        for field in ["code", "message", "traceId", "details"] {
            assert_object_schema_has_field(error_schema, field);
        }
    }

    #[rstest]
    #[case("/api/v1/bookings/webhook-checkout")]
    #[case("/api/v1/tours/{tourId}/reviews")]
    #[case("/api/v1/users/me")]
    #[case("/api/v1/admin/update-database")]
    fn documents_every_surface(#[case] path: &str) {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key(path), "missing {path}");
    }

    #[rstest]
    fn bearer_scheme_is_registered() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("BearerToken"));
    }
}
