//! HTTP inbound adapter exposing REST endpoints.
//!
//! Everything lives under `/api/v1`; [`configure_api`] mounts the scope so
//! the server and handler tests share one route table. Literal segments
//! such as `/users/me` are registered ahead of `/users/{id}`.

pub mod accounts;
pub mod admin;
pub mod auth;
pub mod auth_config;
pub mod bookings;
pub mod envelope;
pub mod error;
pub mod health;
pub mod reviews;
pub mod schemas;
pub mod state;
pub mod tours;
pub mod uploads;
pub mod users;
pub mod validation;

use actix_web::web;

use crate::domain::Error;

pub use error::ApiResult;

/// JSON bodies above this size are rejected before parsing.
const JSON_LIMIT_BYTES: usize = 10 * 1024;

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(JSON_LIMIT_BYTES)
        .error_handler(|err, _req| Error::invalid_request(err.to_string()).into())
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err, _req| Error::invalid_request(err.to_string()).into())
}

fn path_config() -> web::PathConfig {
    web::PathConfig::default()
        .error_handler(|err, _req| Error::invalid_request(err.to_string()).into())
}

/// Mount the `/api/v1` scope and its extractor configuration.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .app_data(json_config())
            .app_data(query_config())
            .app_data(path_config())
            .service(health::api_health)
            // accounts and the caller's own profile
            .service(accounts::signup)
            .service(accounts::login)
            .service(accounts::update_my_password)
            .service(users::get_me)
            .service(users::update_me)
            .service(users::delete_me)
            .service(users::upload_my_photo)
            // user administration
            .service(users::list_users)
            .service(users::create_user)
            .service(users::get_user)
            .service(users::update_user)
            .service(users::delete_user)
            // tours and nested reviews
            .service(tours::list_tours)
            .service(tours::create_tour)
            .service(reviews::list_tour_reviews)
            .service(reviews::create_tour_review)
            .service(tours::upload_tour_images)
            .service(tours::get_tour)
            .service(tours::update_tour)
            .service(tours::delete_tour)
            // bookings
            .service(bookings::checkout_session)
            .service(bookings::payment_webhook)
            .service(bookings::my_bookings)
            .service(bookings::list_bookings)
            .service(bookings::create_booking)
            .service(bookings::get_booking)
            .service(bookings::update_booking)
            .service(bookings::delete_booking)
            // reviews
            .service(reviews::my_reviews)
            .service(reviews::list_reviews)
            .service(reviews::create_review)
            .service(reviews::get_review)
            .service(reviews::update_review)
            .service(reviews::delete_review)
            .service(admin::update_database),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;
    use crate::test_support::http::{TestApp, bearer};
    use actix_web::http::StatusCode;
    use actix_web::test;
    use rstest::rstest;
    use serde_json::Value;

    #[rstest]
    #[case("/api/v1/users/me")]
    #[case("/api/v1/bookings/my-bookings")]
    #[case("/api/v1/reviews/my-reviews")]
    #[actix_web::test]
    async fn literal_routes_win_over_id_routes(#[case] uri: &str) {
        let harness = TestApp::new();
        let (_, token) = harness.seed_user("Ada", "ada@example.com", Role::User).await;
        let app = test::init_service(harness.app()).await;
        let req = test::TestRequest::get()
            .uri(uri)
            .insert_header(bearer(&token))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[rstest]
    #[actix_web::test]
    async fn malformed_json_is_an_invalid_request() {
        let harness = TestApp::new();
        let app = test::init_service(harness.app()).await;
        let req = test::TestRequest::post()
            .uri("/api/v1/users/login")
            .insert_header(("content-type", "application/json"))
            .set_payload("{not json")
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["code"], "invalid_request");
    }
}
