//! Behaviour tests for bookings recorded from payment provider webhooks.
//
// rstest-bdd generates guard variables with double underscores, which trips
// the non_snake_case lint under -D warnings.
#![allow(non_snake_case)]

// Shared world carries helpers used only by other behaviour suites.
#[allow(dead_code)]
#[path = "bdd_support/world.rs"]
mod bdd_world;

use actix_web::test::TestRequest;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use serde_json::Value;
use tourbook::domain::ports::SIGNATURE_HEADER;
use tourbook::test_support::{checkout_completed_payload, fixture_now, sign_webhook};
use bdd_world::{SharedWorld, WorldFixture};

const WEBHOOK_PATH: &str = "/api/v1/bookings/webhook-checkout";

#[fixture]
fn world() -> WorldFixture {
    bdd_world::world()
}

fn completed_payload(world: &SharedWorld, name: &str) -> String {
    let tour = bdd_world::tour(world);
    let user = bdd_world::user(world, name);
    checkout_completed_payload(tour.id, user.id, tour.details.price)
}

fn deliver(world: &SharedWorld, payload: String, signature: String) {
    let req = TestRequest::post()
        .uri(WEBHOOK_PATH)
        .insert_header((SIGNATURE_HEADER, signature))
        .set_payload(payload);
    bdd_world::send(world, req);
}

#[given("a tour called {name}")]
fn a_tour_called(world: &WorldFixture, name: String) {
    bdd_world::seed_tour(&world.world(), name.trim_matches('"'));
}

#[given("a user called {name} with role {role}")]
fn a_user_called_with_role(world: &WorldFixture, name: String, role: String) {
    bdd_world::seed_user(&world.world(), name.trim_matches('"'), role.trim_matches('"'));
}

#[when("the provider reports a completed checkout for {name} twice")]
fn the_provider_reports_a_completed_checkout_twice(world: &WorldFixture, name: String) {
    let world = world.world();
    let payload = completed_payload(&world, name.trim_matches('"'));
    let signature = sign_webhook(payload.as_bytes(), fixture_now());
    for _ in 0..2 {
        deliver(&world, payload.clone(), signature.clone());
        bdd_world::assert_status(&world, 200);
    }
}

#[when("a completed checkout for {name} arrives with a forged signature")]
fn a_completed_checkout_arrives_forged(world: &WorldFixture, name: String) {
    let world = world.world();
    let payload = completed_payload(&world, name.trim_matches('"'));
    let signature = format!("t={},v1={}", fixture_now().timestamp(), "0".repeat(64));
    deliver(&world, payload, signature);
}

#[when("{name} requests a checkout session for the tour")]
fn requests_a_checkout_session(world: &WorldFixture, name: String) {
    let world = world.world();
    let tour = bdd_world::tour(&world);
    let req = TestRequest::get().uri(&format!("/api/v1/bookings/checkout-session/{}", tour.id));
    let req = bdd_world::as_user(&world, Some(name.trim_matches('"')), req);
    bdd_world::send(&world, req);
}

#[then("the response status is {status}")]
fn the_response_status_is(world: &WorldFixture, status: u16) {
    bdd_world::assert_status(&world.world(), status);
}

#[then("the error code is {code}")]
fn the_error_code_is(world: &WorldFixture, code: String) {
    bdd_world::assert_error_code(&world.world(), code.trim_matches('"'));
}

fn my_bookings(world: &SharedWorld, name: &str) -> Vec<Value> {
    let req = bdd_world::as_user(
        world,
        Some(name),
        TestRequest::get().uri("/api/v1/bookings/my-bookings"),
    );
    bdd_world::send(world, req);
    bdd_world::assert_status(world, 200);
    world.borrow().last_body["data"]["bookings"]
        .as_array()
        .cloned()
        .unwrap_or_default()
}

#[then("{name} has 1 paid booking")]
fn has_one_paid_booking(world: &WorldFixture, name: String) {
    let bookings = my_bookings(&world.world(), name.trim_matches('"'));
    assert_eq!(bookings.len(), 1);
    assert_eq!(bookings[0]["paid"], true);
    assert_eq!(bookings[0]["tour"]["name"], "The Forest Hiker");
}

#[then("{name} has no bookings")]
fn has_no_bookings(world: &WorldFixture, name: String) {
    let world = world.world();
    let bookings = my_bookings(&world, name.trim_matches('"'));
    assert!(bookings.is_empty());
    assert_eq!(world.borrow().app.store.booking_count(), 0);
}

#[then("no further checkout session was opened")]
fn no_further_checkout_session_was_opened(world: &WorldFixture) {
    assert!(world.world().borrow().app.payments.requests().is_empty());
}

#[scenario(
    path = "tests/features/booking_webhook.feature",
    name = "A completed checkout books the tour once"
)]
fn a_completed_checkout_books_once(world: WorldFixture) {
    drop(world);
}

#[scenario(
    path = "tests/features/booking_webhook.feature",
    name = "A forged signature books nothing"
)]
fn a_forged_signature_books_nothing(world: WorldFixture) {
    drop(world);
}

#[scenario(
    path = "tests/features/booking_webhook.feature",
    name = "Checkout is refused once the tour is booked"
)]
fn checkout_is_refused_once_booked(world: WorldFixture) {
    drop(world);
}
