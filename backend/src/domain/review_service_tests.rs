//! Tests for review submission, moderation and rating aggregates.

use std::sync::Arc;

use super::*;
use crate::domain::{ErrorCode, MISSING_TOUR_LABEL, Role, User, UserId};
use crate::domain::ports::Repository;
use crate::outbound::memory::InMemoryStore;
use crate::test_support::{MutableClock, fixture_now, sample_tour, sample_user};
use rstest::{fixture, rstest};

struct Harness {
    store: InMemoryStore,
    clock: Arc<MutableClock>,
    service: ReviewService,
    tour: Tour,
    author: User,
}

impl Harness {
    fn author(&self) -> Actor {
        Actor::from(&self.author)
    }

    async fn stored_tour(&self) -> Tour {
        self.store
            .tours()
            .find_by_id(self.tour.id)
            .await
            .expect("query")
            .expect("tour present")
    }
}

#[fixture]
async fn harness() -> Harness {
    let store = InMemoryStore::default();
    let tour = sample_tour("The Forest Hiker");
    let author = sample_user("Rita Reviewer", "rita@example.com", Role::User);
    store.tours().insert(&tour).await.expect("seed tour");
    store.users().insert(&author).await.expect("seed user");
    let clock = Arc::new(MutableClock::new(fixture_now()));
    let service = ReviewService::new(
        Arc::new(store.reviews()),
        Arc::new(store.tours()),
        clock.clone(),
    );
    Harness {
        store,
        clock,
        service,
        tour,
        author,
    }
}

fn rating(value: i64) -> Rating {
    Rating::new(value).expect("rating")
}

fn text(value: &str) -> ReviewText {
    ReviewText::new(value).expect("text")
}

#[rstest]
#[tokio::test]
async fn review_is_listed_under_my_reviews(#[future] harness: Harness) {
    let harness = harness.await;
    let review = harness
        .service
        .create_review(&harness.author(), harness.tour.id, rating(4), text("Great trip"))
        .await
        .expect("create");
    assert_eq!(review.user_id, harness.author.id);

    let mine = harness
        .service
        .list_my_reviews(&harness.author())
        .await
        .expect("mine");
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].review.id, review.id);
    assert_eq!(mine[0].tour_name(), "The Forest Hiker");
}

#[rstest]
#[tokio::test]
async fn second_review_for_same_tour_is_duplicate(#[future] harness: Harness) {
    let harness = harness.await;
    harness
        .service
        .create_review(&harness.author(), harness.tour.id, rating(4), text("Great trip"))
        .await
        .expect("first");
    let err = harness
        .service
        .create_review(&harness.author(), harness.tour.id, rating(5), text("Again"))
        .await
        .expect_err("duplicate");
    assert_eq!(err.code(), ErrorCode::DuplicateKey);
    assert_eq!(err.message(), "You have already reviewed this tour");
}

#[rstest]
#[case(Role::Guide)]
#[case(Role::LeadGuide)]
#[case(Role::Admin)]
#[tokio::test]
async fn only_user_role_writes_reviews(#[future] harness: Harness, #[case] role: Role) {
    let harness = harness.await;
    let err = harness
        .service
        .create_review(
            &Actor::new(UserId::random(), role),
            harness.tour.id,
            rating(5),
            text("Staff opinion"),
        )
        .await
        .expect_err("forbidden");
    assert_eq!(err.code(), ErrorCode::Forbidden);
}

#[rstest]
#[tokio::test]
async fn reviews_of_unknown_tours_are_not_found(#[future] harness: Harness) {
    let harness = harness.await;
    let err = harness
        .service
        .create_review(&harness.author(), TourId::random(), rating(3), text("Hmm"))
        .await
        .expect_err("missing tour");
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[rstest]
#[tokio::test]
async fn ratings_follow_every_write(#[future] harness: Harness) {
    let harness = harness.await;
    let other = sample_user("Omar Other", "omar@example.com", Role::User);
    harness.store.users().insert(&other).await.expect("seed");

    let first = harness
        .service
        .create_review(&harness.author(), harness.tour.id, rating(4), text("Good"))
        .await
        .expect("first");
    harness
        .service
        .create_review(&Actor::from(&other), harness.tour.id, rating(5), text("Superb"))
        .await
        .expect("second");
    let tour = harness.stored_tour().await;
    assert_eq!(tour.ratings.quantity, 2);
    assert!((tour.ratings.average - 4.5).abs() < f64::EPSILON);

    harness
        .service
        .update_review(
            &harness.author(),
            first.id,
            ReviewPatch {
                rating: Some(rating(1)),
                text: None,
            },
        )
        .await
        .expect("update");
    let tour = harness.stored_tour().await;
    assert!((tour.ratings.average - 3.0).abs() < f64::EPSILON);

    harness
        .service
        .delete_review(&harness.author(), first.id)
        .await
        .expect("delete");
    let tour = harness.stored_tour().await;
    assert_eq!(tour.ratings.quantity, 1);
    assert!((tour.ratings.average - 5.0).abs() < f64::EPSILON);
}

#[rstest]
#[tokio::test]
async fn strangers_cannot_edit_but_moderators_can(#[future] harness: Harness) {
    let harness = harness.await;
    let review = harness
        .service
        .create_review(&harness.author(), harness.tour.id, rating(4), text("Good"))
        .await
        .expect("create");

    let stranger = Actor::new(UserId::random(), Role::User);
    let err = harness
        .service
        .delete_review(&stranger, review.id)
        .await
        .expect_err("stranger");
    assert_eq!(err.code(), ErrorCode::Forbidden);

    let admin = Actor::new(UserId::random(), Role::Admin);
    harness
        .service
        .delete_review(&admin, review.id)
        .await
        .expect("moderator delete");
    let tour = harness.stored_tour().await;
    assert_eq!(tour.ratings, RatingSummary::default());
}

#[rstest]
#[tokio::test]
async fn my_reviews_are_newest_first_and_survive_tour_removal(#[future] harness: Harness) {
    let harness = harness.await;
    let second_tour = sample_tour("The Sea Explorer");
    harness.store.tours().insert(&second_tour).await.expect("seed");

    harness
        .service
        .create_review(&harness.author(), harness.tour.id, rating(4), text("Older"))
        .await
        .expect("older");
    harness.clock.advance_seconds(30);
    harness
        .service
        .create_review(&harness.author(), second_tour.id, rating(5), text("Newer"))
        .await
        .expect("newer");
    harness
        .store
        .tours()
        .delete(second_tour.id)
        .await
        .expect("remove tour");

    let mine = harness
        .service
        .list_my_reviews(&harness.author())
        .await
        .expect("mine");
    assert_eq!(mine.len(), 2);
    assert_eq!(mine[0].review.text.as_str(), "Newer");
    assert_eq!(mine[0].tour_name(), MISSING_TOUR_LABEL);
    assert_eq!(mine[1].tour_name(), "The Forest Hiker");
}
