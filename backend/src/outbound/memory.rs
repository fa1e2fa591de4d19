//! In-memory repositories sharing one set of tables.
//!
//! Used when no database URL is configured and throughout the test suites.
//! The unique constraints mirror the PostgreSQL schema so duplicate handling
//! behaves the same against either adapter.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::ports::{
    BookingRepository, PageRequest, Repository, RepositoryError, ReviewRepository,
    TourRepository, UserRepository,
};
use crate::domain::{
    Booking, BookingId, BookingWithTour, EmailAddress, RatingSummary, Review, ReviewId,
    ReviewWithTour, Tour, TourId, TourSummary, User, UserId,
};

pub(crate) const USERS_EMAIL_KEY: &str = "users_email_key";
pub(crate) const TOURS_NAME_KEY: &str = "tours_name_key";
pub(crate) const BOOKINGS_USER_TOUR_KEY: &str = "bookings_user_id_tour_id_key";
pub(crate) const REVIEWS_USER_TOUR_KEY: &str = "reviews_user_id_tour_id_key";

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    tours: Vec<Tour>,
    bookings: Vec<Booking>,
    reviews: Vec<Review>,
}

impl Tables {
    fn tour_summary(&self, id: TourId) -> Option<TourSummary> {
        self.tours.iter().find(|t| t.id == id).map(Tour::summary)
    }
}

/// Rows newest first; ties keep the most recent insert first.
fn newest_first<E: Clone>(rows: &[E], created_at: impl Fn(&E) -> DateTime<Utc>) -> Vec<E> {
    let mut sorted: Vec<E> = rows.iter().rev().cloned().collect();
    sorted.sort_by_key(|row| std::cmp::Reverse(created_at(row)));
    sorted
}

fn paged<E>(rows: Vec<E>, page: PageRequest) -> Vec<E> {
    rows.into_iter()
        .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
        .take(page.limit() as usize)
        .collect()
}

/// Shared handle to the tables. Cloning shares the data.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryStore {
    fn lock(&self) -> Result<MutexGuard<'_, Tables>, RepositoryError> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::query("in-memory store lock poisoned"))
    }

    fn peek(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn users(&self) -> InMemoryUserRepository {
        InMemoryUserRepository {
            store: self.clone(),
        }
    }

    pub fn tours(&self) -> InMemoryTourRepository {
        InMemoryTourRepository {
            store: self.clone(),
        }
    }

    pub fn bookings(&self) -> InMemoryBookingRepository {
        InMemoryBookingRepository {
            store: self.clone(),
        }
    }

    pub fn reviews(&self) -> InMemoryReviewRepository {
        InMemoryReviewRepository {
            store: self.clone(),
        }
    }

    /// Stored user rows, including deactivated accounts.
    pub fn user_count(&self) -> usize {
        self.peek().users.len()
    }

    pub fn booking_count(&self) -> usize {
        self.peek().bookings.len()
    }
}

#[derive(Clone)]
pub struct InMemoryUserRepository {
    store: InMemoryStore,
}

fn email_taken(users: &[User], email: &EmailAddress, except: Option<UserId>) -> bool {
    users
        .iter()
        .any(|u| &u.email == email && Some(u.id) != except)
}

#[async_trait]
impl Repository<User> for InMemoryUserRepository {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let tables = self.store.lock()?;
        Ok(tables
            .users
            .iter()
            .find(|u| u.id == id && u.active)
            .cloned())
    }

    async fn list(&self, page: PageRequest) -> Result<Vec<User>, RepositoryError> {
        let tables = self.store.lock()?;
        let active: Vec<User> = tables.users.iter().filter(|u| u.active).cloned().collect();
        Ok(paged(newest_first(&active, |u| u.created_at), page))
    }

    async fn insert(&self, user: &User) -> Result<(), RepositoryError> {
        let mut tables = self.store.lock()?;
        if email_taken(&tables.users, &user.email, None) {
            return Err(RepositoryError::duplicate_key(USERS_EMAIL_KEY));
        }
        tables.users.push(user.clone());
        Ok(())
    }

    async fn update(&self, user: &User) -> Result<bool, RepositoryError> {
        let mut tables = self.store.lock()?;
        if email_taken(&tables.users, &user.email, Some(user.id)) {
            return Err(RepositoryError::duplicate_key(USERS_EMAIL_KEY));
        }
        match tables.users.iter_mut().find(|u| u.id == user.id && u.active) {
            Some(stored) => {
                *stored = user.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Soft delete: the row stays but every lookup skips it.
    async fn delete(&self, id: UserId) -> Result<bool, RepositoryError> {
        let mut tables = self.store.lock()?;
        match tables.users.iter_mut().find(|u| u.id == id && u.active) {
            Some(stored) => {
                stored.active = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<User>, RepositoryError> {
        let tables = self.store.lock()?;
        Ok(tables
            .users
            .iter()
            .find(|u| &u.email == email && u.active)
            .cloned())
    }
}

#[derive(Clone)]
pub struct InMemoryTourRepository {
    store: InMemoryStore,
}

fn name_taken(tours: &[Tour], name: &str, except: Option<TourId>) -> bool {
    tours
        .iter()
        .any(|t| t.details.name == name && Some(t.id) != except)
}

#[async_trait]
impl Repository<Tour> for InMemoryTourRepository {
    async fn find_by_id(&self, id: TourId) -> Result<Option<Tour>, RepositoryError> {
        let tables = self.store.lock()?;
        Ok(tables.tours.iter().find(|t| t.id == id).cloned())
    }

    async fn list(&self, page: PageRequest) -> Result<Vec<Tour>, RepositoryError> {
        let tables = self.store.lock()?;
        Ok(paged(newest_first(&tables.tours, |t| t.created_at), page))
    }

    async fn insert(&self, tour: &Tour) -> Result<(), RepositoryError> {
        let mut tables = self.store.lock()?;
        if name_taken(&tables.tours, &tour.details.name, None) {
            return Err(RepositoryError::duplicate_key(TOURS_NAME_KEY));
        }
        tables.tours.push(tour.clone());
        Ok(())
    }

    async fn update(&self, tour: &Tour) -> Result<bool, RepositoryError> {
        let mut tables = self.store.lock()?;
        if name_taken(&tables.tours, &tour.details.name, Some(tour.id)) {
            return Err(RepositoryError::duplicate_key(TOURS_NAME_KEY));
        }
        match tables.tours.iter_mut().find(|t| t.id == tour.id) {
            Some(stored) => {
                *stored = tour.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: TourId) -> Result<bool, RepositoryError> {
        let mut tables = self.store.lock()?;
        let before = tables.tours.len();
        tables.tours.retain(|t| t.id != id);
        Ok(tables.tours.len() != before)
    }
}

#[async_trait]
impl TourRepository for InMemoryTourRepository {
    async fn set_ratings(
        &self,
        id: TourId,
        ratings: RatingSummary,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.store.lock()?;
        if let Some(tour) = tables.tours.iter_mut().find(|t| t.id == id) {
            tour.ratings = ratings;
        }
        Ok(())
    }

    async fn summaries(&self, ids: &[TourId]) -> Result<Vec<TourSummary>, RepositoryError> {
        let tables = self.store.lock()?;
        Ok(ids.iter().filter_map(|id| tables.tour_summary(*id)).collect())
    }
}

#[derive(Clone)]
pub struct InMemoryBookingRepository {
    store: InMemoryStore,
}

fn booking_taken(bookings: &[Booking], booking: &Booking) -> bool {
    bookings.iter().any(|b| {
        b.user_id == booking.user_id && b.tour_id == booking.tour_id && b.id != booking.id
    })
}

#[async_trait]
impl Repository<Booking> for InMemoryBookingRepository {
    async fn find_by_id(&self, id: BookingId) -> Result<Option<Booking>, RepositoryError> {
        let tables = self.store.lock()?;
        Ok(tables.bookings.iter().find(|b| b.id == id).cloned())
    }

    async fn list(&self, page: PageRequest) -> Result<Vec<Booking>, RepositoryError> {
        let tables = self.store.lock()?;
        Ok(paged(newest_first(&tables.bookings, |b| b.created_at), page))
    }

    async fn insert(&self, booking: &Booking) -> Result<(), RepositoryError> {
        let mut tables = self.store.lock()?;
        if booking_taken(&tables.bookings, booking) {
            return Err(RepositoryError::duplicate_key(BOOKINGS_USER_TOUR_KEY));
        }
        tables.bookings.push(booking.clone());
        Ok(())
    }

    async fn update(&self, booking: &Booking) -> Result<bool, RepositoryError> {
        let mut tables = self.store.lock()?;
        if booking_taken(&tables.bookings, booking) {
            return Err(RepositoryError::duplicate_key(BOOKINGS_USER_TOUR_KEY));
        }
        match tables.bookings.iter_mut().find(|b| b.id == booking.id) {
            Some(stored) => {
                *stored = booking.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: BookingId) -> Result<bool, RepositoryError> {
        let mut tables = self.store.lock()?;
        let before = tables.bookings.len();
        tables.bookings.retain(|b| b.id != id);
        Ok(tables.bookings.len() != before)
    }
}

#[async_trait]
impl BookingRepository for InMemoryBookingRepository {
    async fn find_for_user_and_tour(
        &self,
        user_id: UserId,
        tour_id: TourId,
    ) -> Result<Option<Booking>, RepositoryError> {
        let tables = self.store.lock()?;
        Ok(tables
            .bookings
            .iter()
            .find(|b| b.user_id == user_id && b.tour_id == tour_id)
            .cloned())
    }

    async fn list_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<BookingWithTour>, RepositoryError> {
        let tables = self.store.lock()?;
        let own: Vec<Booking> = tables
            .bookings
            .iter()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(&own, |b| b.created_at)
            .into_iter()
            .map(|booking| BookingWithTour {
                tour: tables.tour_summary(booking.tour_id),
                booking,
            })
            .collect())
    }
}

#[derive(Clone)]
pub struct InMemoryReviewRepository {
    store: InMemoryStore,
}

fn review_taken(reviews: &[Review], review: &Review) -> bool {
    reviews
        .iter()
        .any(|r| r.user_id == review.user_id && r.tour_id == review.tour_id && r.id != review.id)
}

#[async_trait]
impl Repository<Review> for InMemoryReviewRepository {
    async fn find_by_id(&self, id: ReviewId) -> Result<Option<Review>, RepositoryError> {
        let tables = self.store.lock()?;
        Ok(tables.reviews.iter().find(|r| r.id == id).cloned())
    }

    async fn list(&self, page: PageRequest) -> Result<Vec<Review>, RepositoryError> {
        let tables = self.store.lock()?;
        Ok(paged(newest_first(&tables.reviews, |r| r.created_at), page))
    }

    async fn insert(&self, review: &Review) -> Result<(), RepositoryError> {
        let mut tables = self.store.lock()?;
        if review_taken(&tables.reviews, review) {
            return Err(RepositoryError::duplicate_key(REVIEWS_USER_TOUR_KEY));
        }
        tables.reviews.push(review.clone());
        Ok(())
    }

    async fn update(&self, review: &Review) -> Result<bool, RepositoryError> {
        let mut tables = self.store.lock()?;
        if review_taken(&tables.reviews, review) {
            return Err(RepositoryError::duplicate_key(REVIEWS_USER_TOUR_KEY));
        }
        match tables.reviews.iter_mut().find(|r| r.id == review.id) {
            Some(stored) => {
                *stored = review.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: ReviewId) -> Result<bool, RepositoryError> {
        let mut tables = self.store.lock()?;
        let before = tables.reviews.len();
        tables.reviews.retain(|r| r.id != id);
        Ok(tables.reviews.len() != before)
    }
}

#[async_trait]
impl ReviewRepository for InMemoryReviewRepository {
    async fn list_for_tour(&self, tour_id: TourId) -> Result<Vec<Review>, RepositoryError> {
        let tables = self.store.lock()?;
        let rows: Vec<Review> = tables
            .reviews
            .iter()
            .filter(|r| r.tour_id == tour_id)
            .cloned()
            .collect();
        Ok(newest_first(&rows, |r| r.created_at))
    }

    async fn list_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ReviewWithTour>, RepositoryError> {
        let tables = self.store.lock()?;
        let rows: Vec<Review> = tables
            .reviews
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(&rows, |r| r.created_at)
            .into_iter()
            .map(|review| ReviewWithTour {
                tour: tables.tour_summary(review.tour_id),
                review,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;
    use crate::test_support::{fixture_now, sample_tour, sample_user};
    use chrono::TimeDelta;
    use rstest::rstest;

    #[rstest]
    #[tokio::test]
    async fn deleted_users_disappear_but_keep_their_email() {
        let store = InMemoryStore::default();
        let users = store.users();
        let user = sample_user("Dana Deleted", "dana@example.com", Role::User);
        users.insert(&user).await.expect("insert");

        assert!(users.delete(user.id).await.expect("delete"));
        assert!(!users.delete(user.id).await.expect("second delete"));
        assert_eq!(users.find_by_id(user.id).await.expect("find"), None);
        assert_eq!(
            users.find_by_email(&user.email).await.expect("find"),
            None
        );
        assert!(users.list(PageRequest::default()).await.expect("list").is_empty());
        assert_eq!(store.user_count(), 1);

        let again = sample_user("Dana Again", "dana@example.com", Role::User);
        let err = users.insert(&again).await.expect_err("email reserved");
        assert_eq!(err, RepositoryError::duplicate_key(USERS_EMAIL_KEY));
    }

    #[rstest]
    #[tokio::test]
    async fn listings_are_newest_first_and_paged() {
        let store = InMemoryStore::default();
        let tours = store.tours();
        for (offset, name) in ["The Forest Hiker", "The Sea Explorer", "The Snow Adventurer"]
            .into_iter()
            .enumerate()
        {
            let mut tour = sample_tour(name);
            tour.created_at = fixture_now() + TimeDelta::minutes(offset as i64);
            tours.insert(&tour).await.expect("insert");
        }

        let first = tours
            .list(PageRequest::new(Some(1), Some(2)))
            .await
            .expect("page one");
        let names: Vec<&str> = first.iter().map(|t| t.details.name.as_str()).collect();
        assert_eq!(names, ["The Snow Adventurer", "The Sea Explorer"]);

        let second = tours
            .list(PageRequest::new(Some(2), Some(2)))
            .await
            .expect("page two");
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].details.name, "The Forest Hiker");
    }

    #[rstest]
    #[tokio::test]
    async fn renaming_onto_an_existing_tour_is_rejected() {
        let store = InMemoryStore::default();
        let tours = store.tours();
        let first = sample_tour("The Forest Hiker");
        let second = sample_tour("The Sea Explorer");
        tours.insert(&first).await.expect("insert");
        tours.insert(&second).await.expect("insert");

        let mut details = second.details.clone();
        details.name = first.details.name.clone();
        let err = tours
            .update(&second.clone().with_details(details))
            .await
            .expect_err("duplicate name");
        assert_eq!(err, RepositoryError::duplicate_key(TOURS_NAME_KEY));
    }

    #[rstest]
    #[tokio::test]
    async fn bookings_are_unique_per_user_and_tour() {
        let store = InMemoryStore::default();
        let bookings = store.bookings();
        let tour_id = TourId::random();
        let user_id = UserId::random();
        let now = fixture_now();
        bookings
            .insert(&Booking::new(tour_id, user_id, 100, true, now))
            .await
            .expect("first");
        let err = bookings
            .insert(&Booking::new(tour_id, user_id, 100, true, now))
            .await
            .expect_err("second");
        assert_eq!(err, RepositoryError::duplicate_key(BOOKINGS_USER_TOUR_KEY));
        bookings
            .insert(&Booking::new(TourId::random(), user_id, 100, true, now))
            .await
            .expect("other tour");
        assert_eq!(store.booking_count(), 2);
    }
}
