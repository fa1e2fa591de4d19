//! Test utilities shared by unit tests in `src/` and suites in `tests/`.
//!
//! Compiled for `cfg(test)` and behind the `test-support` feature.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
use mockable::Clock;

use crate::domain::ports::{CredentialHasher, CredentialHasherError};
use crate::domain::{
    Difficulty, EmailAddress, GeoPoint, Location, PasswordHash, Role, Tour, TourDetails, User,
    UserId, UserName,
};
use crate::outbound::memory::InMemoryTourRepository;
use crate::outbound::security::JwtTokenService;

mod doubles;
pub mod http;

pub use doubles::{
    MEDIA_TEST_BASE, RecordingMediaStore, RecordingPaymentGateway, checkout_completed_payload,
    sign_webhook,
};

/// Password every [`sample_user`] is created with.
pub const SAMPLE_PASSWORD: &str = "password123";

/// Webhook secret shared by [`RecordingPaymentGateway`] and [`sign_webhook`].
pub const TEST_WEBHOOK_SECRET: &str = "whsec_test_secret";

/// Fixed instant every fixture is stamped with: 2025-06-01T12:00:00Z.
pub fn fixture_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0)
        .single()
        .unwrap_or_else(|| panic!("fixture timestamp is unambiguous"))
}

/// Clock that only moves when told to.
pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn advance_seconds(&self, seconds: i64) {
        *self.lock_clock() += TimeDelta::seconds(seconds);
    }

    fn lock_clock(&self) -> MutexGuard<'_, DateTime<Utc>> {
        match self.0.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("clock mutex"),
        }
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.lock_clock()
    }
}

/// Reversible hasher so tests skip Argon2's cost.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaintextHasher;

const PLAINTEXT_PREFIX: &str = "plain$";

impl CredentialHasher for PlaintextHasher {
    fn hash(&self, password: &str) -> Result<PasswordHash, CredentialHasherError> {
        Ok(PasswordHash::from_encoded(format!(
            "{PLAINTEXT_PREFIX}{password}"
        )))
    }

    fn verify(&self, password: &str, hash: &PasswordHash) -> Result<bool, CredentialHasherError> {
        hash.as_str()
            .strip_prefix(PLAINTEXT_PREFIX)
            .map(|stored| stored == password)
            .ok_or_else(|| CredentialHasherError::malformed("missing plain$ prefix"))
    }
}

/// Token service with a fixed key and a 90 day lifetime.
pub fn test_token_service() -> JwtTokenService {
    JwtTokenService::new(b"tourbook-test-signing-key-32-byt", TimeDelta::days(90))
}

/// Active user whose password is [`SAMPLE_PASSWORD`].
pub fn sample_user(name: &str, email: &str, role: Role) -> User {
    let password_hash = PlaintextHasher
        .hash(SAMPLE_PASSWORD)
        .unwrap_or_else(|err| panic!("plaintext hashing cannot fail: {err}"));
    User {
        id: UserId::random(),
        name: UserName::new(name).unwrap_or_else(|err| panic!("sample name: {err}")),
        email: EmailAddress::new(email).unwrap_or_else(|err| panic!("sample email: {err}")),
        role,
        active: true,
        photo: crate::domain::DEFAULT_PHOTO.to_owned(),
        password_hash,
        password_changed_at: None,
        created_at: fixture_now(),
    }
}

/// Valid tour details; the cover is a legacy file name, not a hosted URL.
pub fn sample_tour_details(name: &str) -> TourDetails {
    TourDetails {
        name: name.to_owned(),
        duration_days: 5,
        max_group_size: 25,
        difficulty: Difficulty::Easy,
        price: 49_700,
        price_discount: None,
        summary: "Breathtaking hike through the Canadian Banff National Park".to_owned(),
        description: Some("Ut enim ad minim veniam, quis nostrud exercitation.".to_owned()),
        image_cover: "tour-1-cover.jpg".to_owned(),
        images: vec!["tour-1-1.jpg".to_owned(), "tour-1-2.jpg".to_owned()],
        start_dates: vec![fixture_now() + TimeDelta::days(30)],
        start_location: Some(Location {
            description: "Banff, CAN".to_owned(),
            address: Some("224 Banff Ave, Banff, AB, Canada".to_owned()),
            day: None,
            coordinates: GeoPoint::new(-115.570154, 51.178456),
        }),
        locations: vec![Location {
            description: "Banff National Park".to_owned(),
            address: None,
            day: Some(1),
            coordinates: GeoPoint::new(-116.214531, 51.417611),
        }],
        guides: Vec::new(),
    }
}

/// Tour created at [`fixture_now`].
pub fn sample_tour(name: &str) -> Tour {
    Tour::new(sample_tour_details(name), fixture_now())
}

/// Empty in-memory tour repository.
pub fn tour_repository() -> Arc<InMemoryTourRepository> {
    Arc::new(crate::outbound::memory::InMemoryStore::default().tours())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn plaintext_hasher_round_trips() {
        let hash = PlaintextHasher.hash("secret").expect("hash");
        assert_eq!(PlaintextHasher.verify("secret", &hash), Ok(true));
        assert_eq!(PlaintextHasher.verify("other", &hash), Ok(false));
    }

    #[rstest]
    fn sample_tours_are_valid() {
        assert_eq!(sample_tour_details("The Forest Hiker").validate(), Ok(()));
    }

    #[rstest]
    fn mutable_clock_only_moves_on_request() {
        let clock = MutableClock::new(fixture_now());
        clock.advance_seconds(90);
        assert_eq!(clock.utc(), fixture_now() + TimeDelta::seconds(90));
    }
}
