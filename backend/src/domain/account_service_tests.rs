//! Tests for account signup, login and token authentication.

use std::sync::Arc;

use super::*;
use crate::domain::ports::MockTokenService;
use crate::domain::{ErrorCode, TokenClaims};
use crate::domain::ports::Repository;
use crate::outbound::memory::InMemoryStore;
use crate::test_support::{MutableClock, PlaintextHasher, fixture_now, test_token_service};
use rstest::{fixture, rstest};

struct Harness {
    store: InMemoryStore,
    clock: Arc<MutableClock>,
    service: AccountService,
}

#[fixture]
fn harness() -> Harness {
    let store = InMemoryStore::default();
    let clock = Arc::new(MutableClock::new(fixture_now()));
    let service = AccountService::new(
        Arc::new(store.users()),
        Arc::new(PlaintextHasher),
        Arc::new(test_token_service()),
        clock.clone(),
    );
    Harness {
        store,
        clock,
        service,
    }
}

fn signup_request(email: &str) -> SignupRequest {
    SignupRequest {
        name: "Laura Wilson".to_owned(),
        email: email.to_owned(),
        password: "pass1234".to_owned(),
        password_confirm: "pass1234".to_owned(),
    }
}

fn credentials(email: &str, password: &str) -> LoginCredentials {
    LoginCredentials::try_from_parts(email, password).expect("credentials")
}

#[rstest]
#[tokio::test]
async fn signup_creates_a_user_role_account(harness: Harness) {
    let created = harness
        .service
        .signup(signup_request("Laura@Example.com"))
        .await
        .expect("signup");
    assert_eq!(created.user.role, Role::User);
    assert_eq!(created.user.email.as_str(), "laura@example.com");
    assert_eq!(created.user.photo, DEFAULT_PHOTO);

    let resolved = harness
        .service
        .authenticate(&created.token.token)
        .await
        .expect("token resolves");
    assert_eq!(resolved.id, created.user.id);
}

#[rstest]
#[tokio::test]
async fn signup_rejects_mismatched_confirmation(harness: Harness) {
    let mut request = signup_request("laura@example.com");
    request.password_confirm = "pass12345".to_owned();
    let err = harness.service.signup(request).await.expect_err("mismatch");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
    assert_eq!(err.message(), "Passwords are not the same!");
}

#[rstest]
#[tokio::test]
async fn signup_with_taken_email_is_duplicate(harness: Harness) {
    harness
        .service
        .signup(signup_request("laura@example.com"))
        .await
        .expect("first signup");
    let err = harness
        .service
        .signup(signup_request("LAURA@example.com"))
        .await
        .expect_err("duplicate");
    assert_eq!(err.code(), ErrorCode::DuplicateKey);
    assert_eq!(err.message(), "Email address is already registered");
    assert_eq!(harness.store.user_count(), 1);
}

#[rstest]
#[case("laura@example.com", "wrong-password")]
#[case("nobody@example.com", "pass1234")]
#[case("not-an-email", "pass1234")]
#[tokio::test]
async fn login_failures_share_one_message(
    harness: Harness,
    #[case] email: &str,
    #[case] password: &str,
) {
    harness
        .service
        .signup(signup_request("laura@example.com"))
        .await
        .expect("signup");
    let err = harness
        .service
        .login(credentials(email, password))
        .await
        .expect_err("login fails");
    assert_eq!(err.code(), ErrorCode::Unauthenticated);
    assert_eq!(err.message(), "Incorrect email or password");
}

#[rstest]
#[tokio::test]
async fn deactivated_users_cannot_log_in(harness: Harness) {
    let created = harness
        .service
        .signup(signup_request("laura@example.com"))
        .await
        .expect("signup");
    harness
        .store
        .users()
        .delete(created.user.id)
        .await
        .expect("deactivate");
    let err = harness
        .service
        .login(credentials("laura@example.com", "pass1234"))
        .await
        .expect_err("inactive");
    assert_eq!(err.message(), "Incorrect email or password");

    let err = harness
        .service
        .authenticate(&created.token.token)
        .await
        .expect_err("inactive");
    assert_eq!(
        err.message(),
        "The user belonging to this token no longer exists."
    );
}

#[rstest]
#[tokio::test]
async fn password_change_invalidates_older_tokens(harness: Harness) {
    let created = harness
        .service
        .signup(signup_request("laura@example.com"))
        .await
        .expect("signup");
    harness.clock.advance_seconds(60);

    let actor = Actor::from(&created.user);
    let new_password = NewPassword::confirmed("newpass123", "newpass123").expect("password");
    let refreshed = harness
        .service
        .update_password(&actor, "pass1234", new_password)
        .await
        .expect("password change");

    let err = harness
        .service
        .authenticate(&created.token.token)
        .await
        .expect_err("stale token");
    assert_eq!(
        err.message(),
        "User recently changed password. Please log in again."
    );
    harness
        .service
        .authenticate(&refreshed.token.token)
        .await
        .expect("fresh token works");
    harness
        .service
        .login(credentials("laura@example.com", "newpass123"))
        .await
        .expect("new password works");
}

#[rstest]
#[tokio::test]
async fn password_change_requires_current_password(harness: Harness) {
    let created = harness
        .service
        .signup(signup_request("laura@example.com"))
        .await
        .expect("signup");
    let actor = Actor::from(&created.user);
    let new_password = NewPassword::confirmed("newpass123", "newpass123").expect("password");
    let err = harness
        .service
        .update_password(&actor, "guess", new_password)
        .await
        .expect_err("wrong current password");
    assert_eq!(err.code(), ErrorCode::Unauthenticated);
    assert_eq!(err.message(), "Your current password is wrong.");
}

#[rstest]
#[tokio::test]
async fn expired_tokens_are_unauthenticated() {
    let mut tokens = MockTokenService::new();
    tokens
        .expect_verify()
        .times(1)
        .returning(|_, _| Err(TokenServiceError::expired()));
    let service = AccountService::new(
        Arc::new(InMemoryStore::default().users()),
        Arc::new(PlaintextHasher),
        Arc::new(tokens),
        Arc::new(MutableClock::new(fixture_now())),
    );
    let err = service.authenticate("token").await.expect_err("expired");
    assert_eq!(err.code(), ErrorCode::Unauthenticated);
    assert_eq!(err.message(), "Your token has expired! Please log in again.");
}

#[rstest]
#[tokio::test]
async fn tokens_for_unknown_users_are_rejected() {
    let mut tokens = MockTokenService::new();
    tokens.expect_verify().times(1).returning(|_, now| {
        Ok(TokenClaims {
            user_id: UserId::random(),
            issued_at: now,
            expires_at: now + TimeDelta::days(1),
        })
    });
    let service = AccountService::new(
        Arc::new(InMemoryStore::default().users()),
        Arc::new(PlaintextHasher),
        Arc::new(tokens),
        Arc::new(MutableClock::new(fixture_now())),
    );
    let err = service.authenticate("token").await.expect_err("unknown user");
    assert_eq!(err.code(), ErrorCode::Unauthenticated);
}
