//! Signup, login, password change and bearer-token authentication.

use std::sync::Arc;

use chrono::TimeDelta;
use mockable::Clock;
use tracing::{debug, info};

use super::crud::map_repository_error;
use super::ports::{
    CredentialHasher, CredentialHasherError, TokenService, TokenServiceError, UserRepository,
};
use super::{
    Actor, DEFAULT_PHOTO, EmailAddress, Error, IssuedToken, LoginCredentials, NewPassword,
    PasswordHash, Role, User, UserId, UserName,
};

const INCORRECT_CREDENTIALS: &str = "Incorrect email or password";

/// Signup payload before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

/// A user together with a freshly issued token.
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub user: User,
    pub token: IssuedToken,
}

pub(crate) fn map_hasher_error(error: CredentialHasherError) -> Error {
    Error::internal(error.to_string())
}

pub(crate) fn map_token_error(error: TokenServiceError) -> Error {
    match error {
        TokenServiceError::Expired => {
            Error::unauthenticated("Your token has expired! Please log in again.")
        }
        TokenServiceError::Invalid { message } => {
            debug!(%message, "rejected bearer token");
            Error::unauthenticated("Invalid token. Please log in again!")
        }
        TokenServiceError::Signing { message } => {
            Error::internal(format!("token signing failed: {message}"))
        }
    }
}

/// Hash a confirmed password.
pub(crate) fn hash_new_password(
    hasher: &dyn CredentialHasher,
    password: &NewPassword,
) -> Result<PasswordHash, Error> {
    hasher.hash(password.expose()).map_err(map_hasher_error)
}

/// Account use-cases.
#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserRepository>,
    hasher: Arc<dyn CredentialHasher>,
    tokens: Arc<dyn TokenService>,
    clock: Arc<dyn Clock>,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        hasher: Arc<dyn CredentialHasher>,
        tokens: Arc<dyn TokenService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            hasher,
            tokens,
            clock,
        }
    }

    fn issue(&self, user: User) -> Result<Authenticated, Error> {
        let token = self
            .tokens
            .issue(&user, self.clock.utc())
            .map_err(map_token_error)?;
        Ok(Authenticated { user, token })
    }

    /// Register a new `user`-role account and sign it in.
    pub async fn signup(&self, request: SignupRequest) -> Result<Authenticated, Error> {
        let name = UserName::new(&request.name).map_err(|e| Error::invalid_request(e.to_string()))?;
        let email =
            EmailAddress::new(&request.email).map_err(|e| Error::invalid_request(e.to_string()))?;
        let password = NewPassword::confirmed(&request.password, &request.password_confirm)
            .map_err(|e| Error::invalid_request(e.to_string()))?;
        let user = User {
            id: UserId::random(),
            name,
            email,
            role: Role::User,
            active: true,
            photo: DEFAULT_PHOTO.to_owned(),
            password_hash: hash_new_password(self.hasher.as_ref(), &password)?,
            password_changed_at: None,
            created_at: self.clock.utc(),
        };
        self.users
            .insert(&user)
            .await
            .map_err(map_repository_error::<User>)?;
        info!(user_id = %user.id, "account created");
        self.issue(user)
    }

    /// Exchange credentials for a token.
    ///
    /// Unknown emails, wrong passwords and deactivated accounts are
    /// indistinguishable to the caller.
    pub async fn login(&self, credentials: LoginCredentials) -> Result<Authenticated, Error> {
        let Some(email) = credentials.email_address() else {
            return Err(Error::unauthenticated(INCORRECT_CREDENTIALS));
        };
        let user = self
            .users
            .find_by_email(&email)
            .await
            .map_err(map_repository_error::<User>)?
            .ok_or_else(|| Error::unauthenticated(INCORRECT_CREDENTIALS))?;
        let matches = self
            .hasher
            .verify(credentials.password(), &user.password_hash)
            .map_err(map_hasher_error)?;
        if !matches {
            return Err(Error::unauthenticated(INCORRECT_CREDENTIALS));
        }
        self.issue(user)
    }

    /// Change the caller's password after re-checking the current one.
    pub async fn update_password(
        &self,
        actor: &Actor,
        current_password: &str,
        new_password: NewPassword,
    ) -> Result<Authenticated, Error> {
        let mut user = self
            .users
            .find_by_id(actor.id)
            .await
            .map_err(map_repository_error::<User>)?
            .ok_or_else(|| {
                Error::unauthenticated("The user belonging to this token no longer exists.")
            })?;
        let matches = self
            .hasher
            .verify(current_password, &user.password_hash)
            .map_err(map_hasher_error)?;
        if !matches {
            return Err(Error::unauthenticated("Your current password is wrong."));
        }
        let now = self.clock.utc();
        user.password_hash = hash_new_password(self.hasher.as_ref(), &new_password)?;
        // Backdated so the token issued below is not treated as stale.
        user.password_changed_at = Some(now - TimeDelta::seconds(1));
        self.users
            .update(&user)
            .await
            .map_err(map_repository_error::<User>)?;
        info!(user_id = %user.id, "password changed");
        self.issue(user)
    }

    /// Resolve a bearer token to its active user.
    pub async fn authenticate(&self, token: &str) -> Result<User, Error> {
        let claims = self
            .tokens
            .verify(token, self.clock.utc())
            .map_err(map_token_error)?;
        let user = self
            .users
            .find_by_id(claims.user_id)
            .await
            .map_err(map_repository_error::<User>)?
            .ok_or_else(|| {
                Error::unauthenticated("The user belonging to this token no longer exists.")
            })?;
        if user.changed_password_after(claims.issued_at) {
            return Err(Error::unauthenticated(
                "User recently changed password. Please log in again.",
            ));
        }
        Ok(user)
    }
}

#[cfg(test)]
#[path = "account_service_tests.rs"]
mod tests;
