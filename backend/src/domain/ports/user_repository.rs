//! Port abstraction for user account persistence.
use async_trait::async_trait;

use crate::domain::{EmailAddress, User};

use super::{Repository, RepositoryError};

/// User persistence.
///
/// `delete` deactivates the account instead of removing the row, and every
/// lookup (including `find_by_email`) skips inactive accounts.
#[async_trait]
pub trait UserRepository: Repository<User> {
    /// Fetch an active user by normalised email.
    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<User>, RepositoryError>;
}
