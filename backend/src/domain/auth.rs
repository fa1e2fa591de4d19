//! Authorization table and credential primitives.
//!
//! Every privileged operation names a [`Capability`]; the roles that hold it
//! are listed once in [`Capability::roles`] and checked by [`authorize`].
//! Handlers and services never compare roles directly.

use std::fmt;

use chrono::{DateTime, Utc};
use zeroize::Zeroizing;

use super::{EmailAddress, Error, Role, User, UserId};

/// Minimum password length accepted at signup and password change.
pub const PASSWORD_MIN_LEN: usize = 8;

const ALL_ROLES: &[Role] = &[Role::User, Role::Guide, Role::LeadGuide, Role::Admin];

/// Operations gated by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Create, edit, delete tours and their images.
    ManageTours,
    /// Administer user accounts.
    ManageUsers,
    /// Administer bookings, including their `paid` flag.
    ManageBookings,
    /// Submit reviews.
    WriteReviews,
    /// Edit or delete reviews written by others.
    ModerateReviews,
    /// Start checkout and list own bookings.
    BookTours,
    /// Run data maintenance jobs.
    RunMaintenance,
}

impl Capability {
    /// Roles holding this capability.
    pub const fn roles(self) -> &'static [Role] {
        match self {
            Self::ManageTours | Self::ManageBookings => &[Role::Admin, Role::LeadGuide],
            Self::ManageUsers | Self::ModerateReviews | Self::RunMaintenance => &[Role::Admin],
            Self::WriteReviews => &[Role::User],
            Self::BookTours => ALL_ROLES,
        }
    }

    /// Whether `role` holds this capability.
    pub fn allows(self, role: Role) -> bool {
        self.roles().contains(&role)
    }
}

/// Fail with `Forbidden` unless `role` holds `capability`.
///
/// # Examples
/// ```
/// use tourbook::domain::{authorize, Capability, ErrorCode, Role};
///
/// assert!(authorize(Role::LeadGuide, Capability::ManageTours).is_ok());
/// let err = authorize(Role::Guide, Capability::ManageTours).unwrap_err();
/// assert_eq!(err.code(), ErrorCode::Forbidden);
/// ```
pub fn authorize(role: Role, capability: Capability) -> Result<(), Error> {
    if capability.allows(role) {
        Ok(())
    } else {
        Err(Error::forbidden(
            "You do not have permission to perform this action",
        ))
    }
}

/// Authenticated caller of a service operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(id: UserId, role: Role) -> Self {
        Self { id, role }
    }

    /// Shortcut for [`authorize`] on this actor's role.
    pub fn require(&self, capability: Capability) -> Result<(), Error> {
        authorize(self.role, capability)
    }

    pub fn can(&self, capability: Capability) -> bool {
        capability.allows(self.role)
    }
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Self::new(user.id, user.role)
    }
}

/// Verified token contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    pub user_id: UserId,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Signed bearer token handed to clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Domain error returned when credential payload values are invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialValidationError {
    MissingCredentials,
    PasswordTooShort { min: usize },
    PasswordMismatch,
}

impl fmt::Display for CredentialValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCredentials => write!(f, "Please provide email and password!"),
            Self::PasswordTooShort { min } => {
                write!(f, "A password must have at least {min} characters")
            }
            Self::PasswordMismatch => write!(f, "Passwords are not the same!"),
        }
    }
}

impl std::error::Error for CredentialValidationError {}

/// Validated login credentials.
///
/// The email is normalised for lookups; the password keeps caller-provided
/// whitespace and is zeroed on drop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    email: String,
    password: Zeroizing<String>,
}

impl LoginCredentials {
    /// Construct credentials from raw inputs.
    pub fn try_from_parts(email: &str, password: &str) -> Result<Self, CredentialValidationError> {
        let normalised = email.trim().to_lowercase();
        if normalised.is_empty() || password.is_empty() {
            return Err(CredentialValidationError::MissingCredentials);
        }
        Ok(Self {
            email: normalised,
            password: Zeroizing::new(password.to_owned()),
        })
    }

    /// Email as typed, normalised. May not be syntactically valid.
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Parsed email when syntactically valid.
    pub fn email_address(&self) -> Option<EmailAddress> {
        EmailAddress::new(&self.email).ok()
    }

    pub fn password(&self) -> &str {
        self.password.as_str()
    }
}

/// A new password confirmed by the caller.
///
/// # Examples
/// ```
/// use tourbook::domain::NewPassword;
///
/// assert!(NewPassword::confirmed("pass1234", "pass1234").is_ok());
/// assert!(NewPassword::confirmed("pass1234", "pass12345").is_err());
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct NewPassword(Zeroizing<String>);

impl NewPassword {
    /// Validate length and confirmation.
    pub fn confirmed(password: &str, confirm: &str) -> Result<Self, CredentialValidationError> {
        if password.chars().count() < PASSWORD_MIN_LEN {
            return Err(CredentialValidationError::PasswordTooShort {
                min: PASSWORD_MIN_LEN,
            });
        }
        if password != confirm {
            return Err(CredentialValidationError::PasswordMismatch);
        }
        Ok(Self(Zeroizing::new(password.to_owned())))
    }

    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for NewPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NewPassword(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use rstest::rstest;

    #[rstest]
    #[case(Capability::ManageTours, Role::Admin, true)]
    #[case(Capability::ManageTours, Role::LeadGuide, true)]
    #[case(Capability::ManageTours, Role::Guide, false)]
    #[case(Capability::ManageTours, Role::User, false)]
    #[case(Capability::ManageUsers, Role::Admin, true)]
    #[case(Capability::ManageUsers, Role::LeadGuide, false)]
    #[case(Capability::ManageBookings, Role::LeadGuide, true)]
    #[case(Capability::ManageBookings, Role::Guide, false)]
    #[case(Capability::ManageBookings, Role::Admin, true)]
    #[case(Capability::ManageBookings, Role::User, false)]
    #[case(Capability::WriteReviews, Role::User, true)]
    #[case(Capability::WriteReviews, Role::Admin, false)]
    #[case(Capability::ModerateReviews, Role::Admin, true)]
    #[case(Capability::ModerateReviews, Role::User, false)]
    #[case(Capability::BookTours, Role::Guide, true)]
    #[case(Capability::RunMaintenance, Role::LeadGuide, false)]
    fn capability_table(#[case] capability: Capability, #[case] role: Role, #[case] allowed: bool) {
        assert_eq!(capability.allows(role), allowed);
        let result = authorize(role, capability);
        assert_eq!(result.is_ok(), allowed);
        if let Err(err) = result {
            assert_eq!(err.code(), ErrorCode::Forbidden);
        }
    }

    #[rstest]
    #[case("", "secret")]
    #[case("  ", "secret")]
    #[case("a@b.com", "")]
    fn login_requires_both_fields(#[case] email: &str, #[case] password: &str) {
        assert_eq!(
            LoginCredentials::try_from_parts(email, password),
            Err(CredentialValidationError::MissingCredentials)
        );
    }

    #[rstest]
    fn login_normalises_email() {
        let creds = LoginCredentials::try_from_parts(" Admin@Natours.io ", " pw ").expect("valid");
        assert_eq!(creds.email(), "admin@natours.io");
        assert_eq!(creds.password(), " pw ");
    }

    #[rstest]
    fn new_password_enforces_length_and_confirmation() {
        assert_eq!(
            NewPassword::confirmed("short", "short"),
            Err(CredentialValidationError::PasswordTooShort {
                min: PASSWORD_MIN_LEN
            })
        );
        assert_eq!(
            NewPassword::confirmed("longenough", "different"),
            Err(CredentialValidationError::PasswordMismatch)
        );
        let ok = NewPassword::confirmed("longenough", "longenough").expect("valid");
        assert_eq!(ok.expose(), "longenough");
    }
}
