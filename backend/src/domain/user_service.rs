//! Self-service profile operations and user administration.

use std::sync::Arc;

use mockable::Clock;
use tracing::{info, warn};

use super::account_service::hash_new_password;
use super::crud::CrudService;
use super::ports::{
    CredentialHasher, ImageTransform, ImageUpload, MediaFolder, MediaStore, MediaStoreError,
    PageRequest, UserRepository,
};
use super::user::is_absolute_url;
use super::{
    Actor, Capability, DEFAULT_PHOTO, EmailAddress, Error, NewPassword, Role, User, UserId,
    UserName,
};

/// Fields a user may change on their own profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    /// Set when the request carried password fields, which this path refuses.
    pub includes_password: bool,
}

/// Admin payload for creating an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub role: Option<Role>,
    pub active: Option<bool>,
}

/// Admin payload for editing an account; absent fields keep stored values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub active: Option<bool>,
    pub password: Option<String>,
    pub password_confirm: Option<String>,
}

fn invalid(err: impl ToString) -> Error {
    Error::invalid_request(err.to_string())
}

pub(crate) fn map_media_error(error: MediaStoreError) -> Error {
    warn!(kind = error.kind(), %error, "media host call failed");
    match error {
        MediaStoreError::Transport { .. } => {
            Error::service_unavailable("Image upload is currently unavailable")
        }
        other => Error::internal(other.to_string()),
    }
}

/// Derive the host-side public id from a hosted image URL.
///
/// `https://host/.../users/user-1-2.jpeg` yields `user-1-2`.
pub(crate) fn public_id_from_url(url: &str) -> Option<&str> {
    let file = url.rsplit('/').next()?;
    let stem = file.split_once('.').map_or(file, |(stem, _)| stem);
    (!stem.is_empty()).then_some(stem)
}

/// User profile and administration use-cases.
#[derive(Clone)]
pub struct UserService {
    crud: CrudService<User, dyn UserRepository>,
    hasher: Arc<dyn CredentialHasher>,
    media: Arc<dyn MediaStore>,
    clock: Arc<dyn Clock>,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        hasher: Arc<dyn CredentialHasher>,
        media: Arc<dyn MediaStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            crud: CrudService::new(users),
            hasher,
            media,
            clock,
        }
    }

    /// The caller's own account.
    pub async fn get_me(&self, actor: &Actor) -> Result<User, Error> {
        self.crud.get_one(actor.id).await
    }

    /// Update the caller's name and email.
    pub async fn update_me(&self, actor: &Actor, update: ProfileUpdate) -> Result<User, Error> {
        if update.includes_password {
            return Err(Error::invalid_request(
                "This route is not for password updates. Please use /users/update-my-password.",
            ));
        }
        let mut user = self.crud.get_one(actor.id).await?;
        if let Some(name) = update.name {
            user.name = UserName::new(name).map_err(invalid)?;
        }
        if let Some(email) = update.email {
            user.email = EmailAddress::new(email).map_err(invalid)?;
        }
        self.crud.update(user).await
    }

    /// Deactivate the caller's account.
    pub async fn delete_me(&self, actor: &Actor) -> Result<(), Error> {
        self.crud.delete(actor.id).await?;
        info!(user_id = %actor.id, "account deactivated by owner");
        Ok(())
    }

    /// Host a new profile photo and point the account at it.
    pub async fn upload_my_photo(&self, actor: &Actor, bytes: Vec<u8>) -> Result<User, Error> {
        let mut user = self.crud.get_one(actor.id).await?;
        let public_id = format!(
            "user-{}-{}",
            user.id,
            self.clock.utc().timestamp_millis()
        );
        let url = self
            .media
            .upload(ImageUpload {
                folder: MediaFolder::Users,
                public_id,
                bytes,
                transform: ImageTransform::USER_PHOTO,
            })
            .await
            .map_err(map_media_error)?;
        let previous = std::mem::replace(&mut user.photo, url);
        let user = self.crud.update(user).await?;
        if is_absolute_url(&previous) {
            self.discard_photo(&previous).await;
        }
        Ok(user)
    }

    async fn discard_photo(&self, url: &str) {
        let Some(public_id) = public_id_from_url(url) else {
            return;
        };
        if let Err(error) = self.media.delete(MediaFolder::Users, public_id).await {
            warn!(%error, public_id, "failed to remove previous photo");
        }
    }

    /// Create an account on behalf of an administrator.
    pub async fn create_user(&self, actor: &Actor, request: NewUser) -> Result<User, Error> {
        actor.require(Capability::ManageUsers)?;
        let password = NewPassword::confirmed(&request.password, &request.password_confirm)
            .map_err(invalid)?;
        let user = User {
            id: UserId::random(),
            name: UserName::new(&request.name).map_err(invalid)?,
            email: EmailAddress::new(&request.email).map_err(invalid)?,
            role: request.role.unwrap_or_default(),
            active: request.active.unwrap_or(true),
            photo: DEFAULT_PHOTO.to_owned(),
            password_hash: hash_new_password(self.hasher.as_ref(), &password)?,
            password_changed_at: None,
            created_at: self.clock.utc(),
        };
        let user = self.crud.create(user).await?;
        info!(user_id = %user.id, created_by = %actor.id, "user created");
        Ok(user)
    }

    pub async fn get_user(&self, actor: &Actor, id: UserId) -> Result<User, Error> {
        actor.require(Capability::ManageUsers)?;
        self.crud.get_one(id).await
    }

    pub async fn list_users(&self, actor: &Actor, page: PageRequest) -> Result<Vec<User>, Error> {
        actor.require(Capability::ManageUsers)?;
        self.crud.get_all(page).await
    }

    /// Edit an account, falling back to stored values for absent fields.
    pub async fn update_user(
        &self,
        actor: &Actor,
        id: UserId,
        patch: UserPatch,
    ) -> Result<User, Error> {
        actor.require(Capability::ManageUsers)?;
        let mut user = self.crud.get_one(id).await?;
        if let Some(name) = patch.name {
            user.name = UserName::new(name).map_err(invalid)?;
        }
        if let Some(email) = patch.email {
            user.email = EmailAddress::new(email).map_err(invalid)?;
        }
        if let Some(role) = patch.role {
            user.role = role;
        }
        if let Some(active) = patch.active {
            user.active = active;
        }
        if let Some(password) = patch.password {
            let confirm = patch.password_confirm.unwrap_or_default();
            let password = NewPassword::confirmed(&password, &confirm).map_err(invalid)?;
            user.password_hash = hash_new_password(self.hasher.as_ref(), &password)?;
            user.password_changed_at = Some(self.clock.utc());
        }
        self.crud.update(user).await
    }

    /// Deactivate another account.
    pub async fn delete_user(&self, actor: &Actor, id: UserId) -> Result<(), Error> {
        actor.require(Capability::ManageUsers)?;
        if actor.id == id {
            return Err(Error::forbidden(
                "You cannot delete your own account while logged in. Please contact another administrator.",
            ));
        }
        self.crud.delete(id).await?;
        info!(user_id = %id, deleted_by = %actor.id, "user deactivated");
        Ok(())
    }
}

#[cfg(test)]
#[path = "user_service_tests.rs"]
mod tests;
