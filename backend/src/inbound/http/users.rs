//! Profile and user administration endpoints.
//!
//! ```text
//! GET    /api/v1/users/me
//! PATCH  /api/v1/users/update-me {"name":"Ada"}
//! DELETE /api/v1/users/delete-me
//! PATCH  /api/v1/users/me/photo   (multipart field `photo`)
//! GET    /api/v1/users            (admin)
//! POST   /api/v1/users            (admin)
//! GET    /api/v1/users/{id}       (admin)
//! PATCH  /api/v1/users/{id}       (admin)
//! DELETE /api/v1/users/{id}       (admin)
//! ```

use actix_multipart::Multipart;
use actix_web::{HttpResponse, delete, get, patch, post, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{NewUser, ProfileUpdate, Role, User, UserId, UserPatch};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::AuthContext;
use crate::inbound::http::envelope::{Envelope, Wrapped};
use crate::inbound::http::schemas::{ErrorSchema, RoleSchema};
use crate::inbound::http::state::HttpState;
use crate::inbound::http::uploads::{ImageField, collect_images};
use crate::inbound::http::validation::{FieldName, PageQuery, parse_id};

const PHOTO_FIELD: ImageField = ImageField::new("photo", 1);

/// Public view of an account. The password hash never leaves the domain.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    #[schema(value_type = String, example = "3fa85f64-5717-4562-b3fc-2c963f66afa6")]
    pub id: UserId,
    #[schema(example = "Ada Lovelace")]
    pub name: String,
    #[schema(example = "ada@example.com")]
    pub email: String,
    #[schema(value_type = RoleSchema)]
    pub role: Role,
    pub active: bool,
    /// File name or hosted URL of the profile photo.
    pub photo: String,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserDto {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.as_str().to_owned(),
            email: user.email.as_str().to_owned(),
            role: user.role,
            active: user.active,
            photo: user.photo.clone(),
            created_at: user.created_at,
        }
    }
}

/// Self-service profile edit. Password fields are accepted only to be refused.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMeBody {
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_confirm: Option<String>,
}

impl From<UpdateMeBody> for ProfileUpdate {
    fn from(body: UpdateMeBody) -> Self {
        Self {
            includes_password: body.password.is_some() || body.password_confirm.is_some(),
            name: body.name,
            email: body.email,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserBody {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    /// Defaults to `user`.
    #[schema(value_type = Option<RoleSchema>)]
    pub role: Option<Role>,
    /// Defaults to `true`.
    pub active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserBody {
    pub name: Option<String>,
    pub email: Option<String>,
    #[schema(value_type = Option<RoleSchema>)]
    pub role: Option<Role>,
    pub active: Option<bool>,
    pub password: Option<String>,
    pub password_confirm: Option<String>,
}

fn user_id(raw: &str) -> ApiResult<UserId> {
    parse_id(raw, FieldName::new("id"))
}

fn one(user: &User) -> web::Json<Envelope<Wrapped<UserDto>>> {
    web::Json(Envelope::one(UserDto::from(user)))
}

/// The caller's own account.
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    responses(
        (status = 200, description = "Current user", body = Envelope<Wrapped<UserDto>>),
        (status = 401, description = "Not logged in", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "getMe"
)]
#[get("/users/me")]
pub async fn get_me(
    state: web::Data<HttpState>,
    auth: AuthContext,
) -> ApiResult<web::Json<Envelope<Wrapped<UserDto>>>> {
    let user = state.users.get_me(&auth.actor()).await?;
    Ok(one(&user))
}

/// Change the caller's name or email.
#[utoipa::path(
    patch,
    path = "/api/v1/users/update-me",
    request_body = UpdateMeBody,
    responses(
        (status = 200, description = "Profile updated", body = Envelope<Wrapped<UserDto>>),
        (
            status = 400,
            description = "Invalid fields or password fields present",
            body = ErrorSchema
        ),
        (status = 401, description = "Not logged in", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "updateMe"
)]
#[patch("/users/update-me")]
pub async fn update_me(
    state: web::Data<HttpState>,
    auth: AuthContext,
    payload: web::Json<UpdateMeBody>,
) -> ApiResult<web::Json<Envelope<Wrapped<UserDto>>>> {
    let user = state
        .users
        .update_me(&auth.actor(), payload.into_inner().into())
        .await?;
    Ok(one(&user))
}

/// Deactivate the caller's account.
#[utoipa::path(
    delete,
    path = "/api/v1/users/delete-me",
    responses(
        (status = 204, description = "Account deactivated"),
        (status = 401, description = "Not logged in", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "deleteMe"
)]
#[delete("/users/delete-me")]
pub async fn delete_me(state: web::Data<HttpState>, auth: AuthContext) -> ApiResult<HttpResponse> {
    state.users.delete_me(&auth.actor()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Replace the caller's profile photo.
#[utoipa::path(
    patch,
    path = "/api/v1/users/me/photo",
    request_body(content_type = "multipart/form-data", description = "Image file in field `photo`"),
    responses(
        (status = 200, description = "Photo stored", body = Envelope<Wrapped<UserDto>>),
        (status = 400, description = "Missing or non-image file", body = ErrorSchema),
        (status = 401, description = "Not logged in", body = ErrorSchema),
        (status = 503, description = "Media host unavailable", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "uploadMyPhoto"
)]
#[patch("/users/me/photo")]
pub async fn upload_my_photo(
    state: web::Data<HttpState>,
    auth: AuthContext,
    payload: Multipart,
) -> ApiResult<web::Json<Envelope<Wrapped<UserDto>>>> {
    let photo = collect_images(payload, &[PHOTO_FIELD])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| crate::domain::Error::invalid_request("Please upload a photo"))?;
    let user = state
        .users
        .upload_my_photo(&auth.actor(), photo.bytes)
        .await?;
    Ok(one(&user))
}

/// All active accounts.
#[utoipa::path(
    get,
    path = "/api/v1/users",
    params(PageQuery),
    responses(
        (status = 200, description = "Users", body = Envelope<Wrapped<Vec<UserDto>>>),
        (status = 401, description = "Not logged in", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "listUsers"
)]
#[get("/users")]
pub async fn list_users(
    state: web::Data<HttpState>,
    auth: AuthContext,
    query: web::Query<PageQuery>,
) -> ApiResult<web::Json<Envelope<Wrapped<Vec<UserDto>>>>> {
    let users = state
        .users
        .list_users(&auth.actor(), query.into_inner().into())
        .await?;
    Ok(web::Json(Envelope::many(
        users.iter().map(UserDto::from).collect(),
    )))
}

/// Create an account with an explicit role.
#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = CreateUserBody,
    responses(
        (status = 201, description = "User created", body = Envelope<Wrapped<UserDto>>),
        (status = 400, description = "Invalid request or email taken", body = ErrorSchema),
        (status = 401, description = "Not logged in", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "createUser"
)]
#[post("/users")]
pub async fn create_user(
    state: web::Data<HttpState>,
    auth: AuthContext,
    payload: web::Json<CreateUserBody>,
) -> ApiResult<HttpResponse> {
    let CreateUserBody {
        name,
        email,
        password,
        password_confirm,
        role,
        active,
    } = payload.into_inner();
    let user = state
        .users
        .create_user(
            &auth.actor(),
            NewUser {
                name,
                email,
                password,
                password_confirm,
                role,
                active,
            },
        )
        .await?;
    Ok(HttpResponse::Created().json(Envelope::one(UserDto::from(&user))))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "User", body = Envelope<Wrapped<UserDto>>),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 404, description = "No user found with that ID", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "getUser"
)]
#[get("/users/{id}")]
pub async fn get_user(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<Envelope<Wrapped<UserDto>>>> {
    let id = user_id(&path)?;
    let user = state.users.get_user(&auth.actor(), id).await?;
    Ok(one(&user))
}

/// Edit an account; absent fields keep their stored values.
#[utoipa::path(
    patch,
    path = "/api/v1/users/{id}",
    params(("id" = String, Path, description = "User id")),
    request_body = UpdateUserBody,
    responses(
        (status = 200, description = "User updated", body = Envelope<Wrapped<UserDto>>),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 404, description = "No user found with that ID", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "updateUser"
)]
#[patch("/users/{id}")]
pub async fn update_user(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<String>,
    payload: web::Json<UpdateUserBody>,
) -> ApiResult<web::Json<Envelope<Wrapped<UserDto>>>> {
    let id = user_id(&path)?;
    let UpdateUserBody {
        name,
        email,
        role,
        active,
        password,
        password_confirm,
    } = payload.into_inner();
    let user = state
        .users
        .update_user(
            &auth.actor(),
            id,
            UserPatch {
                name,
                email,
                role,
                active,
                password,
                password_confirm,
            },
        )
        .await?;
    Ok(one(&user))
}

/// Deactivate another account.
#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 204, description = "User deactivated"),
        (status = 403, description = "Forbidden or deleting yourself", body = ErrorSchema),
        (status = 404, description = "No user found with that ID", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "deleteUser"
)]
#[delete("/users/{id}")]
pub async fn delete_user(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let id = user_id(&path)?;
    state.users.delete_user(&auth.actor(), id).await?;
    Ok(HttpResponse::NoContent().finish())
}
