//! Signup, login and password change.
//!
//! ```text
//! POST  /api/v1/users/signup
//!       {"name":"Ada","email":"ada@example.com","password":"...","passwordConfirm":"..."}
//! POST  /api/v1/users/login {"email":"ada@example.com","password":"..."}
//! PATCH /api/v1/users/update-my-password
//! ```
//!
//! Each returns `{status, token, expiresAt, data: {user}}`.

use actix_web::{HttpResponse, patch, post, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Authenticated, LoginCredentials, NewPassword, SignupRequest};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::AuthContext;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::users::UserDto;
use crate::inbound::http::validation::{FieldName, invalid_field};

#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignupBody {
    #[schema(example = "Ada Lovelace")]
    pub name: String,
    #[schema(example = "ada@example.com")]
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct LoginBody {
    #[schema(example = "ada@example.com")]
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordBody {
    pub password_current: String,
    pub password: String,
    pub password_confirm: String,
}

/// `data` member of [`AuthResponse`].
#[derive(Debug, Serialize, ToSchema)]
pub struct UserData {
    pub user: UserDto,
}

/// A signed token plus the account it belongs to.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    #[schema(value_type = String, example = "success")]
    pub status: &'static str,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub data: UserData,
}

impl From<Authenticated> for AuthResponse {
    fn from(value: Authenticated) -> Self {
        Self {
            status: "success",
            token: value.token.token,
            expires_at: value.token.expires_at,
            data: UserData {
                user: UserDto::from(&value.user),
            },
        }
    }
}

/// Create a `user` account and sign the caller in.
#[utoipa::path(
    post,
    path = "/api/v1/users/signup",
    request_body = SignupBody,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Invalid request or email taken", body = ErrorSchema)
    ),
    tags = ["accounts"],
    operation_id = "signup",
    security([])
)]
#[post("/users/signup")]
pub async fn signup(
    state: web::Data<HttpState>,
    payload: web::Json<SignupBody>,
) -> ApiResult<HttpResponse> {
    let SignupBody {
        name,
        email,
        password,
        password_confirm,
    } = payload.into_inner();
    let authenticated = state
        .accounts
        .signup(SignupRequest {
            name,
            email,
            password,
            password_confirm,
        })
        .await?;
    Ok(HttpResponse::Created().json(AuthResponse::from(authenticated)))
}

/// Exchange email and password for a token.
#[utoipa::path(
    post,
    path = "/api/v1/users/login",
    request_body = LoginBody,
    responses(
        (status = 200, description = "Login success", body = AuthResponse),
        (status = 400, description = "Missing email or password", body = ErrorSchema),
        (status = 401, description = "Incorrect email or password", body = ErrorSchema)
    ),
    tags = ["accounts"],
    operation_id = "login",
    security([])
)]
#[post("/users/login")]
pub async fn login(
    state: web::Data<HttpState>,
    payload: web::Json<LoginBody>,
) -> ApiResult<web::Json<AuthResponse>> {
    let credentials = LoginCredentials::try_from_parts(&payload.email, &payload.password)
        .map_err(|err| invalid_field(FieldName::new("email"), err))?;
    let authenticated = state.accounts.login(credentials).await?;
    Ok(web::Json(AuthResponse::from(authenticated)))
}

/// Change the caller's password and return a fresh token.
#[utoipa::path(
    patch,
    path = "/api/v1/users/update-my-password",
    request_body = UpdatePasswordBody,
    responses(
        (status = 200, description = "Password changed", body = AuthResponse),
        (status = 400, description = "Weak or unconfirmed password", body = ErrorSchema),
        (status = 401, description = "Current password is wrong", body = ErrorSchema)
    ),
    tags = ["accounts"],
    operation_id = "updateMyPassword"
)]
#[patch("/users/update-my-password")]
pub async fn update_my_password(
    state: web::Data<HttpState>,
    auth: AuthContext,
    payload: web::Json<UpdatePasswordBody>,
) -> ApiResult<web::Json<AuthResponse>> {
    let new_password = NewPassword::confirmed(&payload.password, &payload.password_confirm)
        .map_err(|err| invalid_field(FieldName::new("password"), err))?;
    let authenticated = state
        .accounts
        .update_password(&auth.actor(), &payload.password_current, new_password)
        .await?;
    Ok(web::Json(AuthResponse::from(authenticated)))
}
