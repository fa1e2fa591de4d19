//! Bearer-token authentication for HTTP handlers.
//!
//! Handlers that need an identity take an [`AuthContext`] argument; the
//! extractor resolves the token through the account service, so handlers only
//! see a loaded, active [`User`].

use actix_web::http::header::AUTHORIZATION;
use actix_web::{FromRequest, HttpRequest, dev::Payload, web};
use futures_util::future::LocalBoxFuture;

use crate::domain::{Actor, Capability, Error, User};
use crate::inbound::http::state::HttpState;

const BEARER_PREFIX: &str = "Bearer ";
const NOT_LOGGED_IN: &str = "You are not logged in! Please log in to get access.";

/// Authenticated caller resolved from `Authorization: Bearer <token>`.
#[derive(Debug, Clone)]
pub struct AuthContext {
    user: User,
}

impl AuthContext {
    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn into_user(self) -> User {
        self.user
    }

    /// Identity passed to domain services.
    pub fn actor(&self) -> Actor {
        Actor::from(&self.user)
    }

    /// Fail with `Forbidden` unless the caller holds `capability`.
    pub fn require(&self, capability: Capability) -> Result<Actor, Error> {
        let actor = self.actor();
        actor.require(capability)?;
        Ok(actor)
    }
}

/// Pull the token out of the `Authorization` header, if any.
pub(crate) fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix(BEARER_PREFIX))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
}

impl FromRequest for AuthContext {
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let token = bearer_token(req);
        let state = req.app_data::<web::Data<HttpState>>().cloned();
        Box::pin(async move {
            let Some(token) = token else {
                return Err(Error::unauthenticated(NOT_LOGGED_IN));
            };
            let state =
                state.ok_or_else(|| Error::internal("HTTP state is not registered with the app"))?;
            let user = state.accounts.authenticate(&token).await?;
            Ok(Self { user })
        })
    }
}
