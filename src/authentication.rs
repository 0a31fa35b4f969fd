use actix_web::dev::Payload;
use actix_web::http::header::HeaderMap;
use actix_web::{web, FromRequest, HttpRequest};
use futures::future::{ready, Ready};

use crate::config::Config;
use crate::error::ApiError;
use crate::fookie;

pub const ADMIN_HEADER: &str = "FOOKIE";
pub const USER_HEADER: &str = "USER";

/// Proof that the request carried one of the configured admin keys.
#[derive(Debug)]
pub struct Admin;

/// Self-asserted identity taken from the `USER` header.
#[derive(Debug)]
pub struct User(pub String);

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

pub fn authorize_admin(headers: &HeaderMap, config: &Config) -> Result<Admin, ApiError> {
    match header(headers, ADMIN_HEADER) {
        Some(key) if config.is_admin_key(key) => Ok(Admin),
        Some(_) => {
            tracing::warn!("Rejected request with an unknown admin key");
            Err(ApiError::Forbidden("Invalid admin key"))
        }
        None => Err(ApiError::Forbidden("Admin key required")),
    }
}

pub fn authorize_user(headers: &HeaderMap) -> Result<User, ApiError> {
    header(headers, USER_HEADER)
        .map(str::trim)
        .filter(|user| !user.is_empty())
        .map(|user| User(user.to_string()))
        .ok_or(ApiError::Forbidden("User header required"))
}

fn global_config(req: &HttpRequest) -> Result<&Config, ApiError> {
    req.app_data::<web::Data<fookie::GlobalState>>()
        .map(|data| data.config.as_ref())
        .ok_or(ApiError::Internal("Application state is not configured"))
}

impl FromRequest for Admin {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(global_config(req).and_then(|config| authorize_admin(req.headers(), config)))
    }
}

impl FromRequest for User {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authorize_user(req.headers()))
    }
}
