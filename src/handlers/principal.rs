//! Principal extraction.
//!
//! Authentication happens upstream: the gateway verifies the session token
//! and forwards the verified identity as `x-identity-*` headers. This
//! extractor only materializes those headers; handlers take
//! `Option<Principal>` so anonymous access stays a valid state on read paths
//! and becomes `IdentityUnresolved` on write paths via
//! `IdentityResolver::require`.

use crate::domain::models::Principal;
use actix_web::http::header::HeaderMap;
use actix_web::{dev::Payload, error::ErrorUnauthorized, Error, FromRequest, HttpRequest};
use futures::future::{ready, Ready};

pub const EXTERNAL_ID_HEADER: &str = "x-identity-external-id";
pub const EMAIL_HEADER: &str = "x-identity-email";
pub const FIRST_NAME_HEADER: &str = "x-identity-first-name";
pub const LAST_NAME_HEADER: &str = "x-identity-last-name";
pub const USERNAME_HEADER: &str = "x-identity-username";
pub const AVATAR_HEADER: &str = "x-identity-avatar-url";

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
}

pub fn principal_from_headers(headers: &HeaderMap) -> Option<Principal> {
    let external_id = header(headers, EXTERNAL_ID_HEADER)?;
    let email = header(headers, EMAIL_HEADER)?;

    Some(Principal {
        external_id,
        email,
        first_name: header(headers, FIRST_NAME_HEADER),
        last_name: header(headers, LAST_NAME_HEADER),
        username: header(headers, USERNAME_HEADER),
        avatar_url: header(headers, AVATAR_HEADER),
    })
}

impl FromRequest for Principal {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match principal_from_headers(req.headers()) {
            Some(principal) => ready(Ok(principal)),
            None => ready(Err(ErrorUnauthorized("No authenticated principal"))),
        }
    }
}
