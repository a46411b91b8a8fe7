//! Caller identity extraction.
//!
//! Authentication happens upstream; by the time a request reaches us the
//! proxy has put a stable identity in [`PRINCIPAL_HEADER`].

use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};

use hostgrid_registry::Principal;

use crate::handlers::error_response;

pub const PRINCIPAL_HEADER: &str = "x-hostgrid-principal";

/// The authenticated principal making a request.
#[derive(Debug, Clone)]
pub struct Caller(pub Principal);

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let identity = parts
            .headers
            .get(PRINCIPAL_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty());

        match identity {
            Some(identity) => Ok(Caller(Principal::new(identity))),
            None => Err(error_response(
                "authentication required",
                "unauthenticated",
                StatusCode::UNAUTHORIZED,
            )
            .into_response()),
        }
    }
}
