//! Request extractors.

use std::str::FromStr;

use axum::{extract::FromRequestParts, http::request::Parts};
use treasury_core::OperationContext;
use treasury_shared::types::{ActorId, CompanyId};

use crate::error::ApiError;

/// Header carrying the tenant id.
pub const COMPANY_HEADER: &str = "x-company-id";
/// Header carrying the acting user id.
pub const ACTOR_HEADER: &str = "x-actor-id";

/// Operation context read from the `x-company-id` and `x-actor-id` headers.
///
/// Authentication happens upstream; the ids are taken as given.
#[derive(Debug, Clone, Copy)]
pub struct Ctx(pub OperationContext);

fn header_id<T: FromStr>(parts: &Parts, name: &'static str) -> Result<T, ApiError> {
    let value = parts
        .headers
        .get(name)
        .ok_or(ApiError::MissingHeader(name))?;
    value
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .ok_or(ApiError::InvalidHeader(name))
}

impl<S> FromRequestParts<S> for Ctx
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let company_id: CompanyId = header_id(parts, COMPANY_HEADER)?;
        let actor_id: ActorId = header_id(parts, ACTOR_HEADER)?;
        Ok(Self(OperationContext::new(company_id, actor_id)))
    }
}
