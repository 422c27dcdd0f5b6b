use std::convert::Infallible;

use axum::{
    extract::{Extension, FromRequestParts},
    http::{request::Parts, HeaderMap},
};
use uuid::Uuid;

use crate::{config::config, Error, Result, DB};

pub type UserId = Uuid;

#[derive(Clone, Debug, FromRequestParts)]
pub struct BaseParams {
    pub ctx: Ctx,
    #[from_request(via(Extension))]
    pub db: DB,
}

impl BaseParams {
    pub fn new(db: DB, ctx: Ctx) -> Self {
        Self { db, ctx }
    }
}

/// The caller of an operation. Every note operation receives it explicitly.
#[derive(Clone, Debug, Default)]
pub struct Ctx {
    user_id: Option<UserId>,
}

impl Ctx {
    pub fn new(user_id: Option<UserId>) -> Self {
        Self { user_id }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn get_user_id(&self) -> Option<UserId> {
        self.user_id
    }

    /// Identity for write paths, which fail loudly without a caller.
    pub fn require_user_id(&self) -> Result<UserId> {
        self.user_id.ok_or(Error::Unauthenticated)
    }

    fn from_headers(headers: &HeaderMap, header_name: &str) -> Self {
        let Some(value) = headers.get(header_name) else {
            return Self::anonymous();
        };

        let user_id = value
            .to_str()
            .ok()
            .and_then(|value| Uuid::parse_str(value.trim()).ok());

        if user_id.is_none() {
            tracing::warn!("ignoring malformed {header_name} header");
        }

        Self { user_id }
    }
}

impl<S> FromRequestParts<S> for Ctx
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> std::result::Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers, &config().user_header))
    }
}
