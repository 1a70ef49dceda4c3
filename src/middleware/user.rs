use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use std::convert::Infallible;

use crate::content::H5PUser;

pub const USER_ID_HEADER: &str = "x-h5p-user-id";
pub const USER_NAME_HEADER: &str = "x-h5p-user-name";
pub const USER_EMAIL_HEADER: &str = "x-h5p-user-email";

/// Caller identity forwarded by the host application, if any.
///
/// Requests without an `X-H5P-User-Id` header act as the anonymous user.
#[derive(Debug, Clone, Default)]
pub struct CallerIdentity(pub Option<H5PUser>);

impl CallerIdentity {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let user = header(USER_ID_HEADER).map(|id| H5PUser {
            name: header(USER_NAME_HEADER).unwrap_or_else(|| id.clone()),
            email: header(USER_EMAIL_HEADER).unwrap_or_default(),
            user_type: "local".to_string(),
            id,
        });

        Self(user)
    }

    pub fn into_user(self) -> Option<H5PUser> {
        self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CallerIdentity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}
