use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;

use crate::error::AuthError;
use crate::service::{AuthMethod, Authenticated};

/// Extractor that authenticates the inbound request.
///
/// Reads the `Authorization` header and the raw query string and hands both to
/// the state's [`AuthMethod`]. Rejects with [`AuthError`], which maps client
/// failures to 401 and server failures to 500.
#[derive(Debug, Clone)]
pub struct RequireUser(pub Authenticated);

impl<S> FromRequestParts<S> for RequireUser
where
    Arc<dyn AuthMethod>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = Arc::<dyn AuthMethod>::from_ref(state);
        let headers = &parts.headers;
        let query = parts.uri.query();
        let authenticated = auth.authenticate(headers, query).await?;
        Ok(Self(authenticated))
    }
}
