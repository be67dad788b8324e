use std::sync::Arc;

use async_trait::async_trait;
use axum::http::HeaderMap;
use tracing::{debug, error};

use crate::db::{Backend, Entity, Session, User};
use crate::error::{AuthError, ClientError, ServerError, StoreError};
use crate::service::credentials;

/// A successfully authenticated request.
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub user: User,
    /// Always `None` here; issuing sessions happens elsewhere.
    pub session: Option<Session>,
}

/// An authentication method for the API.
#[async_trait]
pub trait AuthMethod: Send + Sync {
    async fn authenticate(
        &self,
        headers: &HeaderMap,
        query: Option<&str>,
    ) -> Result<Authenticated, AuthError>;
}

/// Username/password login checked against the user's stored bcrypt hash.
#[derive(Clone)]
pub struct BcryptAuth {
    backend: Arc<dyn Backend>,
}

impl BcryptAuth {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    async fn verify(&self, headers: &HeaderMap, query: Option<&str>) -> Result<User, AuthError> {
        let (creds, source) = credentials::resolve(headers, query)?;

        if creds.username.is_empty() {
            return Err(ClientError::MissingUsername.into());
        }
        if creds.password.is_empty() {
            return Err(ClientError::MissingPassword.into());
        }

        let mut user = User::with_username(&creds.username);
        match user.load(self.backend.as_ref()).await {
            Ok(()) => {}
            Err(StoreError::NotFound) => return Err(ClientError::InvalidUsername.into()),
            Err(e) => return Err(ServerError::Backend(e).into()),
        }

        // bcrypt is deliberately slow; keep it off the async workers
        let hash = user.password.clone();
        let password = creds.password;
        let matched = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| ServerError::HashComparison(e.to_string()))?
            .map_err(ServerError::from)?;

        if !matched {
            return Err(ClientError::InvalidPassword.into());
        }

        debug!(username = %user.username, ?source, "authenticated");
        Ok(user)
    }
}

#[async_trait]
impl AuthMethod for BcryptAuth {
    async fn authenticate(
        &self,
        headers: &HeaderMap,
        query: Option<&str>,
    ) -> Result<Authenticated, AuthError> {
        match self.verify(headers, query).await {
            Ok(user) => Ok(Authenticated {
                user,
                session: None,
            }),
            Err(AuthError::Client(e)) => {
                debug!(reason = %e, "authentication rejected");
                Err(AuthError::Client(e))
            }
            Err(AuthError::Server(e)) => {
                error!(error = %e, "authentication failed on server side");
                Err(AuthError::Server(e))
            }
        }
    }
}
