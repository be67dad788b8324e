use std::sync::Arc;

use axum::extract::FromRef;
use axum::{Json, Router, routing::get};
use serde::Serialize;

use crate::db::{Backend, Session, User};
use crate::middleware::auth::RequireUser;
use crate::service::{AuthMethod, BcryptAuth};

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<dyn AuthMethod>,
}

impl AppState {
    /// State using bcrypt password login against `backend`.
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            auth: Arc::new(BcryptAuth::new(backend)),
        }
    }
}

impl FromRef<AppState> for Arc<dyn AuthMethod> {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub error: Option<()>,
    pub user: User,
    pub session: Option<Session>,
}

async fn login_handler(RequireUser(authenticated): RequireUser) -> Json<LoginResponse> {
    Json(LoginResponse {
        error: None,
        user: authenticated.user,
        session: authenticated.session,
    })
}

pub fn wavepipe_router(state: AppState) -> Router {
    Router::new()
        .route("/api/login", get(login_handler))
        .with_state(state)
}
