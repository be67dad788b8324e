use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;

/// Failures raised by a storage backend.
#[derive(Debug, ThisError)]
pub enum StoreError {
    /// No row matches the key set on the entity.
    #[error("no matching record")]
    NotFound,

    /// The entity's natural key is empty.
    #[error("empty natural key: {0}")]
    EmptyKey(&'static str),

    #[error("backend is not open")]
    NotOpen,

    #[error("could not open backend: {0}")]
    Connection(#[source] SqlxError),

    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[error("password hashing error: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

impl From<SqlxError> for StoreError {
    fn from(e: SqlxError) -> Self {
        match e {
            SqlxError::RowNotFound => StoreError::NotFound,
            other => StoreError::Database(other),
        }
    }
}

/// Authentication failures the caller can fix. Messages are safe to show.
#[derive(Debug, ThisError)]
pub enum ClientError {
    #[error("invalid authorization header: {0}")]
    MalformedCredentials(String),

    #[error("missing username")]
    MissingUsername,

    #[error("missing password")]
    MissingPassword,

    #[error("invalid username")]
    InvalidUsername,

    #[error("invalid password")]
    InvalidPassword,
}

/// Authentication failures caused by the system itself.
#[derive(Debug, ThisError)]
pub enum ServerError {
    #[error("backend failure: {0}")]
    Backend(#[source] StoreError),

    #[error("password hash comparison failed: {0}")]
    HashComparison(String),
}

impl From<bcrypt::BcryptError> for ServerError {
    fn from(e: bcrypt::BcryptError) -> Self {
        ServerError::HashComparison(e.to_string())
    }
}

/// Outcome channel of a failed authentication. Exactly one side is ever populated.
#[derive(Debug, ThisError)]
pub enum AuthError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Server(#[from] ServerError),
}

impl AuthError {
    pub fn is_client(&self) -> bool {
        matches!(self, AuthError::Client(_))
    }

    pub fn is_server(&self) -> bool {
        matches!(self, AuthError::Server(_))
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_body) = match self {
            AuthError::Client(client_err) => {
                let status = StatusCode::UNAUTHORIZED;
                let body = ApiErrorBody {
                    code: "UNAUTHORIZED".to_string(),
                    message: client_err.to_string(),
                };
                (status, body)
            }
            // already logged by the authenticator; details stay server-side
            AuthError::Server(_) => {
                let status = StatusCode::INTERNAL_SERVER_ERROR;
                let body = ApiErrorBody {
                    code: "INTERNAL_ERROR".to_string(),
                    message: "An internal server error occurred.".to_string(),
                };
                (status, body)
            }
        };
        (status, Json(ApiErrorResponse { error: error_body })).into_response()
    }
}

/// Standardized API error response body
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}
