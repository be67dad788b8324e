pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod router;
pub mod service;

pub use db::{Backend, Entity, MemoryBackend, SqliteBackend};
pub use error::{AuthError, ClientError, ServerError, StoreError};
pub use service::{AuthMethod, Authenticated, BcryptAuth};
