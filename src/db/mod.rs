//! Database module: the backend contract, entity persistence and engines.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows
//! - `schema.rs`: SQL DDL for initializing the database (SQLite-first)
//! - `sqlite.rs`: sqlx-backed engine
//! - `memory.rs`: in-process engine, mostly for tests

pub mod memory;
pub mod models;
pub mod schema;
pub mod sqlite;

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use tracing::warn;

use crate::error::StoreError;

pub use memory::MemoryBackend;
pub use models::{Album, Artist, Session, Song, User};
pub use schema::SQLITE_INIT;
pub use sqlite::{SqliteBackend, SqlitePool};

/// Storage engine contract.
///
/// `configure` only records the DSN; `open` does the I/O. Entity operations
/// resolve keys the same way on every engine: a non-zero `id` wins, otherwise
/// the natural key. `load_*` reports a miss as [`StoreError::NotFound`];
/// `save_user` refuses an empty username with [`StoreError::EmptyKey`].
#[async_trait]
pub trait Backend: Send + Sync {
    fn configure(&mut self, dsn: &str);
    async fn open(&mut self) -> Result<(), StoreError>;
    async fn close(&self) -> Result<(), StoreError>;

    async fn save_user(&self, user: &mut User) -> Result<(), StoreError>;
    async fn load_user(&self, user: &mut User) -> Result<(), StoreError>;
    async fn delete_user(&self, user: &User) -> Result<(), StoreError>;

    async fn save_artist(&self, artist: &mut Artist) -> Result<(), StoreError>;
    async fn load_artist(&self, artist: &mut Artist) -> Result<(), StoreError>;
    async fn delete_artist(&self, artist: &Artist) -> Result<(), StoreError>;

    async fn save_album(&self, album: &mut Album) -> Result<(), StoreError>;
    async fn load_album(&self, album: &mut Album) -> Result<(), StoreError>;
    async fn delete_album(&self, album: &Album) -> Result<(), StoreError>;

    async fn save_song(&self, song: &mut Song) -> Result<(), StoreError>;
    async fn load_song(&self, song: &mut Song) -> Result<(), StoreError>;
    async fn delete_song(&self, song: &Song) -> Result<(), StoreError>;
}

/// A record that persists itself through whichever backend it is handed.
#[async_trait]
pub trait Entity: Send + Sync {
    /// Insert or update by natural key, writing the generated id back.
    async fn save(&mut self, db: &dyn Backend) -> Result<(), StoreError>;
    /// Populate every field from the key already set on `self`.
    async fn load(&mut self, db: &dyn Backend) -> Result<(), StoreError>;
    async fn delete(&self, db: &dyn Backend) -> Result<(), StoreError>;
}

macro_rules! impl_entity {
    ($ty:ty, $save:ident, $load:ident, $delete:ident) => {
        #[async_trait]
        impl Entity for $ty {
            async fn save(&mut self, db: &dyn Backend) -> Result<(), StoreError> {
                db.$save(self).await
            }

            async fn load(&mut self, db: &dyn Backend) -> Result<(), StoreError> {
                db.$load(self).await
            }

            async fn delete(&self, db: &dyn Backend) -> Result<(), StoreError> {
                db.$delete(self).await
            }
        }
    };
}

impl_entity!(User, save_user, load_user, delete_user);
impl_entity!(Artist, save_artist, load_artist, delete_artist);
impl_entity!(Album, save_album, load_album, delete_album);
impl_entity!(Song, save_song, load_song, delete_song);

/// Configure and open `backend`, hand a shared handle to `f`, then close it.
///
/// Close runs on every exit path of `f`, including a panic, which is resumed
/// once the backend is released. A close failure is only surfaced when `f`
/// itself succeeded.
pub async fn with_backend<B, F, Fut, T, E>(mut backend: B, dsn: &str, f: F) -> Result<T, E>
where
    B: Backend,
    F: FnOnce(Arc<B>) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: From<StoreError>,
{
    backend.configure(dsn);
    backend.open().await?;
    let backend = Arc::new(backend);

    let outcome = AssertUnwindSafe(f(backend.clone())).catch_unwind().await;
    let closed = backend.close().await;

    match outcome {
        Err(panic) => {
            if let Err(e) = &closed {
                warn!(error = %e, "backend close failed while unwinding");
            }
            std::panic::resume_unwind(panic)
        }
        Ok(Err(e)) => {
            if let Err(close_err) = closed {
                warn!(error = %close_err, "backend close failed after error");
            }
            Err(e)
        }
        Ok(Ok(value)) => {
            closed?;
            Ok(value)
        }
    }
}
