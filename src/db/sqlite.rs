use crate::db::Backend;
use crate::db::models::{Album, Artist, Song, User};
use crate::db::schema::SQLITE_INIT;
use crate::error::StoreError;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

pub type SqlitePool = Pool<Sqlite>;

const MAX_CONNECTIONS: u32 = 8;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite engine over a sqlx connection pool.
#[derive(Default)]
pub struct SqliteBackend {
    dsn: String,
    pool: Option<SqlitePool>,
}

impl SqliteBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dsn(&self) -> &str {
        &self.dsn
    }

    /// Live pool, or `NotOpen` before `open` and after `close`.
    pub fn pool(&self) -> Result<&SqlitePool, StoreError> {
        match &self.pool {
            Some(pool) if !pool.is_closed() => Ok(pool),
            _ => Err(StoreError::NotOpen),
        }
    }

    fn is_in_memory(&self) -> bool {
        self.dsn.contains(":memory:") || self.dsn.contains("mode=memory")
    }

    fn connect_options(&self) -> Result<SqliteConnectOptions, StoreError> {
        let opts = if self.dsn.starts_with("sqlite:") {
            SqliteConnectOptions::from_str(&self.dsn).map_err(StoreError::Connection)?
        } else {
            SqliteConnectOptions::new().filename(expand_home(&self.dsn))
        };
        let opts = opts.create_if_missing(true).busy_timeout(BUSY_TIMEOUT);
        if self.is_in_memory() {
            Ok(opts)
        } else {
            Ok(opts.journal_mode(SqliteJournalMode::Wal))
        }
    }

    /// Initialize the schema by executing the bundled DDL.
    async fn init_schema(pool: &SqlitePool) -> Result<(), StoreError> {
        // sqlx::query runs a single statement, so split the DDL
        for stmt in SQLITE_INIT.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            sqlx::query(s)
                .execute(pool)
                .await
                .map_err(StoreError::Connection)?;
        }
        Ok(())
    }
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), std::env::var_os("HOME")) {
        (Some(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => PathBuf::from(path),
    }
}

#[async_trait]
impl Backend for SqliteBackend {
    fn configure(&mut self, dsn: &str) {
        self.dsn = dsn.to_string();
    }

    async fn open(&mut self) -> Result<(), StoreError> {
        let opts = self.connect_options()?;
        // every connection to an in-memory database sees a different database
        let pool_opts = if self.is_in_memory() {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
        } else {
            SqlitePoolOptions::new().max_connections(MAX_CONNECTIONS)
        };
        let pool = pool_opts
            .connect_with(opts)
            .await
            .map_err(StoreError::Connection)?;
        Self::init_schema(&pool).await?;

        info!(dsn = %self.dsn, "sqlite backend opened");
        self.pool = Some(pool);
        Ok(())
    }

    async fn close(&self) -> Result<(), StoreError> {
        if let Some(pool) = &self.pool {
            pool.close().await;
            info!(dsn = %self.dsn, "sqlite backend closed");
        }
        Ok(())
    }

    async fn save_user(&self, user: &mut User) -> Result<(), StoreError> {
        if user.username.is_empty() {
            return Err(StoreError::EmptyKey("username"));
        }
        let mut tx = self.pool()?.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO users (username, password, role_id, last_login)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(username) DO UPDATE SET
                password=excluded.password,
                role_id=excluded.role_id,
                last_login=excluded.last_login
            "#,
        )
        .bind(&user.username)
        .bind(&user.password)
        .bind(user.role_id)
        .bind(user.last_login)
        .execute(&mut *tx)
        .await?;

        let rec: (i64,) = sqlx::query_as("SELECT id FROM users WHERE username = ?")
            .bind(&user.username)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;

        user.id = rec.0;
        debug!(id = user.id, username = %user.username, "user saved");
        Ok(())
    }

    async fn load_user(&self, user: &mut User) -> Result<(), StoreError> {
        let pool = self.pool()?;
        let row = if user.id != 0 {
            sqlx::query_as::<_, User>(
                "SELECT id, username, password, role_id, last_login FROM users WHERE id = ?",
            )
            .bind(user.id)
            .fetch_one(pool)
            .await?
        } else {
            sqlx::query_as::<_, User>(
                "SELECT id, username, password, role_id, last_login FROM users WHERE username = ?",
            )
            .bind(&user.username)
            .fetch_one(pool)
            .await?
        };
        *user = row;
        Ok(())
    }

    async fn delete_user(&self, user: &User) -> Result<(), StoreError> {
        let pool = self.pool()?;
        if user.id != 0 {
            sqlx::query("DELETE FROM users WHERE id = ?")
                .bind(user.id)
                .execute(pool)
                .await?;
        } else {
            sqlx::query("DELETE FROM users WHERE username = ?")
                .bind(&user.username)
                .execute(pool)
                .await?;
        }
        Ok(())
    }

    async fn save_artist(&self, artist: &mut Artist) -> Result<(), StoreError> {
        let mut tx = self.pool()?.begin().await?;
        sqlx::query("INSERT INTO artists (title) VALUES (?) ON CONFLICT(title) DO NOTHING")
            .bind(&artist.title)
            .execute(&mut *tx)
            .await?;

        let rec: (i64,) = sqlx::query_as("SELECT id FROM artists WHERE title = ?")
            .bind(&artist.title)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;

        artist.id = rec.0;
        Ok(())
    }

    async fn load_artist(&self, artist: &mut Artist) -> Result<(), StoreError> {
        let pool = self.pool()?;
        let row = if artist.id != 0 {
            sqlx::query_as::<_, Artist>("SELECT id, title FROM artists WHERE id = ?")
                .bind(artist.id)
                .fetch_one(pool)
                .await?
        } else {
            sqlx::query_as::<_, Artist>("SELECT id, title FROM artists WHERE title = ?")
                .bind(&artist.title)
                .fetch_one(pool)
                .await?
        };
        *artist = row;
        Ok(())
    }

    async fn delete_artist(&self, artist: &Artist) -> Result<(), StoreError> {
        let pool = self.pool()?;
        if artist.id != 0 {
            sqlx::query("DELETE FROM artists WHERE id = ?")
                .bind(artist.id)
                .execute(pool)
                .await?;
        } else {
            sqlx::query("DELETE FROM artists WHERE title = ?")
                .bind(&artist.title)
                .execute(pool)
                .await?;
        }
        Ok(())
    }

    async fn save_album(&self, album: &mut Album) -> Result<(), StoreError> {
        let mut tx = self.pool()?.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO albums (artist, artist_id, title, year)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(artist_id, title) DO UPDATE SET
                artist=excluded.artist,
                year=excluded.year
            "#,
        )
        .bind(&album.artist)
        .bind(album.artist_id)
        .bind(&album.title)
        .bind(album.year)
        .execute(&mut *tx)
        .await?;

        let rec: (i64,) = sqlx::query_as("SELECT id FROM albums WHERE artist_id = ? AND title = ?")
            .bind(album.artist_id)
            .bind(&album.title)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;

        album.id = rec.0;
        Ok(())
    }

    async fn load_album(&self, album: &mut Album) -> Result<(), StoreError> {
        let pool = self.pool()?;
        let row = if album.id != 0 {
            sqlx::query_as::<_, Album>(
                "SELECT id, artist, artist_id, title, year FROM albums WHERE id = ?",
            )
            .bind(album.id)
            .fetch_one(pool)
            .await?
        } else {
            sqlx::query_as::<_, Album>(
                "SELECT id, artist, artist_id, title, year FROM albums WHERE artist_id = ? AND title = ?",
            )
            .bind(album.artist_id)
            .bind(&album.title)
            .fetch_one(pool)
            .await?
        };
        *album = row;
        Ok(())
    }

    async fn delete_album(&self, album: &Album) -> Result<(), StoreError> {
        let pool = self.pool()?;
        if album.id != 0 {
            sqlx::query("DELETE FROM albums WHERE id = ?")
                .bind(album.id)
                .execute(pool)
                .await?;
        } else {
            sqlx::query("DELETE FROM albums WHERE artist_id = ? AND title = ?")
                .bind(album.artist_id)
                .bind(&album.title)
                .execute(pool)
                .await?;
        }
        Ok(())
    }

    async fn save_song(&self, song: &mut Song) -> Result<(), StoreError> {
        let mut tx = self.pool()?.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO songs (
                album, album_id, artist, artist_id, title, track, year,
                file_name, file_size, length, last_modified
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(file_name) DO UPDATE SET
                album=excluded.album,
                album_id=excluded.album_id,
                artist=excluded.artist,
                artist_id=excluded.artist_id,
                title=excluded.title,
                track=excluded.track,
                year=excluded.year,
                file_size=excluded.file_size,
                length=excluded.length,
                last_modified=excluded.last_modified
            "#,
        )
        .bind(&song.album)
        .bind(song.album_id)
        .bind(&song.artist)
        .bind(song.artist_id)
        .bind(&song.title)
        .bind(song.track)
        .bind(song.year)
        .bind(&song.file_name)
        .bind(song.file_size)
        .bind(song.length)
        .bind(song.last_modified)
        .execute(&mut *tx)
        .await?;

        let rec: (i64,) = sqlx::query_as("SELECT id FROM songs WHERE file_name = ?")
            .bind(&song.file_name)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;

        song.id = rec.0;
        Ok(())
    }

    async fn load_song(&self, song: &mut Song) -> Result<(), StoreError> {
        let pool = self.pool()?;
        let row = if song.id != 0 {
            sqlx::query_as::<_, Song>(
                r#"SELECT id, album, album_id, artist, artist_id, title, track, year,
                   file_name, file_size, length, last_modified
                   FROM songs WHERE id = ?"#,
            )
            .bind(song.id)
            .fetch_one(pool)
            .await?
        } else {
            sqlx::query_as::<_, Song>(
                r#"SELECT id, album, album_id, artist, artist_id, title, track, year,
                   file_name, file_size, length, last_modified
                   FROM songs WHERE file_name = ?"#,
            )
            .bind(&song.file_name)
            .fetch_one(pool)
            .await?
        };
        *song = row;
        Ok(())
    }

    async fn delete_song(&self, song: &Song) -> Result<(), StoreError> {
        let pool = self.pool()?;
        if song.id != 0 {
            sqlx::query("DELETE FROM songs WHERE id = ?")
                .bind(song.id)
                .execute(pool)
                .await?;
        } else {
            sqlx::query("DELETE FROM songs WHERE file_name = ?")
                .bind(&song.file_name)
                .execute(pool)
                .await?;
        }
        Ok(())
    }
}
