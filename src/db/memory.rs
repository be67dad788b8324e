use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::db::Backend;
use crate::db::models::{Album, Artist, Song, User};
use crate::error::StoreError;

/// One table: rows by id, plus the id sequence.
struct Table<T> {
    rows: BTreeMap<i64, T>,
    next_id: i64,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl<T> Table<T> {
    fn find(&self, id: i64, matches: impl Fn(&T) -> bool) -> Option<(i64, &T)> {
        if id != 0 {
            return self.rows.get(&id).map(|row| (id, row));
        }
        self.rows.iter().find(|(_, row)| matches(row)).map(|(k, row)| (*k, row))
    }

    /// Insert-or-update on the natural key; returns the row id.
    fn upsert(
        &mut self,
        mut row: T,
        same_key: impl Fn(&T) -> bool,
        with_id: impl Fn(&mut T, i64),
    ) -> i64 {
        let existing = self
            .rows
            .iter()
            .find(|(_, r)| same_key(r))
            .map(|(k, _)| *k);
        let id = existing.unwrap_or_else(|| {
            let id = self.next_id;
            self.next_id += 1;
            id
        });
        with_id(&mut row, id);
        self.rows.insert(id, row);
        id
    }

    fn remove(&mut self, id: i64, matches: impl Fn(&T) -> bool) {
        let found = self.find(id, matches).map(|(k, _)| k);
        if let Some(k) = found {
            self.rows.remove(&k);
        }
    }
}

#[derive(Default)]
struct Tables {
    users: Table<User>,
    artists: Table<Artist>,
    albums: Table<Album>,
    songs: Table<Song>,
}

/// In-process engine with the same key and not-found rules as the SQL engine.
///
/// The DSN is recorded but unused. Data survives `close`/`open` cycles on the
/// same instance.
#[derive(Default)]
pub struct MemoryBackend {
    dsn: String,
    open: AtomicBool,
    tables: RwLock<Tables>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dsn(&self) -> &str {
        &self.dsn
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.open.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(StoreError::NotOpen)
        }
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    fn configure(&mut self, dsn: &str) {
        self.dsn = dsn.to_string();
    }

    async fn open(&mut self) -> Result<(), StoreError> {
        self.open.store(true, Ordering::Release);
        Ok(())
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.open.store(false, Ordering::Release);
        Ok(())
    }

    async fn save_user(&self, user: &mut User) -> Result<(), StoreError> {
        self.ensure_open()?;
        if user.username.is_empty() {
            return Err(StoreError::EmptyKey("username"));
        }
        let username = user.username.clone();
        user.id = self.tables.write().users.upsert(
            user.clone(),
            |r| r.username == username,
            |r, id| r.id = id,
        );
        Ok(())
    }

    async fn load_user(&self, user: &mut User) -> Result<(), StoreError> {
        self.ensure_open()?;
        let tables = self.tables.read();
        let (_, row) = tables
            .users
            .find(user.id, |r| r.username == user.username)
            .ok_or(StoreError::NotFound)?;
        *user = row.clone();
        Ok(())
    }

    async fn delete_user(&self, user: &User) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.tables
            .write()
            .users
            .remove(user.id, |r| r.username == user.username);
        Ok(())
    }

    async fn save_artist(&self, artist: &mut Artist) -> Result<(), StoreError> {
        self.ensure_open()?;
        let title = artist.title.clone();
        artist.id = self.tables.write().artists.upsert(
            artist.clone(),
            |r| r.title == title,
            |r, id| r.id = id,
        );
        Ok(())
    }

    async fn load_artist(&self, artist: &mut Artist) -> Result<(), StoreError> {
        self.ensure_open()?;
        let tables = self.tables.read();
        let (_, row) = tables
            .artists
            .find(artist.id, |r| r.title == artist.title)
            .ok_or(StoreError::NotFound)?;
        *artist = row.clone();
        Ok(())
    }

    async fn delete_artist(&self, artist: &Artist) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.tables
            .write()
            .artists
            .remove(artist.id, |r| r.title == artist.title);
        Ok(())
    }

    async fn save_album(&self, album: &mut Album) -> Result<(), StoreError> {
        self.ensure_open()?;
        let (artist_id, title) = (album.artist_id, album.title.clone());
        album.id = self.tables.write().albums.upsert(
            album.clone(),
            |r| r.artist_id == artist_id && r.title == title,
            |r, id| r.id = id,
        );
        Ok(())
    }

    async fn load_album(&self, album: &mut Album) -> Result<(), StoreError> {
        self.ensure_open()?;
        let tables = self.tables.read();
        let (_, row) = tables
            .albums
            .find(album.id, |r| {
                r.artist_id == album.artist_id && r.title == album.title
            })
            .ok_or(StoreError::NotFound)?;
        *album = row.clone();
        Ok(())
    }

    async fn delete_album(&self, album: &Album) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.tables.write().albums.remove(album.id, |r| {
            r.artist_id == album.artist_id && r.title == album.title
        });
        Ok(())
    }

    async fn save_song(&self, song: &mut Song) -> Result<(), StoreError> {
        self.ensure_open()?;
        let file_name = song.file_name.clone();
        song.id = self.tables.write().songs.upsert(
            song.clone(),
            |r| r.file_name == file_name,
            |r, id| r.id = id,
        );
        Ok(())
    }

    async fn load_song(&self, song: &mut Song) -> Result<(), StoreError> {
        self.ensure_open()?;
        let tables = self.tables.read();
        let (_, row) = tables
            .songs
            .find(song.id, |r| r.file_name == song.file_name)
            .ok_or(StoreError::NotFound)?;
        *song = row.clone();
        Ok(())
    }

    async fn delete_song(&self, song: &Song) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.tables
            .write()
            .songs
            .remove(song.id, |r| r.file_name == song.file_name);
        Ok(())
    }
}
