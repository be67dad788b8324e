use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::StoreError;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    /// bcrypt hash; never leaves the server.
    #[serde(skip_serializing, default)]
    pub password: String,
    pub role_id: i64,
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    /// Unsaved user carrying only its natural key, ready for `load`.
    pub fn with_username(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ..Self::default()
        }
    }

    /// Replace the stored hash with a freshly salted bcrypt hash of `password`.
    pub fn set_password(&mut self, password: &str, cost: u32) -> Result<(), StoreError> {
        self.password = bcrypt::hash(password, cost)?;
        Ok(())
    }
}

/// Login session. Only a data type here; nothing in this crate issues one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub id: i64,
    pub user_id: i64,
    pub client: String,
    pub key: String,
    pub expire: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, FromRow)]
pub struct Artist {
    pub id: i64,
    pub title: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, FromRow)]
pub struct Album {
    pub id: i64,
    pub artist: String,
    pub artist_id: i64,
    pub title: String,
    pub year: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, FromRow)]
pub struct Song {
    pub id: i64,
    pub album: String,
    pub album_id: i64,
    pub artist: String,
    pub artist_id: i64,
    pub title: String,
    pub track: i32,
    pub year: i32,
    pub file_name: String,
    pub file_size: i64,
    /// Duration in seconds.
    pub length: i32,
    /// Unix seconds.
    pub last_modified: i64,
}
