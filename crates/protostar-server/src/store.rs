//! User and post storage
//!
//! Everything lives in memory behind a single lock. When a path is
//! configured, the whole store is written as a JSON snapshot after every
//! change (temp file + rename, so a crash never leaves a torn file).

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Default personal hate-level threshold for new accounts
pub const DEFAULT_HATE_LEVEL: f64 = 80.0;
/// Default profile image for new accounts
pub const DEFAULT_IMAGE: &str = "default.png";

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0}")]
    Conflict(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A registered account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub email: String,
    pub image_file: String,
    /// argon2 PHC string
    pub password: String,
    /// Posts scoring above this are hidden from the user's feed
    pub hate_level: f64,
}

/// A scored post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: u64,
    pub date_posted: DateTime<Utc>,
    pub content: String,
    pub user_id: u64,
    pub hate_level: f64,
}

/// Fields accepted when creating a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// Optional profile changes
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub hate_level: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreData {
    users: Vec<User>,
    posts: Vec<Post>,
    next_user_id: u64,
    next_post_id: u64,
}

/// Shared user/post store
pub struct Store {
    data: RwLock<StoreData>,
    path: Option<PathBuf>,
}

impl Store {
    /// In-memory store that is never written to disk
    pub fn in_memory() -> Self {
        Self {
            data: RwLock::new(StoreData::default()),
            path: None,
        }
    }

    /// Open a snapshot-backed store, loading the snapshot if it exists
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let data = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let data: StoreData = serde_json::from_str(&content)?;
            info!(
                "Loaded {} users and {} posts from {}",
                data.users.len(),
                data.posts.len(),
                path.display()
            );
            data
        } else {
            info!("No store snapshot at {}, starting empty", path.display());
            StoreData::default()
        };

        Ok(Self {
            data: RwLock::new(data),
            path: Some(path),
        })
    }

    /// Apply `change` to a copy of the data and swap it in only once the
    /// snapshot of the copy has been written. A failed write leaves the
    /// store unchanged.
    fn commit<T>(
        &self,
        change: impl FnOnce(&mut StoreData) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut data = self.data.write();
        let mut candidate = data.clone();
        let outcome = change(&mut candidate)?;
        self.persist(&candidate)?;
        *data = candidate;
        Ok(outcome)
    }

    fn persist(&self, data: &StoreData) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let parent = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent)?;

        let temp_file = NamedTempFile::new_in(parent)?;
        let mut writer = BufWriter::new(&temp_file);
        serde_json::to_writer(&mut writer, data)?;
        writer.flush()?;
        drop(writer);
        temp_file.persist(path).map_err(|e| StoreError::Io(e.error))?;
        debug!("Persisted store snapshot to {}", path.display());
        Ok(())
    }

    /// Create a user; usernames and emails are unique (case-insensitive)
    pub fn create_user(&self, new_user: NewUser) -> Result<User, StoreError> {
        self.commit(|data| {
            if data
                .users
                .iter()
                .any(|u| u.username.eq_ignore_ascii_case(&new_user.username))
            {
                return Err(StoreError::Conflict(
                    "That username is taken. Please choose a different one.".to_string(),
                ));
            }
            if data
                .users
                .iter()
                .any(|u| u.email.eq_ignore_ascii_case(&new_user.email))
            {
                return Err(StoreError::Conflict(
                    "That email is taken. Please choose a different one.".to_string(),
                ));
            }

            data.next_user_id += 1;
            let user = User {
                id: data.next_user_id,
                username: new_user.username,
                email: new_user.email,
                image_file: DEFAULT_IMAGE.to_string(),
                password: new_user.password_hash,
                hate_level: DEFAULT_HATE_LEVEL,
            };
            data.users.push(user.clone());
            Ok(user)
        })
    }

    pub fn user(&self, id: u64) -> Option<User> {
        self.data.read().users.iter().find(|u| u.id == id).cloned()
    }

    pub fn user_by_username(&self, username: &str) -> Option<User> {
        self.data
            .read()
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned()
    }

    /// Apply profile changes to an existing user
    pub fn update_user(&self, id: u64, update: UserUpdate) -> Result<User, StoreError> {
        self.commit(|data| {
            if let Some(email) = &update.email {
                if data
                    .users
                    .iter()
                    .any(|u| u.id != id && u.email.eq_ignore_ascii_case(email))
                {
                    return Err(StoreError::Conflict(
                        "That email is taken. Please choose a different one.".to_string(),
                    ));
                }
            }

            let user = data
                .users
                .iter_mut()
                .find(|u| u.id == id)
                .ok_or_else(|| StoreError::NotFound(format!("user {id}")))?;
            if let Some(email) = update.email {
                user.email = email;
            }
            if let Some(hate_level) = update.hate_level {
                user.hate_level = hate_level;
            }
            Ok(user.clone())
        })
    }

    /// Store a scored post for an existing user
    pub fn add_post(&self, user_id: u64, content: String, hate_level: f64) -> Result<Post, StoreError> {
        self.commit(|data| {
            if !data.users.iter().any(|u| u.id == user_id) {
                return Err(StoreError::NotFound(format!("user {user_id}")));
            }

            data.next_post_id += 1;
            let post = Post {
                id: data.next_post_id,
                date_posted: Utc::now(),
                content,
                user_id,
                hate_level,
            };
            data.posts.push(post.clone());
            Ok(post)
        })
    }

    pub fn post(&self, id: u64) -> Option<Post> {
        self.data.read().posts.iter().find(|p| p.id == id).cloned()
    }

    /// Posts newest first, optionally capped at `max_hate_level`
    pub fn posts(&self, max_hate_level: Option<f64>, limit: usize) -> Vec<Post> {
        self.data
            .read()
            .posts
            .iter()
            .rev()
            .filter(|p| max_hate_level.map_or(true, |max| p.hate_level <= max))
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn user_count(&self) -> usize {
        self.data.read().users.len()
    }

    pub fn post_count(&self) -> usize {
        self.data.read().posts.len()
    }
}
