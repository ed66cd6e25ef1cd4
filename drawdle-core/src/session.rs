//! Player session and the daily-play lock.
//!
//! Per-player settings live behind a small [`KeyValueStore`] capability so the
//! round controller never touches storage directly. Two stores are provided:
//! [`MemoryStore`] for tests and one-off runs, and [`FileStore`], which keeps
//! a JSON map per profile in a data directory.
//!
//! The lock allows one round per UTC day:
//!
//! - a round refuses to start if `allowMultiplePlays != "true"`,
//!   `lastPlayDate == today` and `activePlayDate != today`;
//! - starting marks `activePlayDate = today`;
//! - a terminal phase sets `lastPlayDate = today` and clears `activePlayDate`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use chrono::NaiveDate;

use crate::Mode;

/// Key holding the date of the last finished round.
pub const LAST_PLAY_DATE: &str = "lastPlayDate";

/// Key holding the date of the round in progress.
pub const ACTIVE_PLAY_DATE: &str = "activePlayDate";

/// Key overriding the one-round-per-day rule when `"true"`.
pub const ALLOW_MULTIPLE_PLAYS: &str = "allowMultiplePlays";

/// Key holding the player's display name.
pub const PLAYER_NAME: &str = "playerName";

/// Key holding the preferred mode.
pub const GAME_MODE: &str = "gameMode";

/// Name reported when the player never set one.
pub const UNKNOWN_PLAYER: &str = "Unknown";

/// Default profile name for [`FileStore`].
pub const DEFAULT_PROFILE: &str = "default";

/// Errors that can occur in session storage.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Today's round has already been played.
    #[error("Already played today ({0}); come back tomorrow")]
    Locked(NaiveDate),
    /// An I/O error occurred during persistence.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The profile file could not be parsed or written.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// String key-value storage.
pub trait KeyValueStore: Send + Sync {
    /// Read a value.
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be persisted.
    fn set(&self, key: &str, value: &str) -> Result<(), SessionError>;

    /// Remove a value. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the change cannot be persisted.
    fn remove(&self, key: &str) -> Result<(), SessionError>;
}

/// In-memory store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SessionError> {
        self.values
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        self.values
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

/// Store persisted as `<data_dir>/<profile>.json`.
///
/// The whole map is rewritten on every change.
#[derive(Debug, Clone)]
pub struct FileStore {
    values: Arc<RwLock<HashMap<String, String>>>,
    path: PathBuf,
}

impl FileStore {
    /// Open the default profile in `data_dir`.
    ///
    /// # Errors
    ///
    /// See [`FileStore::open_profile`].
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self, SessionError> {
        Self::open_profile(data_dir, DEFAULT_PROFILE)
    }

    /// Open a named profile in `data_dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Io`] if the directory cannot be created or the
    /// file cannot be read, and [`SessionError::Serialization`] if an
    /// existing file is not a JSON string map.
    pub fn open_profile(data_dir: impl Into<PathBuf>, profile: &str) -> Result<Self, SessionError> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)?;
        let path = data_dir.join(format!("{}.json", sanitize_filename(profile)));
        let values = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            HashMap::new()
        };
        tracing::debug!(path = %path.display(), keys = values.len(), "session store opened");
        Ok(Self {
            values: Arc::new(RwLock::new(values)),
            path,
        })
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    fn persist(&self, values: &HashMap<String, String>) -> Result<(), SessionError> {
        let json = serde_json::to_string_pretty(values)?;
        std::fs::write(&self.path, json).map_err(|e| {
            tracing::warn!("Failed to persist session to {}: {e}", self.path.display());
            SessionError::Io(e)
        })
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SessionError> {
        let mut values = self
            .values
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut next = values.clone();
        next.insert(key.to_string(), value.to_string());
        self.persist(&next)?;
        *values = next;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        let mut values = self
            .values
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if !values.contains_key(key) {
            return Ok(());
        }
        let mut next = values.clone();
        next.remove(key);
        self.persist(&next)?;
        *values = next;
        Ok(())
    }
}

/// Replace any character that is not alphanumeric, `-` or `_` with `_`.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// ISO `YYYY-MM-DD` form of a date.
#[must_use]
pub fn iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Today's date in UTC.
#[must_use]
pub fn today_utc() -> NaiveDate {
    chrono::Utc::now().date_naive()
}

/// Player settings for one round, read from the store at startup.
#[derive(Clone)]
pub struct SessionContext {
    store: Arc<dyn KeyValueStore>,
    /// Name reported to the leaderboard.
    pub player_name: String,
    /// Mode the round is played in.
    pub mode: Mode,
    /// The day the round belongs to.
    pub today: NaiveDate,
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("player_name", &self.player_name)
            .field("mode", &self.mode)
            .field("today", &self.today)
            .finish_non_exhaustive()
    }
}

impl SessionContext {
    /// Load the player's name and mode from `store`.
    ///
    /// Missing or unparsable values fall back to `"Unknown"` and easy mode.
    #[must_use]
    pub fn load(store: Arc<dyn KeyValueStore>, today: NaiveDate) -> Self {
        let player_name = store
            .get(PLAYER_NAME)
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_PLAYER.to_string());
        let mode = store
            .get(GAME_MODE)
            .and_then(|m| m.parse().ok())
            .unwrap_or_default();
        Self {
            store,
            player_name,
            mode,
            today,
        }
    }

    /// Save the player's name.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot persist the value.
    pub fn set_player_name(&mut self, name: &str) -> Result<(), SessionError> {
        self.store.set(PLAYER_NAME, name)?;
        self.player_name = name.to_string();
        Ok(())
    }

    /// Save the preferred mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot persist the value.
    pub fn set_mode(&mut self, mode: Mode) -> Result<(), SessionError> {
        self.store.set(GAME_MODE, &mode.to_string())?;
        self.mode = mode;
        Ok(())
    }

    /// Turn the one-round-per-day override on or off.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot persist the value.
    pub fn set_allow_multiple_plays(&self, allow: bool) -> Result<(), SessionError> {
        if allow {
            self.store.set(ALLOW_MULTIPLE_PLAYS, "true")
        } else {
            self.store.remove(ALLOW_MULTIPLE_PLAYS)
        }
    }

    /// Claim today's round.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Locked`] if today's round is already finished
    /// and the override is off.
    pub fn acquire_daily_lock(&self) -> Result<(), SessionError> {
        let today = iso_date(self.today);
        let allow_multiple = self.store.get(ALLOW_MULTIPLE_PLAYS).as_deref() == Some("true");
        let last = self.store.get(LAST_PLAY_DATE);
        let active = self.store.get(ACTIVE_PLAY_DATE);

        if !allow_multiple
            && last.as_deref() == Some(today.as_str())
            && active.as_deref() != Some(today.as_str())
        {
            tracing::warn!(date = %today, "daily round already played");
            return Err(SessionError::Locked(self.today));
        }
        if active.as_deref() != Some(today.as_str()) {
            self.store.set(ACTIVE_PLAY_DATE, &today)?;
        }
        Ok(())
    }

    /// Record that today's round reached a terminal phase.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot persist the change.
    pub fn mark_finished(&self) -> Result<(), SessionError> {
        self.store.set(LAST_PLAY_DATE, &iso_date(self.today))?;
        self.store.remove(ACTIVE_PLAY_DATE)
    }
}
