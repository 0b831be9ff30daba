//! # User Storage Module
//!
//! Key-value persistence for user profile records. Two backends implement
//! [`UserStore`]: the Firebase REST store in [`crate::firebase`] and the
//! in-memory [`MemoryUserStore`] used when no remote endpoint is configured.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

use crate::errors::StoreError;

pub const UNKNOWN_FIRST_NAME: &str = "Unknown";
pub const UNKNOWN_USERNAME: &str = "no_username";

/// Stored profile of a chat participant, keyed by `id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    #[serde(default = "default_first_name", deserialize_with = "first_name_or_default")]
    pub first_name: String,
    #[serde(default = "default_username", deserialize_with = "username_or_default")]
    pub username: String,
    /// First time the user was seen
    #[serde(
        rename = "timestamp",
        default,
        serialize_with = "chrono::serde::ts_seconds::serialize",
        deserialize_with = "epoch::deserialize"
    )]
    pub first_seen: DateTime<Utc>,
    #[serde(
        default,
        serialize_with = "chrono::serde::ts_seconds::serialize",
        deserialize_with = "epoch::deserialize"
    )]
    pub last_seen: DateTime<Utc>,
}

fn default_first_name() -> String {
    UNKNOWN_FIRST_NAME.to_string()
}

fn default_username() -> String {
    UNKNOWN_USERNAME.to_string()
}

// Older writers stored empty strings for missing names
fn first_name_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(normalize(value.as_deref(), UNKNOWN_FIRST_NAME))
}

fn username_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(normalize(value.as_deref(), UNKNOWN_USERNAME))
}

/// Timestamps as written by every generation of the store: Unix seconds,
/// Unix milliseconds (Firebase server timestamps) or ISO 8601 text
mod epoch {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};

    /// Numbers above this are milliseconds; as seconds they would be past the year 5000
    const MILLIS_THRESHOLD: i64 = 100_000_000_000;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawTimestamp {
        Integer(i64),
        Float(f64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let parsed = match RawTimestamp::deserialize(deserializer)? {
            RawTimestamp::Integer(value) => from_number(value),
            RawTimestamp::Float(value) => from_number(value as i64),
            RawTimestamp::Text(text) => DateTime::parse_from_rfc3339(&text)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| {
                    NaiveDateTime::parse_from_str(&text, "%Y-%m-%dT%H:%M:%S%.f")
                        .ok()
                        .map(|naive| naive.and_utc())
                }),
        };
        parsed.ok_or_else(|| D::Error::custom("unrecognized timestamp"))
    }

    fn from_number(value: i64) -> Option<DateTime<Utc>> {
        if value.abs() >= MILLIS_THRESHOLD {
            DateTime::from_timestamp_millis(value)
        } else {
            DateTime::from_timestamp(value, 0)
        }
    }
}

impl UserProfile {
    /// Create a record for a user seen for the first time
    pub fn new(id: i64, first_name: Option<&str>, username: Option<&str>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            first_name: normalize(first_name, UNKNOWN_FIRST_NAME),
            username: normalize(username, UNKNOWN_USERNAME),
            first_seen: now,
            last_seen: now,
        }
    }

    /// Refresh a known record: names follow the latest update, `last_seen` moves
    /// to `now`, `first_seen` is kept
    pub fn touched(&self, first_name: Option<&str>, username: Option<&str>, now: DateTime<Utc>) -> Self {
        Self {
            id: self.id,
            first_name: normalize(first_name, UNKNOWN_FIRST_NAME),
            username: normalize(username, UNKNOWN_USERNAME),
            first_seen: self.first_seen,
            last_seen: now,
        }
    }
}

fn normalize(value: Option<&str>, default: &str) -> String {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(default)
        .to_string()
}

/// Point-in-time snapshot of the store health
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorageStatus {
    pub connected: bool,
    pub total_users: usize,
    pub backend: String,
}

/// Persistence capability shared by both backends
///
/// Reads never fail: a backend that cannot answer degrades to `None`, an
/// empty map or `0`. Writes report failures so callers can log them.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Short name of the backend used in status reports
    fn backend_name(&self) -> &'static str;

    /// Insert or replace the record with the profile's id
    async fn put(&self, profile: &UserProfile) -> Result<(), StoreError>;

    async fn get(&self, id: i64) -> Option<UserProfile>;

    /// All records keyed by user id
    async fn get_all(&self) -> HashMap<i64, UserProfile>;

    async fn count(&self) -> usize;

    /// Check connectivity and count users
    async fn status(&self) -> StorageStatus;
}

/// In-memory backend: a mutex-guarded map owned by the store instance
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: Mutex<HashMap<i64, UserProfile>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn put(&self, profile: &UserProfile) -> Result<(), StoreError> {
        let mut users = self.users.lock().await;
        users.insert(profile.id, profile.clone());
        debug!(user_id = profile.id, total = users.len(), "User saved to memory store");
        Ok(())
    }

    async fn get(&self, id: i64) -> Option<UserProfile> {
        self.users.lock().await.get(&id).cloned()
    }

    async fn get_all(&self) -> HashMap<i64, UserProfile> {
        self.users.lock().await.clone()
    }

    async fn count(&self) -> usize {
        self.users.lock().await.len()
    }

    async fn status(&self) -> StorageStatus {
        StorageStatus {
            connected: true,
            total_users: self.count().await,
            backend: self.backend_name().to_string(),
        }
    }
}
