//! # Firebase REST Store
//!
//! [`UserStore`] backed by the Firebase Realtime Database REST API. Records
//! live under `/users/{id}.json`; every call is timeboxed and failures are
//! logged and degraded to safe defaults.

use async_trait::async_trait;
use reqwest::{Client, Response};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::errors::StoreError;
use crate::storage::{StorageStatus, UserProfile, UserStore};

pub struct FirebaseUserStore {
    client: Client,
    base_url: String,
}

impl FirebaseUserStore {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn user_url(&self, id: i64) -> String {
        format!("{}/users/{}.json", self.base_url, id)
    }

    fn users_url(&self) -> String {
        format!("{}/users.json", self.base_url)
    }

    async fn check(response: Response) -> Result<Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(StoreError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }

    async fn fetch_user(&self, id: i64) -> Result<Option<UserProfile>, StoreError> {
        let response = self.client.get(self.user_url(id)).send().await?;
        let response = Self::check(response).await?;
        // An absent key comes back as `null`
        match response.json::<serde_json::Value>().await? {
            serde_json::Value::Null => Ok(None),
            record => decode_record(id, record)
                .map(Some)
                .map_err(|e| StoreError::Decode(e.to_string())),
        }
    }

    async fn fetch_all(&self) -> Result<HashMap<i64, UserProfile>, StoreError> {
        let response = self.client.get(self.users_url()).send().await?;
        let response = Self::check(response).await?;
        let records = response
            .json::<Option<HashMap<String, serde_json::Value>>>()
            .await?
            .unwrap_or_default();

        Ok(records
            .into_iter()
            .filter_map(|(key, record)| {
                let Ok(id) = key.parse::<i64>() else {
                    warn!(key = %key, "Skipping user record with a non-numeric key");
                    return None;
                };
                match decode_record(id, record) {
                    Ok(profile) => Some((id, profile)),
                    Err(e) => {
                        warn!(user_id = id, error = %e, "Skipping undecodable user record");
                        None
                    }
                }
            })
            .collect())
    }

    async fn fetch_count(&self) -> Result<usize, StoreError> {
        // Shallow reads return only the keys of the collection
        let response = self
            .client
            .get(self.users_url())
            .query(&[("shallow", "true")])
            .send()
            .await?;
        let response = Self::check(response).await?;
        let keys = response
            .json::<Option<HashMap<String, serde_json::Value>>>()
            .await?
            .unwrap_or_default();
        Ok(keys.len())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let response = self
            .client
            .get(format!("{}/.json", self.base_url))
            .query(&[("shallow", "true")])
            .send()
            .await?;
        Self::check(response).await.map(|_| ())
    }
}

/// Decode one stored record; records written without an `id` take it from the key
fn decode_record(id: i64, mut record: serde_json::Value) -> Result<UserProfile, serde_json::Error> {
    if let Some(fields) = record.as_object_mut() {
        fields.entry("id").or_insert_with(|| id.into());
    }
    serde_json::from_value(record)
}

#[async_trait]
impl UserStore for FirebaseUserStore {
    fn backend_name(&self) -> &'static str {
        "firebase"
    }

    async fn put(&self, profile: &UserProfile) -> Result<(), StoreError> {
        let response = self
            .client
            .put(self.user_url(profile.id))
            .json(profile)
            .send()
            .await?;
        Self::check(response).await?;
        info!(user_id = profile.id, first_name = %profile.first_name, "User saved to Firebase");
        Ok(())
    }

    async fn get(&self, id: i64) -> Option<UserProfile> {
        match self.fetch_user(id).await {
            Ok(profile) => profile,
            Err(e) => {
                error!(user_id = id, error = %e, "Failed to get user from Firebase");
                None
            }
        }
    }

    async fn get_all(&self) -> HashMap<i64, UserProfile> {
        match self.fetch_all().await {
            Ok(users) => users,
            Err(e) => {
                error!(error = %e, "Failed to get all users from Firebase");
                HashMap::new()
            }
        }
    }

    async fn count(&self) -> usize {
        match self.fetch_count().await {
            Ok(count) => count,
            Err(e) => {
                error!(error = %e, "Failed to count users in Firebase");
                0
            }
        }
    }

    async fn status(&self) -> StorageStatus {
        let connected = match self.ping().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Firebase connectivity check failed");
                false
            }
        };
        let total_users = if connected { self.count().await } else { 0 };
        debug!(connected, total_users, "Firebase status computed");

        StorageStatus {
            connected,
            total_users,
            backend: self.backend_name().to_string(),
        }
    }
}
