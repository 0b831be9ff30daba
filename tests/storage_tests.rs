//! # Storage Tests
//!
//! Round-trips through the in-memory store and the Firebase REST store,
//! the latter against a wiremock server.

use bg_remover_bot::firebase::FirebaseUserStore;
use bg_remover_bot::storage::{MemoryUserStore, UserProfile, UserStore};
use chrono::{TimeZone, Utc};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[cfg(test)]
mod tests {
    use super::*;

    fn firebase_store(server: &MockServer) -> FirebaseUserStore {
        FirebaseUserStore::new(&format!("{}/", server.uri()), Duration::from_secs(2))
            .expect("Failed to create store")
    }

    fn ana() -> UserProfile {
        let seen = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        UserProfile::new(111, Some("Ana"), Some("ana"), seen)
    }

    /// Test put followed by get on the in-memory store
    #[tokio::test]
    async fn test_memory_round_trip() {
        let store = MemoryUserStore::new();
        store.put(&ana()).await.unwrap();

        let stored = store.get(111).await.unwrap();
        assert_eq!(stored.id, 111);
        assert_eq!(stored.first_name, "Ana");
        assert_eq!(stored.username, "ana");
        assert!(store.get(222).await.is_none());
    }

    /// Test count, listing and status of the in-memory store
    #[tokio::test]
    async fn test_memory_listing_and_status() {
        let store = MemoryUserStore::new();
        let now = Utc::now();
        for id in [1, 2, 3] {
            store.put(&UserProfile::new(id, None, None, now)).await.unwrap();
        }
        // Upsert does not create a second record
        store.put(&UserProfile::new(2, Some("Two"), None, now)).await.unwrap();

        assert_eq!(store.count().await, 3);
        let all = store.get_all().await;
        assert_eq!(all.len(), 3);
        assert_eq!(all[&2].first_name, "Two");
        assert_eq!(all[&1].first_name, "Unknown");
        assert_eq!(all[&1].username, "no_username");

        let status = store.status().await;
        assert!(status.connected);
        assert_eq!(status.total_users, 3);
        assert_eq!(status.backend, "memory");
    }

    /// Test concurrent writers on the in-memory store
    #[tokio::test]
    async fn test_memory_concurrent_puts() {
        let store = std::sync::Arc::new(MemoryUserStore::new());
        let now = Utc::now();
        let tasks: Vec<_> = (0..50)
            .map(|id| {
                let store = store.clone();
                tokio::spawn(async move {
                    store.put(&UserProfile::new(id, None, None, now)).await.unwrap();
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(store.count().await, 50);
    }

    /// Test that put sends the record to the per-user path
    #[tokio::test]
    async fn test_firebase_put() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/users/111.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        firebase_store(&server).put(&ana()).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["id"], 111);
        assert_eq!(body["first_name"], "Ana");
        assert_eq!(body["username"], "ana");
        assert_eq!(body["timestamp"], 1_700_000_000);
    }

    /// Test that a rejected write is reported to the caller
    #[tokio::test]
    async fn test_firebase_put_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Permission denied"))
            .mount(&server)
            .await;

        let err = firebase_store(&server).put(&ana()).await.unwrap_err();
        assert!(err.to_string().contains("401"));
        assert!(err.to_string().contains("Permission denied"));
    }

    /// Test get for a present and an absent user
    #[tokio::test]
    async fn test_firebase_get() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/111.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 111,
                "first_name": "Ana",
                "username": "ana",
                "timestamp": 1_700_000_000
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/users/222.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("null"))
            .mount(&server)
            .await;

        let store = firebase_store(&server);
        let user = store.get(111).await.unwrap();
        assert_eq!(user.first_name, "Ana");
        assert_eq!(user.first_seen.timestamp(), 1_700_000_000);
        assert!(store.get(222).await.is_none());
    }

    /// Test that backend failures degrade to safe defaults
    #[tokio::test]
    async fn test_firebase_failures_degrade() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let store = firebase_store(&server);
        assert!(store.get(111).await.is_none());
        assert!(store.get_all().await.is_empty());
        assert_eq!(store.count().await, 0);

        let status = store.status().await;
        assert!(!status.connected);
        assert_eq!(status.total_users, 0);
        assert_eq!(status.backend, "firebase");
    }

    /// Test listing skips keys that are not user ids
    #[tokio::test]
    async fn test_firebase_get_all() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "111": {"id": 111, "first_name": "Ana", "timestamp": 1_700_000_000},
                "222": {"id": 222, "first_name": "Bob", "username": "bob"},
                "settings": {"id": 0}
            })))
            .mount(&server)
            .await;

        let users = firebase_store(&server).get_all().await;
        assert_eq!(users.len(), 2);
        assert_eq!(users[&111].username, "no_username");
        assert_eq!(users[&222].first_name, "Bob");
    }

    /// Test that one bad record does not hide the others
    #[tokio::test]
    async fn test_firebase_get_all_skips_malformed_record() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "111": {"id": 111, "first_name": "Ana", "timestamp": 1_700_000_000_000_i64},
                "222": {"first_name": "", "timestamp": 1_700_000_000},
                "333": {"id": 333, "timestamp": "not a date"},
                "444": "garbage"
            })))
            .mount(&server)
            .await;

        let users = firebase_store(&server).get_all().await;
        assert_eq!(users.len(), 2);
        assert_eq!(
            users[&111].first_seen,
            Utc.timestamp_opt(1_700_000_000, 0).unwrap()
        );
        assert_eq!(users[&222].id, 222);
        assert_eq!(users[&222].first_name, "Unknown");
    }

    /// Test count and status use shallow reads
    #[tokio::test]
    async fn test_firebase_count_and_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users.json"))
            .and(query_param("shallow", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "111": true,
                "222": true,
                "333": true
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/.json"))
            .and(query_param("shallow", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"users": true})))
            .mount(&server)
            .await;

        let store = firebase_store(&server);
        assert_eq!(store.count().await, 3);

        let status = store.status().await;
        assert!(status.connected);
        assert_eq!(status.total_users, 3);
    }

    /// Test that an empty database counts as zero users
    #[tokio::test]
    async fn test_firebase_empty_database() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("null"))
            .mount(&server)
            .await;

        let store = firebase_store(&server);
        assert_eq!(store.count().await, 0);
        assert!(store.get_all().await.is_empty());
    }
}
