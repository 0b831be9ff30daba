//! # Configuration Module
//!
//! This module reads the bot configuration from the environment and
//! holds the defaults for the optional settings.

use anyhow::{bail, Result};
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

// Constants for the remote endpoints and the HTTP surface
pub const DEFAULT_REMOVE_BG_API_URL: &str = "https://api.remove.bg/v1.0/removebg";
pub const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_STORE_TIMEOUT_SECS: u64 = 10;

pub const BOT_NAME: &str = "Background Remover Bot";
pub const BOT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Runtime configuration of the bot
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Telegram bot token
    pub bot_token: String,
    /// remove.bg API key
    pub remove_bg_api_key: String,
    /// User id allowed to use the admin panel, compared as a string
    pub admin_user_id: Option<String>,
    /// Firebase Realtime Database URL; `None` selects the in-memory store
    pub firebase_database_url: Option<String>,
    /// Background-removal endpoint
    pub remove_bg_api_url: String,
    /// Telegram Bot API base URL
    pub telegram_api_url: String,
    /// Public URL registered as the webhook at startup
    pub webhook_url: Option<String>,
    /// Secret token expected in the webhook header
    pub webhook_secret: Option<String>,
    pub host: String,
    pub port: u16,
    /// Timeout for the Telegram and remove.bg calls in seconds
    pub http_timeout_secs: u64,
    /// Timeout for the remote store calls in seconds
    pub store_timeout_secs: u64,
}

impl BotConfig {
    /// Load the configuration from environment variables
    ///
    /// Fails when `TELEGRAM_BOT_TOKEN` or `REMOVE_BG_API_KEY` is missing.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bot_token = non_empty("TELEGRAM_BOT_TOKEN");
        let remove_bg_api_key = non_empty("REMOVE_BG_API_KEY");

        let (bot_token, remove_bg_api_key) = match (bot_token, remove_bg_api_key) {
            (Some(token), Some(key)) => (token, key),
            (token, key) => {
                let missing: Vec<&str> = [
                    token.is_none().then_some("TELEGRAM_BOT_TOKEN"),
                    key.is_none().then_some("REMOVE_BG_API_KEY"),
                ]
                .into_iter()
                .flatten()
                .collect();
                bail!(
                    "Missing required environment variables: {}",
                    missing.join(", ")
                );
            }
        };

        let firebase_database_url = non_empty("FIREBASE_DATABASE_URL")
            .map(|url| url.trim_end_matches('/').to_string());

        Ok(Self {
            bot_token,
            remove_bg_api_key,
            admin_user_id: non_empty("ADMIN_USER_ID").map(|id| id.trim().to_string()),
            firebase_database_url,
            remove_bg_api_url: non_empty("REMOVE_BG_API_URL")
                .unwrap_or_else(|| DEFAULT_REMOVE_BG_API_URL.to_string()),
            telegram_api_url: non_empty("TELEGRAM_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_TELEGRAM_API_URL.to_string()),
            webhook_url: non_empty("WEBHOOK_URL"),
            webhook_secret: non_empty("WEBHOOK_SECRET"),
            host: non_empty("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_or_default("PORT", non_empty("PORT"), DEFAULT_PORT),
            http_timeout_secs: parse_or_default(
                "HTTP_TIMEOUT_SECS",
                non_empty("HTTP_TIMEOUT_SECS"),
                DEFAULT_HTTP_TIMEOUT_SECS,
            ),
            store_timeout_secs: parse_or_default(
                "STORE_TIMEOUT_SECS",
                non_empty("STORE_TIMEOUT_SECS"),
                DEFAULT_STORE_TIMEOUT_SECS,
            ),
        })
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }

    /// Address the HTTP server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or_default<T>(key: &str, value: Option<String>, default: T) -> T
where
    T: FromStr + Display,
{
    match value {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, default = %default, "Invalid value, using the default");
            default
        }),
    }
}
