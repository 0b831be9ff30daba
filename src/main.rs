use anyhow::{Context, Result};
use reqwest::Url;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use bg_remover_bot::bot::BotContext;
use bg_remover_bot::config::{BotConfig, BOT_NAME, BOT_VERSION};
use bg_remover_bot::firebase::FirebaseUserStore;
use bg_remover_bot::remove_bg::RemoveBgClient;
use bg_remover_bot::server::{self, AppState};
use bg_remover_bot::storage::{MemoryUserStore, UserStore};
use bg_remover_bot::telegram::{BotIdentity, ChatPlatform, TelegramClient};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json")) {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    init_tracing();

    info!(name = BOT_NAME, version = BOT_VERSION, "Starting bot");

    let config = BotConfig::from_env().context("Failed to load configuration")?;
    info!(
        admin_configured = config.admin_user_id.is_some(),
        firebase_configured = config.firebase_database_url.is_some(),
        webhook_configured = config.webhook_url.is_some(),
        "Configuration loaded"
    );

    let telegram = Arc::new(
        TelegramClient::new(
            &config.bot_token,
            &config.telegram_api_url,
            config.http_timeout(),
        )
        .context("Failed to create Telegram client")?,
    );
    let remover = Arc::new(
        RemoveBgClient::new(
            &config.remove_bg_api_url,
            &config.remove_bg_api_key,
            config.http_timeout(),
        )
        .context("Failed to create remove.bg client")?,
    );

    let store: Arc<dyn UserStore> = match config.firebase_database_url.as_deref() {
        Some(url) => Arc::new(
            FirebaseUserStore::new(url, config.store_timeout())
                .context("Failed to create Firebase store")?,
        ),
        None => {
            info!("No Firebase URL configured, using in-memory user store");
            Arc::new(MemoryUserStore::new())
        }
    };
    let status = store.status().await;
    info!(
        backend = %status.backend,
        connected = status.connected,
        total_users = status.total_users,
        "User store ready"
    );

    let identity = match telegram.get_me().await {
        Ok(identity) => {
            info!(username = ?identity.username, "Bot identity fetched");
            identity
        }
        Err(e) => {
            warn!(error = %e, "Failed to fetch bot identity, continuing without it");
            BotIdentity::default()
        }
    };

    let webhook_enabled = match config.webhook_url.as_deref() {
        Some(url) => {
            register_webhook(&telegram, url, config.webhook_secret.as_deref()).await?;
            true
        }
        None => {
            info!("WEBHOOK_URL not set, expecting an externally registered webhook");
            false
        }
    };

    let ctx = BotContext::new(
        telegram.clone(),
        remover,
        store,
        config.admin_user_id.clone(),
    )
    .with_identity(identity)
    .with_webhook_enabled(webhook_enabled);

    let state = Arc::new(AppState::new(ctx, config.webhook_secret.clone()));
    let app = server::router(state);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    info!(address = %address, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Shutting down");
        })
        .await
        .context("HTTP server failed")?;

    Ok(())
}

async fn register_webhook(telegram: &TelegramClient, url: &str, secret: Option<&str>) -> Result<()> {
    let url = Url::parse(url).with_context(|| format!("Invalid WEBHOOK_URL: {url}"))?;
    info!(url = %url, "Setting a webhook");

    let mut request = telegram.bot().set_webhook(url);
    if let Some(secret) = secret {
        request = request.secret_token(secret.to_string());
    }
    request.await.context("Failed to register webhook")?;
    Ok(())
}
