//! HTTP surface of the bot
//!
//! - `POST /webhook` - Telegram update delivery
//! - `GET /health` - bot identity and storage status
//! - `GET /` - service banner

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use teloxide::types::Update;
use tracing::{debug, error, warn};

use crate::bot::{route, BotContext};
use crate::config::{BOT_NAME, BOT_VERSION};

/// Header carrying the secret configured with `setWebhook`
pub const SECRET_TOKEN_HEADER: &str = "X-Telegram-Bot-Api-Secret-Token";

/// Shared state of the HTTP server
pub struct AppState {
    pub ctx: BotContext,
    pub webhook_secret: Option<String>,
}

impl AppState {
    pub fn new(ctx: BotContext, webhook_secret: Option<String>) -> Self {
        Self { ctx, webhook_secret }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/webhook", post(webhook_handler))
        .route("/health", get(health_handler))
        .route("/", get(root_handler))
        .with_state(state)
}

/// Handler for `POST /webhook`
///
/// 400 for a body that is not an update, 401 for a wrong secret, 500 when
/// a handler error escapes the router.
async fn webhook_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    if let Some(expected) = state.webhook_secret.as_deref() {
        let provided = headers
            .get(SECRET_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok());
        if provided != Some(expected) {
            warn!("Webhook call with missing or wrong secret token");
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({"status": "error", "error": "unauthorized"})),
            );
        }
    }

    let update: Update = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(e) => {
            warn!(error = %e, body_len = body.len(), "Unparseable webhook body");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"status": "error", "error": e.to_string()})),
            );
        }
    };

    match route(&state.ctx, update).await {
        Ok(ack) => {
            debug!(status = ack.as_status(), "Update acknowledged");
            (StatusCode::OK, Json(json!({"status": ack.as_status()})))
        }
        Err(e) => {
            error!(error = %e, "Update processing failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"status": "error"})),
            )
        }
    }
}

/// Handler for `GET /health`
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let storage = state.ctx.store.status().await;
    let health_status = json!({
        "status": "healthy",
        "bot": {
            "name": BOT_NAME,
            "version": BOT_VERSION,
            "username": state.ctx.identity.username,
        },
        "storage": storage,
    });

    (StatusCode::OK, Json(health_status))
}

/// Handler for `GET /`
async fn root_handler() -> impl IntoResponse {
    Json(json!({
        "service": BOT_NAME,
        "version": BOT_VERSION,
        "endpoints": {
            "webhook": "POST /webhook",
            "health": "GET /health",
        },
    }))
}
