//! Bot module for handling Telegram interactions
//!
//! This module is split into several submodules for better organization:
//! - `router`: Classifies an update and dispatches it to a handler
//! - `message_handler`: Handles commands, free text and photos
//! - `callback_handler`: Handles inline keyboard callback queries
//! - `ui_builder`: Creates keyboards and formats messages

pub mod callback_handler;
pub mod message_handler;
pub mod router;
pub mod ui_builder;

use std::collections::HashSet;
use std::sync::Arc;
use teloxide::types::User;
use tokio::sync::Mutex;

use crate::remove_bg::BackgroundRemover;
use crate::storage::UserStore;
use crate::telegram::{BotIdentity, ChatPlatform};

// Re-export main entry points for use in main.rs and the server
pub use callback_handler::handle_callback;
pub use router::{route, Ack};

/// Everything a handler needs, shared by all webhook calls
pub struct BotContext {
    pub platform: Arc<dyn ChatPlatform>,
    pub remover: Arc<dyn BackgroundRemover>,
    pub store: Arc<dyn UserStore>,
    pub admin_user_id: Option<String>,
    pub identity: BotIdentity,
    pub webhook_enabled: bool,
    /// Admins who armed `/broadcast` and whose next text is sent to everyone
    broadcast_pending: Mutex<HashSet<i64>>,
}

impl BotContext {
    pub fn new(
        platform: Arc<dyn ChatPlatform>,
        remover: Arc<dyn BackgroundRemover>,
        store: Arc<dyn UserStore>,
        admin_user_id: Option<String>,
    ) -> Self {
        Self {
            platform,
            remover,
            store,
            admin_user_id,
            identity: BotIdentity::default(),
            webhook_enabled: false,
            broadcast_pending: Mutex::new(HashSet::new()),
        }
    }

    pub fn with_identity(mut self, identity: BotIdentity) -> Self {
        self.identity = identity;
        self
    }

    pub fn with_webhook_enabled(mut self, enabled: bool) -> Self {
        self.webhook_enabled = enabled;
        self
    }

    /// Exact string comparison with the configured admin id
    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admin_user_id
            .as_deref()
            .is_some_and(|admin| admin == user_id.to_string())
    }

    /// Chat id of the admin, if configured and numeric
    pub fn admin_chat_id(&self) -> Option<i64> {
        self.admin_user_id.as_deref()?.parse().ok()
    }

    pub(crate) async fn arm_broadcast(&self, user_id: i64) {
        self.broadcast_pending.lock().await.insert(user_id);
    }

    /// Disarm broadcast mode, returning whether it was armed
    pub(crate) async fn disarm_broadcast(&self, user_id: i64) -> bool {
        self.broadcast_pending.lock().await.remove(&user_id)
    }
}

/// Store key of a Telegram user
pub fn user_key(user: &User) -> i64 {
    user.id.0 as i64
}
