//! Message Handler module for processing incoming Telegram messages

use anyhow::Result;
use chrono::Utc;
use teloxide::types::{PhotoSize, User};
use tracing::{debug, error, info, warn};

// Import localization
use crate::localization::t;

use crate::errors::RemovalError;
use crate::storage::UserProfile;

use super::{user_key, BotContext};

// Import UI builder functions
use super::ui_builder::{
    create_image_actions_keyboard, format_admin_menu, format_broadcast, format_broadcast_summary,
    format_help, format_info, format_new_user_notification, format_photo_caption, format_stats,
    format_users_list, format_welcome,
};

/// Commands recognized by exact, case-sensitive match on the full text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Info,
    Stats,
    Users,
    Admin,
    Broadcast,
    Cancel,
}

impl Command {
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "/start" => Some(Self::Start),
            "/help" => Some(Self::Help),
            "/info" => Some(Self::Info),
            "/stats" => Some(Self::Stats),
            "/users" => Some(Self::Users),
            "/admin" => Some(Self::Admin),
            "/broadcast" => Some(Self::Broadcast),
            "/cancel" => Some(Self::Cancel),
            _ => None,
        }
    }

    pub fn admin_only(&self) -> bool {
        matches!(
            self,
            Self::Stats | Self::Users | Self::Admin | Self::Broadcast | Self::Cancel
        )
    }
}

/// Persist the sender and notify the admin when the sender is new
///
/// The record is always written (first-seen kept, last-seen refreshed); the
/// notification goes out only when the store had no record for this id.
/// Returns whether the sender was new.
pub async fn register_user(ctx: &BotContext, sender: &User) -> bool {
    let now = Utc::now();
    let user_id = user_key(sender);
    let first_name = Some(sender.first_name.as_str());
    let username = sender.username.as_deref();

    let existing = ctx.store.get(user_id).await;
    let is_new = existing.is_none();

    let record = match &existing {
        Some(previous) => previous.touched(first_name, username, now),
        None => UserProfile::new(user_id, first_name, username, now),
    };

    if let Err(e) = ctx.store.put(&record).await {
        warn!(
            user_id,
            backend = ctx.store.backend_name(),
            error = %e,
            "Failed to persist user record"
        );
    }

    if is_new {
        info!(user_id, first_name = %record.first_name, "New user seen");
        if !ctx.is_admin(user_id) {
            notify_admin_new_user(ctx, &record).await;
        }
    }

    is_new
}

async fn notify_admin_new_user(ctx: &BotContext, profile: &UserProfile) {
    let Some(admin_chat_id) = ctx.admin_chat_id() else {
        debug!(user_id = profile.id, "No numeric admin id configured, skipping notification");
        return;
    };

    let total_users = ctx.store.count().await;
    let text = format_new_user_notification(profile.id, &profile.first_name, total_users);
    if let Err(e) = ctx.platform.send_message(admin_chat_id, &text, None).await {
        error!(user_id = profile.id, error = %e, "Failed to notify admin about new user");
    }
}

/// Handle a text message: commands, broadcast input or the default prompt
pub async fn handle_text(ctx: &BotContext, sender: Option<&User>, chat_id: i64, text: &str) -> Result<()> {
    let user_id = sender.map(user_key);
    let is_admin = user_id.is_some_and(|id| ctx.is_admin(id));
    debug!(chat_id, user_id = ?user_id, text_len = text.len(), "Received text message");

    let command = Command::parse(text).filter(|cmd| is_admin || !cmd.admin_only());

    if let (Some(user_id), None) = (user_id, command) {
        if is_admin && ctx.disarm_broadcast(user_id).await {
            return run_broadcast(ctx, chat_id, text).await;
        }
    }

    match command {
        Some(Command::Start) => {
            let first_name = sender
                .map(|s| s.first_name.as_str())
                .filter(|name| !name.trim().is_empty())
                .unwrap_or(crate::storage::UNKNOWN_FIRST_NAME);
            let reply = format_welcome(first_name, is_admin);
            ctx.platform
                .send_message(chat_id, &reply.text, reply.keyboard.as_ref())
                .await?;
        }
        Some(Command::Help) => {
            ctx.platform.send_message(chat_id, &format_help(is_admin), None).await?;
        }
        Some(Command::Info) => {
            let text = format_info(crate::config::BOT_NAME, crate::config::BOT_VERSION);
            ctx.platform.send_message(chat_id, &text, None).await?;
        }
        Some(Command::Stats) => {
            let status = ctx.store.status().await;
            let admin_id = ctx.admin_user_id.as_deref().unwrap_or_default();
            let text = format_stats(&status, admin_id, ctx.webhook_enabled);
            ctx.platform.send_message(chat_id, &text, None).await?;
        }
        Some(Command::Users) => {
            let users = ctx.store.get_all().await;
            ctx.platform
                .send_message(chat_id, &format_users_list(&users), None)
                .await?;
        }
        Some(Command::Admin) => {
            let reply = format_admin_menu();
            ctx.platform
                .send_message(chat_id, &reply.text, reply.keyboard.as_ref())
                .await?;
        }
        Some(Command::Broadcast) => {
            if let Some(user_id) = user_id {
                ctx.arm_broadcast(user_id).await;
                info!(user_id, "Broadcast mode armed");
            }
            ctx.platform.send_message(chat_id, &t("broadcast-prompt"), None).await?;
        }
        Some(Command::Cancel) => {
            let was_armed = match user_id {
                Some(id) => ctx.disarm_broadcast(id).await,
                None => false,
            };
            let text = if was_armed {
                t("broadcast-cancelled")
            } else {
                t("default-prompt")
            };
            ctx.platform.send_message(chat_id, &text, None).await?;
        }
        None => {
            ctx.platform.send_message(chat_id, &t("default-prompt"), None).await?;
        }
    }

    Ok(())
}

/// Send the admin's text to every stored user and report the counts
async fn run_broadcast(ctx: &BotContext, admin_chat_id: i64, text: &str) -> Result<()> {
    let users = ctx.store.get_all().await;
    if users.is_empty() {
        ctx.platform
            .send_message(admin_chat_id, &t("broadcast-empty"), None)
            .await?;
        return Ok(());
    }

    ctx.platform
        .send_message(admin_chat_id, &t("broadcast-started"), None)
        .await?;

    let message = format_broadcast(text);
    let mut sent = 0;
    let mut failed = 0;
    for user_id in users.keys() {
        match ctx.platform.send_message(*user_id, &message, None).await {
            Ok(()) => sent += 1,
            Err(e) => {
                error!(user_id, error = %e, "Failed to deliver broadcast");
                failed += 1;
            }
        }
    }
    info!(sent, failed, "Broadcast completed");

    ctx.platform
        .send_message(admin_chat_id, &format_broadcast_summary(sent, failed), None)
        .await?;
    Ok(())
}

/// Run the background-removal pipeline for a photo message
///
/// Each failing stage sends its own error text and stops the pipeline.
pub async fn handle_photo(ctx: &BotContext, chat_id: i64, photos: &[PhotoSize]) -> Result<()> {
    // Sizes are ordered from smallest to largest
    let Some(largest_photo) = photos.last() else {
        return Ok(());
    };
    let file_id = &largest_photo.file.id.0;
    info!(
        chat_id,
        file_id = %file_id,
        width = largest_photo.width,
        height = largest_photo.height,
        "Photo received"
    );

    let file = match ctx.platform.get_file(file_id).await {
        Ok(file) => file,
        Err(e) => {
            error!(chat_id, error = %e, "Failed to get file info");
            ctx.platform.send_message(chat_id, &t("error-get-file"), None).await?;
            return Ok(());
        }
    };

    let image = match ctx.platform.download_file(&file.file_path).await {
        Ok(bytes) => {
            debug!(chat_id, size = bytes.len(), "Image downloaded");
            bytes
        }
        Err(e) => {
            error!(chat_id, file_path = %file.file_path, error = %e, "Failed to download image");
            ctx.platform.send_message(chat_id, &t("error-download"), None).await?;
            return Ok(());
        }
    };

    let processed = match ctx.remover.remove_background(image).await {
        Ok(bytes) => bytes,
        Err(e) => {
            match &e {
                RemovalError::Timeout(_) => {
                    warn!(chat_id, error = %e, "Background removal timed out")
                }
                _ => error!(chat_id, error = %e, "Background removal failed"),
            }
            ctx.platform.send_message(chat_id, &t("error-process"), None).await?;
            return Ok(());
        }
    };

    let keyboard = create_image_actions_keyboard();
    if let Err(e) = ctx
        .platform
        .send_photo(chat_id, processed, &format_photo_caption(), Some(&keyboard))
        .await
    {
        error!(chat_id, error = %e, "Failed to send processed image");
        ctx.platform.send_message(chat_id, &t("error-send"), None).await?;
        return Ok(());
    }

    info!(chat_id, "Processed image delivered");
    Ok(())
}
