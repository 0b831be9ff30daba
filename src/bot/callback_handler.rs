//! Callback Handler module for processing inline keyboard button presses

use anyhow::Result;
use std::str::FromStr;
use teloxide::types::CallbackQuery;
use tracing::{debug, error, info, warn};

// Import localization
use crate::localization::t;

use super::{user_key, BotContext};

// Import UI builder functions
use super::ui_builder::{
    create_back_to_image_keyboard, create_back_to_menu_keyboard, create_image_actions_keyboard,
    create_users_keyboard, format_admin_menu, format_help, format_stats, format_users_list,
    is_admin_data, CallbackToken, ReplyPayload,
};

/// Handle a callback query
///
/// The query is answered exactly once, whatever happens while rendering or
/// sending the screen.
pub async fn handle_callback(ctx: &BotContext, query: &CallbackQuery) {
    let data = query.data.as_deref().unwrap_or_default();
    let user_id = user_key(&query.from);
    let is_admin = ctx.is_admin(user_id);
    debug!(user_id, callback_data = %data, "Received callback query");

    if is_admin_data(data) && !is_admin {
        warn!(user_id, callback_data = %data, "Admin callback from non-admin user");
        answer(ctx, query, Some(&t("no-permission")), true).await;
        return;
    }

    if let Err(e) = dispatch_callback(ctx, query, data, is_admin).await {
        error!(user_id, callback_data = %data, error = %e, "Error handling callback");
    }

    answer(ctx, query, None, false).await;
}

/// Chat where screens for this callback are sent
fn callback_chat_id(query: &CallbackQuery) -> i64 {
    query
        .message
        .as_ref()
        .map(|message| message.chat().id.0)
        .unwrap_or_else(|| user_key(&query.from))
}

async fn dispatch_callback(ctx: &BotContext, query: &CallbackQuery, data: &str, is_admin: bool) -> Result<()> {
    let Ok(token) = CallbackToken::from_str(data) else {
        debug!(callback_data = %data, "Unknown callback data");
        return Ok(());
    };

    let reply = render_screen(ctx, token, user_key(&query.from), is_admin).await;
    ctx.platform
        .send_message(callback_chat_id(query), &reply.text, reply.keyboard.as_ref())
        .await
}

/// Build the screen a callback token leads to
///
/// `AdminBroadcast` also arms broadcast mode for `user_id`.
pub async fn render_screen(ctx: &BotContext, token: CallbackToken, user_id: i64, is_admin: bool) -> ReplyPayload {
    match token {
        CallbackToken::AdminStats => {
            let status = ctx.store.status().await;
            let admin_id = ctx.admin_user_id.as_deref().unwrap_or_default();
            ReplyPayload::with_keyboard(
                format_stats(&status, admin_id, ctx.webhook_enabled),
                create_back_to_menu_keyboard(),
            )
        }
        CallbackToken::AdminUsers => {
            let users = ctx.store.get_all().await;
            ReplyPayload::with_keyboard(format_users_list(&users), create_users_keyboard())
        }
        CallbackToken::AdminBroadcast => {
            ctx.arm_broadcast(user_id).await;
            info!(user_id, "Broadcast mode armed");
            ReplyPayload::with_keyboard(t("broadcast-prompt"), create_back_to_menu_keyboard())
        }
        CallbackToken::AdminBack => format_admin_menu(),
        CallbackToken::Help => {
            let keyboard = if is_admin {
                create_back_to_menu_keyboard()
            } else {
                create_back_to_image_keyboard()
            };
            ReplyPayload::with_keyboard(format_help(is_admin), keyboard)
        }
        CallbackToken::DeveloperInfo => {
            ReplyPayload::with_keyboard(t("developer-info"), create_back_to_image_keyboard())
        }
        CallbackToken::RateBot => {
            ReplyPayload::with_keyboard(t("rate-bot"), create_back_to_image_keyboard())
        }
        CallbackToken::RemoveAnother => {
            ReplyPayload::with_keyboard(t("remove-another"), create_back_to_image_keyboard())
        }
        CallbackToken::BackToImage => {
            ReplyPayload::with_keyboard(t("image-ready"), create_image_actions_keyboard())
        }
    }
}

async fn answer(ctx: &BotContext, query: &CallbackQuery, text: Option<&str>, show_alert: bool) {
    if let Err(e) = ctx.platform.answer_callback(&query.id.0, text, show_alert).await {
        error!(callback_id = %query.id.0, error = %e, "Failed to answer callback query");
    }
}
