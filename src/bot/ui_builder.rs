//! UI Builder module for creating keyboards and formatting messages

use std::collections::HashMap;
use strum::{AsRefStr, Display, EnumIter, EnumString};
use teloxide::utils::html::escape;

// Import localization
use crate::localization::{t, t_args};

use crate::storage::{StorageStatus, UserProfile};

/// Callback data prefix reserved for the admin panel
pub const ADMIN_PREFIX: &str = "admin_";

/// Maximum number of users rendered by the users screen
pub const USERS_LIST_LIMIT: usize = 50;

/// Screens reachable from inline buttons; the string form is the callback data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, AsRefStr, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum CallbackToken {
    AdminStats,
    AdminUsers,
    AdminBroadcast,
    AdminBack,
    Help,
    DeveloperInfo,
    RateBot,
    RemoveAnother,
    BackToImage,
}

impl CallbackToken {
    pub fn requires_admin(&self) -> bool {
        is_admin_data(self.as_ref())
    }
}

/// Whether raw callback data belongs to the admin namespace
pub fn is_admin_data(data: &str) -> bool {
    data.starts_with(ADMIN_PREFIX)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub token: CallbackToken,
}

impl Button {
    pub fn new(label: impl Into<String>, token: CallbackToken) -> Self {
        Self {
            label: label.into(),
            token,
        }
    }
}

/// Inline keyboard as rows of buttons
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    pub fn new(rows: Vec<Vec<Button>>) -> Self {
        Self { rows }
    }

    /// All callback tokens in row order
    pub fn tokens(&self) -> Vec<CallbackToken> {
        self.rows.iter().flatten().map(|b| b.token).collect()
    }
}

/// Text plus an optional keyboard, ready to be sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyPayload {
    pub text: String,
    pub keyboard: Option<Keyboard>,
}

impl ReplyPayload {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
        }
    }

    pub fn with_keyboard(text: impl Into<String>, keyboard: Keyboard) -> Self {
        Self {
            text: text.into(),
            keyboard: Some(keyboard),
        }
    }
}

fn paragraphs(parts: &[String]) -> String {
    parts.join("\n\n")
}

/// Admin panel: statistics, users, help and a refresh of the statistics
pub fn create_admin_menu_keyboard() -> Keyboard {
    Keyboard::new(vec![
        vec![
            Button::new(t("btn-statistics"), CallbackToken::AdminStats),
            Button::new(t("btn-users"), CallbackToken::AdminUsers),
        ],
        vec![
            Button::new(t("btn-help"), CallbackToken::Help),
            Button::new(t("btn-refresh"), CallbackToken::AdminStats),
        ],
    ])
}

/// Buttons attached to a processed image
pub fn create_image_actions_keyboard() -> Keyboard {
    Keyboard::new(vec![
        vec![
            Button::new(t("btn-developer"), CallbackToken::DeveloperInfo),
            Button::new(t("btn-rate"), CallbackToken::RateBot),
        ],
        vec![
            Button::new(t("btn-remove-another"), CallbackToken::RemoveAnother),
            Button::new(t("btn-help"), CallbackToken::Help),
        ],
    ])
}

/// Single-row keyboard leading back to the admin panel
pub fn create_back_to_menu_keyboard() -> Keyboard {
    Keyboard::new(vec![vec![Button::new(
        t("btn-back-menu"),
        CallbackToken::AdminBack,
    )]])
}

/// Users screen: start a broadcast or go back to the admin panel
pub fn create_users_keyboard() -> Keyboard {
    Keyboard::new(vec![
        vec![Button::new(t("btn-broadcast"), CallbackToken::AdminBroadcast)],
        vec![Button::new(t("btn-back-menu"), CallbackToken::AdminBack)],
    ])
}

/// Single-row keyboard leading back to the image-ready screen
pub fn create_back_to_image_keyboard() -> Keyboard {
    Keyboard::new(vec![vec![Button::new(
        t("btn-back"),
        CallbackToken::BackToImage,
    )]])
}

pub fn format_admin_menu() -> ReplyPayload {
    ReplyPayload::with_keyboard(
        paragraphs(&[t("admin-title"), t("admin-choose")]),
        create_admin_menu_keyboard(),
    )
}

/// Greeting for `/start`; the admin also gets the panel
pub fn format_welcome(first_name: &str, is_admin: bool) -> ReplyPayload {
    let mut parts = vec![
        t_args("welcome-greeting", &[("name", &escape(first_name))]),
        t("welcome-intro"),
        t("welcome-credits"),
        t("welcome-features"),
    ];
    if is_admin {
        parts.push(t("welcome-admin"));
        ReplyPayload::with_keyboard(paragraphs(&parts), create_admin_menu_keyboard())
    } else {
        ReplyPayload::text(paragraphs(&parts))
    }
}

pub fn format_help(is_admin: bool) -> String {
    let mut parts = vec![t("help-title"), t("help-steps")];
    if is_admin {
        parts.push(t("help-admin"));
    }
    parts.push(t("help-note"));
    paragraphs(&parts)
}

pub fn format_info(bot_name: &str, version: &str) -> String {
    paragraphs(&[
        t("info-title"),
        t_args("info-body", &[("name", &escape(bot_name)), ("version", version)]),
        t("info-note"),
    ])
}

pub fn format_stats(status: &StorageStatus, admin_id: &str, webhook_enabled: bool) -> String {
    let connection = if status.connected {
        t("stats-connected")
    } else {
        t("stats-disconnected")
    };
    let webhook = if webhook_enabled {
        t("stats-webhook-enabled")
    } else {
        t("stats-webhook-disabled")
    };
    let details = [
        t_args("stats-total", &[("count", &status.total_users.to_string())]),
        t_args("stats-backend", &[("backend", &status.backend)]),
        connection,
        t_args("stats-admin", &[("admin_id", &escape(admin_id))]),
        webhook,
    ]
    .join("\n");
    paragraphs(&[t("stats-title"), details])
}

/// One line per user, sorted by first appearance, capped at [`USERS_LIST_LIMIT`]
pub fn format_users_list(users: &HashMap<i64, UserProfile>) -> String {
    if users.is_empty() {
        return t("users-empty");
    }

    let mut sorted: Vec<&UserProfile> = users.values().collect();
    sorted.sort_by_key(|u| (u.first_seen, u.id));

    let mut lines: Vec<String> = sorted
        .iter()
        .take(USERS_LIST_LIMIT)
        .map(|u| {
            t_args(
                "users-entry",
                &[("name", &escape(&u.first_name)), ("username", &escape(&u.username))],
            )
        })
        .collect();
    if sorted.len() > USERS_LIST_LIMIT {
        let rest = (sorted.len() - USERS_LIST_LIMIT).to_string();
        lines.push(t_args("users-more", &[("count", &rest)]));
    }

    paragraphs(&[
        t_args("users-title", &[("count", &users.len().to_string())]),
        lines.join("\n"),
    ])
}

/// Message sent to the admin when a user is seen for the first time
pub fn format_new_user_notification(id: i64, first_name: &str, total_users: usize) -> String {
    let id = id.to_string();
    paragraphs(&[
        t("new-user-title"),
        t_args("new-user-name", &[("id", &id), ("name", &escape(first_name))]),
        t_args("new-user-id", &[("id", &id)]),
        t_args("new-user-total", &[("count", &total_users.to_string())]),
    ])
}

pub fn format_photo_caption() -> String {
    paragraphs(&[t("photo-success"), t("photo-signature")])
}

pub fn format_broadcast(text: &str) -> String {
    paragraphs(&[t("broadcast-header"), escape(text)])
}

pub fn format_broadcast_summary(sent: usize, failed: usize) -> String {
    t_args(
        "broadcast-done",
        &[("sent", &sent.to_string()), ("failed", &failed.to_string())],
    )
}
