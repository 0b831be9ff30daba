//! # Telegram Client Module
//!
//! [`ChatPlatform`] is the set of Bot API calls the handlers use. The
//! production implementation wraps a teloxide [`Bot`]; file bytes are
//! downloaded with a plain HTTP GET against the file endpoint.

use anyhow::{bail, Result};
use async_trait::async_trait;
use reqwest::Url;
use teloxide::prelude::*;
use teloxide::types::{
    CallbackQueryId, FileId, InlineKeyboardButton, InlineKeyboardMarkup, InputFile, ParseMode,
};
use tracing::{debug, error, info};

use crate::bot::ui_builder::Keyboard;

/// Identity of the bot account
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BotIdentity {
    pub id: i64,
    pub first_name: String,
    pub username: Option<String>,
}

/// Metadata of a file stored on the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub file_id: String,
    pub file_path: String,
    pub file_size: u32,
}

/// Outbound calls to the chat platform
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    async fn send_message(&self, chat_id: i64, text: &str, keyboard: Option<&Keyboard>) -> Result<()>;

    /// Send PNG bytes as a photo
    async fn send_photo(
        &self,
        chat_id: i64,
        photo: Vec<u8>,
        caption: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<()>;

    async fn get_file(&self, file_id: &str) -> Result<FileInfo>;

    async fn download_file(&self, file_path: &str) -> Result<Vec<u8>>;

    /// Acknowledge a callback query, optionally with a text or an alert
    async fn answer_callback(&self, callback_id: &str, text: Option<&str>, show_alert: bool) -> Result<()>;

    async fn get_me(&self) -> Result<BotIdentity>;
}

/// Convert a keyboard into the teloxide inline markup
pub fn to_inline_markup(keyboard: &Keyboard) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(keyboard.rows.iter().map(|row| {
        row.iter()
            .map(|button| InlineKeyboardButton::callback(button.label.clone(), button.token.to_string()))
            .collect::<Vec<_>>()
    }))
}

pub struct TelegramClient {
    bot: Bot,
    http: reqwest::Client,
    api_url: String,
}

impl TelegramClient {
    pub fn new(token: &str, api_url: &str, timeout: std::time::Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let bot = Bot::with_client(token, http.clone()).set_api_url(Url::parse(api_url)?);
        Ok(Self {
            bot,
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }

    /// Underlying teloxide bot, used for webhook registration
    pub fn bot(&self) -> &Bot {
        &self.bot
    }

    fn file_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{}", self.api_url, self.bot.token(), file_path)
    }
}

#[async_trait]
impl ChatPlatform for TelegramClient {
    async fn send_message(&self, chat_id: i64, text: &str, keyboard: Option<&Keyboard>) -> Result<()> {
        let mut request = self
            .bot
            .send_message(ChatId(chat_id), text)
            .parse_mode(ParseMode::Html);
        if let Some(keyboard) = keyboard {
            request = request.reply_markup(to_inline_markup(keyboard));
        }
        request.await?;
        debug!(chat_id, "Message sent");
        Ok(())
    }

    async fn send_photo(
        &self,
        chat_id: i64,
        photo: Vec<u8>,
        caption: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<()> {
        let size = photo.len();
        let file = InputFile::memory(photo).file_name("image.png");
        let mut request = self
            .bot
            .send_photo(ChatId(chat_id), file)
            .caption(caption)
            .parse_mode(ParseMode::Html);
        if let Some(keyboard) = keyboard {
            request = request.reply_markup(to_inline_markup(keyboard));
        }
        request.await?;
        info!(chat_id, size, "Photo sent");
        Ok(())
    }

    async fn get_file(&self, file_id: &str) -> Result<FileInfo> {
        let file = self.bot.get_file(FileId(file_id.to_string())).await?;
        Ok(FileInfo {
            file_id: file_id.to_string(),
            file_path: file.path,
            file_size: file.meta.size,
        })
    }

    async fn download_file(&self, file_path: &str) -> Result<Vec<u8>> {
        let response = self.http.get(self.file_url(file_path)).send().await?;
        let status = response.status();
        if !status.is_success() {
            error!(status = status.as_u16(), file_path, "File download rejected");
            bail!("file download failed with status {status}");
        }
        Ok(response.bytes().await?.to_vec())
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>, show_alert: bool) -> Result<()> {
        let mut request = self
            .bot
            .answer_callback_query(CallbackQueryId(callback_id.to_string()));
        if let Some(text) = text {
            request = request.text(text);
        }
        if show_alert {
            request = request.show_alert(true);
        }
        request.await?;
        Ok(())
    }

    async fn get_me(&self) -> Result<BotIdentity> {
        let me = self.bot.get_me().await?;
        Ok(BotIdentity {
            id: me.user.id.0 as i64,
            first_name: me.user.first_name.clone(),
            username: me.user.username.clone(),
        })
    }
}
