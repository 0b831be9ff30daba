//! Update dispatch boundary
//!
//! Callback queries go to the callback handler. Messages are handled as
//! text, then as photo, and anything else in a message is a no-op. Other
//! update kinds are ignored.

use anyhow::Result;
use teloxide::types::{Message, Update, UpdateKind};
use tracing::{debug, error, info_span, warn, Instrument};

// Import localization
use crate::localization::t;

use super::callback_handler::handle_callback;
use super::message_handler::{handle_photo, handle_text, register_user};
use super::BotContext;

/// Outcome reported back to the webhook caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    /// A handler ran
    Processed,
    /// Neither a message nor a callback query
    Ignored,
    /// A message with neither text nor photo
    NoOp,
}

impl Ack {
    pub fn as_status(&self) -> &'static str {
        match self {
            Ack::Processed | Ack::NoOp => "ok",
            Ack::Ignored => "ignored",
        }
    }
}

/// Route one update to its handler
///
/// Callback failures are absorbed by the callback handler. A message handler
/// error is logged, the chat gets a generic error text and the error is
/// returned so the caller can report it.
pub async fn route(ctx: &BotContext, update: Update) -> Result<Ack> {
    let span = info_span!("update", update_id = update.id.0);
    async move {
        let message = match &update.kind {
            UpdateKind::CallbackQuery(query) => {
                handle_callback(ctx, query).await;
                return Ok(Ack::Processed);
            }
            UpdateKind::Message(message) => message,
            UpdateKind::Error(value) => {
                warn!(payload = %value, "Update payload not understood, ignoring");
                return Ok(Ack::Ignored);
            }
            _ => {
                debug!("Update without message or callback, ignoring");
                return Ok(Ack::Ignored);
            }
        };

        let chat_id = message.chat.id.0;
        match handle_message(ctx, message).await {
            Ok(ack) => Ok(ack),
            Err(e) => {
                error!(chat_id, error = ?e, "Unhandled error while processing message");
                if let Err(send_err) = ctx
                    .platform
                    .send_message(chat_id, &t("error-generic"), None)
                    .await
                {
                    error!(chat_id, error = %send_err, "Failed to send error message");
                }
                Err(e)
            }
        }
    }
    .instrument(span)
    .await
}

/// Text of a message unless it is empty
fn message_text(message: &Message) -> Option<&str> {
    message.text().filter(|text| !text.is_empty())
}

async fn handle_message(ctx: &BotContext, message: &Message) -> Result<Ack> {
    if let Some(sender) = &message.from {
        register_user(ctx, sender).await;
    }

    let chat_id = message.chat.id.0;
    if let Some(text) = message_text(message) {
        handle_text(ctx, message.from.as_ref(), chat_id, text).await?;
        return Ok(Ack::Processed);
    }

    if let Some(photos) = message.photo().filter(|photos| !photos.is_empty()) {
        handle_photo(ctx, chat_id, photos).await?;
        return Ok(Ack::Processed);
    }

    debug!(chat_id, "Message without text or photo");
    Ok(Ack::NoOp)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(extra: serde_json::Value) -> Message {
        let mut json = serde_json::json!({
            "message_id": 1,
            "date": 1700000000,
            "chat": {"id": 111, "type": "private", "first_name": "Ana"},
            "from": {"id": 111, "is_bot": false, "first_name": "Ana"}
        });
        if let (Some(base), Some(extra)) = (json.as_object_mut(), extra.as_object()) {
            base.extend(extra.clone());
        }
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_whitespace_text_is_kept() {
        let msg = message(serde_json::json!({"text": "   "}));
        assert_eq!(message_text(&msg), Some("   "));
    }

    #[test]
    fn test_photo_message_has_no_text() {
        let msg = message(serde_json::json!({
            "photo": [
                {"file_id": "small", "file_unique_id": "s", "width": 90, "height": 90},
                {"file_id": "large", "file_unique_id": "l", "width": 1280, "height": 1280}
            ]
        }));
        assert!(message_text(&msg).is_none());
        assert_eq!(msg.photo().unwrap().last().unwrap().file.id.0, "large");
    }

    #[test]
    fn test_ack_status() {
        assert_eq!(Ack::Processed.as_status(), "ok");
        assert_eq!(Ack::NoOp.as_status(), "ok");
        assert_eq!(Ack::Ignored.as_status(), "ignored");
    }
}
