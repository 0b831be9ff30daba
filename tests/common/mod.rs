//! Recording fakes shared by the integration tests

#![allow(dead_code)]

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use bg_remover_bot::bot::ui_builder::Keyboard;
use bg_remover_bot::bot::BotContext;
use bg_remover_bot::errors::RemovalError;
use bg_remover_bot::remove_bg::BackgroundRemover;
use bg_remover_bot::storage::{MemoryUserStore, UserStore};
use bg_remover_bot::telegram::{BotIdentity, ChatPlatform, FileInfo};

pub const ADMIN_ID: i64 = 999;

/// One outbound platform call
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Message {
        chat_id: i64,
        text: String,
        keyboard: Option<Keyboard>,
    },
    Photo {
        chat_id: i64,
        photo: Vec<u8>,
        caption: String,
        keyboard: Option<Keyboard>,
    },
    GetFile(String),
    Download(String),
    Answer {
        callback_id: String,
        text: Option<String>,
        show_alert: bool,
    },
}

/// Which platform operations should fail
#[derive(Debug, Clone, Copy, Default)]
pub struct Failures {
    pub get_file: bool,
    pub download: bool,
    pub send_photo: bool,
    pub send_message: bool,
}

#[derive(Default)]
pub struct RecordingPlatform {
    calls: Mutex<Vec<Call>>,
    failures: Mutex<Failures>,
}

impl RecordingPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, failures: Failures) {
        *self.failures.lock().unwrap() = failures;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Messages sent to one chat, text only
    pub fn messages_to(&self, chat_id: i64) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Message { chat_id: to, text, .. } if to == chat_id => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn message_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call, Call::Message { .. }))
            .collect()
    }

    pub fn photos(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call, Call::Photo { .. }))
            .collect()
    }

    pub fn answers(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call, Call::Answer { .. }))
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn failures(&self) -> Failures {
        *self.failures.lock().unwrap()
    }
}

#[async_trait]
impl ChatPlatform for RecordingPlatform {
    async fn send_message(&self, chat_id: i64, text: &str, keyboard: Option<&Keyboard>) -> Result<()> {
        self.record(Call::Message {
            chat_id,
            text: text.to_string(),
            keyboard: keyboard.cloned(),
        });
        if self.failures().send_message {
            bail!("send_message failed");
        }
        Ok(())
    }

    async fn send_photo(
        &self,
        chat_id: i64,
        photo: Vec<u8>,
        caption: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<()> {
        self.record(Call::Photo {
            chat_id,
            photo,
            caption: caption.to_string(),
            keyboard: keyboard.cloned(),
        });
        if self.failures().send_photo {
            bail!("send_photo failed");
        }
        Ok(())
    }

    async fn get_file(&self, file_id: &str) -> Result<FileInfo> {
        self.record(Call::GetFile(file_id.to_string()));
        if self.failures().get_file {
            bail!("get_file failed");
        }
        Ok(FileInfo {
            file_id: file_id.to_string(),
            file_path: format!("photos/{file_id}.jpg"),
            file_size: 4,
        })
    }

    async fn download_file(&self, file_path: &str) -> Result<Vec<u8>> {
        self.record(Call::Download(file_path.to_string()));
        if self.failures().download {
            bail!("download failed");
        }
        Ok(b"JPEG".to_vec())
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>, show_alert: bool) -> Result<()> {
        self.record(Call::Answer {
            callback_id: callback_id.to_string(),
            text: text.map(str::to_string),
            show_alert,
        });
        Ok(())
    }

    async fn get_me(&self) -> Result<BotIdentity> {
        Ok(BotIdentity {
            id: 1,
            first_name: "Remover".to_string(),
            username: Some("remover_bot".to_string()),
        })
    }
}

/// Background remover returning fixed bytes or a fixed error
pub struct FakeRemover {
    result: Mutex<Result<Vec<u8>, RemovalError>>,
    inputs: Mutex<Vec<Vec<u8>>>,
}

impl FakeRemover {
    pub fn returning(bytes: &[u8]) -> Self {
        Self {
            result: Mutex::new(Ok(bytes.to_vec())),
            inputs: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: RemovalError) -> Self {
        Self {
            result: Mutex::new(Err(error)),
            inputs: Mutex::new(Vec::new()),
        }
    }

    pub fn inputs(&self) -> Vec<Vec<u8>> {
        self.inputs.lock().unwrap().clone()
    }
}

#[async_trait]
impl BackgroundRemover for FakeRemover {
    async fn remove_background(&self, image: Vec<u8>) -> Result<Vec<u8>, RemovalError> {
        self.inputs.lock().unwrap().push(image);
        self.result.lock().unwrap().clone()
    }
}

/// Context wired with fakes and an in-memory store; admin is [`ADMIN_ID`]
pub struct Harness {
    pub ctx: BotContext,
    pub platform: Arc<RecordingPlatform>,
    pub remover: Arc<FakeRemover>,
    pub store: Arc<MemoryUserStore>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_remover(FakeRemover::returning(b"PNGDATA"))
    }

    pub fn with_remover(remover: FakeRemover) -> Self {
        let platform = Arc::new(RecordingPlatform::new());
        let remover = Arc::new(remover);
        let store = Arc::new(MemoryUserStore::new());
        let ctx = BotContext::new(
            platform.clone(),
            remover.clone(),
            store.clone() as Arc<dyn UserStore>,
            Some(ADMIN_ID.to_string()),
        );
        Self {
            ctx,
            platform,
            remover,
            store,
        }
    }
}

fn private_chat(user_id: i64, first_name: &str) -> serde_json::Value {
    serde_json::json!({"id": user_id, "type": "private", "first_name": first_name})
}

fn user(user_id: i64, first_name: &str) -> serde_json::Value {
    serde_json::json!({"id": user_id, "is_bot": false, "first_name": first_name})
}

/// Message update with arbitrary content fields merged in
pub fn message_update(user_id: i64, first_name: &str, content: serde_json::Value) -> serde_json::Value {
    let mut message = serde_json::json!({
        "message_id": 1,
        "date": 1700000000,
        "chat": private_chat(user_id, first_name),
        "from": user(user_id, first_name)
    });
    if let (Some(message), Some(content)) = (message.as_object_mut(), content.as_object()) {
        message.extend(content.clone());
    }
    serde_json::json!({"update_id": 1, "message": message})
}

pub fn text_update(user_id: i64, first_name: &str, text: &str) -> serde_json::Value {
    message_update(user_id, first_name, serde_json::json!({"text": text}))
}

pub fn photo_update(user_id: i64) -> serde_json::Value {
    message_update(
        user_id,
        "Ana",
        serde_json::json!({
            "photo": [
                {"file_id": "small", "file_unique_id": "s", "width": 90, "height": 90},
                {"file_id": "medium", "file_unique_id": "m", "width": 320, "height": 320},
                {"file_id": "large", "file_unique_id": "l", "width": 1280, "height": 1280}
            ]
        }),
    )
}

pub fn callback_update(user_id: i64, data: &str) -> serde_json::Value {
    serde_json::json!({
        "update_id": 3,
        "callback_query": {
            "id": format!("cb-{user_id}"),
            "from": user(user_id, "Ana"),
            "chat_instance": "ci",
            "data": data,
            "message": {
                "message_id": 5,
                "date": 1700000000,
                "chat": private_chat(user_id, "Ana"),
                "from": {"id": 1, "is_bot": true, "first_name": "Remover", "username": "remover_bot"},
                "text": "Background removed"
            }
        }
    })
}
