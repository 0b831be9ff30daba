//! # Background Remover Telegram Bot
//!
//! A webhook-driven Telegram bot that sends user photos to the remove.bg API,
//! relays the processed image back to the chat and keeps a small user
//! registry with an admin panel for statistics and broadcasts.

pub mod bot;
pub mod config;
pub mod errors;
pub mod firebase;
pub mod localization;
pub mod remove_bg;
pub mod server;
pub mod storage;
pub mod telegram;
