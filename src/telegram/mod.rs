//! Telegram bot integration.

pub mod client;

pub use client::TelegramSession;
