//! Telegram Bot API types and client.

pub mod client;
pub mod types;

pub use client::{BotApi, OutgoingDocument, TelegramClient};
pub use types::{ApiResponse, Chat, Document, File, Message, ReplyParameters, Update, User, WebhookInfo};
