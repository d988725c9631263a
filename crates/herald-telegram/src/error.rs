//! Error types for the Telegram transport.

use thiserror::Error;

/// Errors that can occur while setting up or talking to Telegram.
#[derive(Debug, Error)]
pub enum TelegramError {
    /// Bot token not provided.
    #[error("Telegram bot token not set. Set TELEGRAM_BOT_TOKEN or [telegram].token.")]
    NoToken,

    /// No chat to deliver to.
    #[error("Telegram chat not set. Set TELEGRAM_CHAT_ID or [telegram].chat_id.")]
    NoChat,

    /// Chat ID is not a number.
    #[error("invalid Telegram chat id '{0}'")]
    InvalidChatId(String),

    /// Bot API request failed.
    #[error("Telegram API error: {0}")]
    Api(#[from] teloxide::RequestError),
}

/// Result type for Telegram operations.
pub type Result<T> = std::result::Result<T, TelegramError>;
