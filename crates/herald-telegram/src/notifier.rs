//! Delivering task notifications to Telegram chats.

use std::collections::HashMap;

use async_trait::async_trait;
use herald_core::{Notification, Notifier, NotifierId, NotifyError, TaskContext};
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, ParseMode};
use tracing::{debug, info};

use crate::error::{Result, TelegramError};
use crate::format::{cancel_callback_data, render};

/// Sends notifications to Telegram, one chat per notifier ID.
#[derive(Clone)]
pub struct TelegramNotifier {
    bot: Bot,
    chats: HashMap<NotifierId, ChatId>,
}

impl std::fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramNotifier")
            .field("chats", &self.chats)
            .finish()
    }
}

impl TelegramNotifier {
    /// Creates a notifier with no chats.
    pub fn new(bot: Bot) -> Self {
        Self {
            bot,
            chats: HashMap::new(),
        }
    }

    /// Creates a notifier from a token and a chat ID string.
    pub fn from_token(token: &str, notifier_id: impl Into<NotifierId>, chat_id: &str) -> Result<Self> {
        if token.trim().is_empty() {
            return Err(TelegramError::NoToken);
        }
        Ok(Self::new(Bot::new(token)).with_chat(notifier_id, parse_chat_id(chat_id)?))
    }

    /// Routes `notifier_id` to `chat_id`.
    pub fn with_chat(mut self, notifier_id: impl Into<NotifierId>, chat_id: ChatId) -> Self {
        self.chats.insert(notifier_id.into(), chat_id);
        self
    }

    pub fn bot(&self) -> &Bot {
        &self.bot
    }

    /// Returns the chat for a notifier ID.
    pub fn chat_for(&self, notifier_id: &NotifierId) -> Option<ChatId> {
        self.chats.get(notifier_id).copied()
    }

    /// Returns every configured chat.
    pub fn chats(&self) -> impl Iterator<Item = ChatId> + '_ {
        self.chats.values().copied()
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, ctx: &TaskContext, notification: Notification) -> std::result::Result<(), NotifyError> {
        let chat_id = self
            .chat_for(&notification.notifier_id)
            .ok_or_else(|| NotifyError::UnknownNotifier(notification.notifier_id.to_string()))?;

        let mut request = self
            .bot
            .send_message(chat_id, render(&notification))
            .parse_mode(ParseMode::Html);

        if notification.cancelable {
            request = request.reply_markup(InlineKeyboardMarkup::new(vec![vec![
                InlineKeyboardButton::callback(
                    "Cancel",
                    cancel_callback_data(&notification.instance_id),
                ),
            ]]));
        }

        debug!(
            chat_id = %chat_id,
            task_id = %notification.task_id,
            instance_id = %notification.instance_id,
            "sending telegram notification"
        );

        ctx.run_until(async move { request.await })
            .await
            .map_err(|e| NotifyError::Delivery(e.to_string()))?
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;

        info!(
            chat_id = %chat_id,
            instance_id = %notification.instance_id,
            error_occurred = notification.error_occurred,
            "telegram notification sent"
        );
        Ok(())
    }

    fn supports_rich_formatting(&self, notifier_id: &NotifierId) -> bool {
        self.chats.contains_key(notifier_id)
    }
}

/// Parses a numeric chat ID (negative for groups).
pub fn parse_chat_id(raw: &str) -> Result<ChatId> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(TelegramError::NoChat);
    }
    raw.parse::<i64>()
        .map(ChatId)
        .map_err(|_| TelegramError::InvalidChatId(raw.to_string()))
}
