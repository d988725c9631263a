//! Telegram transport for Herald.
//!
//! - [`TelegramNotifier`] delivers task notifications to chats in HTML parse
//!   mode, with an inline "Cancel" button on cancelable ones.
//! - [`CommandListener`] long-polls the bot and turns `/run`, `/cancel`,
//!   `/tasks` and button presses into calls on a [`CommandHandler`].
//!
//! # Environment Variables
//!
//! - `TELEGRAM_BOT_TOKEN`: Bot token from @BotFather
//! - `TELEGRAM_CHAT_ID`: Chat that receives notifications and may send commands
//!
//! # Commands
//!
//! - `/help` - Show available commands
//! - `/tasks` - List tasks and their commands
//! - `/run <task> <command>` - Start a run
//! - `/cancel <instance>` - Cancel a running instance

pub mod error;
pub mod format;
pub mod listener;
pub mod notifier;

pub use error::{Result, TelegramError};
pub use listener::{Command, CommandHandler, CommandListener};
pub use notifier::{parse_chat_id, TelegramNotifier};
