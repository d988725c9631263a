//! Receiving run and cancel requests from Telegram.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use herald_core::{CommandId, InstanceId, TaskError, TaskId};
use teloxide::dispatching::UpdateFilterExt;
use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, ParseMode};
use teloxide::utils::command::BotCommands;
use tracing::{info, warn};

use crate::format::{escape_html, parse_cancel_callback};

/// Bot commands that can be invoked with /.
#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "Show help message")]
    Help,

    #[command(description = "List tasks and their commands")]
    Tasks,

    #[command(description = "Run a task command: /run <task> <command>", parse_with = "split")]
    Run { task: String, command: String },

    #[command(description = "Cancel a running task: /cancel <instance>")]
    Cancel(String),
}

/// What the listener asks of the task service.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Starts a user-initiated run and returns its instance.
    async fn run(&self, task_id: TaskId, command_id: CommandId) -> Result<InstanceId, TaskError>;

    /// Cancels a running instance.
    async fn cancel(&self, instance_id: &InstanceId) -> Result<(), TaskError>;

    /// One line per task with its commands.
    fn describe_tasks(&self) -> Vec<String>;
}

/// Dispatches Telegram updates from authorized chats to a [`CommandHandler`].
pub struct CommandListener {
    bot: Bot,
    allowed_chats: Arc<HashSet<ChatId>>,
    handler: Arc<dyn CommandHandler>,
}

impl CommandListener {
    pub fn new(
        bot: Bot,
        allowed_chats: impl IntoIterator<Item = ChatId>,
        handler: Arc<dyn CommandHandler>,
    ) -> Self {
        Self {
            bot,
            allowed_chats: Arc::new(allowed_chats.into_iter().collect()),
            handler,
        }
    }

    /// Long-polls Telegram until the future is dropped.
    pub async fn run(self) {
        let chats_for_commands = Arc::clone(&self.allowed_chats);
        let chats_for_callbacks = Arc::clone(&self.allowed_chats);
        let handler_for_commands = Arc::clone(&self.handler);
        let handler_for_callbacks = Arc::clone(&self.handler);

        let handler = dptree::entry()
            .branch(
                Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
                    let chats = Arc::clone(&chats_for_callbacks);
                    let handler = Arc::clone(&handler_for_callbacks);
                    async move { handle_callback(bot, q, chats, handler).await }
                }),
            )
            .branch(
                Update::filter_message()
                    .filter_command::<Command>()
                    .endpoint(move |bot: Bot, msg: Message, cmd: Command| {
                        let chats = Arc::clone(&chats_for_commands);
                        let handler = Arc::clone(&handler_for_commands);
                        async move { handle_command(bot, msg, cmd, chats, handler).await }
                    }),
            );

        info!(chats = self.allowed_chats.len(), "telegram listener started");

        Dispatcher::builder(self.bot, handler)
            .default_handler(|_upd| async {})
            .build()
            .dispatch()
            .await;
    }
}

async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    chats: Arc<HashSet<ChatId>>,
    handler: Arc<dyn CommandHandler>,
) -> ResponseResult<()> {
    if !chats.contains(&msg.chat.id) {
        warn!(chat_id = %msg.chat.id, "command from unauthorized chat ignored");
        return Ok(());
    }

    info!(chat_id = %msg.chat.id, command = ?cmd, "telegram command");
    let reply = command_reply(cmd, handler.as_ref()).await;
    bot.send_message(msg.chat.id, reply)
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

/// Executes a command and builds the HTML reply.
pub async fn command_reply(cmd: Command, handler: &dyn CommandHandler) -> String {
    match cmd {
        Command::Help => escape_html(&Command::descriptions().to_string()),
        Command::Tasks => {
            let tasks = handler.describe_tasks();
            if tasks.is_empty() {
                "No tasks registered.".to_string()
            } else {
                format!("<b>Tasks</b>\n\n{}", escape_html(&tasks.join("\n")))
            }
        }
        Command::Run { task, command } => {
            match handler.run(TaskId::from(task.as_str()), CommandId::from(command.as_str())).await {
                Ok(instance_id) => format!(
                    "Started <b>{} / {}</b> as <code>{}</code>.",
                    escape_html(&task),
                    escape_html(&command),
                    escape_html(instance_id.as_str())
                ),
                Err(e) => format!("❌ {}", escape_html(&e.to_string())),
            }
        }
        Command::Cancel(raw) => {
            let raw = raw.trim();
            if raw.is_empty() {
                return "Usage: <code>/cancel &lt;instance&gt;</code>".to_string();
            }
            cancel_reply(&InstanceId::from(raw), handler).await
        }
    }
}

async fn cancel_reply(instance_id: &InstanceId, handler: &dyn CommandHandler) -> String {
    match handler.cancel(instance_id).await {
        Ok(()) => format!(
            "Cancel requested for <code>{}</code>.",
            escape_html(instance_id.as_str())
        ),
        Err(e) => format!("❌ {}", escape_html(&e.to_string())),
    }
}

async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    chats: Arc<HashSet<ChatId>>,
    handler: Arc<dyn CommandHandler>,
) -> ResponseResult<()> {
    let chat_id = ChatId::from(q.from.id);
    if !chats.contains(&chat_id) {
        warn!(chat_id = %chat_id, "callback from unauthorized chat ignored");
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    }

    let Some(instance_id) = q.data.as_deref().and_then(parse_cancel_callback) else {
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    };

    let reply = cancel_reply(&instance_id, handler.as_ref()).await;
    bot.answer_callback_query(q.id.clone()).await?;
    bot.send_message(chat_id, reply)
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeHandler {
        runs: Mutex<Vec<(TaskId, CommandId)>>,
        cancels: Mutex<Vec<InstanceId>>,
    }

    #[async_trait]
    impl CommandHandler for FakeHandler {
        async fn run(&self, task_id: TaskId, command_id: CommandId) -> Result<InstanceId, TaskError> {
            if task_id.as_str() == "missing" {
                return Err(TaskError::NotFound("task 'missing' is not supported".to_string()));
            }
            self.runs.lock().unwrap().push((task_id, command_id));
            Ok(InstanceId::from("inst-42"))
        }

        async fn cancel(&self, instance_id: &InstanceId) -> Result<(), TaskError> {
            self.cancels.lock().unwrap().push(instance_id.clone());
            Ok(())
        }

        fn describe_tasks(&self) -> Vec<String> {
            vec!["shop: Watch<All>".to_string()]
        }
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            Command::parse("/run shop WatchPrices", "herald_bot").unwrap(),
            Command::Run {
                task: "shop".to_string(),
                command: "WatchPrices".to_string()
            }
        );
        assert_eq!(
            Command::parse("/cancel inst-1", "herald_bot").unwrap(),
            Command::Cancel("inst-1".to_string())
        );
        assert!(Command::parse("/run shop", "herald_bot").is_err());
    }

    #[tokio::test]
    async fn test_run_reply() {
        let handler = FakeHandler::default();
        let reply = command_reply(
            Command::Run {
                task: "shop".to_string(),
                command: "WatchPrices".to_string(),
            },
            &handler,
        )
        .await;

        assert!(reply.contains("<code>inst-42</code>"));
        assert_eq!(handler.runs.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_run_error_reply() {
        let handler = FakeHandler::default();
        let reply = command_reply(
            Command::Run {
                task: "missing".to_string(),
                command: "C".to_string(),
            },
            &handler,
        )
        .await;

        assert!(reply.starts_with("❌"));
        assert!(reply.contains("not supported"));
    }

    #[tokio::test]
    async fn test_cancel_reply() {
        let handler = FakeHandler::default();

        let reply = command_reply(Command::Cancel(" inst-9 ".to_string()), &handler).await;
        assert!(reply.contains("inst-9"));
        assert_eq!(handler.cancels.lock().unwrap()[0].as_str(), "inst-9");

        let usage = command_reply(Command::Cancel(String::new()), &handler).await;
        assert!(usage.starts_with("Usage"));
    }

    #[tokio::test]
    async fn test_tasks_reply_is_escaped() {
        let handler = FakeHandler::default();
        let reply = command_reply(Command::Tasks, &handler).await;
        assert!(reply.contains("Watch&lt;All&gt;"));
    }
}
