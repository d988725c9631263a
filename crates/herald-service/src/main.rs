//! Herald binary.
//!
//! ```bash
//! TELEGRAM_BOT_TOKEN=xxx TELEGRAM_CHAT_ID=123 herald serve
//! herald --dry-run run disk Usage
//! ```

use std::sync::Arc;

use clap::Parser;
use herald_core::{CommandId, Notifier, Registry, ResultStore, RunBy, TaskId, TaskRequest, TaskState};
use herald_persistence::{FileResultStore, MemoryResultStore};
use herald_service::cli::{Cli, Commands};
use herald_service::tasks::{register_process_tasks, schedules_for};
use herald_service::{
    describe_tasks, paths, LogNotifier, Scheduler, ServiceCommands, ServiceConfig, Settings,
    TaskService,
};
use herald_telegram::{CommandListener, TelegramNotifier};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const TELEGRAM_NOTIFIER: &str = "telegram";
const LOG_NOTIFIER: &str = "log";

type BoxError = Box<dyn std::error::Error>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let env_path = paths::env_file();
    if env_path.exists() {
        let _ = dotenvy::from_path(&env_path);
    }
    let _ = dotenvy::from_filename(".env.local");

    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(cli.log_filter()))
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings_path = cli.config.clone().unwrap_or_else(paths::config_file);
    let mut settings = Settings::load(&settings_path)?;
    settings.apply_env_overrides();
    settings.validate()?;

    let registry = Arc::new(Registry::new());
    register_process_tasks(&registry, &settings.process)?;

    let store = build_store(&settings, cli.dry_run)?;
    let telegram = build_telegram(&settings, cli.dry_run)?;
    let (notifier, notifier_id): (Arc<dyn Notifier>, &str) = match &telegram {
        Some(telegram) => (Arc::new(telegram.clone()) as Arc<dyn Notifier>, TELEGRAM_NOTIFIER),
        None => (Arc::new(LogNotifier) as Arc<dyn Notifier>, LOG_NOTIFIER),
    };

    let service = Arc::new(TaskService::new(
        ServiceConfig::from(&settings.service),
        registry,
        store,
        notifier,
    ));

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(service, &settings, telegram, notifier_id).await,
        Commands::Run { task, command } => {
            let request = TaskRequest::new(
                TaskId::from(task),
                CommandId::from(command),
                notifier_id,
                RunBy::User,
            );
            let state = service.run_to_completion(request).await?;
            println!("{:?}", state);
            if state == TaskState::Failed {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Tasks => {
            for line in describe_tasks(&service) {
                println!("{}", line);
            }
            Ok(())
        }
    }
}

fn build_store(settings: &Settings, dry_run: bool) -> Result<Arc<dyn ResultStore>, BoxError> {
    if dry_run {
        info!("dry run: results are kept in memory");
        return Ok(Arc::new(MemoryResultStore::new()));
    }

    let state_dir = paths::state_dir();
    paths::ensure_dirs(&state_dir)?;
    let mut store = FileResultStore::new(&state_dir);
    if let Some(hours) = settings.service.snapshot_max_age_hours {
        store = store.with_max_age(chrono::Duration::hours(hours as i64));
    }
    info!(path = %state_dir.display(), "using file result store");
    Ok(Arc::new(store))
}

fn build_telegram(settings: &Settings, dry_run: bool) -> Result<Option<TelegramNotifier>, BoxError> {
    if dry_run {
        return Ok(None);
    }
    let telegram = &settings.telegram;
    match (telegram.token.as_deref(), telegram.chat_id.as_deref()) {
        (Some(token), Some(chat_id)) if telegram.is_configured() => Ok(Some(
            TelegramNotifier::from_token(token, TELEGRAM_NOTIFIER, chat_id)?,
        )),
        _ => {
            warn!("telegram is not configured; notifications go to the log");
            Ok(None)
        }
    }
}

async fn serve(
    service: Arc<TaskService>,
    settings: &Settings,
    telegram: Option<TelegramNotifier>,
    notifier_id: &str,
) -> Result<(), BoxError> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let schedules = schedules_for(&settings.process, &notifier_id.into());
    let scheduler = Scheduler::new(Arc::clone(&service), schedules, shutdown_rx);
    let scheduler_handle = tokio::spawn(scheduler.run());

    let listener_handle = telegram.map(|telegram| {
        let handler = Arc::new(ServiceCommands::new(Arc::clone(&service), notifier_id));
        let listener = CommandListener::new(telegram.bot().clone(), telegram.chats(), handler);
        tokio::spawn(listener.run())
    });

    info!(tasks = service.registry().len(), "herald is running; press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");

    let _ = shutdown_tx.send(true);
    if let Some(handle) = listener_handle {
        handle.abort();
    }
    service.shutdown().await;
    if let Err(e) = scheduler_handle.await {
        warn!(error = %e, "scheduler did not stop cleanly");
    }

    Ok(())
}
