//! Tests for the task runtime lifecycle.

use super::*;
use crate::config::{CommandConfig, TaskConfig};
use crate::registry::Registry;
use crate::snapshot::snapshot_factory;
use crate::store::StoreError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::AtomicUsize;

type Map = HashMap<String, String>;

#[derive(Debug, Clone)]
enum LoadBehavior {
    NotFound,
    Fresh(serde_json::Value),
    Stale(serde_json::Value),
    Corrupted,
}

/// Result store that records every call.
struct RecordingStore {
    load_behavior: LoadBehavior,
    fail_save: bool,
    loads: AtomicUsize,
    saves: Mutex<Vec<(TaskId, CommandId, serde_json::Value)>>,
}

impl RecordingStore {
    fn new(load_behavior: LoadBehavior) -> Arc<Self> {
        Arc::new(Self {
            load_behavior,
            fail_save: false,
            loads: AtomicUsize::new(0),
            saves: Mutex::new(Vec::new()),
        })
    }

    fn failing_save(load_behavior: LoadBehavior) -> Arc<Self> {
        Arc::new(Self {
            load_behavior,
            fail_save: true,
            loads: AtomicUsize::new(0),
            saves: Mutex::new(Vec::new()),
        })
    }

    fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    fn saves(&self) -> Vec<(TaskId, CommandId, serde_json::Value)> {
        self.saves.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResultStore for RecordingStore {
    async fn load(
        &self,
        task_id: &TaskId,
        command_id: &CommandId,
        snapshot: &mut dyn Snapshot,
    ) -> Result<LoadOutcome, StoreError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        match &self.load_behavior {
            LoadBehavior::NotFound => Err(StoreError::not_found(task_id, command_id)),
            LoadBehavior::Fresh(value) => {
                snapshot.load_json(value.clone())?;
                Ok(LoadOutcome::Fresh)
            }
            LoadBehavior::Stale(value) => {
                snapshot.load_json(value.clone())?;
                Ok(LoadOutcome::Stale {
                    reason: "saved by an older version".to_string(),
                })
            }
            LoadBehavior::Corrupted => Err(StoreError::Corrupted {
                task_id: task_id.to_string(),
                command_id: command_id.to_string(),
                reason: "unexpected end of file".to_string(),
            }),
        }
    }

    async fn save(
        &self,
        task_id: &TaskId,
        command_id: &CommandId,
        snapshot: &dyn Snapshot,
    ) -> Result<(), StoreError> {
        if self.fail_save {
            return Err(StoreError::Backend("disk full".to_string()));
        }
        self.saves
            .lock()
            .unwrap()
            .push((task_id.clone(), command_id.clone(), snapshot.to_json()?));
        Ok(())
    }
}

/// Notifier that records every notification.
#[derive(Default)]
struct RecordingNotifier {
    rich: bool,
    panic_on_notify: bool,
    fail_delivery: bool,
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(
        &self,
        _ctx: &TaskContext,
        notification: Notification,
    ) -> Result<(), crate::notification::NotifyError> {
        if self.panic_on_notify {
            panic!("notifier exploded");
        }
        self.sent.lock().unwrap().push(notification);
        if self.fail_delivery {
            return Err(crate::notification::NotifyError::Delivery(
                "chat unreachable".to_string(),
            ));
        }
        Ok(())
    }

    fn supports_rich_formatting(&self, _notifier_id: &NotifierId) -> bool {
        self.rich
    }
}

fn request(run_by: RunBy) -> TaskRequest {
    TaskRequest::new("T", "C", "telegram", run_by)
}

fn runtime_with_store(store: Arc<RecordingStore>, run_by: RunBy) -> TaskRuntime {
    TaskRuntime::new(InstanceId::new(), &request(run_by))
        .with_store(store)
        .with_snapshot_factory(snapshot_factory::<Map>())
}

fn counting(calls: Arc<AtomicUsize>, message: &'static str) -> ExecuteFn {
    execute_fn(move |_ctx, _snapshot, _rich| {
        calls.fetch_add(1, Ordering::SeqCst);
        async move { Ok(ExecuteOutput::message(message)) }
    })
}

async fn explode(reason: &'static str) -> Result<ExecuteOutput, ExecuteFailure> {
    panic!("{}", reason)
}

#[tokio::test]
async fn test_end_to_end_register_resolve_run() {
    let registry = Registry::new();
    let config = TaskConfig::new(Arc::new(|params: NewTaskParams| {
        Ok(TaskRuntime::from_params(&params).with_execute(execute_fn(
            |_ctx, _snapshot, _rich| async {
                let mut map = Map::new();
                map.insert("k".to_string(), "v".to_string());
                Ok(ExecuteOutput::message("hello").with_snapshot(map))
            },
        )))
    }))
    .with_command(CommandConfig::new("C", snapshot_factory::<Map>()));
    registry.register(&"T".into(), &config).unwrap();

    let store = RecordingStore::new(LoadBehavior::NotFound);
    let resolved = registry.find_config(&"T".into(), &"C".into()).unwrap();
    let runtime = resolved
        .new_task(NewTaskParams {
            instance_id: InstanceId::new(),
            request: request(RunBy::Scheduler),
            resolved: resolved.clone(),
            store: Some(store.clone() as Arc<dyn ResultStore>),
        })
        .unwrap();

    let notifier = RecordingNotifier::default();
    runtime.run(&TaskContext::new(), &notifier).await;

    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].message, "hello");
    assert!(!sent[0].error_occurred);
    assert!(!sent[0].cancelable);
    assert!(sent[0].formatted);
    assert_eq!(sent[0].task_id.as_str(), "T");
    assert_eq!(sent[0].instance_id, *runtime.instance_id());

    let saves = store.saves();
    assert_eq!(saves.len(), 1);
    assert_eq!(saves[0].0.as_str(), "T");
    assert_eq!(saves[0].1.as_str(), "C");
    assert_eq!(saves[0].2, serde_json::json!({ "k": "v" }));

    assert_eq!(runtime.state(), TaskState::Succeeded);
}

#[tokio::test]
async fn test_cancel_before_run_does_nothing() {
    let store = RecordingStore::new(LoadBehavior::NotFound);
    let calls = Arc::new(AtomicUsize::new(0));
    let runtime = runtime_with_store(store.clone(), RunBy::User)
        .with_execute(counting(calls.clone(), "hello"));
    let notifier = RecordingNotifier::default();

    runtime.cancel();
    runtime.run(&TaskContext::new(), &notifier).await;

    assert_eq!(store.load_count(), 0);
    assert!(store.saves().is_empty());
    assert!(notifier.sent().is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(runtime.state(), TaskState::Canceled);
    assert_eq!(runtime.elapsed(), Duration::ZERO);
}

#[tokio::test]
async fn test_corrupted_load_fails_fast() {
    let store = RecordingStore::new(LoadBehavior::Corrupted);
    let calls = Arc::new(AtomicUsize::new(0));
    let runtime = runtime_with_store(store.clone(), RunBy::Scheduler)
        .with_execute(counting(calls.clone(), "hello"));
    let notifier = RecordingNotifier::default();

    runtime.run(&TaskContext::new(), &notifier).await;

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].error_occurred);
    assert!(!sent[0].cancelable);
    assert!(sent[0].message.contains("corrupted"));
    assert!(store.saves().is_empty());
    assert_eq!(runtime.state(), TaskState::Failed);
}

#[tokio::test]
async fn test_first_run_uses_empty_snapshot() {
    let store = RecordingStore::new(LoadBehavior::NotFound);
    let seen = Arc::new(Mutex::new(None));
    let seen_in_task = seen.clone();
    let runtime = runtime_with_store(store.clone(), RunBy::Scheduler).with_execute(execute_fn(
        move |_ctx, snapshot: Option<Box<dyn Snapshot>>, _rich| {
            let map = snapshot
                .as_deref()
                .and_then(|s| s.downcast_ref::<Map>())
                .cloned();
            *seen_in_task.lock().unwrap() = Some(map);
            async { Ok(ExecuteOutput::silent()) }
        },
    ));
    let notifier = RecordingNotifier::default();

    runtime.run(&TaskContext::new(), &notifier).await;

    assert_eq!(store.load_count(), 1);
    assert_eq!(*seen.lock().unwrap(), Some(Some(Map::new())));
    assert!(notifier.sent().is_empty());
    assert_eq!(runtime.state(), TaskState::Succeeded);
}

#[tokio::test]
async fn test_previous_snapshot_is_passed_to_logic() {
    let store = RecordingStore::new(LoadBehavior::Fresh(serde_json::json!({ "k": "old" })));
    let runtime = runtime_with_store(store.clone(), RunBy::Scheduler).with_execute(execute_fn(
        |_ctx, snapshot: Option<Box<dyn Snapshot>>, _rich| {
            let previous = snapshot
                .as_deref()
                .and_then(|s| s.downcast_ref::<Map>())
                .and_then(|m| m.get("k").cloned())
                .unwrap_or_default();
            async move { Ok(ExecuteOutput::message(format!("was {}", previous))) }
        },
    ));
    let notifier = RecordingNotifier::default();

    runtime.run(&TaskContext::new(), &notifier).await;

    assert_eq!(notifier.sent()[0].message, "was old");
}

#[tokio::test]
async fn test_save_failure_replaces_success_message() {
    let store = RecordingStore::failing_save(LoadBehavior::NotFound);
    let runtime = runtime_with_store(store.clone(), RunBy::Scheduler).with_execute(execute_fn(
        |_ctx, _snapshot, _rich| async {
            Ok(ExecuteOutput::message("<pre>price dropped to 900</pre>").with_snapshot(Map::new()))
        },
    ));
    let notifier = RecordingNotifier::default();

    runtime.run(&TaskContext::new(), &notifier).await;

    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].error_occurred);
    assert!(!sent[0].cancelable);
    // Task output stays verbatim; the warning travels as plain detail.
    assert_eq!(sent[0].message, "<pre>price dropped to 900</pre>");
    assert!(sent[0].formatted);
    assert!(sent[0].detail.starts_with(SAVE_FAILURE_WARNING));
    assert!(sent[0].detail.contains("disk full"));
    assert_eq!(runtime.state(), TaskState::Failed);
}

#[tokio::test]
async fn test_save_failure_without_message_is_plain_error() {
    let store = RecordingStore::failing_save(LoadBehavior::NotFound);
    let runtime = runtime_with_store(store.clone(), RunBy::Scheduler).with_execute(execute_fn(
        |_ctx, _snapshot, _rich| async { Ok(ExecuteOutput::silent().with_snapshot(Map::new())) },
    ));
    let notifier = RecordingNotifier::default();

    runtime.run(&TaskContext::new(), &notifier).await;

    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].error_occurred);
    assert!(sent[0].message.starts_with(FAILURE_PREAMBLE));
    assert!(sent[0].message.contains("disk full"));
    assert!(!sent[0].formatted);
    assert!(sent[0].detail.is_empty());
}

#[tokio::test]
async fn test_stale_warning_is_cancelable_for_user_runs() {
    let store = RecordingStore::new(LoadBehavior::Stale(serde_json::json!({})));
    let calls = Arc::new(AtomicUsize::new(0));
    let runtime = runtime_with_store(store, RunBy::User).with_execute(counting(calls, "done"));
    let notifier = RecordingNotifier::default();

    runtime.run(&TaskContext::new(), &notifier).await;

    let sent = notifier.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent[0].cancelable);
    assert!(!sent[0].error_occurred);
    assert!(sent[0].message.contains("outdated"));
    assert_eq!(sent[1].message, "done");
    assert!(!sent[1].cancelable);
}

#[tokio::test]
async fn test_scheduler_runs_never_cancelable() {
    let store = RecordingStore::new(LoadBehavior::Stale(serde_json::json!({})));
    let calls = Arc::new(AtomicUsize::new(0));
    let runtime =
        runtime_with_store(store, RunBy::Scheduler).with_execute(counting(calls, "done"));
    let notifier = RecordingNotifier::default();

    runtime.run(&TaskContext::new(), &notifier).await;

    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].message, "done");
    assert!(sent.iter().all(|n| !n.cancelable));
}

#[tokio::test]
async fn test_panic_in_logic_is_contained() {
    let store = RecordingStore::new(LoadBehavior::NotFound);
    let runtime = runtime_with_store(store.clone(), RunBy::User)
        .with_execute(execute_fn(|_ctx, _snapshot, _rich| explode("boom")));
    let notifier = RecordingNotifier::default();

    runtime.run(&TaskContext::new(), &notifier).await;

    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].error_occurred);
    assert!(!sent[0].cancelable);
    assert!(sent[0].message.contains("boom"));
    assert!(store.saves().is_empty());
    assert_eq!(runtime.state(), TaskState::Failed);
}

#[tokio::test]
async fn test_panic_while_reporting_panic_is_swallowed() {
    let runtime = TaskRuntime::new(InstanceId::new(), &request(RunBy::Scheduler))
        .with_execute(execute_fn(|_ctx, _snapshot, _rich| explode("first fault")));
    let notifier = RecordingNotifier {
        panic_on_notify: true,
        ..Default::default()
    };

    runtime.run(&TaskContext::new(), &notifier).await;

    assert_eq!(runtime.state(), TaskState::Failed);
}

#[tokio::test]
async fn test_missing_logic_reports_error_before_storage() {
    let store = RecordingStore::new(LoadBehavior::NotFound);
    let runtime = runtime_with_store(store.clone(), RunBy::Scheduler);
    let notifier = RecordingNotifier::default();

    runtime.run(&TaskContext::new(), &notifier).await;

    assert_eq!(store.load_count(), 0);
    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].error_occurred);
    assert!(sent[0].message.contains("business logic not initialized"));
}

#[tokio::test]
async fn test_factory_without_store_is_internal_error() {
    let calls = Arc::new(AtomicUsize::new(0));
    let runtime = TaskRuntime::new(InstanceId::new(), &request(RunBy::Scheduler))
        .with_snapshot_factory(snapshot_factory::<Map>())
        .with_execute(counting(calls.clone(), "hello"));
    let notifier = RecordingNotifier::default();

    runtime.run(&TaskContext::new(), &notifier).await;

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].message.contains("internal error"));
}

#[tokio::test]
async fn test_degenerate_factory_is_internal_error() {
    let store = RecordingStore::new(LoadBehavior::NotFound);
    let calls = Arc::new(AtomicUsize::new(0));
    let runtime = TaskRuntime::new(InstanceId::new(), &request(RunBy::Scheduler))
        .with_store(store.clone())
        .with_snapshot_factory(Arc::new(|| None))
        .with_execute(counting(calls.clone(), "hello"));
    let notifier = RecordingNotifier::default();

    runtime.run(&TaskContext::new(), &notifier).await;

    assert_eq!(store.load_count(), 0);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(notifier.sent().len(), 1);
}

#[tokio::test]
async fn test_no_factory_skips_storage() {
    let calls = Arc::new(AtomicUsize::new(0));
    let runtime = TaskRuntime::new(InstanceId::new(), &request(RunBy::Scheduler))
        .with_execute(counting(calls.clone(), "hello"));
    let notifier = RecordingNotifier::default();

    runtime.run(&TaskContext::new(), &notifier).await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(notifier.sent()[0].message, "hello");
}

#[tokio::test]
async fn test_cancel_during_execution_discards_result() {
    let store = RecordingStore::new(LoadBehavior::NotFound);
    let (started_tx, started_rx) = tokio::sync::oneshot::channel::<()>();
    let started_tx = Mutex::new(Some(started_tx));

    let runtime = Arc::new(runtime_with_store(store.clone(), RunBy::User).with_execute(
        execute_fn(move |ctx: TaskContext, _snapshot, _rich| {
            if let Some(tx) = started_tx.lock().unwrap().take() {
                let _ = tx.send(());
            }
            async move {
                ctx.run_until(futures::future::pending::<()>()).await?;
                Ok(ExecuteOutput::message("never").with_snapshot(Map::new()))
            }
        }),
    ));
    let notifier = Arc::new(RecordingNotifier::default());

    let handle = {
        let runtime = Arc::clone(&runtime);
        let notifier = Arc::clone(&notifier);
        tokio::spawn(async move {
            runtime.run(&TaskContext::new(), notifier.as_ref()).await;
        })
    };

    started_rx.await.unwrap();
    runtime.cancel();
    handle.await.unwrap();

    assert!(runtime.is_canceled());
    assert_eq!(runtime.state(), TaskState::Canceled);
    assert!(notifier.sent().is_empty());
    assert!(store.saves().is_empty());
}

#[tokio::test]
async fn test_parent_cancel_reaches_logic_and_is_not_reported() {
    let parent = TaskContext::new();
    let (started_tx, started_rx) = tokio::sync::oneshot::channel::<()>();
    let started_tx = Mutex::new(Some(started_tx));

    let runtime = Arc::new(
        TaskRuntime::new(InstanceId::new(), &request(RunBy::Scheduler)).with_execute(execute_fn(
            move |ctx: TaskContext, _snapshot, _rich| {
                if let Some(tx) = started_tx.lock().unwrap().take() {
                    let _ = tx.send(());
                }
                async move {
                    ctx.run_until(futures::future::pending::<()>()).await?;
                    Ok(ExecuteOutput::message("never"))
                }
            },
        )),
    );
    let notifier = Arc::new(RecordingNotifier::default());

    let handle = {
        let runtime = Arc::clone(&runtime);
        let notifier = Arc::clone(&notifier);
        let parent = parent.clone();
        tokio::spawn(async move {
            runtime.run(&parent, notifier.as_ref()).await;
        })
    };

    started_rx.await.unwrap();
    parent.token().cancel();
    handle.await.unwrap();

    assert!(!runtime.is_canceled());
    assert_eq!(runtime.state(), TaskState::Canceled);
    assert!(notifier.sent().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_deadline_is_reported_as_failure() {
    let runtime = TaskRuntime::new(InstanceId::new(), &request(RunBy::Scheduler)).with_execute(
        execute_fn(|ctx: TaskContext, _snapshot, _rich| async move {
            let bounded = ctx.with_timeout(Duration::from_millis(20));
            bounded
                .run_until(tokio::time::sleep(Duration::from_secs(5)))
                .await?;
            Ok(ExecuteOutput::message("too slow to matter"))
        }),
    );
    let notifier = RecordingNotifier::default();

    runtime.run(&TaskContext::new(), &notifier).await;

    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].error_occurred);
    assert!(sent[0].message.contains("deadline exceeded"));
}

#[tokio::test]
async fn test_reported_cancel_is_suppressed() {
    let runtime = TaskRuntime::new(InstanceId::new(), &request(RunBy::User)).with_execute(
        execute_fn(|_ctx, _snapshot, _rich| async { Err(TaskError::Canceled.into()) }),
    );
    let notifier = RecordingNotifier::default();

    runtime.run(&TaskContext::new(), &notifier).await;

    assert!(notifier.sent().is_empty());
    assert_eq!(runtime.state(), TaskState::Canceled);
}

#[tokio::test]
async fn test_failure_includes_preamble_error_and_partial_output() {
    let runtime = TaskRuntime::new(InstanceId::new(), &request(RunBy::User)).with_execute(
        execute_fn(|_ctx, _snapshot, _rich| async {
            Err(ExecuteFailure::with_partial(
                TaskError::ExecutionFailed("site returned 503".to_string()),
                "checked 3 of 5 items",
            ))
        }),
    );
    let notifier = RecordingNotifier::default();

    runtime.run(&TaskContext::new(), &notifier).await;

    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    let text = &sent[0].message;
    assert!(text.starts_with(FAILURE_PREAMBLE));
    assert!(text.contains("site returned 503"));
    assert!(text.contains("checked 3 of 5 items"));
    assert!(sent[0].error_occurred);
    assert!(!sent[0].cancelable);
}

#[tokio::test]
async fn test_empty_message_saves_silently() {
    let store = RecordingStore::new(LoadBehavior::NotFound);
    let runtime = runtime_with_store(store.clone(), RunBy::User).with_execute(execute_fn(
        |_ctx, _snapshot, _rich| async { Ok(ExecuteOutput::silent().with_snapshot(Map::new())) },
    ));
    let notifier = RecordingNotifier::default();

    runtime.run(&TaskContext::new(), &notifier).await;

    assert!(notifier.sent().is_empty());
    assert_eq!(store.saves().len(), 1);
    assert_eq!(runtime.state(), TaskState::Succeeded);
}

#[tokio::test]
async fn test_rich_formatting_flag_reaches_logic() {
    let runtime = TaskRuntime::new(InstanceId::new(), &request(RunBy::User)).with_execute(
        execute_fn(|_ctx, _snapshot, rich| async move {
            Ok(ExecuteOutput::message(if rich { "<b>rich</b>" } else { "plain" }))
        }),
    );
    let notifier = RecordingNotifier {
        rich: true,
        ..Default::default()
    };

    runtime.run(&TaskContext::new(), &notifier).await;

    assert_eq!(notifier.sent()[0].message, "<b>rich</b>");
}

#[tokio::test]
async fn test_runtime_is_single_use() {
    let calls = Arc::new(AtomicUsize::new(0));
    let runtime = TaskRuntime::new(InstanceId::new(), &request(RunBy::User))
        .with_execute(counting(calls.clone(), "hello"));
    let notifier = RecordingNotifier::default();

    runtime.run(&TaskContext::new(), &notifier).await;
    runtime.run(&TaskContext::new(), &notifier).await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(notifier.sent().len(), 1);
}

#[tokio::test]
async fn test_late_cancel_is_noop() {
    let calls = Arc::new(AtomicUsize::new(0));
    let runtime = TaskRuntime::new(InstanceId::new(), &request(RunBy::User))
        .with_execute(counting(calls, "hello"));
    let notifier = RecordingNotifier::default();

    runtime.run(&TaskContext::new(), &notifier).await;
    runtime.cancel();
    runtime.cancel();

    assert!(runtime.is_canceled());
    assert_eq!(runtime.state(), TaskState::Succeeded);
    assert_eq!(notifier.sent().len(), 1);
}

#[tokio::test]
async fn test_delivery_failure_does_not_fail_task() {
    let calls = Arc::new(AtomicUsize::new(0));
    let runtime = TaskRuntime::new(InstanceId::new(), &request(RunBy::User))
        .with_execute(counting(calls, "hello"));
    let notifier = RecordingNotifier {
        fail_delivery: true,
        ..Default::default()
    };

    runtime.run(&TaskContext::new(), &notifier).await;

    assert_eq!(runtime.state(), TaskState::Succeeded);
    assert_eq!(notifier.sent().len(), 1);
}

#[tokio::test]
async fn test_elapsed_tracks_execution() {
    let runtime = TaskRuntime::new(InstanceId::new(), &request(RunBy::User)).with_execute(
        execute_fn(|_ctx, _snapshot, _rich| async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(ExecuteOutput::message("slow"))
        }),
    );
    let notifier = RecordingNotifier::default();

    assert_eq!(runtime.elapsed(), Duration::ZERO);
    runtime.run(&TaskContext::new(), &notifier).await;

    assert!(runtime.elapsed() >= Duration::from_millis(20));
    assert!(notifier.sent()[0].elapsed >= Duration::from_millis(20));
}
