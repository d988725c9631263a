//! Cancellation scope handed to tasks.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;

/// Cancellation token plus an optional deadline.
///
/// Cloning shares the same token. Use [`TaskContext::child`] to derive a
/// scope that can be canceled without affecting its parent.
#[derive(Debug, Clone, Default)]
pub struct TaskContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl TaskContext {
    /// Creates a root context that is never canceled on its own.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context driven by an existing token.
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Derives a child scope and returns it with its cancel handle.
    ///
    /// Canceling the parent cancels the child; not the other way around.
    pub fn child(&self) -> (TaskContext, CancellationToken) {
        let token = self.token.child_token();
        let ctx = TaskContext {
            token: token.clone(),
            deadline: self.deadline,
        };
        (ctx, token)
    }

    /// Derives a child scope that also expires after `timeout`.
    ///
    /// The earlier of the existing and the new deadline wins.
    pub fn with_timeout(&self, timeout: Duration) -> TaskContext {
        let candidate = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(existing) if existing <= candidate => existing,
            _ => candidate,
        };
        TaskContext {
            token: self.token.child_token(),
            deadline: Some(deadline),
        }
    }

    /// Returns the cancellation token.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Returns the deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns true if the scope was explicitly canceled.
    pub fn is_canceled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Returns the reason this scope is done, or `None` while it is live.
    pub fn err(&self) -> Option<TaskError> {
        if self.token.is_cancelled() {
            return Some(TaskError::Canceled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(TaskError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolves once the scope is canceled or its deadline passes.
    pub async fn done(&self) -> TaskError {
        match self.deadline {
            Some(deadline) => tokio::select! {
                _ = self.token.cancelled() => TaskError::Canceled,
                _ = tokio::time::sleep_until(deadline) => TaskError::DeadlineExceeded,
            },
            None => {
                self.token.cancelled().await;
                TaskError::Canceled
            }
        }
    }

    /// Runs `fut` until it completes or the scope is done.
    pub async fn run_until<F>(&self, fut: F) -> Result<F::Output, TaskError>
    where
        F: Future,
    {
        tokio::select! {
            biased;
            reason = self.done() => Err(reason),
            output = fut => Ok(output),
        }
    }
}
