// src/health/runner.rs
use super::result::TIMEOUT_CAUSE;
use super::{CheckResult, Procedure, ProcedureError};
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OwnedSemaphorePermit;
use tokio::task::JoinError;
use tokio::time::timeout;
use tracing::{debug, warn};

/// How a leaf execution ended, for logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    Completed,
    Failed,
    Raised,
    Panicked,
    TimedOut,
}

impl RunKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RunKind::Completed => "completed",
            RunKind::Failed => "failed",
            RunKind::Raised => "raised",
            RunKind::Panicked => "panic",
            RunKind::TimedOut => "timeout",
        }
    }

    pub fn is_execution_failure(self) -> bool {
        matches!(self, RunKind::Raised | RunKind::Panicked | RunKind::TimedOut)
    }
}

/// Runs a single procedure against its timeout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcedureRunner;

impl ProcedureRunner {
    pub fn new() -> Self {
        Self
    }

    /// The procedure runs on its own task. If the timeout wins, the task is
    /// detached: it keeps running but whatever it produces is dropped.
    pub async fn run(&self, procedure: Arc<dyn Procedure>, limit: Duration) -> (CheckResult, RunKind) {
        self.run_holding(procedure, limit, None).await
    }

    /// Like [`run`](Self::run), but `permit` moves into the procedure's task
    /// and is released when the procedure finishes, not when the timeout
    /// fires.
    pub async fn run_holding(
        &self,
        procedure: Arc<dyn Procedure>,
        limit: Duration,
        permit: Option<OwnedSemaphorePermit>,
    ) -> (CheckResult, RunKind) {
        let task = tokio::spawn(async move {
            let _permit = permit;
            procedure.check().await
        });

        match timeout(limit, task).await {
            Ok(Ok(Ok(status))) => (CheckResult::completed(status), RunKind::Completed),
            Ok(Ok(Err(ProcedureError::Failed(cause)))) => {
                debug!("Procedure reported failure: {}", cause);
                (CheckResult::failed(cause), RunKind::Failed)
            }
            Ok(Ok(Err(ProcedureError::Raised(cause)))) => {
                warn!("Procedure raised an error: {}", cause);
                (CheckResult::execution_failed(cause), RunKind::Raised)
            }
            Ok(Err(join_error)) => {
                let cause = join_error_cause(join_error);
                warn!("Procedure panicked: {}", cause);
                (CheckResult::execution_failed(cause), RunKind::Panicked)
            }
            Err(_) => {
                warn!("Procedure timed out after {:?}", limit);
                (CheckResult::execution_failed(TIMEOUT_CAUSE), RunKind::TimedOut)
            }
        }
    }
}

fn join_error_cause(err: JoinError) -> String {
    if err.is_panic() {
        panic_message(err.into_panic())
    } else {
        err.to_string()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(message) => *message,
        Err(payload) => match payload.downcast::<&'static str>() {
            Ok(message) => (*message).to_string(),
            Err(_) => "procedure panicked".to_string(),
        },
    }
}
