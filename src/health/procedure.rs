// src/health/procedure.rs
use super::{ProcedureError, Status};
use async_trait::async_trait;
use std::future::Future;
use tokio::sync::oneshot;

/// User-supplied check logic.
///
/// A procedure resolves exactly once: `Ok(status)` when it completed (the
/// status may still be DOWN), `Err(ProcedureError::Failed)` when it reports
/// its dependency as unhealthy, and `Err(ProcedureError::Raised)` when the
/// check itself is broken. Panics are treated like `Raised`.
#[async_trait]
pub trait Procedure: Send + Sync + 'static {
    async fn check(&self) -> Result<Status, ProcedureError>;
}

#[async_trait]
impl<F, Fut> Procedure for F
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Status, ProcedureError>> + Send + 'static,
{
    async fn check(&self) -> Result<Status, ProcedureError> {
        (self)().await
    }
}

/// Completion handle given to [`callback`] procedures. Every signaling
/// method consumes the handle, so a procedure can only answer once.
#[derive(Debug)]
pub struct Completion {
    tx: oneshot::Sender<Result<Status, ProcedureError>>,
}

impl Completion {
    /// Bare success, reported as `Status::ok()`.
    pub fn complete(self) {
        self.complete_with(Status::ok());
    }

    pub fn complete_with(self, status: Status) {
        // The runner may have given up on us already.
        let _ = self.tx.send(Ok(status));
    }

    pub fn fail(self, cause: impl Into<String>) {
        let _ = self.tx.send(Err(ProcedureError::Failed(cause.into())));
    }
}

/// Procedure driven by a completion handle instead of a returned future.
pub struct Callback<F> {
    f: F,
}

/// Wraps a closure that signals through a [`Completion`]. Dropping the
/// handle without signaling leaves the check pending until it times out.
pub fn callback<F>(f: F) -> Callback<F>
where
    F: Fn(Completion) + Send + Sync + 'static,
{
    Callback { f }
}

#[async_trait]
impl<F> Procedure for Callback<F>
where
    F: Fn(Completion) + Send + Sync + 'static,
{
    async fn check(&self) -> Result<Status, ProcedureError> {
        let (tx, rx) = oneshot::channel();
        (self.f)(Completion { tx });

        match rx.await {
            Ok(result) => result,
            Err(_) => std::future::pending().await,
        }
    }
}
