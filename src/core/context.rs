// Execution context threaded through every store operation.
//
// Purpose
// - Carry the caller's namespace, read on every call.
// - Let callers bound blocking operations with a cancellation token and a deadline.
//
// Boundaries
// - Cancellation only stops waiting. Atomicity of writes is the backend transaction's job.

use crate::core::errors::EventStoreError;
use crate::core::keys::{Namespace, NamespaceError};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default)]
pub struct Context {
    namespace: Namespace,
    cancellation: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    pub fn new(namespace: Namespace) -> Self {
        Self {
            namespace,
            cancellation: CancellationToken::new(),
            deadline: None,
        }
    }

    pub fn for_namespace(namespace: &str) -> Result<Self, NamespaceError> {
        Ok(Self::new(Namespace::new(namespace)?))
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Run `operation` until it finishes, the token fires, or the deadline passes.
    /// `fallback_timeout` applies only when the context carries no deadline of its own.
    pub async fn guard<T, F>(
        &self,
        fallback_timeout: Option<Duration>,
        operation: F,
    ) -> Result<T, EventStoreError>
    where
        F: Future<Output = Result<T, EventStoreError>>,
    {
        if self.cancellation.is_cancelled() {
            return Err(EventStoreError::Cancelled);
        }
        let deadline = self
            .deadline
            .or_else(|| fallback_timeout.map(|timeout| Instant::now() + timeout));
        let bounded = async move {
            match deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, operation).await {
                    Ok(result) => result,
                    Err(_) => Err(EventStoreError::TimedOut),
                },
                None => operation.await,
            }
        };
        tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => Err(EventStoreError::Cancelled),
            result = bounded => result,
        }
    }
}
