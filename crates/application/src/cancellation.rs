//! Request-scoped cancellation honoured by every handle operation.

use std::future::{Future, pending};

use discepto_core::{AppError, AppResult};
use tokio::sync::watch;

/// Receiving side of a cancellation signal. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    receiver: Option<watch::Receiver<bool>>,
}

/// Firing side of a cancellation signal.
#[derive(Debug)]
pub struct CancellationTrigger {
    sender: watch::Sender<bool>,
}

impl CancellationTrigger {
    /// Fires the signal. Operations racing against it resolve to `Cancelled`.
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }
}

impl Cancellation {
    /// Creates a connected trigger and signal.
    #[must_use]
    pub fn new() -> (CancellationTrigger, Self) {
        let (sender, receiver) = watch::channel(false);
        (
            CancellationTrigger { sender },
            Self {
                receiver: Some(receiver),
            },
        )
    }

    /// A signal that never fires.
    #[must_use]
    pub fn never() -> Self {
        Self::default()
    }

    /// Returns whether the signal already fired.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.receiver
            .as_ref()
            .is_some_and(|receiver| *receiver.borrow())
    }

    /// Resolves once the signal fires. A dropped trigger never fires.
    pub async fn cancelled(&self) {
        let Some(receiver) = &self.receiver else {
            return pending().await;
        };

        let mut receiver = receiver.clone();
        if receiver.wait_for(|cancelled| *cancelled).await.is_err() {
            pending::<()>().await;
        }
    }

    /// Runs an operation unless the signal fires first. The operation future
    /// is dropped on cancellation, which rolls back any open transaction.
    pub async fn run<T, F>(&self, operation: F) -> AppResult<T>
    where
        F: Future<Output = AppResult<T>>,
    {
        tokio::select! {
            biased;
            () = self.cancelled() => Err(AppError::Cancelled),
            result = operation => result,
        }
    }
}
