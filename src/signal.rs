use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::oneshot;

/// Upper bound on how long the loop lingers for background work after an invoke.
pub const POST_INVOKE_WAIT: Duration = Duration::from_secs(10);

#[derive(Debug, PartialEq, Eq)]
pub enum WaitOutcome {
    /// Nothing was armed during the invoke.
    Idle,
    Signalled,
    TimedOut,
}

/// A single-shot slot that lets handler code hold the loop open briefly
/// after its response has been sent.
///
/// The handler calls [`arm`](Self::arm) and keeps the sender; sending on it
/// (or dropping it) releases the loop. The slot is emptied after every wait.
#[derive(Clone, Debug, Default)]
pub struct PostInvokeSignal {
    slot: Arc<Mutex<Option<oneshot::Receiver<()>>>>,
}

impl PostInvokeSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.lock() = Some(rx);
        tx
    }

    pub fn is_armed(&self) -> bool {
        self.lock().is_some()
    }

    /// Waits up to `ceiling` for an armed signal. The slot is empty afterwards
    /// whichever way the wait ended.
    pub async fn wait(&self, ceiling: Duration) -> WaitOutcome {
        let Some(rx) = self.lock().take() else {
            return WaitOutcome::Idle;
        };
        match tokio::time::timeout(ceiling, rx).await {
            Ok(_) => WaitOutcome::Signalled,
            Err(_) => {
                tracing::debug!(?ceiling, "post-invoke signal did not fire, continuing");
                WaitOutcome::TimedOut
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<oneshot::Receiver<()>>> {
        // A poisoned slot still holds a valid Option.
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
