use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

use crate::traits::Clock;

/// Cancellation handle for one run.
///
/// Cloned between the engine (which cancels on reset) and the run loop
/// (which checks it at every suspension point).
#[derive(Debug, Clone, Default)]
pub struct RunToken {
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl RunToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Sleep on `clock` unless cancelled first. Returns false when cancelled,
    /// either before, during or right after the sleep.
    pub async fn sleep(&self, clock: &dyn Clock, duration: Duration) -> bool {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        if self.is_cancelled() {
            return false;
        }

        tokio::select! {
            _ = clock.sleep(duration) => {}
            _ = &mut notified => {}
        }

        !self.is_cancelled()
    }
}
