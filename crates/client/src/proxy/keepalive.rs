//! Lifetime token for work that outlives the event that started it.
//!
//! A stale-while-revalidate lookup answers from the store and leaves its
//! network refresh running. That refresh is spawned on the [`KeepAlive`] so the
//! host can wait for it before tearing the runtime down.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;

#[derive(Debug, Clone, Default)]
pub struct KeepAlive {
    tracker: TaskTracker,
    /// Held for the whole close, wait, reopen sequence of one settle call.
    settling: Arc<Mutex<()>>,
}

impl KeepAlive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `future` to completion independently of the caller.
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.tracker.spawn(future)
    }

    /// Number of tasks still running.
    pub fn pending(&self) -> usize {
        self.tracker.len()
    }

    /// Wait until every task spawned so far has finished.
    ///
    /// New work may still be spawned afterwards. Concurrent callers are
    /// served one at a time, so a reopen never strands another waiter.
    pub async fn settle(&self) {
        let _guard = self.settling.lock().await;
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}
