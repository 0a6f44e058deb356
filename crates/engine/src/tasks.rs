//! Work queue for store writes that outlive the request that caused them.
//!
//! Tasks run detached on the runtime rather than inside the caller, so
//! dropping the caller's future, or a drain waiting on them, never cancels a
//! revalidation or a deferred write.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;

/// Detached background tasks with a deterministic drain.
///
/// Each task runs on its own `tokio::spawn`; the queue only counts the ones
/// in flight. Dropping or cancelling a drain never touches the tasks.
#[derive(Clone)]
pub struct BackgroundTasks {
    in_flight: Arc<watch::Sender<usize>>,
}

impl std::fmt::Debug for BackgroundTasks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundTasks").field("pending", &self.pending()).finish()
    }
}

impl Default for BackgroundTasks {
    fn default() -> Self {
        let (in_flight, _) = watch::channel(0);
        Self { in_flight: Arc::new(in_flight) }
    }
}

/// Decrements the in-flight count when a task finishes, panics or is dropped
/// by a shutting-down runtime.
struct InFlight {
    in_flight: Arc<watch::Sender<usize>>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if std::thread::panicking() {
            tracing::error!("background task panicked");
        }
        self.in_flight.send_modify(|n| *n = n.saturating_sub(1));
    }
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Submit a task. Must be called from within a tokio runtime.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.in_flight.send_modify(|n| *n += 1);
        let guard = InFlight { in_flight: self.in_flight.clone() };
        tokio::spawn(async move {
            let _guard = guard;
            task.await;
        });
    }

    /// Number of tasks submitted and not yet finished.
    pub fn pending(&self) -> usize {
        *self.in_flight.borrow()
    }

    /// Wait until every submitted task, including ones submitted while
    /// draining, has finished. Any number of drains may wait at once.
    pub async fn drain(&self) {
        let mut rx = self.in_flight.subscribe();
        // the sender lives in self, so the channel cannot close here
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::oneshot;

    fn gated(tasks: &BackgroundTasks, done: &Arc<AtomicUsize>) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel::<()>();
        let done = done.clone();
        tasks.spawn(async move {
            let _ = rx.await;
            done.fetch_add(1, Ordering::SeqCst);
        });
        tx
    }

    #[tokio::test]
    async fn test_drain_waits_for_all() {
        let tasks = BackgroundTasks::new();
        let done = Arc::new(AtomicUsize::new(0));

        for _ in 0..8 {
            let done = done.clone();
            tasks.spawn(async move {
                tokio::task::yield_now().await;
                done.fetch_add(1, Ordering::SeqCst);
            });
        }

        tasks.drain().await;
        assert_eq!(done.load(Ordering::SeqCst), 8);
        assert_eq!(tasks.pending(), 0);
    }

    #[tokio::test]
    async fn test_drain_includes_nested_spawns() {
        let tasks = BackgroundTasks::new();
        let done = Arc::new(AtomicUsize::new(0));

        let inner_tasks = tasks.clone();
        let inner_done = done.clone();
        tasks.spawn(async move {
            let done = inner_done.clone();
            inner_tasks.spawn(async move {
                done.fetch_add(1, Ordering::SeqCst);
            });
            inner_done.fetch_add(1, Ordering::SeqCst);
        });

        tasks.drain().await;
        assert_eq!(done.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_task_survives_dropped_caller() {
        let tasks = BackgroundTasks::new();
        let (tx, rx) = oneshot::channel::<()>();
        let (started_tx, started_rx) = oneshot::channel::<()>();
        let done = Arc::new(AtomicUsize::new(0));

        let caller = {
            let tasks = tasks.clone();
            let done = done.clone();
            async move {
                tasks.spawn(async move {
                    let _ = rx.await;
                    done.fetch_add(1, Ordering::SeqCst);
                });
                let _ = started_tx.send(());
                std::future::pending::<()>().await;
            }
        };

        let handle = tokio::spawn(caller);
        started_rx.await.unwrap();
        handle.abort();
        let _ = handle.await;

        tx.send(()).unwrap();
        tasks.drain().await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_panicking_task_does_not_poison_queue() {
        let tasks = BackgroundTasks::new();
        tasks.spawn(async { panic!("boom") });
        tasks.drain().await;

        let done = Arc::new(AtomicUsize::new(0));
        let d = done.clone();
        tasks.spawn(async move {
            d.fetch_add(1, Ordering::SeqCst);
        });
        tasks.drain().await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancelled_drain_keeps_tasks_running() {
        let tasks = BackgroundTasks::new();
        let done = Arc::new(AtomicUsize::new(0));
        let gate = gated(&tasks, &done);

        let cut_short = tokio::time::timeout(Duration::from_millis(20), tasks.drain()).await;
        assert!(cut_short.is_err());
        assert_eq!(tasks.pending(), 1);

        gate.send(()).unwrap();
        tasks.drain().await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
        assert_eq!(tasks.pending(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_drains_both_wait() {
        let tasks = BackgroundTasks::new();
        let done = Arc::new(AtomicUsize::new(0));
        let gate = gated(&tasks, &done);

        let first = {
            let tasks = tasks.clone();
            tokio::spawn(async move { tasks.drain().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        let second = tokio::time::timeout(Duration::from_millis(20), tasks.drain()).await;
        assert!(second.is_err());
        assert!(!first.is_finished());
        assert_eq!(tasks.pending(), 1);

        gate.send(()).unwrap();
        first.await.unwrap();
        tasks.drain().await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }
}
