//! Run queue: one run at a time against the shared automation session.
//!
//! Submissions arriving while a run is in flight are enqueued FIFO and
//! drained by a single worker task. No mid-run cancellation; a run either
//! completes or records failures and moves on.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::model::Submission;

/// Executes one submission to completion. The production executor drives
/// the run coordinator; tests substitute stubs.
#[async_trait]
pub trait RunExecutor: Send + Sync + 'static {
    async fn execute(&self, submission: Submission);
}

/// Where a submission landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitDisposition {
    /// Picked up immediately (the worker was idle).
    Started,
    /// Parked behind the in-flight run.
    Queued,
}

/// Handle to the single-worker run queue.
pub struct RunQueue {
    tx: mpsc::UnboundedSender<Submission>,
    running: Arc<AtomicBool>,
    pending: Arc<AtomicUsize>,
}

impl RunQueue {
    /// Spawn the worker and return the queue handle.
    pub fn start(executor: Arc<dyn RunExecutor>) -> Arc<RunQueue> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Submission>();
        let running = Arc::new(AtomicBool::new(false));
        let pending = Arc::new(AtomicUsize::new(0));

        let worker_running = Arc::clone(&running);
        let worker_pending = Arc::clone(&pending);
        tokio::spawn(async move {
            while let Some(submission) = rx.recv().await {
                worker_pending.fetch_sub(1, Ordering::SeqCst);
                worker_running.store(true, Ordering::SeqCst);
                executor.execute(submission).await;
                worker_running.store(false, Ordering::SeqCst);
            }
        });

        Arc::new(RunQueue {
            tx,
            running,
            pending,
        })
    }

    /// Enqueue a submission. Returns whether it starts now or waits.
    pub fn submit(&self, submission: Submission) -> SubmitDisposition {
        let disposition = if self.is_running() || self.queue_size() > 0 {
            SubmitDisposition::Queued
        } else {
            SubmitDisposition::Started
        };
        self.pending.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(submission).is_err() {
            tracing::error!("run worker is gone; submission dropped");
            self.pending.fetch_sub(1, Ordering::SeqCst);
        }
        disposition
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn queue_size(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::Notify;

    struct BlockingExecutor {
        started: Arc<Notify>,
        release: Arc<Notify>,
        completed: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl RunExecutor for BlockingExecutor {
        async fn execute(&self, _submission: Submission) {
            self.started.notify_one();
            self.release.notified().await;
            self.completed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn empty_submission() -> Submission {
        Submission { brands: vec![] }
    }

    #[tokio::test]
    async fn second_submission_queues_behind_the_first() {
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let completed = Arc::new(AtomicUsize::new(0));
        let queue = RunQueue::start(Arc::new(BlockingExecutor {
            started: Arc::clone(&started),
            release: Arc::clone(&release),
            completed: Arc::clone(&completed),
        }));

        assert_eq!(queue.submit(empty_submission()), SubmitDisposition::Started);
        started.notified().await;
        assert!(queue.is_running());

        assert_eq!(queue.submit(empty_submission()), SubmitDisposition::Queued);
        assert_eq!(queue.queue_size(), 1);

        release.notify_one();
        started.notified().await; // second run picked up
        release.notify_one();

        // drain
        tokio::time::timeout(Duration::from_secs(2), async {
            while completed.load(Ordering::SeqCst) < 2 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(queue.queue_size(), 0);
        // the worker clears the running flag just after execute returns
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!queue.is_running());
    }
}
