//! Fire-and-forget transform job dispatcher.
//!
//! Every submission spawns an independent Tokio task that runs the transform
//! and then hands its outcome to a continuation exactly once. Submission
//! returns immediately; there is no queue and no concurrency limit.
//!
//! The transform runs in its own nested task so a panic inside the runner
//! is observed as a `JoinError` and converted into a failed outcome. The
//! continuation therefore always runs, and the image never stays in
//! `PROCESSING` because of a runner fault.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use seismo_core::transform::executor::{TransformOutcome, TransformRequest, TransformRunner};
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;

/// Handle to one submitted job.
///
/// Dropping it detaches the job; it keeps running to completion.
pub struct JobHandle {
    inner: JoinHandle<()>,
}

impl JobHandle {
    /// Wait until the job's continuation has returned.
    pub async fn finished(self) {
        if let Err(e) = self.inner.await {
            tracing::error!(error = %e, "Job continuation did not finish cleanly");
        }
    }
}

/// Spawns transform jobs and tracks how many are still running.
///
/// Clones share the runner and the set of tracked tasks.
pub struct JobDispatcher<R> {
    runner: Arc<R>,
    tracker: TaskTracker,
    /// Number of callers currently inside [`wait_idle`](Self::wait_idle).
    waiters: Arc<Mutex<usize>>,
}

impl<R> Clone for JobDispatcher<R> {
    fn clone(&self) -> Self {
        Self {
            runner: Arc::clone(&self.runner),
            tracker: self.tracker.clone(),
            waiters: Arc::clone(&self.waiters),
        }
    }
}

impl<R: TransformRunner> JobDispatcher<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner: Arc::new(runner),
            tracker: TaskTracker::new(),
            waiters: Arc::new(Mutex::new(0)),
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Start `request` in the background and pass its outcome to `on_complete`.
    ///
    /// `on_complete` is invoked exactly once per submission, with a synthetic
    /// failure outcome if the runner task panicked.
    pub fn submit<F, Fut>(&self, request: TransformRequest, on_complete: F) -> JobHandle
    where
        F: FnOnce(TransformOutcome) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let runner = Arc::clone(&self.runner);
        let kind = request.kind;

        let inner = self.tracker.spawn(async move {
            let job = tokio::spawn(async move { runner.run(request).await });
            let outcome = match job.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(kind = %kind, error = %e, "Transform job aborted");
                    TransformOutcome::failure(format!("background processing error: {e}"), 0)
                }
            };
            on_complete(outcome).await;
        });

        JobHandle { inner }
    }

    /// Run `task` to completion on the tracker, independent of the caller.
    ///
    /// Dropping the returned handle does not cancel the task, and
    /// [`wait_idle`](Self::wait_idle) waits for it like a job.
    pub fn track<T>(&self, task: T) -> JoinHandle<T::Output>
    where
        T: Future + Send + 'static,
        T::Output: Send + 'static,
    {
        self.tracker.spawn(task)
    }

    /// Number of tracked tasks (jobs and [`track`](Self::track)ed work)
    /// that have not yet returned.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Wait until every task tracked so far has finished.
    ///
    /// The tracker stays closed only while at least one caller is waiting,
    /// including callers whose wait is dropped part-way through.
    pub async fn wait_idle(&self) {
        let _guard = IdleWait::enter(&self.tracker, &self.waiters);
        self.tracker.wait().await;
    }

    /// Wait up to `timeout` for in-flight jobs. Returns `false` on timeout.
    pub async fn drain(&self, timeout: Duration) -> bool {
        let pending = self.in_flight();
        if pending > 0 {
            tracing::info!(pending, "Waiting for in-flight transform jobs");
        }
        tokio::time::timeout(timeout, self.wait_idle()).await.is_ok()
    }
}

/// Keeps the tracker closed for as long as any waiter holds one.
struct IdleWait<'a> {
    tracker: &'a TaskTracker,
    waiters: &'a Mutex<usize>,
}

impl<'a> IdleWait<'a> {
    fn enter(tracker: &'a TaskTracker, waiters: &'a Mutex<usize>) -> Self {
        let mut count = waiters.lock().unwrap_or_else(PoisonError::into_inner);
        *count += 1;
        tracker.close();
        Self { tracker, waiters }
    }
}

impl Drop for IdleWait<'_> {
    fn drop(&mut self) {
        let mut count = self.waiters.lock().unwrap_or_else(PoisonError::into_inner);
        *count -= 1;
        if *count == 0 {
            self.tracker.reopen();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use seismo_core::transform::TransformKind;
    use tokio::sync::Semaphore;

    use super::*;

    fn request(kind: TransformKind) -> TransformRequest {
        TransformRequest {
            input: "https://example.com/q.jpg".to_string(),
            output_filename: format!("1_{kind}.jpg"),
            kind,
            min_time_secs: 0,
        }
    }

    /// Succeeds once released, recording every request it sees.
    struct GatedRunner {
        gate: Semaphore,
        seen: Mutex<Vec<TransformKind>>,
    }

    impl GatedRunner {
        fn new() -> Self {
            Self {
                gate: Semaphore::new(0),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn release(&self, jobs: usize) {
            self.gate.add_permits(jobs);
        }
    }

    impl TransformRunner for GatedRunner {
        async fn run(&self, request: TransformRequest) -> TransformOutcome {
            self.seen.lock().unwrap().push(request.kind);
            self.gate.acquire().await.unwrap().forget();
            TransformOutcome {
                success: true,
                processing_time: 1,
                ..TransformOutcome::default()
            }
        }
    }

    struct PanickingRunner;

    impl TransformRunner for PanickingRunner {
        async fn run(&self, _request: TransformRequest) -> TransformOutcome {
            panic!("runner exploded");
        }
    }

    #[tokio::test]
    async fn submit_returns_before_job_completes() {
        let dispatcher = JobDispatcher::new(GatedRunner::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&calls);
        let handle = dispatcher.submit(request(TransformKind::Edge), move |outcome| async move {
            assert!(outcome.success);
            counter.fetch_add(1, Ordering::SeqCst);
        });

        tokio::task::yield_now().await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(dispatcher.in_flight(), 1);

        dispatcher.runner().release(1);
        handle.finished().await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(dispatcher.in_flight(), 0);
    }

    #[tokio::test]
    async fn jobs_run_concurrently() {
        let dispatcher = JobDispatcher::new(GatedRunner::new());
        let calls = Arc::new(AtomicUsize::new(0));

        for kind in TransformKind::ALL {
            let counter = Arc::clone(&calls);
            dispatcher.submit(request(kind), move |_| async move {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }

        // All three reach the runner while none has been released.
        while dispatcher.runner().seen.lock().unwrap().len() < 3 {
            tokio::task::yield_now().await;
        }
        assert_eq!(dispatcher.in_flight(), 3);

        dispatcher.runner().release(3);
        dispatcher.wait_idle().await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn runner_panic_becomes_failed_outcome() {
        let dispatcher = JobDispatcher::new(PanickingRunner);
        let outcomes = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&outcomes);
        dispatcher
            .submit(request(TransformKind::Fft), move |outcome| async move {
                sink.lock().unwrap().push(outcome);
            })
            .finished()
            .await;

        let outcomes = outcomes.lock().unwrap();
        assert_eq!(outcomes.len(), 1);
        assert!(!outcomes[0].success);
        let error = outcomes[0].error.as_deref().unwrap();
        assert!(error.starts_with("background processing error"), "got {error}");
    }

    #[tokio::test]
    async fn dispatcher_accepts_jobs_after_wait_idle() {
        let dispatcher = JobDispatcher::new(PanickingRunner);
        dispatcher.wait_idle().await;

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        dispatcher.submit(request(TransformKind::Edge), move |_| async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        dispatcher.wait_idle().await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn drain_times_out_on_stuck_jobs() {
        let dispatcher = JobDispatcher::new(GatedRunner::new());
        dispatcher.submit(request(TransformKind::Edge), |_| async {});

        assert!(!dispatcher.drain(Duration::from_millis(50)).await);

        dispatcher.runner().release(1);
        assert!(dispatcher.drain(Duration::from_secs(5)).await);
    }

    #[tokio::test]
    async fn timed_out_drain_leaves_tracker_open() {
        let dispatcher = JobDispatcher::new(GatedRunner::new());
        dispatcher.submit(request(TransformKind::Edge), |_| async {});

        assert!(!dispatcher.drain(Duration::from_millis(20)).await);
        assert!(!dispatcher.tracker.is_closed());
        assert_eq!(*dispatcher.waiters.lock().unwrap(), 0);

        dispatcher.runner().release(1);
        dispatcher.wait_idle().await;
        assert_eq!(dispatcher.in_flight(), 0);
    }

    #[tokio::test]
    async fn concurrent_waiters_all_return_and_reopen() {
        let dispatcher = JobDispatcher::new(GatedRunner::new());
        dispatcher.submit(request(TransformKind::Fft), |_| async {});

        let release = async {
            tokio::task::yield_now().await;
            dispatcher.runner().release(1);
        };
        tokio::join!(dispatcher.wait_idle(), dispatcher.wait_idle(), release);

        assert!(!dispatcher.tracker.is_closed());
        assert_eq!(*dispatcher.waiters.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn tracked_work_survives_dropped_handle() {
        let dispatcher = JobDispatcher::new(PanickingRunner);
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&calls);
        drop(dispatcher.track(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        dispatcher.wait_idle().await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
