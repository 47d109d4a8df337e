//! The request scheduler — bounded FIFO lanes, one serialized consumer.

use std::future::Future;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use futures::future::BoxFuture;
use staffcast_core::{Result, StaffcastError};
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, oneshot, watch};

use crate::lane::Lane;

/// A unit of outbound work. Ownership transfers to the scheduler on submit;
/// the closure runs at most once and is never retried here — retry belongs
/// to the caller.
pub type Request = Box<dyn FnOnce() -> BoxFuture<'static, Result<()>> + Send + 'static>;

const STATE_IDLE: u8 = 0;
const STATE_RUNNING: u8 = 1;
const STATE_STOPPED: u8 = 2;

/// Serialized, rate-limited executor for one collaborator.
///
/// Two bounded FIFO lanes feed a single consumer loop started with
/// [`start`](Self::start) or [`start_adaptive`](Self::start_adaptive).
/// Submitting against a scheduler that is not running is rejected
/// immediately rather than queued against a dead consumer.
pub struct RequestScheduler {
    name: String,
    normal_tx: mpsc::Sender<Request>,
    low_tx: mpsc::Sender<Request>,
    receivers: Mutex<Option<(mpsc::Receiver<Request>, mpsc::Receiver<Request>)>>,
    state: AtomicU8,
    shutdown_tx: watch::Sender<bool>,
    sync_timeout: Duration,
}

impl RequestScheduler {
    /// Create a scheduler with the given lane buffer size.
    ///
    /// `sync_timeout` bounds every [`submit_and_wait`](Self::submit_and_wait)
    /// call so a stalled consumer cannot hold callers forever.
    pub fn new(name: impl Into<String>, buffer_size: usize, sync_timeout: Duration) -> Self {
        let (normal_tx, normal_rx) = mpsc::channel(buffer_size.max(1));
        let (low_tx, low_rx) = mpsc::channel(buffer_size.max(1));
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            name: name.into(),
            normal_tx,
            low_tx,
            receivers: Mutex::new(Some((normal_rx, low_rx))),
            state: AtomicU8::new(STATE_IDLE),
            shutdown_tx,
            sync_timeout,
        }
    }

    /// Whether the consumer loop is currently running.
    pub fn is_running(&self) -> bool {
        self.state.load(Ordering::Acquire) == STATE_RUNNING
    }

    /// Queue a request on the given lane.
    ///
    /// Fails fast with [`StaffcastError::SchedulerNotRunning`] when the
    /// consumer loop has not been started or has been stopped.
    pub async fn submit<F, Fut>(&self, lane: Lane, f: F) -> Result<()>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let request: Request =
            Box::new(move || -> BoxFuture<'static, Result<()>> { Box::pin(f()) });
        self.submit_boxed(lane, request).await
    }

    /// Queue an already-boxed request on the given lane.
    pub async fn submit_boxed(&self, lane: Lane, request: Request) -> Result<()> {
        if !self.is_running() {
            return Err(StaffcastError::SchedulerNotRunning);
        }
        let tx = match lane {
            Lane::Normal => &self.normal_tx,
            Lane::Low => &self.low_tx,
        };
        tx.send(request)
            .await
            .map_err(|_| StaffcastError::SchedulerNotRunning)
    }

    /// Queue a request and wait until the consumer has executed it.
    ///
    /// The closure's own result comes back to the caller; the wait is
    /// bounded by the scheduler's `sync_timeout`. A consumer that shuts
    /// down with the request still queued yields
    /// [`StaffcastError::RequestDropped`].
    pub async fn submit_and_wait<T, F, Fut>(&self, lane: Lane, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel::<Result<T>>();
        let request: Request = Box::new(move || -> BoxFuture<'static, Result<()>> {
            Box::pin(async move {
                let result = f().await;
                let failure = result.as_ref().err().map(|e| e.to_string());
                let _ = tx.send(result);
                match failure {
                    None => Ok(()),
                    Some(msg) => Err(StaffcastError::Request(msg)),
                }
            })
        });
        self.submit_boxed(lane, request).await?;

        match tokio::time::timeout(self.sync_timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(StaffcastError::RequestDropped),
            Err(_) => Err(StaffcastError::AwaitTimeout),
        }
    }

    /// Start the consumer loop with a fixed pause between requests.
    ///
    /// Dequeues exactly one request per iteration from whichever lane is
    /// ready; when both are ready the pick is `select!`'s random choice.
    pub fn start(&self, pause: Duration) -> Result<()> {
        let (mut normal_rx, mut low_rx) = self.take_receivers()?;
        let name = self.name.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            tracing::info!(scheduler = %name, pause_ms = pause.as_millis() as u64, "consumer loop started");
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    Some(request) = normal_rx.recv() => run_request(&name, Lane::Normal, request).await,
                    Some(request) = low_rx.recv() => run_request(&name, Lane::Low, request).await,
                }
                tokio::time::sleep(pause).await;
            }
            tracing::info!(scheduler = %name, "consumer loop stopped");
        });
        Ok(())
    }

    /// Start the consumer loop with an adaptive pause.
    ///
    /// While requests arrive back-to-back the pause grows through `growth`;
    /// the moment both lanes drain it resets to `base_pause`.
    pub fn start_adaptive<G>(&self, base_pause: Duration, growth: G) -> Result<()>
    where
        G: Fn(Duration) -> Duration + Send + 'static,
    {
        let (mut normal_rx, mut low_rx) = self.take_receivers()?;
        let name = self.name.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            tracing::info!(scheduler = %name, base_ms = base_pause.as_millis() as u64, "adaptive consumer loop started");
            let mut pause = base_pause;
            let mut streak: u32 = 0;
            loop {
                if *shutdown_rx.borrow() {
                    break;
                }
                let next = match normal_rx.try_recv() {
                    Ok(request) => Some((Lane::Normal, request)),
                    Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => {
                        low_rx.try_recv().ok().map(|r| (Lane::Low, r))
                    }
                };
                let Some((lane, request)) = next else {
                    // Both lanes drained: reset and idle one base interval.
                    streak = 0;
                    pause = base_pause;
                    tokio::select! {
                        _ = shutdown_rx.changed() => break,
                        _ = tokio::time::sleep(base_pause) => {}
                    }
                    continue;
                };
                streak += 1;
                run_request(&name, lane, request).await;
                pause = if streak > 1 { growth(pause) } else { base_pause };
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    _ = tokio::time::sleep(pause) => {}
                }
            }
            tracing::info!(scheduler = %name, "adaptive consumer loop stopped");
        });
        Ok(())
    }

    /// Stop the consumer loop. Queued requests are abandoned; callers
    /// parked in `submit_and_wait` resolve through their timeout or a
    /// dropped completion signal.
    pub fn stop(&self) {
        self.state.store(STATE_STOPPED, Ordering::Release);
        let _ = self.shutdown_tx.send(true);
    }

    fn take_receivers(&self) -> Result<(mpsc::Receiver<Request>, mpsc::Receiver<Request>)> {
        if self
            .state
            .compare_exchange(
                STATE_IDLE,
                STATE_RUNNING,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            tracing::warn!(scheduler = %self.name, "consumer loop already started");
            return Err(StaffcastError::other(format!(
                "scheduler {} already started",
                self.name
            )));
        }
        let mut receivers = self.receivers.lock().unwrap_or_else(|e| e.into_inner());
        receivers
            .take()
            .ok_or_else(|| StaffcastError::other(format!("scheduler {} has no consumer queues", self.name)))
    }
}

async fn run_request(name: &str, lane: Lane, request: Request) {
    if let Err(e) = request().await {
        tracing::error!(scheduler = name, %lane, "request failed: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    fn scheduler() -> RequestScheduler {
        RequestScheduler::new("test", 64, Duration::from_secs(5))
    }

    async fn wait_until(mut check: impl FnMut() -> bool) {
        for _ in 0..500 {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached in time");
    }

    #[tokio::test]
    async fn lane_is_fifo_and_exactly_once() {
        let sched = scheduler();
        sched.start(Duration::from_millis(1)).unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        for i in 0..10 {
            let seen = seen.clone();
            sched
                .submit(Lane::Normal, move || async move {
                    seen.lock().unwrap().push(i);
                    Ok(())
                })
                .await
                .unwrap();
        }

        wait_until(|| seen.lock().unwrap().len() == 10).await;
        assert_eq!(*seen.lock().unwrap(), (0..10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn low_lane_also_drains() {
        let sched = scheduler();
        sched.start(Duration::from_millis(1)).unwrap();

        let count = Arc::new(AtomicUsize::new(0));
        for _ in 0..5 {
            let count = count.clone();
            sched
                .submit(Lane::Low, move || async move {
                    count.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
                .await
                .unwrap();
        }
        wait_until(|| count.load(Ordering::SeqCst) == 5).await;
    }

    #[tokio::test]
    async fn submit_and_wait_returns_after_execution() {
        let sched = scheduler();
        sched.start(Duration::from_millis(1)).unwrap();

        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        let value = sched
            .submit_and_wait(Lane::Normal, move || async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(7_u32)
            })
            .await
            .unwrap();

        // The closure must have fully run by the time the call returns.
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn submit_and_wait_surfaces_request_error() {
        let sched = scheduler();
        sched.start(Duration::from_millis(1)).unwrap();

        let err = sched
            .submit_and_wait::<(), _, _>(Lane::Normal, || async {
                Err(StaffcastError::other("boom"))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StaffcastError::Other(msg) if msg == "boom"));
    }

    #[tokio::test]
    async fn submit_before_start_is_rejected() {
        let sched = scheduler();
        let ran = Arc::new(AtomicUsize::new(0));
        let r = ran.clone();
        let err = sched
            .submit(Lane::Normal, move || async move {
                r.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StaffcastError::SchedulerNotRunning));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn submit_after_stop_is_rejected() {
        let sched = scheduler();
        sched.start(Duration::from_millis(1)).unwrap();
        sched.stop();

        let ran = Arc::new(AtomicUsize::new(0));
        let r = ran.clone();
        let err = sched
            .submit(Lane::Normal, move || async move {
                r.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StaffcastError::SchedulerNotRunning));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn second_start_fails() {
        let sched = scheduler();
        sched.start(Duration::from_millis(1)).unwrap();
        assert!(sched.start(Duration::from_millis(1)).is_err());
    }

    #[tokio::test]
    async fn adaptive_loop_executes_requests() {
        let sched = scheduler();
        sched
            .start_adaptive(Duration::from_millis(1), |p| p)
            .unwrap();

        let count = Arc::new(AtomicUsize::new(0));
        for _ in 0..5 {
            let count = count.clone();
            sched
                .submit(Lane::Normal, move || async move {
                    count.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
                .await
                .unwrap();
        }
        wait_until(|| count.load(Ordering::SeqCst) == 5).await;
    }

    #[tokio::test]
    async fn sync_wait_times_out_behind_slow_request() {
        let sched = RequestScheduler::new("slow", 8, Duration::from_millis(50));
        sched.start(Duration::from_millis(1)).unwrap();

        sched
            .submit(Lane::Normal, || async {
                tokio::time::sleep(Duration::from_millis(500)).await;
                Ok(())
            })
            .await
            .unwrap();

        let err = sched
            .submit_and_wait::<(), _, _>(Lane::Normal, || async { Ok(()) })
            .await
            .unwrap_err();
        assert!(matches!(err, StaffcastError::AwaitTimeout));
    }
}
