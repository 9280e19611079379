//! Per-provider request scheduler.
//!
//! `schedule` runs a request inline when the rate tracker admits it. When it
//! doesn't, the request waits in the provider's priority queue until the
//! provider's drain loop finds capacity. Failed attempts are retried with
//! exponential backoff; each attempt runs under the provider's timeout.
//!
//! The queued item only holds a one-shot permit. The work closure stays with
//! the awaiting caller, so a caller that gives up simply drops its receiver
//! and the drain loop discards the item without spending an admission.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::clock::{elapsed_between, SharedClock};
use crate::errors::MarketDataError;
use crate::provider::PriorityClass;

use super::rate_tracker::{AttemptOutcome, RateTracker};

/// Scheduler tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SchedulerConfig {
    /// Period of each provider's drain loop.
    pub drain_interval: Duration,
    /// Maximum waiting requests per provider.
    pub queue_capacity: usize,
    /// Longest a denied request waits for admission before it is denied.
    /// Requests whose provider cannot admit anything within this horizon
    /// are denied without queueing.
    pub max_queue_wait: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            drain_interval: Duration::from_secs(1),
            queue_capacity: 256,
            max_queue_wait: Duration::from_secs(90),
        }
    }
}

/// Priority score: provider base priority x 10 + caller priority.
pub fn priority_score(provider: PriorityClass, caller: PriorityClass) -> u32 {
    provider.weight() * 10 + caller.weight()
}

type Permit = Result<(), MarketDataError>;

/// A request waiting for admission.
#[derive(Debug)]
pub struct QueueItem {
    pub score: u32,
    /// Enqueue order; breaks score ties in favor of the earlier request.
    pub seq: u64,
    pub enqueued_at: DateTime<Utc>,
    /// Retries already spent by the request when it was queued.
    pub retry_count: u32,
    permit: oneshot::Sender<Permit>,
}

impl QueueItem {
    pub fn new(
        score: u32,
        seq: u64,
        enqueued_at: DateTime<Utc>,
        retry_count: u32,
    ) -> (Self, oneshot::Receiver<Permit>) {
        let (permit, rx) = oneshot::channel();
        let item = Self {
            score,
            seq,
            enqueued_at,
            retry_count,
            permit,
        };
        (item, rx)
    }

    fn key(&self) -> (u32, Reverse<u64>) {
        (self.score, Reverse(self.seq))
    }

    /// The caller stopped waiting.
    fn is_abandoned(&self) -> bool {
        self.permit.is_closed()
    }
}

impl PartialEq for QueueItem {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for QueueItem {}

impl PartialOrd for QueueItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueItem {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// Bounded max-heap of waiting requests for one provider.
#[derive(Debug)]
pub struct PendingQueue {
    heap: BinaryHeap<QueueItem>,
    capacity: usize,
}

impl PendingQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            heap: BinaryHeap::new(),
            capacity,
        }
    }

    /// Add an item; gives it back when the queue is full.
    pub fn push(&mut self, item: QueueItem) -> Result<(), QueueItem> {
        if self.heap.len() >= self.capacity {
            return Err(item);
        }
        self.heap.push(item);
        Ok(())
    }

    pub fn peek(&self) -> Option<&QueueItem> {
        self.heap.peek()
    }

    pub fn pop(&mut self) -> Option<QueueItem> {
        self.heap.pop()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

struct SchedulerInner {
    tracker: Arc<RateTracker>,
    clock: SharedClock,
    config: SchedulerConfig,
    queues: Mutex<HashMap<String, PendingQueue>>,
    drains: Mutex<HashMap<String, JoinHandle<()>>>,
    seq: AtomicU64,
    cancel: CancellationToken,
}

impl SchedulerInner {
    fn lock_queues(&self) -> MutexGuard<'_, HashMap<String, PendingQueue>> {
        self.queues.lock().unwrap_or_else(|poisoned| {
            warn!("Scheduler queues mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn lock_drains(&self) -> MutexGuard<'_, HashMap<String, JoinHandle<()>>> {
        self.drains.lock().unwrap_or_else(|poisoned| {
            warn!("Scheduler drains mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Admit as many queued items as the tracker allows, best score first.
    fn drain_once(&self, provider: &str) {
        let now = self.clock.now();
        let mut queues = self.lock_queues();
        let Some(queue) = queues.get_mut(provider) else {
            return;
        };

        while let Some(top) = queue.peek() {
            if top.is_abandoned() {
                if let Some(item) = queue.pop() {
                    debug!(
                        "Scheduler: discarding abandoned request for '{}' (seq {})",
                        provider, item.seq
                    );
                }
                continue;
            }

            if !self.tracker.try_admit(provider) {
                break;
            }

            if let Some(item) = queue.pop() {
                debug!(
                    "Scheduler: admitted queued request for '{}' (score {}, waited {:?})",
                    provider,
                    item.score,
                    elapsed_between(item.enqueued_at, now)
                );
                // Receiver may have gone away since the check; the slot is spent either way
                let _ = item.permit.send(Ok(()));
            }
        }
    }

    /// Wake every waiter of a provider with a denial.
    fn fail_all(&self, provider: &str) {
        let mut queues = self.lock_queues();
        if let Some(queue) = queues.get_mut(provider) {
            while let Some(item) = queue.pop() {
                let _ = item.permit.send(Err(stopped(provider)));
            }
        }
    }
}

fn denied(provider: &str, reason: &str) -> MarketDataError {
    MarketDataError::ProviderDenied {
        provider: provider.to_string(),
        reason: reason.to_string(),
    }
}

fn stopped(provider: &str) -> MarketDataError {
    denied(provider, "scheduler stopped")
}

async fn drain_loop(inner: Arc<SchedulerInner>, provider: String) {
    let mut ticker = tokio::time::interval(inner.config.drain_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = inner.cancel.cancelled() => {
                inner.fail_all(&provider);
                debug!("Scheduler: drain loop for '{}' stopped", provider);
                break;
            }
            _ = ticker.tick() => inner.drain_once(&provider),
        }
    }
}

/// Queue-and-wait scheduler shared by every provider.
///
/// Cheap to clone; clones share queues and drain loops.
#[derive(Clone)]
pub struct RequestScheduler {
    inner: Arc<SchedulerInner>,
}

impl RequestScheduler {
    pub fn new(
        tracker: Arc<RateTracker>,
        clock: SharedClock,
        config: SchedulerConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                tracker,
                clock,
                config,
                queues: Mutex::new(HashMap::new()),
                drains: Mutex::new(HashMap::new()),
                seq: AtomicU64::new(0),
                cancel,
            }),
        }
    }

    pub fn tracker(&self) -> &Arc<RateTracker> {
        &self.inner.tracker
    }

    /// Requests waiting for `provider`. Zero for unknown providers.
    pub fn queue_len(&self, provider: &str) -> usize {
        self.inner
            .lock_queues()
            .get(provider)
            .map(PendingQueue::len)
            .unwrap_or(0)
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    /// Run `work` against `provider` under admission control.
    ///
    /// `work` is called once per attempt. Errors classed
    /// [`RetryClass::Never`](crate::errors::RetryClass::Never) return as-is;
    /// other errors are retried up to the provider's `retry_attempts`, after
    /// which the caller gets [`MarketDataError::RetriesExhausted`].
    pub async fn schedule<T, F, Fut>(
        &self,
        provider: &str,
        priority: PriorityClass,
        mut work: F,
    ) -> Result<T, MarketDataError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, MarketDataError>>,
    {
        let config = self
            .inner
            .tracker
            .config(provider)
            .ok_or_else(|| denied(provider, "unknown provider"))?;
        let score = priority_score(config.priority_class, priority);

        let mut retry_count = 0;
        loop {
            self.admit(provider, score, retry_count).await?;

            let result = match tokio::time::timeout(config.timeout, work()).await {
                Ok(result) => result,
                Err(_) => Err(MarketDataError::Timeout {
                    provider: provider.to_string(),
                }),
            };

            let error = match result {
                Ok(value) => {
                    self.inner
                        .tracker
                        .record_outcome(provider, AttemptOutcome::Success);
                    return Ok(value);
                }
                Err(error) => error,
            };

            let outcome = if error.is_rate_limit() {
                AttemptOutcome::RateLimited
            } else {
                AttemptOutcome::Failure
            };
            self.inner.tracker.record_outcome(provider, outcome);

            if error.retry_class() == crate::errors::RetryClass::Never {
                return Err(error);
            }

            if retry_count >= config.retry_attempts {
                return Err(MarketDataError::RetriesExhausted {
                    provider: provider.to_string(),
                    attempts: retry_count + 1,
                    last_error: error.to_string(),
                });
            }

            let delay = config.backoff_delay(retry_count);
            debug!(
                "Scheduler: '{}' attempt {} failed ({}), retrying in {:?}",
                provider,
                retry_count + 1,
                error,
                delay
            );

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.inner.cancel.cancelled() => return Err(stopped(provider)),
            }
            retry_count += 1;
        }
    }

    /// Wait until the provider admits one request.
    async fn admit(&self, provider: &str, score: u32, retry_count: u32) -> Result<(), MarketDataError> {
        let rx = {
            let mut queues = self.inner.lock_queues();
            if self.inner.cancel.is_cancelled() {
                return Err(stopped(provider));
            }

            let queue = queues
                .entry(provider.to_string())
                .or_insert_with(|| PendingQueue::new(self.inner.config.queue_capacity));

            // Waiting requests go first; only an empty queue allows the fast path
            if queue.is_empty() && self.inner.tracker.try_admit(provider) {
                return Ok(());
            }

            let max_wait = self.inner.config.max_queue_wait;
            if let Some(wait) = self.inner.tracker.time_until_admissible(provider) {
                if wait > max_wait {
                    debug!(
                        "Scheduler: '{}' has no capacity for {:?}, denying request",
                        provider, wait
                    );
                    return Err(denied(provider, "no capacity within wait limit"));
                }
            }

            let seq = self.inner.seq.fetch_add(1, AtomicOrdering::Relaxed);
            let (item, rx) = QueueItem::new(score, seq, self.inner.clock.now(), retry_count);
            if queue.push(item).is_err() {
                warn!("Scheduler: queue for '{}' is full, denying request", provider);
                return Err(denied(provider, "queue full"));
            }
            debug!(
                "Scheduler: queued request for '{}' (score {}, depth {})",
                provider,
                score,
                queue.len()
            );
            rx
        };

        self.ensure_drain_loop(provider);

        // On timeout the receiver is dropped and the drain loop discards the item
        match tokio::time::timeout(self.inner.config.max_queue_wait, rx).await {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => Err(stopped(provider)),
            Err(_) => {
                debug!("Scheduler: request for '{}' timed out in queue", provider);
                Err(denied(provider, "wait timeout"))
            }
        }
    }

    fn ensure_drain_loop(&self, provider: &str) {
        let mut drains = self.inner.lock_drains();
        if drains.get(provider).is_some_and(|handle| !handle.is_finished()) {
            return;
        }
        if self.inner.cancel.is_cancelled() {
            // Loop won't run; flush anything queued in the meantime
            drop(drains);
            self.inner.fail_all(provider);
            return;
        }

        debug!("Scheduler: starting drain loop for '{}'", provider);
        let handle = tokio::spawn(drain_loop(self.inner.clone(), provider.to_string()));
        drains.insert(provider.to_string(), handle);
    }

    /// Stop every drain loop and wake all waiters with `ProviderDenied`.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        let handles: Vec<(String, JoinHandle<()>)> = self.inner.lock_drains().drain().collect();
        for (provider, handle) in handles {
            if let Err(e) = handle.await {
                warn!("Scheduler: drain loop for '{}' ended abnormally: {}", provider, e);
            }
        }
        info!("Scheduler stopped");
    }
}
