//! Tag suggestion service: cache, per-user quota, and an async worker pool.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use memollm_core::defaults;
use memollm_core::{Error, Result, SuggestTagsRequest};
use memollm_inference::LlmService;

use crate::cache::{CacheStats, TagCache};
use crate::job::{TagJob, TagJobStatus};
use crate::rate_limit::{RateLimitStatus, RateLimiter};

/// Configuration for the tag service.
#[derive(Debug, Clone)]
pub struct TagServiceConfig {
    /// Tags requested per suggestion.
    pub max_tags: usize,
    pub cache_ttl: Duration,
    pub cache_size: usize,
    /// Requests allowed per user per window.
    pub rate_limit: u32,
    pub rate_window: Duration,
    /// Whether `suggest_tags_async` and the worker pool are available.
    pub async_enabled: bool,
    pub workers: usize,
    pub queue_size: usize,
    /// Deadline for a single call into the provider registry.
    pub request_timeout: Duration,
    /// Deadline for the completion notifier.
    pub notify_timeout: Duration,
}

impl Default for TagServiceConfig {
    fn default() -> Self {
        Self {
            max_tags: defaults::MAX_TAGS,
            cache_ttl: Duration::from_secs(defaults::TAG_CACHE_TTL_SECS),
            cache_size: defaults::TAG_CACHE_SIZE,
            rate_limit: defaults::TAG_RATE_LIMIT,
            rate_window: Duration::from_secs(defaults::TAG_RATE_WINDOW_SECS),
            async_enabled: true,
            workers: defaults::TAG_WORKERS,
            queue_size: defaults::TAG_QUEUE_SIZE,
            request_timeout: Duration::from_secs(defaults::TAG_REQUEST_TIMEOUT_SECS),
            notify_timeout: Duration::from_secs(defaults::TAG_NOTIFY_TIMEOUT_SECS),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

impl TagServiceConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `MEMOLLM_TAG_MAX_TAGS` | `5` | Tags requested per suggestion |
    /// | `MEMOLLM_TAG_CACHE_TTL_SECS` | `900` | Cache entry lifetime |
    /// | `MEMOLLM_TAG_CACHE_SIZE` | `1000` | Cache capacity |
    /// | `MEMOLLM_TAG_RATE_LIMIT` | `60` | Requests per user per window |
    /// | `MEMOLLM_TAG_RATE_WINDOW_SECS` | `60` | Rate limit window |
    /// | `MEMOLLM_TAG_ASYNC` | `true` | Enable async jobs and workers |
    /// | `MEMOLLM_TAG_WORKERS` | `2` | Worker count |
    /// | `MEMOLLM_TAG_QUEUE_SIZE` | `100` | Job queue capacity |
    pub fn from_env() -> Self {
        let base = Self::default();

        let async_enabled = std::env::var("MEMOLLM_TAG_ASYNC")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(base.async_enabled);

        Self {
            max_tags: env_parse("MEMOLLM_TAG_MAX_TAGS").unwrap_or(base.max_tags),
            cache_ttl: env_parse("MEMOLLM_TAG_CACHE_TTL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(base.cache_ttl),
            cache_size: env_parse("MEMOLLM_TAG_CACHE_SIZE").unwrap_or(base.cache_size),
            rate_limit: env_parse("MEMOLLM_TAG_RATE_LIMIT").unwrap_or(base.rate_limit),
            rate_window: env_parse("MEMOLLM_TAG_RATE_WINDOW_SECS")
                .map(Duration::from_secs)
                .unwrap_or(base.rate_window),
            async_enabled,
            workers: env_parse::<usize>("MEMOLLM_TAG_WORKERS")
                .unwrap_or(base.workers)
                .max(1),
            queue_size: env_parse::<usize>("MEMOLLM_TAG_QUEUE_SIZE")
                .unwrap_or(base.queue_size)
                .max(1),
            ..base
        }
    }

    pub fn with_max_tags(mut self, max_tags: usize) -> Self {
        self.max_tags = max_tags;
        self
    }

    pub fn with_cache(mut self, ttl: Duration, size: usize) -> Self {
        self.cache_ttl = ttl;
        self.cache_size = size;
        self
    }

    pub fn with_rate_limit(mut self, limit: u32, window: Duration) -> Self {
        self.rate_limit = limit;
        self.rate_window = window;
        self
    }

    /// Enable or disable async jobs.
    pub fn with_async(mut self, enabled: bool) -> Self {
        self.async_enabled = enabled;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_queue_size(mut self, queue_size: usize) -> Self {
        self.queue_size = queue_size.max(1);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_notify_timeout(mut self, timeout: Duration) -> Self {
        self.notify_timeout = timeout;
        self
    }
}

/// Receives every job a worker finishes, at most once per job.
///
/// Calls are bounded by [`TagServiceConfig::notify_timeout`]; a notifier
/// that overruns is abandoned.
#[async_trait]
pub trait TagJobNotifier: Send + Sync {
    async fn job_finished(&self, job: &TagJob);
}

/// Event emitted by the tag workers.
#[derive(Debug, Clone, PartialEq)]
pub enum TagJobEvent {
    WorkerStarted { worker: usize },
    WorkerStopped { worker: usize },
    JobQueued { job_id: String },
    JobStarted { job_id: String },
    JobCompleted { job_id: String, tag_count: usize },
    JobFailed { job_id: String, error: String },
}

/// State shared between the service handle and its workers.
struct Shared {
    llm: Arc<LlmService>,
    config: TagServiceConfig,
    cache: TagCache,
    limiter: RateLimiter,
    jobs: RwLock<HashMap<String, TagJob>>,
    notifier: RwLock<Option<Arc<dyn TagJobNotifier>>>,
    event_tx: broadcast::Sender<TagJobEvent>,
}

impl Shared {
    async fn request_tags(&self, content: &str, existing_tags: &[String]) -> Result<Vec<String>> {
        let req = SuggestTagsRequest::new(content)
            .with_existing_tags(existing_tags.to_vec())
            .with_max_tags(self.config.max_tags);

        let timeout = self.config.request_timeout;
        match tokio::time::timeout(timeout, self.llm.suggest_tags(&req)).await {
            Ok(resp) => Ok(resp?.tags),
            Err(_) => Err(Error::Timeout(timeout)),
        }
    }

    fn store_job(&self, job: TagJob) {
        if let Ok(mut jobs) = self.jobs.write() {
            jobs.insert(job.id.clone(), job);
        }
    }

    fn remove_job(&self, job_id: &str) {
        if let Ok(mut jobs) = self.jobs.write() {
            jobs.remove(job_id);
        }
    }

    /// Apply `f` to a stored job and return the updated copy.
    fn update_job<F>(&self, job_id: &str, f: F) -> Option<TagJob>
    where
        F: FnOnce(&mut TagJob),
    {
        let mut jobs = self.jobs.write().ok()?;
        let job = jobs.get_mut(job_id)?;
        f(job);
        Some(job.clone())
    }

    fn emit(&self, event: TagJobEvent) {
        let _ = self.event_tx.send(event);
    }

    async fn process_job(&self, worker: usize, job: TagJob) {
        let start = Instant::now();
        let job_id = job.id.clone();

        if self
            .update_job(&job_id, |j| j.status = TagJobStatus::Running)
            .is_none()
        {
            warn!(
                subsystem = "tags",
                component = "worker",
                worker,
                job_id = %job_id,
                "Dequeued job is missing from the job table"
            );
            return;
        }
        self.emit(TagJobEvent::JobStarted {
            job_id: job_id.clone(),
        });
        debug!(
            subsystem = "tags",
            component = "worker",
            worker,
            job_id = %job_id,
            memo_id = job.memo_id,
            "Processing tag job"
        );

        let result = self.request_tags(&job.content, &job.existing_tags).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let finished = match result {
            Ok(tags) => {
                self.cache
                    .insert(&job.content, &job.existing_tags, tags.clone());
                let tag_count = tags.len();
                let finished = self.update_job(&job_id, |j| {
                    j.status = TagJobStatus::Completed;
                    j.result = Some(tags);
                    j.completed_at = Some(Utc::now());
                });
                info!(
                    subsystem = "tags",
                    component = "worker",
                    worker,
                    job_id = %job_id,
                    memo_id = job.memo_id,
                    tag_count,
                    duration_ms,
                    "Tag job completed"
                );
                self.emit(TagJobEvent::JobCompleted {
                    job_id: job_id.clone(),
                    tag_count,
                });
                finished
            }
            Err(e) => {
                let message = e.to_string();
                let finished = self.update_job(&job_id, |j| {
                    j.status = TagJobStatus::Failed;
                    j.error = Some(message.clone());
                    j.completed_at = Some(Utc::now());
                });
                error!(
                    subsystem = "tags",
                    component = "worker",
                    worker,
                    job_id = %job_id,
                    memo_id = job.memo_id,
                    error = %message,
                    duration_ms,
                    "Tag job failed"
                );
                self.emit(TagJobEvent::JobFailed {
                    job_id: job_id.clone(),
                    error: message,
                });
                finished
            }
        };

        if let Some(finished) = finished {
            self.notify(&finished).await;
        }
    }

    async fn notify(&self, job: &TagJob) {
        let notifier = self.notifier.read().ok().and_then(|n| n.clone());
        let Some(notifier) = notifier else {
            return;
        };
        let timeout = self.config.notify_timeout;
        if tokio::time::timeout(timeout, notifier.job_finished(job))
            .await
            .is_err()
        {
            warn!(
                subsystem = "tags",
                component = "worker",
                job_id = %job.id,
                timeout_ms = timeout.as_millis() as u64,
                "Tag job notifier timed out"
            );
        }
    }
}

type JobQueue = Arc<tokio::sync::Mutex<mpsc::Receiver<TagJob>>>;

async fn run_worker(
    shared: Arc<Shared>,
    worker: usize,
    queue: JobQueue,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    info!(subsystem = "tags", component = "worker", worker, "Tag worker started");
    shared.emit(TagJobEvent::WorkerStarted { worker });

    loop {
        if *shutdown_rx.borrow() {
            break;
        }
        let next = tokio::select! {
            biased;
            _ = shutdown_rx.changed() => None,
            job = async { queue.lock().await.recv().await } => job,
        };
        let Some(job) = next else {
            break;
        };
        shared.process_job(worker, job).await;
    }

    shared.emit(TagJobEvent::WorkerStopped { worker });
    info!(subsystem = "tags", component = "worker", worker, "Tag worker stopped");
}

/// Tag suggestions on top of an [`LlmService`].
///
/// Synchronous calls go through the per-user quota and the result cache.
/// Async calls additionally record a [`TagJob`] and hand it to a fixed
/// worker pool over a bounded queue; a full queue fails the call at once.
pub struct TagService {
    shared: Arc<Shared>,
    queue_tx: Mutex<Option<mpsc::Sender<TagJob>>>,
    shutdown_tx: watch::Sender<bool>,
    workers: tokio::sync::Mutex<Vec<JoinHandle<()>>>,
    stopped: AtomicBool,
}

impl TagService {
    /// Create the service and, when async is enabled, spawn its workers.
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(llm: Arc<LlmService>, config: TagServiceConfig) -> Self {
        let (event_tx, _) = broadcast::channel(defaults::TAG_EVENT_CAPACITY);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let shared = Arc::new(Shared {
            llm,
            cache: TagCache::new(config.cache_ttl, config.cache_size),
            limiter: RateLimiter::new(config.rate_limit, config.rate_window),
            jobs: RwLock::new(HashMap::new()),
            notifier: RwLock::new(None),
            event_tx,
            config,
        });

        let mut handles = Vec::new();
        let queue_tx = if shared.config.async_enabled {
            let (tx, rx) = mpsc::channel(shared.config.queue_size.max(1));
            let queue: JobQueue = Arc::new(tokio::sync::Mutex::new(rx));
            for worker in 0..shared.config.workers.max(1) {
                handles.push(tokio::spawn(run_worker(
                    shared.clone(),
                    worker,
                    queue.clone(),
                    shutdown_rx.clone(),
                )));
            }
            Some(tx)
        } else {
            None
        };

        info!(
            subsystem = "tags",
            component = "service",
            async_enabled = shared.config.async_enabled,
            workers = handles.len(),
            queue_size = shared.config.queue_size,
            rate_limit = shared.config.rate_limit,
            "Tag service started"
        );

        Self {
            shared,
            queue_tx: Mutex::new(queue_tx),
            shutdown_tx,
            workers: tokio::sync::Mutex::new(handles),
            stopped: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &TagServiceConfig {
        &self.shared.config
    }

    /// Suggest tags for `content`, consuming one quota slot for `user_id`.
    pub async fn suggest_tags(
        &self,
        user_id: i32,
        content: &str,
        existing_tags: &[String],
    ) -> Result<Vec<String>> {
        self.shared.limiter.check_and_increment(user_id)?;

        if let Some(tags) = self.shared.cache.get(content, existing_tags) {
            debug!(subsystem = "tags", component = "service", user_id, "Tag cache hit");
            return Ok(tags);
        }

        let tags = self.shared.request_tags(content, existing_tags).await?;
        self.shared
            .cache
            .insert(content, existing_tags, tags.clone());
        Ok(tags)
    }

    /// Queue a tag job for `memo_id` and return it without waiting.
    ///
    /// A cache hit returns a job that is already completed and never
    /// reaches the queue.
    pub async fn suggest_tags_async(
        &self,
        user_id: i32,
        memo_id: i32,
        content: &str,
        existing_tags: &[String],
    ) -> Result<TagJob> {
        if !self.shared.config.async_enabled {
            return Err(Error::FeatureDisabled(
                "async tag suggestions are disabled".to_string(),
            ));
        }
        if self.stopped.load(Ordering::SeqCst) {
            return Err(Error::ServiceStopped);
        }

        self.shared.limiter.check_and_increment(user_id)?;

        if let Some(tags) = self.shared.cache.get(content, existing_tags) {
            let job = TagJob::completed_from_cache(user_id, memo_id, content, existing_tags, tags);
            self.shared.store_job(job.clone());
            debug!(
                subsystem = "tags",
                component = "service",
                user_id,
                memo_id,
                job_id = %job.id,
                "Tag cache hit, job completed immediately"
            );
            return Ok(job);
        }

        let job = TagJob::pending(user_id, memo_id, content, existing_tags);
        self.shared.store_job(job.clone());

        let sender = self.queue_tx.lock().ok().and_then(|tx| tx.clone());
        let Some(sender) = sender else {
            self.shared.remove_job(&job.id);
            return Err(Error::ServiceStopped);
        };

        match sender.try_send(job.clone()) {
            Ok(()) => {
                debug!(
                    subsystem = "tags",
                    component = "service",
                    user_id,
                    memo_id,
                    job_id = %job.id,
                    "Tag job queued"
                );
                self.shared.emit(TagJobEvent::JobQueued {
                    job_id: job.id.clone(),
                });
                Ok(job)
            }
            Err(TrySendError::Full(_)) => {
                self.shared.remove_job(&job.id);
                warn!(
                    subsystem = "tags",
                    component = "service",
                    user_id,
                    memo_id,
                    queue_size = self.shared.config.queue_size,
                    "Tag job queue full"
                );
                Err(Error::QueueFull)
            }
            Err(TrySendError::Closed(_)) => {
                self.shared.remove_job(&job.id);
                Err(Error::ServiceStopped)
            }
        }
    }

    /// Copy of the job with `job_id`.
    pub fn get_job(&self, job_id: &str) -> Result<TagJob> {
        self.shared
            .jobs
            .read()
            .ok()
            .and_then(|jobs| jobs.get(job_id).cloned())
            .ok_or_else(|| Error::NotFound(format!("tag job {job_id}")))
    }

    pub fn job_count(&self) -> usize {
        self.shared.jobs.read().map(|j| j.len()).unwrap_or(0)
    }

    pub fn rate_limit_status(&self, user_id: i32) -> RateLimitStatus {
        self.shared.limiter.status(user_id)
    }

    pub fn clear_cache(&self) {
        self.shared.cache.clear();
        info!(subsystem = "tags", component = "cache", "Tag cache cleared");
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.shared.cache.stats()
    }

    /// Remove completed and failed jobs that finished more than `max_age`
    /// ago. Pending and running jobs are kept. Returns the removed count.
    ///
    /// Elapsed rate-limit windows are swept on the same pass.
    pub fn cleanup_expired_jobs(&self, max_age: Duration) -> usize {
        let max_age = chrono::Duration::from_std(max_age).unwrap_or(chrono::Duration::MAX);
        let cutoff = Utc::now()
            .checked_sub_signed(max_age)
            .unwrap_or(chrono::DateTime::<Utc>::MIN_UTC);

        let Ok(mut jobs) = self.shared.jobs.write() else {
            return 0;
        };
        let before = jobs.len();
        jobs.retain(|_, job| {
            !(job.is_terminal() && job.completed_at.is_some_and(|done| done < cutoff))
        });
        let removed = before - jobs.len();
        let remaining = jobs.len();
        drop(jobs);

        let windows_purged = self.shared.limiter.purge_expired();
        if removed > 0 || windows_purged > 0 {
            info!(
                subsystem = "tags",
                component = "service",
                removed,
                remaining,
                windows_purged,
                "Cleaned up expired tag jobs"
            );
        }
        removed
    }

    /// Install the completion notifier, replacing any previous one.
    pub fn set_notifier(&self, notifier: Arc<dyn TagJobNotifier>) {
        if let Ok(mut slot) = self.shared.notifier.write() {
            *slot = Some(notifier);
        }
    }

    pub fn events(&self) -> broadcast::Receiver<TagJobEvent> {
        self.shared.event_tx.subscribe()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Stop accepting async work and wait for every worker to exit.
    ///
    /// A job already being processed runs to completion; jobs still in
    /// the queue stay pending. Safe to call more than once.
    pub async fn stop(&self) {
        let first = !self.stopped.swap(true, Ordering::SeqCst);
        let _ = self.shutdown_tx.send(true);
        if let Ok(mut tx) = self.queue_tx.lock() {
            tx.take();
        }

        let mut workers = self.workers.lock().await;
        for handle in workers.drain(..) {
            if let Err(e) = handle.await {
                error!(subsystem = "tags", component = "worker", error = ?e, "Tag worker panicked");
            }
        }

        if first {
            info!(subsystem = "tags", component = "service", "Tag service stopped");
        }
    }
}
