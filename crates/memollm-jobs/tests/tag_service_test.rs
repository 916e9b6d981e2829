//! TagService behavior against an in-process mock provider.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use memollm_core::{Error, ProviderType};
use memollm_inference::mock::MockProvider;
use memollm_inference::LlmService;
use memollm_jobs::{TagJob, TagJobEvent, TagJobNotifier, TagJobStatus, TagService, TagServiceConfig};
use tokio::sync::broadcast;

fn tags(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn service_with(mock: &MockProvider, config: TagServiceConfig) -> TagService {
    let llm = Arc::new(LlmService::new());
    llm.register_provider(Arc::new(mock.clone())).unwrap();
    TagService::new(llm, config)
}

/// Wait for the first event matching `pred`, bounded by a few seconds.
async fn wait_for<F>(events: &mut broadcast::Receiver<TagJobEvent>, pred: F) -> TagJobEvent
where
    F: Fn(&TagJobEvent) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let event = events.recv().await.unwrap();
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .expect("event not received in time")
}

#[derive(Default)]
struct RecordingNotifier {
    seen: Mutex<Vec<TagJob>>,
}

#[async_trait]
impl TagJobNotifier for RecordingNotifier {
    async fn job_finished(&self, job: &TagJob) {
        self.seen.lock().unwrap().push(job.clone());
    }
}

#[tokio::test]
async fn test_meeting_notes_tags_and_cache_hit() {
    let mock = MockProvider::of_type(ProviderType::OpenAI).with_tags(["meeting", "project", "notes"]);
    let service = service_with(&mock, TagServiceConfig::default().with_max_tags(5));

    let first = service
        .suggest_tags(1, "Meeting notes for project Alpha", &[])
        .await
        .unwrap();
    assert_eq!(first, tags(&["meeting", "project", "notes"]));
    assert_eq!(mock.total_calls(), 1);

    let second = service
        .suggest_tags(1, "Meeting notes for project Alpha", &[])
        .await
        .unwrap();
    assert_eq!(second, first);
    assert_eq!(mock.total_calls(), 1);

    service.stop().await;
}

#[tokio::test]
async fn test_existing_tag_order_is_part_of_cache_key() {
    let mock = MockProvider::new().with_tags(["x"]);
    let service = service_with(&mock, TagServiceConfig::default());

    service.suggest_tags(1, "c", &tags(&["a", "b"])).await.unwrap();
    service.suggest_tags(1, "c", &tags(&["b", "a"])).await.unwrap();
    assert_eq!(mock.call_count("suggest_tags"), 2);
    assert_eq!(service.cache_stats().size, 2);

    service.stop().await;
}

#[tokio::test]
async fn test_rate_limit_is_per_user() {
    let mock = MockProvider::new().with_tags(["x"]);
    let config = TagServiceConfig::default().with_rate_limit(3, Duration::from_secs(60));
    let service = service_with(&mock, config);

    for _ in 0..3 {
        service.suggest_tags(1, "c", &[]).await.unwrap();
    }
    let err = service.suggest_tags(1, "c", &[]).await.unwrap_err();
    assert!(matches!(err, Error::QuotaExceeded));

    service.suggest_tags(2, "c", &[]).await.unwrap();
    assert_eq!(service.rate_limit_status(1).remaining, 0);
    assert_eq!(service.rate_limit_status(2).remaining, 2);
    assert_eq!(service.rate_limit_status(3).remaining, 3);

    service.stop().await;
}

#[tokio::test]
async fn test_async_job_runs_through_lifecycle() {
    let mock = MockProvider::new()
        .with_tags(["alpha", "beta"])
        .with_latency_ms(200);
    let service = service_with(&mock, TagServiceConfig::default().with_workers(1));
    let notifier = Arc::new(RecordingNotifier::default());
    service.set_notifier(notifier.clone());
    let mut events = service.events();

    let job = service
        .suggest_tags_async(1, 42, "Sprint retro", &[])
        .await
        .unwrap();
    assert_eq!(job.status, TagJobStatus::Pending);
    assert_eq!(job.memo_id, 42);

    wait_for(&mut events, |e| matches!(e, TagJobEvent::JobStarted { .. })).await;
    assert_eq!(service.get_job(&job.id).unwrap().status, TagJobStatus::Running);

    let done = wait_for(&mut events, |e| matches!(e, TagJobEvent::JobCompleted { .. })).await;
    assert_eq!(
        done,
        TagJobEvent::JobCompleted {
            job_id: job.id.clone(),
            tag_count: 2
        }
    );

    let finished = service.get_job(&job.id).unwrap();
    assert_eq!(finished.status, TagJobStatus::Completed);
    assert_eq!(finished.result, Some(tags(&["alpha", "beta"])));
    assert!(finished.completed_at.is_some());

    service.stop().await;
    let seen = notifier.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].id, job.id);

    // The worker cached the result, so a sync call does not reach the provider.
    drop(seen);
    let calls = mock.call_count("suggest_tags");
    service.suggest_tags(1, "Sprint retro", &[]).await.unwrap();
    assert_eq!(mock.call_count("suggest_tags"), calls);
}

#[tokio::test]
async fn test_async_job_failure_is_recorded() {
    let mock = MockProvider::new().with_failure(|| Error::InvalidApiKey);
    let service = service_with(&mock, TagServiceConfig::default());
    let mut events = service.events();

    let job = service.suggest_tags_async(1, 7, "c", &[]).await.unwrap();
    wait_for(&mut events, |e| matches!(e, TagJobEvent::JobFailed { .. })).await;

    let failed = service.get_job(&job.id).unwrap();
    assert_eq!(failed.status, TagJobStatus::Failed);
    assert_eq!(failed.error.as_deref(), Some("Invalid API key"));
    assert!(failed.result.is_none());
    assert_eq!(service.cache_stats().size, 0);

    service.stop().await;
}

#[tokio::test]
async fn test_async_cache_hit_completes_without_queue() {
    let mock = MockProvider::new().with_tags(["cached"]);
    let service = service_with(&mock, TagServiceConfig::default());

    service.suggest_tags(1, "c", &[]).await.unwrap();
    let job = service.suggest_tags_async(1, 9, "c", &[]).await.unwrap();
    assert_eq!(job.status, TagJobStatus::Completed);
    assert_eq!(job.result, Some(tags(&["cached"])));
    assert_eq!(service.get_job(&job.id).unwrap(), job);
    assert_eq!(mock.call_count("suggest_tags"), 1);

    service.stop().await;
}

#[tokio::test]
async fn test_full_queue_fails_fast() {
    let mock = MockProvider::new().with_tags(["x"]).with_latency_ms(500);
    let config = TagServiceConfig::default().with_workers(1).with_queue_size(1);
    let service = service_with(&mock, config);

    // suggest_tags_async never yields, so the worker cannot drain the queue in between.
    let queued = service.suggest_tags_async(1, 1, "first", &[]).await.unwrap();
    let err = service
        .suggest_tags_async(1, 2, "second", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::QueueFull));
    assert_eq!(service.job_count(), 1);
    assert!(service.get_job(&queued.id).is_ok());

    service.stop().await;
}

#[tokio::test]
async fn test_cleanup_only_removes_old_terminal_jobs() {
    let mock = MockProvider::new().with_tags(["x"]);
    let service = service_with(&mock, TagServiceConfig::default());
    let mut events = service.events();

    let done = service.suggest_tags_async(1, 1, "done", &[]).await.unwrap();
    wait_for(&mut events, |e| matches!(e, TagJobEvent::JobCompleted { .. })).await;
    assert_eq!(service.cleanup_expired_jobs(Duration::from_secs(3600)), 0);

    service.stop().await;

    // A slow provider keeps this job in flight while cleanup runs.
    let slow = MockProvider::new().with_tags(["y"]).with_latency_ms(10_000);
    let busy = service_with(&slow, TagServiceConfig::default().with_workers(1));
    let pending = busy.suggest_tags_async(1, 2, "pending", &[]).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(busy.cleanup_expired_jobs(Duration::ZERO), 0);
    assert!(busy.get_job(&pending.id).is_ok());

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(service.cleanup_expired_jobs(Duration::ZERO), 1);
    assert!(service.get_job(&done.id).is_err());
    assert_eq!(service.job_count(), 0);
}

#[tokio::test]
async fn test_stop_waits_for_workers() {
    let mock = MockProvider::new().with_tags(["x"]);
    let service = service_with(&mock, TagServiceConfig::default().with_workers(3));
    let mut events = service.events();

    service.stop().await;
    let mut stopped = 0;
    while let Ok(event) = events.try_recv() {
        if matches!(event, TagJobEvent::WorkerStopped { .. }) {
            stopped += 1;
        }
    }
    assert_eq!(stopped, 3);

    let err = service.suggest_tags_async(1, 1, "c", &[]).await.unwrap_err();
    assert!(matches!(err, Error::ServiceStopped));
    // Synchronous suggestions do not depend on the worker pool.
    assert_eq!(service.suggest_tags(1, "c", &[]).await.unwrap(), tags(&["x"]));
}
