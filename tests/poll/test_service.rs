use crate::helpers::doubles::RecordingSink;
use crate::helpers::fixtures::{feed, hours_ago, item, sources};
use crate::helpers::TestContext;
use chrono::Utc;
use feedwatch::domain::poll::{PollDispatcher, PollService, ProcessOptions};
use feedwatch::infrastructure::repositories::InMemorySourceRepository;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn service(ctx: &TestContext, sink: Arc<RecordingSink>, count: usize) -> PollService {
    PollService::new(
        Arc::new(InMemorySourceRepository::with_sources(sources(count))),
        PollDispatcher::new(ctx.processor.clone(), 2),
        ctx.observed.clone(),
        sink,
        ProcessOptions::default(),
    )
}

#[tokio::test]
async fn it_should_notify_surfaced_items_newest_first() {
    let now = Utc::now();
    let ctx = TestContext::new();
    ctx.feeds
        .set_feed("source-0", feed(vec![item("older", hours_ago(now, 5))]));
    ctx.feeds
        .set_feed("source-1", feed(vec![item("newer", hours_ago(now, 1))]));
    ctx.feeds.fail("source-2");
    let sink = Arc::new(RecordingSink::default());
    let service = service(&ctx, sink.clone(), 4);

    let summary = service.run_cycle(&CancellationToken::new()).await.unwrap();

    assert_eq!(summary.sources, 4);
    assert_eq!(summary.processed, 3);
    assert_eq!(summary.errored, 1);
    assert_eq!(summary.surfaced, 2);
    assert_eq!(service.last_summary(), Some(summary));

    let batches = sink.batches();
    assert_eq!(batches.len(), 1);
    let ids: Vec<_> = batches[0].iter().map(|s| s.item.id.as_str()).collect();
    assert_eq!(ids, vec!["newer", "older"]);
    assert_eq!(batches[0][0].source_title, "Source 1");

    assert!(ctx.observed.last_refreshed_at().is_some());
}

#[tokio::test]
async fn it_should_not_notify_when_nothing_is_new() {
    let ctx = TestContext::new();
    let sink = Arc::new(RecordingSink::default());
    let service = service(&ctx, sink.clone(), 2);

    let summary = service.run_cycle(&CancellationToken::new()).await.unwrap();

    assert_eq!(summary.processed, 2);
    assert_eq!(summary.surfaced, 0);
    assert!(sink.batches().is_empty());
}

#[tokio::test]
async fn it_should_survive_sink_failure() {
    let ctx = TestContext::new();
    ctx.feeds
        .set_feed("source-0", feed(vec![item("a", Utc::now())]));
    let sink = Arc::new(RecordingSink::failing());
    let service = service(&ctx, sink.clone(), 1);

    let summary = service.run_cycle(&CancellationToken::new()).await.unwrap();

    assert_eq!(summary.surfaced, 1);
    assert_eq!(sink.batches().len(), 1);
}

#[tokio::test]
async fn it_should_not_mark_refresh_for_cancelled_cycle() {
    let ctx = TestContext::new();
    let sink = Arc::new(RecordingSink::default());
    let service = service(&ctx, sink.clone(), 3);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let summary = service.run_cycle(&cancel).await.unwrap();

    assert_eq!(summary.cancelled, 3);
    assert_eq!(summary.processed, 0);
    assert!(ctx.observed.last_refreshed_at().is_none());
    assert!(sink.batches().is_empty());
}

#[tokio::test(start_paused = true)]
async fn it_should_poll_on_interval_until_cancelled() {
    let ctx = TestContext::new();
    let sink = Arc::new(RecordingSink::default());
    let service = Arc::new(service(&ctx, sink, 1));
    let cancel = CancellationToken::new();

    let handle = tokio::spawn({
        let service = service.clone();
        let cancel = cancel.clone();
        async move { service.run(cancel, Duration::from_secs(60)).await }
    });

    tokio::time::sleep(Duration::from_secs(150)).await;
    cancel.cancel();
    handle.await.unwrap();

    // ticks at 0s, 60s and 120s
    assert_eq!(ctx.feeds.calls(), 3);
    assert!(service.last_summary().is_some());
}
