use crate::helpers::doubles::{
    FailingEnrichment, FlakyCheckpointRepository, RecordingEnrichment, StubFeedClient,
};
use crate::helpers::fixtures::{feed, hours_ago, item};
use crate::helpers::TestContext;
use chrono::Utc;
use feedwatch::domain::poll::{ProcessOptions, SourceError};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const SOURCE: &str = "UC-rust";

#[tokio::test]
async fn it_should_surface_newest_item_and_advance_checkpoint() {
    let now = Utc::now();
    let enrichment = Arc::new(RecordingEnrichment::default());
    let ctx = TestContext::build(
        StubFeedClient::new(),
        FlakyCheckpointRepository::default(),
        enrichment.clone(),
    );
    ctx.checkpoints.seed(SOURCE, hours_ago(now, 24));
    ctx.feeds.set_feed(
        SOURCE,
        feed(vec![
            item("B", hours_ago(now, 2)),
            item("A", hours_ago(now, 1)),
            item("C", hours_ago(now, 30)),
        ]),
    );

    let result = ctx
        .processor
        .process(&CancellationToken::new(), SOURCE, ProcessOptions::default())
        .await;

    assert_eq!(result.source_id, SOURCE);
    assert_eq!(result.item().map(|i| i.id.as_str()), Some("A"));
    assert_eq!(ctx.checkpoints.stored(SOURCE), Some(hours_ago(now, 1)));
    assert_eq!(enrichment.seen(), vec!["B", "A"]);

    // old items stay browsable
    let mut observed: Vec<_> = ctx
        .observed
        .get_all()
        .into_iter()
        .map(|c| c.item.id)
        .collect();
    observed.sort();
    assert_eq!(observed, vec!["A", "B", "C"]);
}

#[tokio::test]
async fn it_should_report_nothing_when_no_item_is_newer_than_checkpoint() {
    let now = Utc::now();
    let ctx = TestContext::new();
    ctx.checkpoints.seed(SOURCE, now);
    ctx.feeds.set_feed(
        SOURCE,
        feed(vec![item("A", now), item("B", hours_ago(now, 3))]),
    );

    let result = ctx
        .processor
        .process(&CancellationToken::new(), SOURCE, ProcessOptions::default())
        .await;

    assert!(result.item().is_none());
    assert!(result.error().is_none());
    assert_eq!(ctx.checkpoints.stored(SOURCE), Some(now));
    assert_eq!(ctx.checkpoints.writes(), 0);
}

#[tokio::test]
async fn it_should_never_move_checkpoint_backwards() {
    let now = Utc::now();
    let ctx = TestContext::new();
    let cancel = CancellationToken::new();

    ctx.feeds
        .set_feed(SOURCE, feed(vec![item("A", hours_ago(now, 1))]));
    ctx.processor
        .process(&cancel, SOURCE, ProcessOptions::default())
        .await;
    let first = ctx.checkpoints.stored(SOURCE);
    assert_eq!(first, Some(hours_ago(now, 1)));

    // feed now only carries older entries
    ctx.feeds
        .set_feed(SOURCE, feed(vec![item("Z", hours_ago(now, 5))]));
    let result = ctx
        .processor
        .process(&cancel, SOURCE, ProcessOptions::default())
        .await;
    assert!(result.item().is_none());
    assert_eq!(ctx.checkpoints.stored(SOURCE), first);

    ctx.feeds.set_feed(SOURCE, feed(vec![item("N", now)]));
    ctx.processor
        .process(&cancel, SOURCE, ProcessOptions::default())
        .await;
    assert!(ctx.checkpoints.stored(SOURCE) > first);
}

#[tokio::test]
async fn it_should_leave_checkpoint_untouched_when_ignoring_it() {
    let now = Utc::now();
    let ctx = TestContext::new();
    ctx.checkpoints.seed(SOURCE, now);
    ctx.feeds.set_feed(
        SOURCE,
        feed(vec![item("A", hours_ago(now, 1)), item("B", hours_ago(now, 48))]),
    );

    let result = ctx
        .processor
        .process(
            &CancellationToken::new(),
            SOURCE,
            ProcessOptions {
                ignore_checkpoint: true,
                max_items: 0,
            },
        )
        .await;

    assert_eq!(result.item().map(|i| i.id.as_str()), Some("A"));
    assert_eq!(ctx.checkpoints.stored(SOURCE), Some(now));
    assert_eq!(ctx.checkpoints.writes(), 0);
}

#[tokio::test]
async fn it_should_surface_item_when_enrichment_fails() {
    let now = Utc::now();
    let ctx = TestContext::build(
        StubFeedClient::new(),
        FlakyCheckpointRepository::default(),
        Arc::new(FailingEnrichment),
    );
    ctx.checkpoints.seed(SOURCE, hours_ago(now, 24));
    ctx.feeds
        .set_feed(SOURCE, feed(vec![item("A", hours_ago(now, 1))]));

    let result = ctx
        .processor
        .process(&CancellationToken::new(), SOURCE, ProcessOptions::default())
        .await;

    let surfaced = result.item().expect("item surfaced");
    assert_eq!(surfaced.id, "A");
    assert!(surfaced.details.is_empty());
    assert_eq!(surfaced.media.description.as_deref(), Some("About A"));
    assert_eq!(ctx.checkpoints.stored(SOURCE), Some(hours_ago(now, 1)));
}

#[tokio::test]
async fn it_should_not_touch_cache_or_checkpoint_when_fetch_fails() {
    let now = Utc::now();
    let ctx = TestContext::new();
    ctx.checkpoints.seed(SOURCE, hours_ago(now, 24));
    ctx.feeds.set_feed(SOURCE, feed(vec![item("A", now)]));
    ctx.feeds.fail(SOURCE);

    let result = ctx
        .processor
        .process(&CancellationToken::new(), SOURCE, ProcessOptions::default())
        .await;

    assert!(matches!(result.error(), Some(SourceError::Fetch(_))));
    assert!(ctx.observed.is_empty());
    assert_eq!(ctx.checkpoints.writes(), 0);
    assert_eq!(ctx.checkpoints.stored(SOURCE), Some(hours_ago(now, 24)));
}

#[tokio::test]
async fn it_should_treat_unreadable_checkpoint_as_never_checked() {
    let now = Utc::now();
    let ctx = TestContext::build(
        StubFeedClient::new(),
        FlakyCheckpointRepository::failing_reads(),
        Arc::new(RecordingEnrichment::default()),
    );
    ctx.feeds.set_feed(
        SOURCE,
        feed(vec![item("old", hours_ago(now, 500)), item("A", hours_ago(now, 2))]),
    );

    let result = ctx
        .processor
        .process(&CancellationToken::new(), SOURCE, ProcessOptions::default())
        .await;

    assert_eq!(result.item().map(|i| i.id.as_str()), Some("A"));
    assert_eq!(ctx.checkpoints.writes(), 1);
    assert_eq!(ctx.checkpoints.stored(SOURCE), Some(hours_ago(now, 2)));
}

#[tokio::test]
async fn it_should_not_move_checkpoint_back_when_read_fails() {
    let now = Utc::now();
    let ctx = TestContext::build(
        StubFeedClient::new(),
        FlakyCheckpointRepository::failing_reads(),
        Arc::new(RecordingEnrichment::default()),
    );
    ctx.checkpoints.seed(SOURCE, hours_ago(now, 1));
    ctx.feeds
        .set_feed(SOURCE, feed(vec![item("old", hours_ago(now, 5))]));

    ctx.processor
        .process(&CancellationToken::new(), SOURCE, ProcessOptions::default())
        .await;

    assert_eq!(ctx.checkpoints.stored(SOURCE), Some(hours_ago(now, 1)));
}

#[tokio::test]
async fn it_should_keep_result_when_checkpoint_write_fails() {
    let now = Utc::now();
    let ctx = TestContext::build(
        StubFeedClient::new(),
        FlakyCheckpointRepository::failing_writes(),
        Arc::new(RecordingEnrichment::default()),
    );
    ctx.feeds
        .set_feed(SOURCE, feed(vec![item("A", hours_ago(now, 1))]));

    let result = ctx
        .processor
        .process(&CancellationToken::new(), SOURCE, ProcessOptions::default())
        .await;

    assert_eq!(result.item().map(|i| i.id.as_str()), Some("A"));
    assert_eq!(ctx.checkpoints.writes(), 1);
    assert_eq!(ctx.checkpoints.stored(SOURCE), None);
}

#[tokio::test]
async fn it_should_stop_scanning_at_item_cap() {
    let now = Utc::now();
    let enrichment = Arc::new(RecordingEnrichment::default());
    let ctx = TestContext::build(
        StubFeedClient::new(),
        FlakyCheckpointRepository::default(),
        enrichment.clone(),
    );
    ctx.checkpoints.seed(SOURCE, hours_ago(now, 24));
    ctx.feeds.set_feed(
        SOURCE,
        feed(vec![
            item("C", hours_ago(now, 3)),
            item("B", hours_ago(now, 2)),
            item("A", hours_ago(now, 1)),
        ]),
    );

    let result = ctx
        .processor
        .process(
            &CancellationToken::new(),
            SOURCE,
            ProcessOptions {
                ignore_checkpoint: false,
                max_items: 2,
            },
        )
        .await;

    // A lies past the cap: not enriched, not counted, not cached this cycle
    assert_eq!(result.item().map(|i| i.id.as_str()), Some("B"));
    assert_eq!(enrichment.seen(), vec!["C", "B"]);
    assert_eq!(ctx.checkpoints.stored(SOURCE), Some(hours_ago(now, 2)));
    assert!(ctx.observed.get("A").is_none());
}

#[tokio::test]
async fn it_should_store_enriched_details_in_observed_cache() {
    let now = Utc::now();
    let ctx = TestContext::new();
    ctx.feeds.set_feed(
        SOURCE,
        feed(vec![item("A", hours_ago(now, 1))]),
    );

    let result = ctx
        .processor
        .process(&CancellationToken::new(), SOURCE, ProcessOptions::default())
        .await;

    let cached = ctx.observed.get("A").expect("cached");
    assert_eq!(cached.source_id, SOURCE);
    assert_eq!(cached.item.details.summary.as_deref(), Some("Summary of A"));
    assert_eq!(
        result.item().and_then(|i| i.details.duration_secs),
        Some(60)
    );
}

#[tokio::test]
async fn it_should_keep_user_flags_across_refetch() {
    let now = Utc::now();
    let ctx = TestContext::new();
    let cancel = CancellationToken::new();

    ctx.feeds
        .set_feed(SOURCE, feed(vec![item("A", hours_ago(now, 1))]));
    ctx.processor
        .process(&cancel, SOURCE, ProcessOptions::default())
        .await;

    assert!(ctx.observed.set_watched("A"));
    assert!(ctx.observed.set_to_watch("A"));

    let mut renamed = item("A", hours_ago(now, 1));
    renamed.title = "Renamed".to_string();
    ctx.feeds.set_feed(SOURCE, feed(vec![renamed]));
    ctx.processor
        .process(&cancel, SOURCE, ProcessOptions::default())
        .await;

    let cached = ctx.observed.get("A").expect("cached");
    assert_eq!(cached.item.title, "Renamed");
    assert!(cached.watched);
    assert!(cached.to_watch);
    // enrichment from the first cycle survives the bare re-fetch
    assert_eq!(cached.item.details.summary.as_deref(), Some("Summary of A"));
}

#[tokio::test]
async fn it_should_report_cancellation_without_mutating_checkpoint() {
    let now = Utc::now();
    let ctx = TestContext::new();
    ctx.feeds.set_feed(SOURCE, feed(vec![item("A", now)]));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = ctx
        .processor
        .process(&cancel, SOURCE, ProcessOptions::default())
        .await;

    assert!(matches!(result.error(), Some(SourceError::Cancelled)));
    assert_eq!(ctx.checkpoints.writes(), 0);
}
