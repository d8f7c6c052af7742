
use doubles::{FlakyCheckpointRepository, RecordingEnrichment, StubFeedClient};
use feedwatch::domain::enrichment::EnrichmentService;
use feedwatch::domain::observed::ObservedItemCache;
use feedwatch::domain::poll::SourceProcessor;
use std::sync::Arc;

/// A processor over test doubles, with handles kept for assertions.
pub struct TestContext {
    pub feeds: Arc<StubFeedClient>,
    pub checkpoints: Arc<FlakyCheckpointRepository>,
    pub observed: Arc<ObservedItemCache>,
    pub processor: Arc<SourceProcessor>,
}

impl TestContext {
    pub fn new() -> Self {
        Self::build(
            StubFeedClient::new(),
            FlakyCheckpointRepository::default(),
            Arc::new(RecordingEnrichment::default()),
        )
    }

    pub fn build(
        feeds: StubFeedClient,
        checkpoints: FlakyCheckpointRepository,
        enrichment: Arc<dyn EnrichmentService>,
    ) -> Self {
        let feeds = Arc::new(feeds);
        let checkpoints = Arc::new(checkpoints);
        let observed = Arc::new(ObservedItemCache::default());
        let processor = Arc::new(SourceProcessor::new(
            feeds.clone(),
            checkpoints.clone(),
            observed.clone(),
            enrichment,
        ));

        Self {
            feeds,
            checkpoints,
            observed,
            processor,
        }
    }
}
