use crate::helpers::doubles::RecordingSink;
use crate::helpers::fixtures::{feed, item, sources};
use crate::helpers::TestContext;
use chrono::Utc;
use feedwatch::controllers::health::HealthState;
use feedwatch::domain::poll::{PollDispatcher, PollService, ProcessOptions};
use feedwatch::infrastructure::http::request_id::X_REQUEST_ID;
use feedwatch::infrastructure::http::router;
use feedwatch::infrastructure::repositories::InMemorySourceRepository;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

async fn spawn_server(poll_service: Arc<PollService>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(HealthState {
        pool: None,
        poll_service,
    });

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

#[tokio::test]
async fn it_should_answer_liveness_with_request_id() {
    let ctx = TestContext::new();
    let poll_service = Arc::new(PollService::new(
        Arc::new(InMemorySourceRepository::new()),
        PollDispatcher::new(ctx.processor.clone(), 1),
        ctx.observed.clone(),
        Arc::new(RecordingSink::default()),
        ProcessOptions::default(),
    ));
    let base_url = spawn_server(poll_service).await;

    let response = reqwest::get(format!("{}/health", base_url)).await.unwrap();

    assert_eq!(response.status(), 200);
    assert!(response.headers().contains_key(X_REQUEST_ID));
    assert_eq!(response.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn it_should_report_last_cycle_in_readiness() {
    let ctx = TestContext::new();
    ctx.feeds
        .set_feed("source-0", feed(vec![item("a", Utc::now())]));
    let poll_service = Arc::new(PollService::new(
        Arc::new(InMemorySourceRepository::with_sources(sources(1))),
        PollDispatcher::new(ctx.processor.clone(), 1),
        ctx.observed.clone(),
        Arc::new(RecordingSink::default()),
        ProcessOptions::default(),
    ));
    poll_service
        .run_cycle(&CancellationToken::new())
        .await
        .unwrap();
    let base_url = spawn_server(poll_service).await;

    let body: serde_json::Value = reqwest::get(format!("{}/health/ready", base_url))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["status"], "ready");
    assert_eq!(body["store"], "memory");
    assert_eq!(body["observed_items"], 1);
    assert_eq!(body["last_cycle"]["surfaced"], 1);
    assert!(body["last_refreshed_at"].is_string());
}
