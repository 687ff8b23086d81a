use super::{
    handler::{HashService, spawn_cancellable},
    routes::{HASH_PATH, HEALTH_PATH, router},
};
use crate::server::{
    broker::{BrokerFlush, PublishPolicy},
    dispatch::SubmissionQueue,
    testing::{MemoryLookup, MemoryPublisher},
};
use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use core::time::Duration;
use hashgate_core::{
    Coalescer, CoalescerConfig, Error, HashResponse, LookupError, digest,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

const HELLO_HASH: &str =
    "5M+jmj03vjHFlgnoB5cHmcqmihm/qhUTXxZQheAdQaZboeGxRq62vQCStJ6sIUwQPM+jo2WVS7vlL3Sis2IMlA==";

fn service_with(lookup: Arc<MemoryLookup>, window: Duration) -> (HashService, Arc<MemoryPublisher>) {
    let publisher = Arc::new(MemoryPublisher::default());
    let flush = BrokerFlush::new(
        publisher.clone(),
        PublishPolicy::default(),
        CancellationToken::new(),
    );
    let coalescer = Coalescer::new(CoalescerConfig::new(window), flush);
    let service = HashService::new(lookup, SubmissionQueue::new(coalescer, 64));
    (service, publisher)
}

fn service() -> (HashService, Arc<MemoryPublisher>) {
    service_with(
        Arc::new(
            MemoryLookup::default()
                .with(1, "alice")
                .with(2, "bob")
                .unavailable(99),
        ),
        Duration::from_millis(20),
    )
}

fn published(publisher: &MemoryPublisher) -> Vec<HashResponse> {
    publisher
        .bodies()
        .iter()
        .flat_map(|body| serde_json::from_slice::<Vec<HashResponse>>(body).unwrap())
        .collect()
}

fn post_hash(body: &str) -> Request<Body> {
    Request::post(HASH_PATH)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn handle_joins_lookup_and_digest() {
    let (service, _) = service();

    let response = service
        .handle(br#"{"ID": 1, "Data": "hello"}"#)
        .await
        .unwrap();

    assert_eq!(response.name, "alice");
    assert_eq!(response.hash, HELLO_HASH);
}

#[tokio::test]
async fn lookup_failures_fail_the_request() {
    let (service, publisher) = service();

    let missing = service.handle(br#"{"ID": 7, "Data": "x"}"#).await;
    assert!(matches!(
        missing,
        Err(Error::Lookup(LookupError::NotFound { id: 7 }))
    ));

    let down = service.handle(br#"{"ID": 99, "Data": "x"}"#).await;
    assert!(matches!(down, Err(Error::Lookup(LookupError::Unavailable(_)))));

    service.shutdown().await.unwrap();
    assert!(published(&publisher).is_empty());
}

#[tokio::test]
async fn malformed_bodies_are_decode_errors() {
    let (service, _) = service();

    let bodies: [&[u8]; 3] = [b"not json", br#"{"ID": 1}"#, br#"{"ID": "one", "Data": ""}"#];
    for body in bodies {
        assert!(matches!(
            service.handle(body).await,
            Err(Error::Decode(_))
        ));
    }
}

#[tokio::test]
async fn every_success_is_published_in_order() {
    let (service, publisher) = service();

    let first = service.handle(br#"{"ID": 1, "Data": "a"}"#).await.unwrap();
    let second = service.handle(br#"{"ID": 2, "Data": "b"}"#).await.unwrap();
    let third = service.handle(br#"{"ID": 1, "Data": "a"}"#).await.unwrap();
    service.shutdown().await.unwrap();

    assert_eq!(published(&publisher), vec![first, second, third]);
}

#[tokio::test]
async fn requests_after_shutdown_are_refused() {
    let (service, _) = service();
    service.shutdown().await.unwrap();

    assert!(!service.is_serving());
    assert!(matches!(
        service.handle(br#"{"ID": 1, "Data": "a"}"#).await,
        Err(Error::ServiceShutdown)
    ));
}

#[tokio::test(start_paused = true)]
async fn cancelled_token_abandons_the_task() {
    let token = CancellationToken::new();
    let task = spawn_cancellable(token.clone(), async {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok::<(), Error>(())
    });

    token.cancel();

    assert!(matches!(task.await.unwrap(), Err(Error::RequestCancelled)));
}

#[tokio::test(start_paused = true)]
async fn dropped_request_cancels_its_lookup() {
    let lookup = Arc::new(
        MemoryLookup::default()
            .with(1, "alice")
            .delayed(Duration::from_secs(60)),
    );
    let (service, publisher) = service_with(lookup.clone(), Duration::ZERO);

    let abandoned = tokio::time::timeout(
        Duration::from_millis(10),
        service.handle(br#"{"ID": 1, "Data": "a"}"#),
    )
    .await;
    assert!(abandoned.is_err());

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(lookup.completed(), 0);

    service.shutdown().await.unwrap();
    assert!(published(&publisher).is_empty());
}

#[tokio::test]
async fn hash_route_sets_content_headers() {
    let (service, _) = service();
    let app = router(service);

    let response = app
        .oneshot(post_hash(r#"{"ID": 2, "Data": "hello"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );
    assert_eq!(response.headers()[header::CONTENT_ENCODING], "utf-8");

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["Name"], "bob");
    assert_eq!(json["Hash"], digest(b"hello"));
}

#[tokio::test]
async fn hash_route_reports_errors_as_plain_text() {
    let (service, _) = service();
    let app = router(service);

    let response = app.oneshot(post_hash(r#"{"ID": 7"#)).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(
        response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/plain")
    );
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(String::from_utf8_lossy(&body).starts_with("Decode error"));
}

#[tokio::test]
async fn unknown_client_is_a_server_error() {
    let (service, _) = service();

    let response = router(service)
        .oneshot(post_hash(r#"{"ID": 5, "Data": "x"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test(start_paused = true)]
async fn slow_lookups_are_awaited_without_a_deadline() {
    let lookup = Arc::new(
        MemoryLookup::default()
            .with(1, "alice")
            .delayed(Duration::from_secs(11)),
    );
    let (service, publisher) = service_with(lookup, Duration::from_millis(20));

    let response = router(service)
        .oneshot(post_hash(r#"{"ID": 1, "Data": "hello"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["Name"], "alice");

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(published(&publisher).len(), 1);
}

#[tokio::test]
async fn health_flips_once_shutdown_begins() {
    let (service, _) = service();
    let app = router(service.clone());
    let health = || Request::get(HEALTH_PATH).body(Body::empty()).unwrap();

    let serving = app.clone().oneshot(health()).await.unwrap();
    assert_eq!(serving.status(), StatusCode::OK);

    service.begin_shutdown();

    let stopping = app.clone().oneshot(health()).await.unwrap();
    assert_eq!(stopping.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = to_bytes(stopping.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"NOT_SERVING");

    let refused = app.oneshot(post_hash(r#"{"ID": 1, "Data": "a"}"#)).await.unwrap();
    assert_eq!(refused.status(), StatusCode::SERVICE_UNAVAILABLE);
}
