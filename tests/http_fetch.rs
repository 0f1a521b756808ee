//! End-to-end tests against a local mock HTTP server
//!
//! Exercise the real reqwest-backed fetcher and the full download manager:
//! pacing, backoff after a server error, cache write-through and callback
//! delivery.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use bulk_fetcher::app::{
    ClientConfig, DownloadManager, Fetcher, HttpFetcher, ManagerConfig, ResponseMeta, Session,
};
use bulk_fetcher::errors::TransportError;

type Deliveries = Arc<Mutex<Vec<(Option<u16>, Bytes)>>>;

fn fast_config(base: &str) -> ManagerConfig {
    ManagerConfig::default()
        .with_base_url(base)
        .with_worker_count(2)
        .with_throttle(Duration::from_millis(10))
        .with_cache_dir(None)
        .with_backoff(Duration::from_millis(100), Duration::from_millis(50))
        .with_drain_timing(Duration::from_millis(30), Duration::from_millis(150))
        .with_poll_intervals(Duration::from_millis(20), Duration::from_millis(20))
        .with_progress(false)
}

fn collect(
    deliveries: &Deliveries,
) -> impl Fn(Option<ResponseMeta>, Bytes) -> anyhow::Result<()> + Send + Sync + 'static {
    let deliveries = Arc::clone(deliveries);
    move |meta, body| {
        deliveries.lock().push((meta.map(|m| m.status), body));
        Ok(())
    }
}

#[tokio::test]
async fn test_http_fetcher_returns_body_and_meta() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/plain")
                .set_body_string("hello"),
        )
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(ClientConfig::default()).unwrap();
    let url = Url::parse(&format!("{}/page", server.uri())).unwrap();
    let response = fetcher.fetch(&url, &Session::new()).await.unwrap();

    assert_eq!(response.meta.status, 200);
    assert_eq!(response.body, Bytes::from_static(b"hello"));
    assert_eq!(
        response
            .meta
            .headers
            .get("content-type")
            .and_then(|v| v.to_str().ok()),
        Some("text/plain")
    );
}

#[tokio::test]
async fn test_http_fetcher_maps_server_error_to_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(ClientConfig::default()).unwrap();
    let url = Url::parse(&format!("{}/broken", server.uri())).unwrap();
    let err = fetcher.fetch(&url, &Session::new()).await.unwrap_err();

    assert!(matches!(err, TransportError::Status { status: 503, .. }));
    assert_eq!(err.status(), Some(503));
}

#[tokio::test]
async fn test_manager_retries_after_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("recovered"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/steady"))
        .respond_with(ResponseTemplate::new(200).set_body_string("steady"))
        .mount(&server)
        .await;

    let manager = DownloadManager::new(fast_config(&server.uri())).await.unwrap();
    let deliveries: Deliveries = Arc::new(Mutex::new(Vec::new()));

    manager.download("/flaky", collect(&deliveries)).unwrap();
    manager.download("steady", collect(&deliveries)).unwrap();

    let outcome = manager.wait_until_drained().await;
    assert!(outcome.is_drained());

    let delivered = deliveries.lock().clone();
    assert_eq!(delivered.len(), 2);
    assert!(delivered
        .iter()
        .any(|(status, body)| *status == Some(200) && body == &Bytes::from_static(b"recovered")));

    let stats = manager.stats();
    assert_eq!(stats.transport_errors, 1);
    assert_eq!(stats.delivered, 2);

    let requests = server.received_requests().await.unwrap_or_default();
    let flaky = requests.iter().filter(|r| r.url.path() == "/flaky").count();
    assert_eq!(flaky, 2);

    manager.shutdown().await;
}

#[tokio::test]
async fn test_manager_serves_second_run_from_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_string("a,b\n1,2\n"))
        .expect(1)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let config = fast_config(&server.uri()).with_cache_dir(Some(temp_dir.path().to_path_buf()));

    for expected_status in [Some(200), None] {
        let manager = DownloadManager::new(config.clone()).await.unwrap();
        let deliveries: Deliveries = Arc::new(Mutex::new(Vec::new()));

        manager.download("/data.csv", collect(&deliveries)).unwrap();
        assert!(manager.wait_until_drained().await.is_drained());

        let delivered = deliveries.lock().clone();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].0, expected_status);
        assert_eq!(delivered[0].1, Bytes::from_static(b"a,b\n1,2\n"));

        manager.shutdown().await;
    }

    // Dropping the server verifies the single-request expectation
}
