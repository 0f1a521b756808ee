//! Manager scenarios driven by a scripted in-memory transport

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tempfile::TempDir;
use tokio::time::{timeout, Instant};
use url::Url;

use super::*;
use crate::app::client::{FetchResponse, Fetcher, ResponseMeta, Session};
use crate::errors::{TransportError, TransportResult};

/// Transport that records every call and fails selected paths on demand
#[derive(Default)]
struct ScriptedFetcher {
    calls: Mutex<Vec<(String, Instant)>>,
    failures: Mutex<HashMap<String, u32>>,
    latency: Duration,
}

impl ScriptedFetcher {
    fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn failing(path: &str, times: u32) -> Self {
        let fetcher = Self::default();
        fetcher.failures.lock().insert(path.to_string(), times);
        fetcher
    }

    fn calls_for(&self, path: &str) -> Vec<Instant> {
        self.calls
            .lock()
            .iter()
            .filter(|(p, _)| p == path)
            .map(|(_, at)| *at)
            .collect()
    }

    fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, url: &Url, _session: &Session) -> TransportResult<FetchResponse> {
        let path = url.path().to_string();
        self.calls.lock().push((path.clone(), Instant::now()));
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if let Some(left) = self.failures.lock().get_mut(&path) {
            if *left > 0 {
                *left -= 1;
                return Err(TransportError::Status {
                    status: 500,
                    url: url.to_string(),
                });
            }
        }

        Ok(FetchResponse {
            meta: ResponseMeta::ok(url.clone()),
            body: Bytes::from(format!("body of {}", path)),
        })
    }
}

type Deliveries = Arc<Mutex<Vec<(String, Option<u16>, Bytes)>>>;

fn recording_callback(deliveries: &Deliveries, path: &str) -> Callback {
    let deliveries = Arc::clone(deliveries);
    let path = path.to_string();
    Arc::new(move |meta: Option<ResponseMeta>, body: Bytes| {
        deliveries
            .lock()
            .push((path.clone(), meta.map(|m| m.status), body));
        Ok(())
    })
}

fn test_config() -> ManagerConfig {
    ManagerConfig::default()
        .with_base_url("http://test.invalid/")
        .with_worker_count(3)
        .with_throttle(Duration::from_millis(10))
        .with_cache_dir(None)
        .with_backoff(Duration::from_millis(150), Duration::from_millis(50))
        .with_drain_timing(Duration::from_millis(30), Duration::from_millis(100))
        .with_poll_intervals(Duration::from_millis(20), Duration::from_millis(20))
}

async fn drained(manager: &DownloadManager) -> DrainOutcome {
    timeout(Duration::from_secs(10), manager.wait_until_drained())
        .await
        .expect("drain did not finish in time")
}

#[test]
fn test_resolve_url() {
    let base = "http://h";
    assert_eq!(resolve_url(base, "/x").unwrap().as_str(), "http://h/x");
    assert_eq!(resolve_url(base, "x").unwrap().as_str(), "http://h/x");
    assert_eq!(
        resolve_url(base, "http://other/y").unwrap().as_str(),
        "http://other/y"
    );
    assert_eq!(
        resolve_url(base, "https://other/y?q=1").unwrap().as_str(),
        "https://other/y?q=1"
    );
    assert_eq!(
        resolve_url("http://h/api", "v1/items").unwrap().as_str(),
        "http://h/api/v1/items"
    );
}

#[test]
fn test_resolve_url_rejects_garbage() {
    let result = resolve_url("not a base", "x");
    assert!(matches!(result, Err(SubmitError::InvalidUrl { .. })));
}

#[tokio::test]
async fn test_forced_error_is_retried_after_backoff_window() {
    let fetcher = Arc::new(ScriptedFetcher::failing("/b", 1));
    let manager = DownloadManager::with_fetcher(test_config(), fetcher.clone())
        .await
        .unwrap();
    let deliveries: Deliveries = Arc::default();

    for path in ["/a", "/b", "/c"] {
        manager
            .submit(path, recording_callback(&deliveries, path))
            .unwrap();
    }

    assert_eq!(drained(&manager).await, DrainOutcome::Drained);

    let delivered = deliveries.lock().clone();
    assert_eq!(delivered.len(), 3);
    for path in ["/a", "/b", "/c"] {
        let hits: Vec<_> = delivered.iter().filter(|(p, _, _)| p == path).collect();
        assert_eq!(hits.len(), 1, "{} delivered {} times", path, hits.len());
        assert_eq!(hits[0].1, Some(200));
        assert_eq!(hits[0].2, Bytes::from(format!("body of {}", path)));
    }

    let attempts = fetcher.calls_for("/b");
    assert_eq!(attempts.len(), 2);
    assert!(attempts[1] >= attempts[0] + Duration::from_millis(150));

    let stats = manager.stats();
    assert_eq!(stats.submitted, 3);
    assert_eq!(stats.delivered, 3);
    assert_eq!(stats.transport_errors, 1);
    assert_eq!(stats.requeued, 1);
    assert_eq!(stats.abandoned, 0);

    manager.shutdown().await;
}

#[tokio::test]
async fn test_cache_hit_never_fetches() {
    let dir = TempDir::new().unwrap();
    let cache = ContentCache::open(dir.path()).await.unwrap();
    cache
        .write("http://test.invalid/cached", &Bytes::from_static(b"from disk"))
        .await
        .unwrap();

    let fetcher = Arc::new(ScriptedFetcher::default());
    let config = test_config().with_cache_dir(Some(dir.path().to_path_buf()));
    let manager = DownloadManager::with_fetcher(config, fetcher.clone())
        .await
        .unwrap();
    let deliveries: Deliveries = Arc::default();

    manager
        .submit("cached", recording_callback(&deliveries, "/cached"))
        .unwrap();
    manager
        .submit("/fresh", recording_callback(&deliveries, "/fresh"))
        .unwrap();
    assert!(drained(&manager).await.is_drained());

    let delivered = deliveries.lock().clone();
    let cached = delivered.iter().find(|(p, _, _)| p == "/cached").unwrap();
    assert_eq!(cached.1, None);
    assert_eq!(cached.2, Bytes::from_static(b"from disk"));

    assert!(fetcher.calls_for("/cached").is_empty());
    assert_eq!(fetcher.call_count(), 1);

    // The network fetch was written through to the cache.
    assert!(manager.cache().has("http://test.invalid/fresh").await);
    assert_eq!(manager.stats().cache_hits, 1);

    manager.shutdown().await;
}

#[tokio::test]
async fn test_cache_is_keyed_on_the_submitted_spelling() {
    let dir = TempDir::new().unwrap();
    let cache = ContentCache::open(dir.path()).await.unwrap();
    // The url crate would store this as "http://other.test/".
    cache
        .write("http://Other.test", &Bytes::from_static(b"bare host"))
        .await
        .unwrap();

    let fetcher = Arc::new(ScriptedFetcher::default());
    let config = test_config().with_cache_dir(Some(dir.path().to_path_buf()));
    let manager = DownloadManager::with_fetcher(config, fetcher.clone())
        .await
        .unwrap();
    let deliveries: Deliveries = Arc::default();

    manager
        .submit("http://Other.test", recording_callback(&deliveries, "bare"))
        .unwrap();
    manager
        .submit("http://other.test/", recording_callback(&deliveries, "slash"))
        .unwrap();
    assert!(drained(&manager).await.is_drained());

    let delivered = deliveries.lock().clone();
    let bare = delivered.iter().find(|(p, _, _)| p == "bare").unwrap();
    assert_eq!(bare.1, None);
    assert_eq!(bare.2, Bytes::from_static(b"bare host"));

    // The other spelling is a separate entry, fetched and written under its own key.
    assert_eq!(fetcher.call_count(), 1);
    assert!(manager.cache().has("http://other.test/").await);
    let expected = dir
        .path()
        .join(format!("{:x}", md5::compute(b"http://other.test/")));
    assert!(expected.is_file());

    manager.shutdown().await;
}

#[tokio::test]
async fn test_failing_callbacks_do_not_stop_the_pool() {
    let fetcher = Arc::new(ScriptedFetcher::default());
    let manager = DownloadManager::with_fetcher(test_config(), fetcher.clone())
        .await
        .unwrap();

    for i in 0..4 {
        manager
            .download(&format!("item/{}", i), |_, _| {
                Err(anyhow::anyhow!("callback rejected body"))
            })
            .unwrap();
    }
    manager
        .download("boom", |_, _| panic!("callback exploded"))
        .unwrap();

    assert!(drained(&manager).await.is_drained());
    assert!(manager.is_alive());

    let stats = manager.stats();
    assert_eq!(stats.fetched, 5);
    assert_eq!(stats.delivered, 5);
    assert_eq!(stats.callback_failures, 5);
    assert_eq!(stats.transport_errors, 0);

    // Still accepting and processing work afterwards.
    let deliveries: Deliveries = Arc::default();
    manager
        .submit("after", recording_callback(&deliveries, "/after"))
        .unwrap();
    assert!(drained(&manager).await.is_drained());
    assert_eq!(deliveries.lock().len(), 1);

    manager.shutdown().await;
}

#[tokio::test]
async fn test_retry_ceiling_abandons_item() {
    let fetcher = Arc::new(ScriptedFetcher::failing("/never", u32::MAX));
    let config = test_config()
        .with_backoff(Duration::from_millis(20), Duration::ZERO)
        .with_max_retries(Some(1));
    let manager = DownloadManager::with_fetcher(config, fetcher.clone())
        .await
        .unwrap();
    let deliveries: Deliveries = Arc::default();

    manager
        .submit("/never", recording_callback(&deliveries, "/never"))
        .unwrap();
    assert!(drained(&manager).await.is_drained());

    assert!(deliveries.lock().is_empty());
    assert_eq!(fetcher.calls_for("/never").len(), 2);

    let stats = manager.stats();
    assert_eq!(stats.transport_errors, 2);
    assert_eq!(stats.requeued, 1);
    assert_eq!(stats.abandoned, 1);

    manager.shutdown().await;
}

#[tokio::test]
async fn test_interrupted_drain_reports_remaining_and_stops() {
    let fetcher = Arc::new(ScriptedFetcher::failing("/down", u32::MAX));
    let config = test_config().with_backoff(Duration::from_secs(30), Duration::ZERO);
    let manager = DownloadManager::with_fetcher(config, fetcher)
        .await
        .unwrap();

    manager.download("/down", |_, _| Ok(())).unwrap();
    manager.download("/other", |_, _| Ok(())).unwrap();

    let outcome = manager
        .wait_until_drained_or(tokio::time::sleep(Duration::from_millis(200)))
        .await;

    assert!(matches!(outcome, DrainOutcome::Interrupted { .. }));
    assert!(outcome.remaining() >= 1);
    assert!(!manager.is_alive());
    assert!(matches!(
        manager.download("/late", |_, _| Ok(())),
        Err(SubmitError::ShutDown)
    ));

    timeout(Duration::from_secs(5), manager.shutdown())
        .await
        .expect("shutdown hung");
}

#[tokio::test]
async fn test_wire_pacing_spaces_fetches() {
    let fetcher = Arc::new(ScriptedFetcher::default());
    let config = test_config()
        .with_worker_count(6)
        .with_throttle(Duration::from_millis(40));
    let manager = DownloadManager::with_fetcher(config, fetcher.clone())
        .await
        .unwrap();

    for i in 0..6 {
        manager.download(&format!("p{}", i), |_, _| Ok(())).unwrap();
    }
    assert!(drained(&manager).await.is_drained());

    let mut times: Vec<Instant> = fetcher.calls.lock().iter().map(|(_, at)| *at).collect();
    times.sort();
    assert_eq!(times.len(), 6);
    for pair in times.windows(2) {
        // Slack for the gap between acquiring a slot and recording the call.
        assert!(pair[1] >= pair[0] + Duration::from_millis(30));
    }

    manager.shutdown().await;
}

#[tokio::test]
async fn test_no_fetch_inside_backoff_window_and_spacing_survives_it() {
    let throttle = Duration::from_millis(30);
    let window = Duration::from_millis(200);
    let fetcher = Arc::new(ScriptedFetcher::failing("/p1", 1));
    let config = test_config()
        .with_worker_count(4)
        .with_throttle(throttle)
        .with_backoff(window, Duration::from_millis(50));
    let manager = DownloadManager::with_fetcher(config, fetcher.clone())
        .await
        .unwrap();

    for i in 0..6 {
        manager.download(&format!("/p{}", i), |_, _| Ok(())).unwrap();
    }
    assert!(drained(&manager).await.is_drained());

    let calls = fetcher.calls.lock().clone();
    assert_eq!(calls.len(), 7);
    let failed_at = calls
        .iter()
        .find(|(path, _)| path == "/p1")
        .map(|(_, at)| *at)
        .unwrap();

    for (path, at) in calls.iter().filter(|(_, at)| *at > failed_at) {
        assert!(
            *at >= failed_at + window,
            "{} fetched {:?} after the failure, inside the backoff window",
            path,
            *at - failed_at
        );
    }

    let mut times: Vec<Instant> = calls.iter().map(|(_, at)| *at).collect();
    times.sort();
    for pair in times.windows(2) {
        // Slack for the gap between a wire slot and the recorded call.
        assert!(pair[1] >= pair[0] + throttle - Duration::from_millis(10));
    }

    let stats = manager.stats();
    assert_eq!(stats.transport_errors, 1);
    assert!(stats.parked >= 1);
    assert_eq!(stats.delivered, 6);

    manager.shutdown().await;
}

#[tokio::test]
async fn test_burst_of_failures_keeps_every_worker_alive() {
    let paths: Vec<String> = (0..100).map(|i| format!("/down{}", i)).collect();
    let fetcher = ScriptedFetcher::default().with_latency(Duration::from_millis(200));
    for path in &paths {
        fetcher.failures.lock().insert(path.clone(), u32::MAX);
    }
    let fetcher = Arc::new(fetcher);
    let config = test_config()
        .with_worker_count(100)
        .with_throttle(Duration::ZERO)
        .with_backoff(Duration::from_secs(3), Duration::from_secs(2))
        .with_max_retries(Some(0));
    let manager = DownloadManager::with_fetcher(config, fetcher.clone())
        .await
        .unwrap();

    for path in &paths {
        manager.download(path, |_, _| Ok(())).unwrap();
    }

    // Every item is in flight before the first failure lands, so all 100
    // trips happen back to back and every item is abandoned.
    assert!(drained(&manager).await.is_drained());
    assert_eq!(manager.outstanding(), 0);
    assert!(manager.is_alive());

    let stats = manager.stats();
    assert_eq!(stats.transport_errors, 100);
    assert_eq!(stats.abandoned, 100);
    assert!(manager.is_penalized());

    timeout(Duration::from_secs(5), manager.shutdown())
        .await
        .expect("shutdown hung");
}

#[tokio::test]
async fn test_callback_can_submit_follow_up_work() {
    let fetcher = Arc::new(ScriptedFetcher::default());
    let manager = DownloadManager::with_fetcher(test_config(), fetcher.clone())
        .await
        .unwrap();
    let deliveries: Deliveries = Arc::default();

    let handle = manager.handle();
    let child = recording_callback(&deliveries, "/child");
    let root_deliveries = Arc::clone(&deliveries);
    manager
        .download("/root", move |meta, body| {
            root_deliveries
                .lock()
                .push(("/root".to_string(), meta.map(|m| m.status), body));
            handle.submit("/child", Arc::clone(&child))?;
            Ok(())
        })
        .unwrap();

    assert!(drained(&manager).await.is_drained());
    let paths: Vec<String> = deliveries.lock().iter().map(|(p, _, _)| p.clone()).collect();
    assert_eq!(paths, vec!["/root".to_string(), "/child".to_string()]);

    manager.shutdown().await;
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let fetcher = Arc::new(ScriptedFetcher::default());
    let result =
        DownloadManager::with_fetcher(test_config().with_worker_count(0), fetcher).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_shutdown_is_idempotent() {
    let manager = DownloadManager::with_fetcher(test_config(), Arc::new(ScriptedFetcher::default()))
        .await
        .unwrap();
    manager.shutdown().await;
    manager.shutdown().await;
    assert!(!manager.is_alive());
    assert!(matches!(
        manager.download("x", |_, _| Ok(())),
        Err(SubmitError::ShutDown)
    ));
}
