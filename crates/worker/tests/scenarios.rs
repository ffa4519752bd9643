//! End-to-end runs of the worker against a scripted network and real storage.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use swcache_core::{CacheDb, CacheStorage, Error, MemoryStorage, Method, Request, Response};
use swcache_worker::{
    BypassReason, CachePolicy, FetchDisposition, Network, OfflineWorker, Outcome, Registration, Source, WorkerState,
};
use url::Url;

const ORIGIN: &str = "https://folio.dev";

#[derive(Default)]
struct FakeNetwork {
    routes: Mutex<HashMap<String, Option<Response>>>,
    stalled: Mutex<Vec<String>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl FakeNetwork {
    fn serve(&self, path: &str, status: u16, content_type: &str, body: &str) {
        let response = Response::with_content_type(status, content_type, body.to_string());
        self.routes.lock().unwrap().insert(path.to_string(), Some(response));
    }

    fn go_offline(&self) {
        for route in self.routes.lock().unwrap().values_mut() {
            *route = None;
        }
    }

    fn stall(&self, path: &str) {
        self.stalled.lock().unwrap().push(path.to_string());
    }

    fn calls(&self, path: &str) -> usize {
        self.calls.lock().unwrap().get(path).copied().unwrap_or(0)
    }

    fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl Network for FakeNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let path = request.url.path().to_string();
        *self.calls.lock().unwrap().entry(path.clone()).or_default() += 1;

        let stalled = self.stalled.lock().unwrap().contains(&path);
        if stalled {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }

        let route = self.routes.lock().unwrap().get(&path).cloned().flatten();
        route.ok_or_else(|| Error::Network(format!("failed to fetch {}", request.url)))
    }
}

fn url(path: &str) -> Url {
    Url::parse(ORIGIN).unwrap().join(path).unwrap()
}

fn small_policy() -> CachePolicy {
    CachePolicy::new(ORIGIN).unwrap().with_manifest(["/", "/favicon.ico"]).unwrap()
}

fn site() -> Arc<FakeNetwork> {
    let network = Arc::new(FakeNetwork::default());
    network.serve("/", 200, "text/html", "<h1>home</h1>");
    network.serve("/favicon.ico", 200, "image/x-icon", "ico");
    network
}

async fn active_worker(
    policy: CachePolicy, storage: Arc<dyn CacheStorage>, network: Arc<FakeNetwork>,
) -> OfflineWorker {
    let worker = OfflineWorker::new(policy, storage, network, Arc::new(Registration::new()), Duration::from_secs(2));
    worker.install().await.unwrap();
    worker.activate().await.unwrap();
    assert_eq!(worker.state().await, WorkerState::Activated);
    worker
}

async fn respond(worker: &OfflineWorker, request: Request) -> Outcome {
    match worker.handle_fetch(&request).await.unwrap() {
        FetchDisposition::Respond(outcome) => outcome,
        FetchDisposition::Passthrough(reason) => panic!("{} passed through: {reason:?}", request.url),
    }
}

#[tokio::test]
async fn precached_favicon_needs_no_network() {
    let storage = Arc::new(CacheDb::open_in_memory().await.unwrap());
    let network = site();
    let worker = active_worker(small_policy(), storage.clone(), network.clone()).await;
    let installed_calls = network.total_calls();

    let outcome = respond(&worker, Request::get(url("/favicon.ico"))).await;
    assert_eq!(outcome.source, Source::Cache { partition: "static-v1".to_string() });
    assert_eq!(outcome.response.text(), "ico");
    assert_eq!(network.total_calls(), installed_calls);
}

#[tokio::test]
async fn build_asset_is_fetched_once() {
    let storage = Arc::new(CacheDb::open_in_memory().await.unwrap());
    let network = site();
    network.serve("/_next/static/chunk123.js", 200, "application/javascript", "console.log(1)");
    let worker = active_worker(small_policy(), storage.clone(), network.clone()).await;

    let first = respond(&worker, Request::get(url("/_next/static/chunk123.js"))).await;
    assert_eq!(first.source, Source::Network);
    let second = respond(&worker, Request::get(url("/_next/static/chunk123.js"))).await;
    assert_eq!(second.source, Source::Cache { partition: "static-v1".to_string() });
    assert_eq!(second.response.text(), "console.log(1)");
    assert_eq!(network.calls("/_next/static/chunk123.js"), 1);
}

#[tokio::test]
async fn unreachable_image_gets_placeholder() {
    let worker = active_worker(small_policy(), Arc::new(MemoryStorage::new()), site()).await;

    let outcome = respond(&worker, Request::image(url("/projects/cover.png"))).await;
    assert_eq!(outcome.source, Source::Placeholder);
    assert_eq!(outcome.response.content_type(), Some("image/svg+xml"));
    assert!(outcome.response.text().contains("Image unavailable"));
}

#[tokio::test]
async fn offline_navigation_serves_cached_root() {
    let network = site();
    let worker = active_worker(small_policy(), Arc::new(MemoryStorage::new()), network.clone()).await;
    network.go_offline();

    let outcome = respond(&worker, Request::navigate(url("/about"))).await;
    assert_eq!(outcome.source, Source::CachedFallback { partition: "static-v1".to_string() });
    assert_eq!(outcome.response.text(), "<h1>home</h1>");
}

#[tokio::test]
async fn offline_navigation_without_cached_root_is_503() {
    let network = site();
    let policy = small_policy().with_manifest(["/favicon.ico"]).unwrap();
    let worker = active_worker(policy, Arc::new(MemoryStorage::new()), network.clone()).await;
    network.go_offline();

    let outcome = respond(&worker, Request::navigate(url("/about"))).await;
    assert_eq!(outcome.source, Source::Offline);
    assert_eq!(outcome.response.status, 503);
    assert_eq!(outcome.response.text(), "Offline");
}

#[tokio::test(start_paused = true)]
async fn stalled_navigation_times_out_to_fallback() {
    let network = site();
    let worker = active_worker(small_policy(), Arc::new(MemoryStorage::new()), network.clone()).await;
    network.stall("/slow");

    let outcome = respond(&worker, Request::navigate(url("/slow"))).await;
    assert_eq!(outcome.source, Source::CachedFallback { partition: "static-v1".to_string() });
}

#[tokio::test]
async fn new_version_purges_old_partitions() {
    let storage = Arc::new(CacheDb::open_in_memory().await.unwrap());
    let network = site();
    network.serve("/photo.png", 200, "image/png", "png");

    let v1 = active_worker(small_policy(), storage.clone(), network.clone()).await;
    respond(&v1, Request::image(url("/photo.png"))).await;
    storage.open("foo").await.unwrap();
    assert_eq!(storage.keys().await.unwrap(), vec!["static-v1", "dynamic-v1", "foo"]);

    let v2 = OfflineWorker::new(
        small_policy().with_partitions("static-v2", "dynamic-v2"),
        storage.clone(),
        network.clone(),
        Arc::new(Registration::new()),
        Duration::from_secs(2),
    );
    v2.install().await.unwrap();
    let report = v2.activate().await.unwrap();

    assert_eq!(report.deleted, vec!["static-v1", "dynamic-v1", "foo"]);
    assert_eq!(storage.keys().await.unwrap(), vec!["static-v2"]);
}

#[tokio::test]
async fn failed_install_leaves_previous_version_in_place() {
    let storage = Arc::new(MemoryStorage::new());
    let network = site();
    let v1 = active_worker(small_policy(), storage.clone(), network.clone()).await;

    let v2 = OfflineWorker::new(
        small_policy()
            .with_manifest(["/", "/favicon.ico", "/missing.png"])
            .unwrap()
            .with_partitions("static-v2", "dynamic-v2"),
        storage.clone(),
        network.clone(),
        Arc::new(Registration::new()),
        Duration::from_secs(2),
    );
    assert!(matches!(v2.install().await, Err(Error::InstallFailed(_))));
    assert_eq!(v2.state().await, WorkerState::Redundant);
    assert_eq!(storage.keys().await.unwrap(), vec!["static-v1"]);

    let outcome = respond(&v1, Request::get(url("/favicon.ico"))).await;
    assert_eq!(outcome.source, Source::Cache { partition: "static-v1".to_string() });
}

#[tokio::test]
async fn write_back_failure_does_not_change_response() {
    let network = site();
    network.serve("/photo.png", 200, "image/png", "a very large photo");
    let storage = Arc::new(MemoryStorage::with_quota(32));
    let worker = active_worker(small_policy(), storage.clone(), network.clone()).await;

    let outcome = respond(&worker, Request::image(url("/photo.png"))).await;
    assert_eq!(outcome.source, Source::Network);
    assert_eq!(outcome.response.text(), "a very large photo");
    assert_eq!(storage.entry_count("dynamic-v1").await.unwrap(), 0);
}

#[tokio::test]
async fn non_get_and_cross_origin_pass_through() {
    let network = site();
    let worker = active_worker(small_policy(), Arc::new(MemoryStorage::new()), network.clone()).await;
    let before = network.total_calls();

    let post = Request::get(url("/api/contact")).with_method(Method::Post);
    assert!(matches!(
        worker.handle_fetch(&post).await.unwrap(),
        FetchDisposition::Passthrough(BypassReason::NonGet)
    ));

    let remote = Request::image(Url::parse("https://cdn.example.com/pic.png").unwrap());
    assert!(matches!(
        worker.handle_fetch(&remote).await.unwrap(),
        FetchDisposition::Passthrough(BypassReason::CrossOrigin)
    ));
    assert_eq!(network.total_calls(), before);
}
