//! End-to-end scans with the reqwest client against a mock registry

use regman::concurrency::ConcurrencyConfig;
use regman::config::RegistryEndpoint;
use regman::logging::Logger;
use regman::registry::{FetchConfig, RegistryApi, RegistryClient};
use regman::scan::{Completion, Dispatcher, ScanOutcome};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::{Duration, Instant};
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn manifest_doc(created: &[&str]) -> Value {
    let history: Vec<Value> = created
        .iter()
        .map(|ts| json!({ "v1Compatibility": json!({ "id": "layer", "created": ts }).to_string() }))
        .collect();
    json!({ "schemaVersion": 1, "name": "repo", "tag": "tag", "history": history })
}

async fn mount_json(server: &MockServer, route: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn scan(server: &MockServer, fetch: FetchConfig, concurrency: ConcurrencyConfig) -> ScanOutcome {
    let client = RegistryClient::builder()
        .with_config(fetch)
        .with_logger(Logger::new_quiet())
        .build()
        .unwrap();
    let endpoint = RegistryEndpoint::parse(&server.uri()).unwrap();
    let api = RegistryApi::new(Arc::new(client), &endpoint);

    tokio::time::timeout(
        Duration::from_secs(10),
        Dispatcher::new(api, concurrency, Logger::new_quiet()).run(),
    )
    .await
    .expect("scan did not finish")
}

#[tokio::test]
async fn test_scan_reports_newest_tags_first() {
    let server = MockServer::start().await;
    mount_json(&server, "/v2/_catalog", json!({ "repositories": ["a", "b"] })).await;
    mount_json(&server, "/v2/a/tags/list", json!({ "name": "a", "tags": ["v1", "v2"] })).await;
    mount_json(&server, "/v2/b/tags/list", json!({ "name": "b", "tags": [] })).await;
    mount_json(
        &server,
        "/v2/a/manifests/v1",
        manifest_doc(&["2023-01-01T00:00:00Z", "2022-06-01T00:00:00.123Z"]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/v2/a/manifests/v2"))
        .and(header_exists("accept"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(manifest_doc(&["2023-01-02T00:00:00Z"])),
        )
        .mount(&server)
        .await;

    let outcome = scan(&server, FetchConfig::default(), ConcurrencyConfig::default()).await;

    assert_eq!(
        serde_json::to_value(&outcome.report).unwrap(),
        json!({
            "a": [
                { "Tag": "v2", "Created": "2023-01-02 00:00:00" },
                { "Tag": "v1", "Created": "2023-01-01 00:00:00" }
            ]
        })
    );
    assert_eq!(outcome.stats.completion, Completion::Finished);
    assert_eq!(outcome.stats.requests, 5);
    assert_eq!(outcome.stats.failed_fetches, 0);
}

#[tokio::test]
async fn test_failed_fetches_reduce_coverage_only() {
    let server = MockServer::start().await;
    mount_json(&server, "/v2/_catalog", json!({ "repositories": ["ok", "down", "private"] })).await;
    mount_json(&server, "/v2/ok/tags/list", json!({ "name": "ok", "tags": ["1.0", "2.0"] })).await;
    mount_json(&server, "/v2/ok/manifests/2.0", manifest_doc(&["2024-02-02T02:02:02Z"])).await;
    Mock::given(method("GET"))
        .and(path("/v2/ok/manifests/1.0"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "errors": [{ "code": "MANIFEST_UNKNOWN", "message": "manifest unknown" }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/down/tags/list"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/private/tags/list"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&server)
        .await;

    let outcome = scan(&server, FetchConfig::default(), ConcurrencyConfig::default()).await;

    let repos: Vec<&str> = outcome.report.repositories().collect();
    assert_eq!(repos, vec!["ok"]);
    let tags = outcome.report.tags("ok").unwrap();
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].tag, "2.0");
    assert_eq!(outcome.stats.failed_fetches, 3);
    assert_eq!(outcome.stats.completion, Completion::Finished);
}

#[tokio::test]
async fn test_missing_catalog_completes_empty() {
    let server = MockServer::start().await;

    let outcome = scan(&server, FetchConfig::default(), ConcurrencyConfig::default()).await;

    assert_eq!(outcome.report.repository_count(), 0);
    assert_eq!(outcome.stats.requests, 1);
    assert_eq!(outcome.stats.failed_fetches, 1);
}

#[tokio::test]
async fn test_request_timeout_drops_only_slow_tag() {
    let server = MockServer::start().await;
    mount_json(&server, "/v2/_catalog", json!({ "repositories": ["a"] })).await;
    mount_json(&server, "/v2/a/tags/list", json!({ "name": "a", "tags": ["fast", "slow"] })).await;
    mount_json(&server, "/v2/a/manifests/fast", manifest_doc(&["2023-01-01T00:00:00Z"])).await;
    Mock::given(method("GET"))
        .and(path("/v2/a/manifests/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(manifest_doc(&["2023-01-02T00:00:00Z"]))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let fetch = FetchConfig {
        timeout: Duration::from_millis(300),
        ..FetchConfig::default()
    };
    let outcome = scan(&server, fetch, ConcurrencyConfig::default()).await;

    let tags = outcome.report.tags("a").unwrap();
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].tag, "fast");
    assert_eq!(outcome.stats.failed_fetches, 1);
}

#[tokio::test]
async fn test_in_flight_requests_are_bounded() {
    let server = MockServer::start().await;
    let tags: Vec<String> = (0..4).map(|i| format!("t{}", i)).collect();
    mount_json(&server, "/v2/_catalog", json!({ "repositories": ["a"] })).await;
    mount_json(&server, "/v2/a/tags/list", json!({ "name": "a", "tags": tags })).await;
    for tag in &tags {
        Mock::given(method("GET"))
            .and(path(format!("/v2/a/manifests/{}", tag)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(manifest_doc(&["2023-01-01T00:00:00Z"]))
                    .set_delay(Duration::from_millis(150)),
            )
            .mount(&server)
            .await;
    }

    let fetch = FetchConfig {
        max_in_flight: 1,
        ..FetchConfig::default()
    };
    let started = Instant::now();
    let outcome = scan(&server, fetch, ConcurrencyConfig::default().with_max_in_flight(1)).await;

    assert_eq!(outcome.report.tag_count(), 4);
    assert!(started.elapsed() >= Duration::from_millis(600));
}

#[tokio::test]
async fn test_deadline_keeps_collected_details() {
    let server = MockServer::start().await;
    mount_json(&server, "/v2/_catalog", json!({ "repositories": ["a"] })).await;
    mount_json(&server, "/v2/a/tags/list", json!({ "name": "a", "tags": ["done", "stuck"] })).await;
    mount_json(&server, "/v2/a/manifests/done", manifest_doc(&["2023-01-01T00:00:00Z"])).await;
    Mock::given(method("GET"))
        .and(path("/v2/a/manifests/stuck"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(manifest_doc(&["2023-01-02T00:00:00Z"]))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let concurrency = ConcurrencyConfig::default().with_deadline(Some(Duration::from_millis(500)));
    let outcome = scan(&server, FetchConfig::default(), concurrency).await;

    assert_eq!(outcome.report.tags("a").unwrap()[0].tag, "done");
    assert_eq!(outcome.stats.completion, Completion::DeadlineExceeded { abandoned: 1 });
}
