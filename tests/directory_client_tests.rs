/// Peppol directory client and resolver tests against a mock directory
use firmasok::{
    capability::{
        CapabilityCache, CapabilityResolver, ConcurrencyLimiter, DirectoryClient, FailureKind,
        OrgId, PeppolDirectoryClient, QueryOutcome, RetryPolicy,
    },
    config::CapabilityConfig,
};
use std::{sync::Arc, time::Duration};
use wiremock::{
    matchers::{method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

const PARTICIPANT: &str = "iso6523-actorid-upis::0192:923609016";

fn config_for(server: &MockServer) -> CapabilityConfig {
    CapabilityConfig {
        directory_url: format!("{}/search/1.0/json", server.uri()),
        request_timeout_secs: 2,
        ..CapabilityConfig::default()
    }
}

fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        initial_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(20),
        multiplier: 2.0,
        jitter: false,
        max_transient_retries: 1,
    }
}

fn resolver_for(server: &MockServer) -> CapabilityResolver {
    let client = PeppolDirectoryClient::new(&config_for(server)).unwrap();
    CapabilityResolver::new(
        CapabilityCache::new(chrono::Duration::hours(24)),
        Arc::new(client),
        ConcurrencyLimiter::new(5),
        fast_policy(),
    )
}

async fn mount_count(server: &MockServer, participant: &str, count: u64) {
    Mock::given(method("GET"))
        .and(path("/search/1.0/json"))
        .and(query_param("participant", participant))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "total-result-count": count })),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_positive_count_is_supported() {
    let server = MockServer::start().await;
    mount_count(&server, PARTICIPANT, 1).await;

    let client = PeppolDirectoryClient::new(&config_for(&server)).unwrap();
    let outcome = client.query(&OrgId::new("923609016")).await;

    assert_eq!(outcome, QueryOutcome::Positive);
}

#[tokio::test]
async fn test_zero_count_is_negative() {
    let server = MockServer::start().await;
    mount_count(&server, PARTICIPANT, 0).await;

    let client = PeppolDirectoryClient::new(&config_for(&server)).unwrap();
    let outcome = client.query(&OrgId::new("923 609 016")).await;

    assert_eq!(outcome, QueryOutcome::Negative);
}

#[tokio::test]
async fn test_throttling_carries_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "2"))
        .mount(&server)
        .await;

    let client = PeppolDirectoryClient::new(&config_for(&server)).unwrap();
    let outcome = client.query(&OrgId::new("923609016")).await;

    assert_eq!(
        outcome,
        QueryOutcome::RateLimited {
            retry_after: Some(Duration::from_secs(2))
        }
    );
}

#[tokio::test]
async fn test_server_error_is_unexpected_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = PeppolDirectoryClient::new(&config_for(&server)).unwrap();
    let outcome = client.query(&OrgId::new("923609016")).await;

    assert_eq!(outcome, QueryOutcome::Failed(FailureKind::UnexpectedStatus(503)));
}

#[tokio::test]
async fn test_malformed_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let client = PeppolDirectoryClient::new(&config_for(&server)).unwrap();
    let outcome = client.query(&OrgId::new("923609016")).await;

    assert!(matches!(
        outcome,
        QueryOutcome::Failed(FailureKind::MalformedResponse(_))
    ));
}

#[tokio::test]
async fn test_slow_directory_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "total-result-count": 1 }))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let config = CapabilityConfig {
        request_timeout_secs: 1,
        ..config_for(&server)
    };
    let client = PeppolDirectoryClient::new(&config).unwrap();
    let outcome = client.query(&OrgId::new("923609016")).await;

    assert_eq!(outcome, QueryOutcome::Failed(FailureKind::Timeout));
}

#[tokio::test]
async fn test_resolver_retries_through_throttling() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_count(&server, PARTICIPANT, 2).await;

    let resolver = resolver_for(&server);
    assert!(resolver.resolve_one("923609016").await);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
}

#[tokio::test]
async fn test_resolver_caches_confirmed_answers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("participant", PARTICIPANT))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "total-result-count": 0 })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let resolver = resolver_for(&server);
    assert!(!resolver.resolve_one("923609016").await);
    assert!(!resolver.resolve_one("923609016").await);
    // `expect(1)` is verified when the server drops
}

#[tokio::test]
async fn test_resolver_does_not_cache_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_count(&server, PARTICIPANT, 1).await;

    let resolver = resolver_for(&server);
    assert!(!resolver.resolve_one("923609016").await);
    assert!(resolver.cache().is_empty().await);

    // Next call reaches the directory again and gets the real answer
    assert!(resolver.resolve_one("923609016").await);
}

#[tokio::test]
async fn test_batch_mixes_outcomes() {
    let server = MockServer::start().await;
    mount_count(&server, "iso6523-actorid-upis::0192:111111111", 1).await;
    mount_count(&server, "iso6523-actorid-upis::0192:222222222", 0).await;
    Mock::given(method("GET"))
        .and(query_param("participant", "iso6523-actorid-upis::0192:333333333"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let resolver = resolver_for(&server);
    let batch = resolver
        .resolve_many(&["111111111", "222222222", "333333333", "111111111"])
        .await;

    assert_eq!(batch.len(), 4);
    assert_eq!(batch.get("111111111"), Some(true));
    assert_eq!(batch.get("222222222"), Some(false));
    assert_eq!(batch.get("333333333"), Some(false));

    // Duplicate input is resolved once
    let requests = server.received_requests().await.unwrap();
    let hits_for_first = requests
        .iter()
        .filter(|r| r.url.query().unwrap_or_default().contains("111111111"))
        .count();
    assert_eq!(hits_for_first, 1);
}
