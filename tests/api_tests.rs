/// End-to-end router tests with mocked registry and directory
use firmasok::{
    capability::CapabilityResolver,
    config::{
        CapabilityConfig, LoggingConfig, RateLimitConfig, RegistryConfig, ServerConfig,
        ServiceConfig,
    },
    registry::RegistryClient,
    server::build_router,
    AppContext,
};
use serde_json::{json, Value};
use wiremock::{
    matchers::{method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

struct TestApp {
    base_url: String,
    registry: MockServer,
    directory: MockServer,
}

async fn spawn_app(rate_limit_enabled: bool) -> TestApp {
    let registry = MockServer::start().await;
    let directory = MockServer::start().await;

    let config = ServerConfig {
        service: ServiceConfig {
            hostname: "127.0.0.1".to_string(),
            port: 0,
            version: "test".to_string(),
        },
        registry: RegistryConfig {
            base_url: registry.uri(),
            search_size: 20,
            timeout_secs: 2,
        },
        capability: CapabilityConfig {
            directory_url: format!("{}/search/1.0/json", directory.uri()),
            retry_max_attempts: 2,
            retry_initial_delay_ms: 5,
            retry_max_delay_ms: 20,
            batch_deadline_secs: 5,
            ..CapabilityConfig::default()
        },
        email: None,
        rate_limit: RateLimitConfig {
            enabled: rate_limit_enabled,
            requests_per_second: 1,
            burst_size: 2,
        },
        logging: LoggingConfig {
            level: "info".to_string(),
            json: false,
        },
    };

    let registry_client = RegistryClient::new(&config.registry).unwrap();
    let resolver = CapabilityResolver::from_config(&config.capability).unwrap();
    let ctx = AppContext::with_services(config, registry_client, resolver).unwrap();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, build_router(ctx)).await.unwrap();
    });

    TestApp {
        base_url: format!("http://{}", addr),
        registry,
        directory,
    }
}

async fn mount_directory(directory: &MockServer, org_number: &str, count: u64) {
    Mock::given(method("GET"))
        .and(query_param(
            "participant",
            format!("iso6523-actorid-upis::0192:{}", org_number),
        ))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "total-result-count": count })),
        )
        .mount(directory)
        .await;
}

#[tokio::test]
async fn test_health() {
    let app = spawn_app(false).await;

    let body: Value = reqwest::get(format!("{}/health", app.base_url))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");

    let detailed = reqwest::get(format!("{}/health/detailed", app.base_url))
        .await
        .unwrap();
    assert_eq!(detailed.status(), 200);
    let body: Value = detailed.json().await.unwrap();
    assert_eq!(body["status"], "healthy");

    let cache = body["checks"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["name"] == "capability_cache")
        .expect("capability cache check present");
    assert_eq!(cache["status"], "healthy");
    assert_eq!(cache["details"]["entries"], 0);
    assert_eq!(cache["details"]["ttl_secs"], 86400);
}

#[tokio::test]
async fn test_detailed_health_counts_cached_entries() {
    let app = spawn_app(false).await;
    mount_directory(&app.directory, "923609016", 1).await;

    reqwest::get(format!("{}/api/ehf/923609016", app.base_url))
        .await
        .unwrap();

    let body: Value = reqwest::get(format!("{}/health/detailed", app.base_url))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let cache = body["checks"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["name"] == "capability_cache")
        .expect("capability cache check present");
    assert_eq!(cache["details"]["entries"], 1);
}

#[tokio::test]
async fn test_single_capability_lookup() {
    let app = spawn_app(false).await;
    mount_directory(&app.directory, "923609016", 1).await;

    let response = reqwest::get(format!("{}/api/ehf/923609016", app.base_url))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["orgnr"], "923609016");
    assert_eq!(body["ehf"], true);
    assert_eq!(body["confirmed"], true);
}

#[tokio::test]
async fn test_unreachable_directory_is_unconfirmed() {
    let app = spawn_app(false).await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&app.directory)
        .await;

    let body: Value = reqwest::get(format!("{}/api/ehf/923609016", app.base_url))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["ehf"], false);
    assert_eq!(body["confirmed"], false);
}

#[tokio::test]
async fn test_non_numeric_capability_lookup_rejected() {
    let app = spawn_app(false).await;

    let response = reqwest::get(format!("{}/api/ehf/equinor", app.base_url))
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_batch_capability_lookup() {
    let app = spawn_app(false).await;
    mount_directory(&app.directory, "111111111", 1).await;
    mount_directory(&app.directory, "222222222", 0).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/ehf", app.base_url))
        .json(&json!({ "orgIds": ["111111111", "222222222", "111111111"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["results"]["111111111"], true);
    assert_eq!(body["results"]["222222222"], false);
}

#[tokio::test]
async fn test_search_by_number() {
    let app = spawn_app(false).await;
    Mock::given(method("GET"))
        .and(path("/enheter/923609016"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "organisasjonsnummer": "923609016",
            "navn": "EQUINOR ASA",
            "forretningsadresse": {
                "adresse": ["Forusbeen 50"],
                "postnummer": "4035",
                "poststed": "STAVANGER"
            }
        })))
        .mount(&app.registry)
        .await;
    Mock::given(method("GET"))
        .and(path("/underenheter"))
        .and(query_param("overordnetEnhet", "923609016"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_embedded": {"underenheter": [
                {
                    "organisasjonsnummer": "100000001",
                    "navn": "EQUINOR ASA AVD BERGEN",
                    "overordnetEnhet": "923609016",
                    "beliggenhetsadresse": {"adresse": ["Sandsliveien 90"], "postnummer": "5254", "poststed": "SANDSLI"}
                },
                {
                    "organisasjonsnummer": "100000002",
                    "navn": "EQUINOR ASA UTEN ADRESSE",
                    "overordnetEnhet": "923609016"
                }
            ]},
            "page": {"totalPages": 1, "number": 0}
        })))
        .mount(&app.registry)
        .await;
    mount_directory(&app.directory, "923609016", 1).await;
    mount_directory(&app.directory, "100000001", 0).await;

    let response = reqwest::get(format!("{}/api/search?q=923%20609%20016", app.base_url))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["type"], "entity");
    assert_eq!(body["entity"]["name"], "EQUINOR ASA");
    assert_eq!(body["entity"]["ehf"], true);
    assert_eq!(body["entity"]["address"], "Forusbeen 50, 4035 STAVANGER");
    // Subunit without an address is left out
    assert_eq!(body["subunits"].as_array().unwrap().len(), 1);
    assert_eq!(body["subunits"][0]["ehf"], false);
    assert_eq!(body["totalUnits"], 2);
}

#[tokio::test]
async fn test_search_unknown_number_is_not_found() {
    let app = spawn_app(false).await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&app.registry)
        .await;

    let response = reqwest::get(format!("{}/api/search?q=999999999", app.base_url))
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_empty_search_rejected() {
    let app = spawn_app(false).await;

    let response = reqwest::get(format!("{}/api/search?q=%20%20", app.base_url))
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_feedback_without_mailer_is_accepted() {
    let app = spawn_app(false).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/feedback", app.base_url))
        .json(&json!({
            "name": "Kari",
            "email": "kari@example.no",
            "message": "Fint verktøy"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let invalid = reqwest::Client::new()
        .post(format!("{}/api/feedback", app.base_url))
        .json(&json!({ "email": "nope", "message": "Hei" }))
        .send()
        .await
        .unwrap();
    assert_eq!(invalid.status(), 400);
}

#[tokio::test]
async fn test_rate_limit_applies_to_api() {
    let app = spawn_app(true).await;
    let client = reqwest::Client::new();

    let mut statuses = Vec::new();
    for _ in 0..4 {
        let response = client
            .get(format!("{}/api/ehf/not-a-number", app.base_url))
            .send()
            .await
            .unwrap();
        statuses.push(response.status().as_u16());
    }

    assert!(statuses.contains(&429));
    // Health is never limited
    let health = client.get(format!("{}/health", app.base_url)).send().await.unwrap();
    assert_eq!(health.status(), 200);
}

#[tokio::test]
async fn test_unknown_route() {
    let app = spawn_app(false).await;

    let response = reqwest::get(format!("{}/nope", app.base_url)).await.unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = spawn_app(false).await;
    reqwest::get(format!("{}/health", app.base_url)).await.unwrap();

    let body = reqwest::get(format!("{}/metrics", app.base_url))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("http_requests_total"));
}
