/// Directory Client - Single capability query against the Peppol directory
use crate::{
    capability::OrgId,
    config::CapabilityConfig,
    error::{AppError, AppResult},
    metrics,
};
use async_trait::async_trait;
use reqwest::{header::RETRY_AFTER, Client, StatusCode};
use serde::Deserialize;
use std::{fmt, time::Duration};
use tracing::debug;

/// Result of one directory query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    /// At least one participant registered under the scheme
    Positive,
    /// Zero matching participants
    Negative,
    /// Directory is throttling us
    RateLimited { retry_after: Option<Duration> },
    /// No capability information could be obtained
    Failed(FailureKind),
}

/// Why a query produced no capability information
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    Timeout,
    Network(String),
    MalformedResponse(String),
    UnexpectedStatus(u16),
}

impl FailureKind {
    /// Timeouts and connection errors may succeed on a later attempt
    pub fn is_transient(&self) -> bool {
        matches!(self, FailureKind::Timeout | FailureKind::Network(_))
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Timeout => write!(f, "request timed out"),
            FailureKind::Network(e) => write!(f, "network error: {}", e),
            FailureKind::MalformedResponse(e) => write!(f, "malformed response: {}", e),
            FailureKind::UnexpectedStatus(code) => write!(f, "unexpected status {}", code),
        }
    }
}

impl QueryOutcome {
    /// Label used for metrics and logs
    pub fn label(&self) -> &'static str {
        match self {
            QueryOutcome::Positive => "positive",
            QueryOutcome::Negative => "negative",
            QueryOutcome::RateLimited { .. } => "rate_limited",
            QueryOutcome::Failed(FailureKind::Timeout) => "timeout",
            QueryOutcome::Failed(FailureKind::Network(_)) => "network_error",
            QueryOutcome::Failed(FailureKind::MalformedResponse(_)) => "malformed",
            QueryOutcome::Failed(FailureKind::UnexpectedStatus(_)) => "unexpected_status",
        }
    }
}

/// Anything able to answer a capability query for one organization
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    async fn query(&self, org_id: &OrgId) -> QueryOutcome;
}

/// Peppol directory search response (only the fields we need)
#[derive(Debug, Deserialize)]
struct DirectoryResponse {
    #[serde(rename = "total-result-count")]
    total_result_count: u64,
}

/// HTTP client for the Peppol directory search API
#[derive(Clone)]
pub struct PeppolDirectoryClient {
    http_client: Client,
    directory_url: String,
    participant_scheme: String,
}

impl PeppolDirectoryClient {
    /// Create a new directory client
    pub fn new(config: &CapabilityConfig) -> AppResult<Self> {
        let http_client = Client::builder()
            .user_agent(concat!("firmasok/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            directory_url: config.directory_url.clone(),
            participant_scheme: config.participant_scheme.clone(),
        })
    }

    /// Participant identifier in the directory's scheme representation
    ///
    /// `923609016` -> `iso6523-actorid-upis::0192:923609016`
    pub fn participant_id(&self, org_id: &OrgId) -> String {
        format!("{}:{}", self.participant_scheme, org_id)
    }

    fn query_url(&self, org_id: &OrgId) -> String {
        format!(
            "{}?participant={}",
            self.directory_url,
            urlencoding::encode(&self.participant_id(org_id))
        )
    }
}

#[async_trait]
impl DirectoryClient for PeppolDirectoryClient {
    async fn query(&self, org_id: &OrgId) -> QueryOutcome {
        let url = self.query_url(org_id);
        let start = std::time::Instant::now();

        debug!(org_id = %org_id, "directory_query");

        let outcome = match self.http_client.get(&url).send().await {
            Ok(response) => interpret_response(response).await,
            Err(e) if e.is_timeout() => QueryOutcome::Failed(FailureKind::Timeout),
            Err(e) => QueryOutcome::Failed(FailureKind::Network(e.to_string())),
        };

        metrics::record_directory_query(outcome.label(), start.elapsed().as_secs_f64());
        debug!(org_id = %org_id, outcome = outcome.label(), "directory_query_completed");

        outcome
    }
}

async fn interpret_response(response: reqwest::Response) -> QueryOutcome {
    match response.status() {
        StatusCode::OK => match response.json::<DirectoryResponse>().await {
            Ok(body) if body.total_result_count > 0 => QueryOutcome::Positive,
            Ok(_) => QueryOutcome::Negative,
            Err(e) if e.is_timeout() => QueryOutcome::Failed(FailureKind::Timeout),
            Err(e) => QueryOutcome::Failed(FailureKind::MalformedResponse(e.to_string())),
        },
        StatusCode::TOO_MANY_REQUESTS => QueryOutcome::RateLimited {
            retry_after: parse_retry_after(response.headers().get(RETRY_AFTER)),
        },
        status => QueryOutcome::Failed(FailureKind::UnexpectedStatus(status.as_u16())),
    }
}

/// Parse a delta-seconds `Retry-After` header; HTTP dates are ignored
fn parse_retry_after(value: Option<&reqwest::header::HeaderValue>) -> Option<Duration> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}
