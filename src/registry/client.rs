/// Registry Client - HTTP access to Enhetsregisteret
use crate::{
    capability::OrgId,
    config::RegistryConfig,
    error::{AppError, AppResult},
    metrics,
    registry::{Entity, Subunit},
};
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use std::{collections::HashSet, time::Duration};
use tracing::{debug, warn};

/// Page size used when listing subunits of an entity
const SUBUNIT_PAGE_SIZE: u32 = 100;

/// Hard stop for subunit pagination (registry caps paging at 10 000 rows)
const MAX_SUBUNIT_PAGES: u32 = 100;

/// Paged list response (`_embedded` + `page`)
#[derive(Debug, Deserialize)]
struct PagedResponse<T> {
    #[serde(rename = "_embedded", default = "Embedded::empty")]
    embedded: Embedded<T>,
    #[serde(default)]
    page: PageInfo,
}

#[derive(Debug, Deserialize)]
struct Embedded<T> {
    #[serde(alias = "enheter", alias = "underenheter")]
    items: Vec<T>,
}

impl<T> Embedded<T> {
    fn empty() -> Self {
        Self { items: Vec::new() }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    #[serde(default)]
    total_pages: u32,
    #[serde(default)]
    number: u32,
}

/// Enhetsregisteret client
#[derive(Clone)]
pub struct RegistryClient {
    http_client: Client,
    base_url: String,
    search_size: u32,
}

impl RegistryClient {
    /// Create a new registry client
    pub fn new(config: &RegistryConfig) -> AppResult<Self> {
        let http_client = Client::builder()
            .user_agent(concat!("firmasok/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            search_size: config.search_size,
        })
    }

    /// Fetch a main entity; `None` when the number is not a main entity
    pub async fn get_entity(&self, org_id: &OrgId) -> AppResult<Option<Entity>> {
        let url = format!("{}/enheter/{}", self.base_url, urlencoding::encode(org_id.as_str()));
        self.get_optional("get_entity", &url).await
    }

    /// Fetch a subunit; `None` when the number is not a subunit
    pub async fn get_subunit(&self, org_id: &OrgId) -> AppResult<Option<Subunit>> {
        let url = format!(
            "{}/underenheter/{}",
            self.base_url,
            urlencoding::encode(org_id.as_str())
        );
        self.get_optional("get_subunit", &url).await
    }

    /// Fetch a subunit together with its parent entity
    pub async fn get_subunit_with_parent(
        &self,
        org_id: &OrgId,
    ) -> AppResult<Option<(Subunit, Option<Entity>)>> {
        let Some(subunit) = self.get_subunit(org_id).await? else {
            return Ok(None);
        };

        let parent = match subunit.parent.as_deref() {
            Some(parent) => self.get_entity(&OrgId::new(parent)).await?,
            None => None,
        };

        Ok(Some((subunit, parent)))
    }

    /// List every subunit of an entity, following pagination
    pub async fn list_subunits(&self, parent: &OrgId) -> AppResult<Vec<Subunit>> {
        let mut subunits = Vec::new();
        let mut seen = HashSet::new();
        let mut page = 0;

        loop {
            let url = format!(
                "{}/underenheter?overordnetEnhet={}&size={}&page={}",
                self.base_url,
                urlencoding::encode(parent.as_str()),
                SUBUNIT_PAGE_SIZE,
                page
            );

            let response: PagedResponse<Subunit> = self.get_json("list_subunits", &url).await?;

            for subunit in response.embedded.items {
                if seen.insert(subunit.org_number.clone()) {
                    subunits.push(subunit);
                }
            }

            let last_page = response.page.total_pages.saturating_sub(1);
            if response.page.number >= last_page || page + 1 >= MAX_SUBUNIT_PAGES {
                break;
            }
            page += 1;
        }

        debug!(parent = %parent, count = subunits.len(), "registry_subunits_listed");
        Ok(subunits)
    }

    /// Search main entities by name
    pub async fn search_entities(&self, name: &str) -> AppResult<Vec<Entity>> {
        let url = format!(
            "{}/enheter?navn={}&size={}",
            self.base_url,
            urlencoding::encode(name),
            self.search_size
        );
        let response: PagedResponse<Entity> = self.get_json("search_entities", &url).await?;
        Ok(response.embedded.items)
    }

    /// Search subunits by name
    pub async fn search_subunits(&self, name: &str) -> AppResult<Vec<Subunit>> {
        let url = format!(
            "{}/underenheter?navn={}&size={}",
            self.base_url,
            urlencoding::encode(name),
            self.search_size
        );
        let response: PagedResponse<Subunit> = self.get_json("search_subunits", &url).await?;
        Ok(response.embedded.items)
    }

    /// GET returning `None` on 404/410 (unknown or deleted unit)
    async fn get_optional<T: DeserializeOwned>(
        &self,
        operation: &str,
        url: &str,
    ) -> AppResult<Option<T>> {
        let response = self.send(operation, url).await?;

        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::GONE => {
                metrics::record_registry_request(operation, true);
                Ok(None)
            }
            status if status.is_success() => {
                let body = response.json().await.map_err(|e| {
                    metrics::record_registry_request(operation, false);
                    AppError::Registry(format!("Invalid registry response: {}", e))
                })?;
                metrics::record_registry_request(operation, true);
                Ok(Some(body))
            }
            status => {
                metrics::record_registry_request(operation, false);
                warn!(operation, %status, "registry_request_failed");
                Err(AppError::Registry(format!("Registry returned error: {}", status)))
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, operation: &str, url: &str) -> AppResult<T> {
        let response = self.send(operation, url).await?;

        if !response.status().is_success() {
            metrics::record_registry_request(operation, false);
            warn!(operation, status = %response.status(), "registry_request_failed");
            return Err(AppError::Registry(format!(
                "Registry returned error: {}",
                response.status()
            )));
        }

        let body = response.json().await.map_err(|e| {
            metrics::record_registry_request(operation, false);
            AppError::Registry(format!("Invalid registry response: {}", e))
        })?;
        metrics::record_registry_request(operation, true);
        Ok(body)
    }

    async fn send(&self, operation: &str, url: &str) -> AppResult<reqwest::Response> {
        debug!(operation, url, "registry_request");

        self.http_client.get(url).send().await.map_err(|e| {
            metrics::record_registry_request(operation, false);
            AppError::Registry(format!("Failed to reach registry: {}", e))
        })
    }
}
