/// Capability Resolver - Orchestrates cache, limiter and directory queries
use crate::{
    capability::{
        Capability, CapabilityCache, ConcurrencyLimiter, DirectoryClient, OrgId,
        PeppolDirectoryClient, RetryPolicy,
    },
    config::CapabilityConfig,
    error::{AppError, AppResult},
    metrics,
};
use chrono::Utc;
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::{task::JoinSet, time::Instant};
use tracing::{debug, warn};

/// Main capability resolver - one instance per process, cloned into handlers
#[derive(Clone)]
pub struct CapabilityResolver {
    cache: CapabilityCache,
    client: Arc<dyn DirectoryClient>,
    limiter: ConcurrencyLimiter,
    policy: RetryPolicy,
}

/// One answer per input identifier, in input order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResolution {
    entries: Vec<(String, bool)>,
    by_id: HashMap<String, bool>,
}

impl BatchResolution {
    fn from_entries(entries: Vec<(String, bool)>) -> Self {
        let by_id = entries.iter().cloned().collect();
        Self { entries, by_id }
    }

    /// Number of answers; equals the number of inputs, duplicates included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, org_id: &str) -> Option<bool> {
        self.by_id.get(org_id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.entries.iter().map(|(id, supported)| (id.as_str(), *supported))
    }

    /// Collapse into a map keyed by the caller's identifiers
    pub fn into_map(self) -> HashMap<String, bool> {
        self.by_id
    }
}

impl CapabilityResolver {
    /// Create a resolver from explicit parts
    pub fn new(
        cache: CapabilityCache,
        client: Arc<dyn DirectoryClient>,
        limiter: ConcurrencyLimiter,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            cache,
            client,
            limiter,
            policy,
        }
    }

    /// Create a resolver backed by the Peppol directory
    pub fn from_config(config: &CapabilityConfig) -> AppResult<Self> {
        let ttl = i64::try_from(config.cache_ttl_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "Capability TTL out of range: {} seconds",
                    config.cache_ttl_secs
                ))
            })?;

        let client = PeppolDirectoryClient::new(config)?;
        Ok(Self::new(
            CapabilityCache::new(ttl),
            Arc::new(client),
            ConcurrencyLimiter::new(config.max_concurrent_lookups),
            RetryPolicy::from_config(config),
        ))
    }

    pub fn cache(&self) -> &CapabilityCache {
        &self.cache
    }

    pub fn limiter(&self) -> &ConcurrencyLimiter {
        &self.limiter
    }

    /// Resolve one identifier, keeping "unknown" distinct from a confirmed negative
    ///
    /// Resolution order:
    /// 1. Check cache first (fast path)
    /// 2. Wait for a limiter slot
    /// 3. Re-check cache (a sibling may have resolved it meanwhile)
    /// 4. Query the directory under the retry policy
    /// 5. Cache confirmed answers only
    pub async fn resolve(&self, org_id: &OrgId) -> Capability {
        if org_id.is_empty() {
            return Capability::Unknown;
        }

        if let Some(supported) = self.cache.get(org_id).await {
            metrics::record_cache_access("capability", true);
            debug!(org_id = %org_id, supported, "capability_cache_hit");
            return supported.into();
        }
        metrics::record_cache_access("capability", false);

        let _permit = match self.limiter.acquire().await {
            Ok(permit) => permit,
            Err(e) => {
                warn!(org_id = %org_id, error = %e, "capability_limiter_unavailable");
                metrics::record_capability_resolution("unknown");
                return Capability::Unknown;
            }
        };

        if let Some(supported) = self.cache.get(org_id).await {
            return supported.into();
        }

        match self.policy.run(self.client.as_ref(), org_id).await {
            Ok(supported) => {
                self.cache.put(org_id, supported, Utc::now()).await;
                metrics::record_capability_resolution(if supported {
                    "supported"
                } else {
                    "not_supported"
                });
                debug!(org_id = %org_id, supported, "capability_resolved");
                supported.into()
            }
            Err(failure) => {
                metrics::record_capability_resolution("unknown");
                warn!(org_id = %org_id, error = %failure, "capability_unresolved");
                Capability::Unknown
            }
        }
    }

    /// Resolve one identifier to the advisory boolean
    pub async fn resolve_one(&self, org_id: &str) -> bool {
        self.resolve(&OrgId::new(org_id)).await.is_supported()
    }

    /// Resolve many identifiers concurrently
    pub async fn resolve_many<S: AsRef<str>>(&self, org_ids: &[S]) -> BatchResolution {
        self.resolve_batch(org_ids, None).await
    }

    /// Resolve many identifiers, giving up on anything unresolved after `timeout`
    ///
    /// Outstanding directory calls are cancelled at the deadline and report `false`.
    pub async fn resolve_many_within<S: AsRef<str>>(
        &self,
        org_ids: &[S],
        timeout: Duration,
    ) -> BatchResolution {
        self.resolve_batch(org_ids, Some(Instant::now() + timeout))
            .await
    }

    async fn resolve_batch<S: AsRef<str>>(
        &self,
        org_ids: &[S],
        deadline: Option<Instant>,
    ) -> BatchResolution {
        let normalized: Vec<(String, OrgId)> = org_ids
            .iter()
            .map(|raw| (raw.as_ref().to_string(), OrgId::new(raw.as_ref())))
            .collect();

        let mut unique: Vec<OrgId> = normalized.iter().map(|(_, id)| id.clone()).collect();
        unique.sort();
        unique.dedup();

        debug!(
            requested = normalized.len(),
            unique = unique.len(),
            "capability_batch_started"
        );

        let resolved = self.resolve_unique(unique, deadline).await;

        let entries = normalized
            .into_iter()
            .map(|(raw, id)| {
                let capability = resolved.get(&id).copied().unwrap_or(Capability::Unknown);
                (raw, capability.is_supported())
            })
            .collect();

        BatchResolution::from_entries(entries)
    }

    async fn resolve_unique(
        &self,
        unique: Vec<OrgId>,
        deadline: Option<Instant>,
    ) -> HashMap<OrgId, Capability> {
        let mut results = HashMap::with_capacity(unique.len());
        let mut tasks = JoinSet::new();

        for org_id in unique {
            let resolver = self.clone();

            tasks.spawn(async move {
                let capability = match deadline {
                    Some(deadline) => {
                        match tokio::time::timeout_at(deadline, resolver.resolve(&org_id)).await {
                            Ok(capability) => capability,
                            Err(_) => {
                                warn!(org_id = %org_id, "capability_deadline_exceeded");
                                metrics::record_capability_resolution("deadline_exceeded");
                                Capability::Unknown
                            }
                        }
                    }
                    None => resolver.resolve(&org_id).await,
                };
                (org_id, capability)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((org_id, capability)) => {
                    results.insert(org_id, capability);
                }
                Err(e) => warn!("Capability task join error: {}", e),
            }
        }

        results
    }
}
