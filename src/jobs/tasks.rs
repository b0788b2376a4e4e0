/// Background task implementations
use crate::{context::AppContext, error::AppResult, metrics};

/// Drop expired capability entries and refresh the cache size gauge
pub async fn purge_capability_cache(ctx: &AppContext) -> AppResult<usize> {
    let cache = ctx.capability_resolver.cache();
    let purged = cache.purge_expired().await;
    metrics::CAPABILITY_CACHE_SIZE.set(cache.len().await as i64);
    Ok(purged)
}

/// Refresh the uptime gauge
pub async fn update_uptime(ctx: &AppContext) -> AppResult<()> {
    metrics::UPTIME_SECONDS.set(ctx.started_at.elapsed().as_secs_f64());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        capability::{CapabilityResolver, OrgId},
        config::{
            CapabilityConfig, LoggingConfig, RateLimitConfig, RegistryConfig, ServerConfig,
            ServiceConfig,
        },
        registry::RegistryClient,
    };
    use chrono::Utc;

    fn test_context() -> AppContext {
        let config = ServerConfig {
            service: ServiceConfig {
                hostname: "localhost".to_string(),
                port: 8080,
                version: "test".to_string(),
            },
            registry: RegistryConfig::default(),
            capability: CapabilityConfig::default(),
            email: None,
            rate_limit: RateLimitConfig {
                enabled: false,
                requests_per_second: 20,
                burst_size: 40,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                json: false,
            },
        };
        let registry = RegistryClient::new(&config.registry).unwrap();
        let resolver = CapabilityResolver::from_config(&config.capability).unwrap();
        AppContext::with_services(config, registry, resolver).unwrap()
    }

    #[tokio::test]
    async fn test_purge_removes_only_expired() {
        let ctx = test_context();
        let cache = ctx.capability_resolver.cache();
        let stale = Utc::now() - cache.ttl() - chrono::Duration::minutes(1);

        cache.put(&OrgId::new("111111111"), true, stale).await;
        cache.put(&OrgId::new("222222222"), false, Utc::now()).await;

        let purged = purge_capability_cache(&ctx).await.unwrap();

        assert_eq!(purged, 1);
        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.get(&OrgId::new("222222222")).await, Some(false));
    }

    #[tokio::test]
    async fn test_update_uptime() {
        let ctx = test_context();
        assert!(update_uptime(&ctx).await.is_ok());
        assert!(metrics::UPTIME_SECONDS.get() >= 0.0);
    }
}
