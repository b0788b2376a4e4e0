/// Application context and dependency injection
use crate::{
    capability::CapabilityResolver,
    config::ServerConfig,
    error::AppResult,
    mailer::Mailer,
    rate_limit::RateLimiter,
    registry::RegistryClient,
};
use std::{sync::Arc, time::Instant};

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    // Enhetsregisteret lookups
    pub registry: Arc<RegistryClient>,
    // EHF capability resolution (owns the shared cache and limiter)
    pub capability_resolver: Arc<CapabilityResolver>,
    // Inbound rate limiter
    pub rate_limiter: Arc<RateLimiter>,
    // Feedback mailer
    pub mailer: Arc<Mailer>,
    pub started_at: Instant,
}

impl AppContext {
    /// Create a new application context from configuration
    pub fn new(config: ServerConfig) -> AppResult<Self> {
        // Validate configuration
        config.validate()?;

        let registry = RegistryClient::new(&config.registry)?;
        let capability_resolver = CapabilityResolver::from_config(&config.capability)?;

        tracing::info!(
            directory = %config.capability.directory_url,
            max_concurrent = config.capability.max_concurrent_lookups,
            ttl_secs = config.capability.cache_ttl_secs,
            "Capability resolver initialized"
        );

        Self::with_services(config, registry, capability_resolver)
    }

    /// Assemble a context around already constructed clients
    pub fn with_services(
        config: ServerConfig,
        registry: RegistryClient,
        capability_resolver: CapabilityResolver,
    ) -> AppResult<Self> {
        let rate_limiter = Arc::new(RateLimiter::new(&config.rate_limit));
        let mailer = Arc::new(Mailer::new(config.email.clone())?);

        Ok(Self {
            config: Arc::new(config),
            registry: Arc::new(registry),
            capability_resolver: Arc::new(capability_resolver),
            rate_limiter,
            mailer,
            started_at: Instant::now(),
        })
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }

    /// Deadline for one batch resolution issued by a request handler
    pub fn batch_deadline(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.config.capability.batch_deadline_secs)
    }
}
