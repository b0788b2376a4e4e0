/// Configuration management for FirmaSøk
use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::env;

/// Longest accepted capability TTL (one year)
pub const MAX_CAPABILITY_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// Log filter used when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "firmasok=debug,tower_http=debug";

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub registry: RegistryConfig,
    pub capability: CapabilityConfig,
    pub email: Option<EmailConfig>,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    pub version: String,
}

/// Enhetsregisteret configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Base URL, without trailing slash (e.g. https://data.brreg.no/enhetsregisteret/api)
    pub base_url: String,
    /// Page size for name searches
    pub search_size: u32,
    pub timeout_secs: u64,
}

/// Capability (EHF) resolution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityConfig {
    /// Peppol directory search endpoint
    pub directory_url: String,
    /// Participant scheme prefix joined to the org number with `:`
    pub participant_scheme: String,
    pub cache_ttl_secs: u64,
    pub max_concurrent_lookups: usize,
    pub request_timeout_secs: u64,
    pub retry_max_attempts: u32,
    pub retry_initial_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    pub retry_transient: u32,
    /// Upper bound for one batch resolution issued by the HTTP layer
    pub batch_deadline_secs: u64,
}

/// Email configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_url: String,
    pub from_address: String,
    pub feedback_address: String,
}

/// Inbound rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub requests_per_second: u32,
    pub burst_size: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directives
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for CapabilityConfig {
    fn default() -> Self {
        Self {
            directory_url: "https://directory.peppol.eu/search/1.0/json".to_string(),
            participant_scheme: "iso6523-actorid-upis::0192".to_string(),
            cache_ttl_secs: 86400,
            max_concurrent_lookups: 5,
            request_timeout_secs: 10,
            retry_max_attempts: 5,
            retry_initial_delay_ms: 500,
            retry_max_delay_ms: 8000,
            retry_transient: 2,
            batch_deadline_secs: 30,
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: "https://data.brreg.no/enhetsregisteret/api".to_string(),
            search_size: 20,
            timeout_secs: 10,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> AppResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("FIRMASOK_HOSTNAME").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("FIRMASOK_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| AppError::Validation("Invalid port number".to_string()))?;
        let version = env::var("FIRMASOK_VERSION")
            .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string());

        let registry_defaults = RegistryConfig::default();
        let registry = RegistryConfig {
            base_url: env::var("FIRMASOK_REGISTRY_URL")
                .unwrap_or(registry_defaults.base_url)
                .trim_end_matches('/')
                .to_string(),
            search_size: env_parse("FIRMASOK_REGISTRY_SEARCH_SIZE", registry_defaults.search_size),
            timeout_secs: env_parse("FIRMASOK_REGISTRY_TIMEOUT_SECS", registry_defaults.timeout_secs),
        };

        let defaults = CapabilityConfig::default();
        let capability = CapabilityConfig {
            directory_url: env::var("FIRMASOK_DIRECTORY_URL").unwrap_or(defaults.directory_url),
            participant_scheme: env::var("FIRMASOK_PARTICIPANT_SCHEME")
                .unwrap_or(defaults.participant_scheme),
            cache_ttl_secs: env_parse("FIRMASOK_CAPABILITY_TTL_SECS", defaults.cache_ttl_secs),
            max_concurrent_lookups: env_parse(
                "FIRMASOK_MAX_CONCURRENT_LOOKUPS",
                defaults.max_concurrent_lookups,
            ),
            request_timeout_secs: env_parse(
                "FIRMASOK_DIRECTORY_TIMEOUT_SECS",
                defaults.request_timeout_secs,
            ),
            retry_max_attempts: env_parse("FIRMASOK_RETRY_MAX_ATTEMPTS", defaults.retry_max_attempts),
            retry_initial_delay_ms: env_parse(
                "FIRMASOK_RETRY_INITIAL_DELAY_MS",
                defaults.retry_initial_delay_ms,
            ),
            retry_max_delay_ms: env_parse("FIRMASOK_RETRY_MAX_DELAY_MS", defaults.retry_max_delay_ms),
            retry_transient: env_parse("FIRMASOK_RETRY_TRANSIENT", defaults.retry_transient),
            batch_deadline_secs: env_parse(
                "FIRMASOK_BATCH_DEADLINE_SECS",
                defaults.batch_deadline_secs,
            ),
        };

        let email = if let Ok(smtp_url) = env::var("FIRMASOK_EMAIL_SMTP_URL") {
            let from_address = env::var("FIRMASOK_EMAIL_FROM_ADDRESS")
                .unwrap_or_else(|_| format!("noreply@{}", hostname));
            Some(EmailConfig {
                smtp_url,
                feedback_address: env::var("FIRMASOK_FEEDBACK_TO_ADDRESS")
                    .unwrap_or_else(|_| from_address.clone()),
                from_address,
            })
        } else {
            None
        };

        let rate_limit = RateLimitConfig {
            enabled: env_parse("FIRMASOK_RATE_LIMITS_ENABLED", true),
            requests_per_second: env_parse("FIRMASOK_RATE_LIMIT_RPS", 20),
            burst_size: env_parse("FIRMASOK_RATE_LIMIT_BURST", 40),
        };

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string());

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                version,
            },
            registry,
            capability,
            email,
            rate_limit,
            logging: LoggingConfig {
                level: log_level,
                json: env::var("FIRMASOK_LOG_FORMAT")
                    .map(|f| f.eq_ignore_ascii_case("json"))
                    .unwrap_or(false),
            },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.service.hostname.is_empty() {
            return Err(AppError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.registry.base_url.is_empty() || self.capability.directory_url.is_empty() {
            return Err(AppError::Validation(
                "Registry and directory URLs must be set".to_string(),
            ));
        }

        let cap = &self.capability;
        if cap.max_concurrent_lookups == 0 {
            return Err(AppError::Validation(
                "Max concurrent lookups must be at least 1".to_string(),
            ));
        }
        if cap.retry_max_attempts == 0 {
            return Err(AppError::Validation(
                "Retry attempts must be at least 1".to_string(),
            ));
        }
        if cap.retry_initial_delay_ms > cap.retry_max_delay_ms {
            return Err(AppError::Validation(
                "Initial retry delay cannot exceed max retry delay".to_string(),
            ));
        }
        if cap.cache_ttl_secs == 0 {
            return Err(AppError::Validation("Capability TTL cannot be zero".to_string()));
        }
        if cap.cache_ttl_secs > MAX_CAPABILITY_TTL_SECS {
            return Err(AppError::Validation(format!(
                "Capability TTL cannot exceed {} seconds",
                MAX_CAPABILITY_TTL_SECS
            )));
        }

        Ok(())
    }
}

/// Parse an environment variable, falling back to `default` when unset or invalid
fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
