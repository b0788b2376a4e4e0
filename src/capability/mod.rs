/// EHF Capability Resolution
///
/// Determines whether an organization can receive EHF invoices by querying
/// the Peppol directory, with a TTL cache, bounded retry and a process-wide
/// limit on concurrent directory queries.

pub mod cache;
pub mod client;
pub mod limiter;
pub mod resolver;
pub mod retry;

pub use cache::CapabilityCache;
pub use client::{DirectoryClient, FailureKind, PeppolDirectoryClient, QueryOutcome};
pub use limiter::ConcurrencyLimiter;
pub use resolver::CapabilityResolver;
pub use retry::{ResolveFailure, RetryPolicy};

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Normalized organization number used as cache and query key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct OrgId(String);

impl OrgId {
    /// Build an OrgId, stripping all whitespace ("923 609 016" -> "923609016")
    pub fn new(raw: &str) -> Self {
        Self(raw.chars().filter(|c| !c.is_whitespace()).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when the identifier looks like a registry number (digits only)
    pub fn is_numeric(&self) -> bool {
        !self.0.is_empty() && self.0.chars().all(|c| c.is_ascii_digit())
    }
}

impl fmt::Display for OrgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OrgId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// A confirmed capability observation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityRecord {
    pub org_id: OrgId,
    pub supported: bool,
    pub observed_at: DateTime<Utc>,
}

/// Resolution result before it is collapsed to a boolean
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Capability {
    Supported,
    NotSupported,
    /// Lookup failed; not a confirmed negative
    Unknown,
}

impl Capability {
    /// Collapse to the advisory boolean shown to callers
    pub fn is_supported(self) -> bool {
        matches!(self, Capability::Supported)
    }

    pub fn is_confirmed(self) -> bool {
        !matches!(self, Capability::Unknown)
    }
}

impl From<bool> for Capability {
    fn from(supported: bool) -> Self {
        if supported {
            Capability::Supported
        } else {
            Capability::NotSupported
        }
    }
}
