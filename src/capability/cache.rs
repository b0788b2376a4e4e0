/// Capability Cache - In-memory TTL cache of confirmed capability lookups
use crate::capability::{CapabilityRecord, OrgId};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Capability cache shared by every resolution path
#[derive(Clone)]
pub struct CapabilityCache {
    entries: Arc<RwLock<HashMap<OrgId, CapabilityRecord>>>,
    /// How long a confirmed result is trusted (default: 24 hours)
    ttl: Duration,
}

impl Default for CapabilityCache {
    fn default() -> Self {
        Self::new(Duration::hours(24))
    }
}

impl CapabilityCache {
    /// Create a new cache with the given TTL
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Get the cached flag if present and unexpired
    pub async fn get(&self, org_id: &OrgId) -> Option<bool> {
        self.get_at(org_id, Utc::now()).await
    }

    /// Get the cached flag as seen at `now`
    pub async fn get_at(&self, org_id: &OrgId, now: DateTime<Utc>) -> Option<bool> {
        let entries = self.entries.read().await;
        entries
            .get(org_id)
            .filter(|record| self.is_fresh(record, now))
            .map(|record| record.supported)
    }

    /// Store a confirmed result, replacing any previous entry
    pub async fn put(&self, org_id: &OrgId, supported: bool, observed_at: DateTime<Utc>) {
        let record = CapabilityRecord {
            org_id: org_id.clone(),
            supported,
            observed_at,
        };

        let mut entries = self.entries.write().await;
        entries.insert(org_id.clone(), record);
    }

    /// Number of physically stored entries, expired ones included
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Drop entries that are already past their expiry, returning how many were removed
    pub async fn purge_expired(&self) -> usize {
        self.purge_expired_at(Utc::now()).await
    }

    pub async fn purge_expired_at(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, record| self.is_fresh(record, now));
        before - entries.len()
    }

    /// An expiry past the end of the calendar never arrives
    fn is_fresh(&self, record: &CapabilityRecord, now: DateTime<Utc>) -> bool {
        record
            .observed_at
            .checked_add_signed(self.ttl)
            .map_or(true, |expires_at| now < expires_at)
    }
}
