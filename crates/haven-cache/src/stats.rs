//! Per-tenant operator statistics, separated from counting logic the way the
//! teacher's cache stats module keeps counters apart from exposition.

use dashmap::DashMap;
use haven_core::TenantId;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Atomics backing one tenant's counters; cheap to update from any task.
#[derive(Default)]
pub struct TenantCounters {
    memory_hits: AtomicU64,
    disk_hits: AtomicU64,
    negative_hits: AtomicU64,
    coalesced: AtomicU64,
    generated: AtomicU64,
    failed: AtomicU64,
    dirty_invalidated: AtomicU64,
    generation_millis: AtomicI64,
}

/// Point-in-time snapshot of one tenant's counters, safe to serialise or log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStatsSnapshot {
    /// Memory-tier hits.
    pub memory_hits: u64,
    /// Disk-tier hits.
    pub disk_hits: u64,
    /// Negative-cache hits.
    pub negative_hits: u64,
    /// Requests that coalesced onto an in-flight generation.
    pub coalesced: u64,
    /// Tiles successfully generated.
    pub generated: u64,
    /// Generation attempts that failed.
    pub failed: u64,
    /// Dirty-invalidation events applied.
    pub dirty_invalidated: u64,
    /// Cumulative time spent generating, in milliseconds.
    pub generation_millis: i64,
}

impl TenantCounters {
    fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            memory_hits: self.memory_hits.load(Ordering::Relaxed),
            disk_hits: self.disk_hits.load(Ordering::Relaxed),
            negative_hits: self.negative_hits.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            generated: self.generated.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            dirty_invalidated: self.dirty_invalidated.load(Ordering::Relaxed),
            generation_millis: self.generation_millis.load(Ordering::Relaxed),
        }
    }
}

/// Registry of per-tenant counters, keyed by tenant id.
#[derive(Default)]
pub struct CacheStats {
    by_tenant: DashMap<TenantId, TenantCounters>,
}

impl CacheStats {
    /// Build an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a memory-tier hit.
    pub fn record_memory_hit(&self, tenant: &TenantId) {
        self.entry(tenant).memory_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a disk-tier hit.
    pub fn record_disk_hit(&self, tenant: &TenantId) {
        self.entry(tenant).disk_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a negative-cache hit.
    pub fn record_negative_hit(&self, tenant: &TenantId) {
        self.entry(tenant).negative_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a request that coalesced onto an in-flight generation.
    pub fn record_coalesced(&self, tenant: &TenantId) {
        self.entry(tenant).coalesced.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful generation, with its duration.
    pub fn record_generated(&self, tenant: &TenantId, duration: std::time::Duration) {
        let entry = self.entry(tenant);
        entry.generated.fetch_add(1, Ordering::Relaxed);
        entry.generation_millis.fetch_add(duration.as_millis() as i64, Ordering::Relaxed);
    }

    /// Record a failed generation attempt.
    pub fn record_failed(&self, tenant: &TenantId) {
        self.entry(tenant).failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a dirty-invalidation application.
    pub fn record_dirty(&self, tenant: &TenantId) {
        self.entry(tenant).dirty_invalidated.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot one tenant's counters, zeroed if none have been recorded.
    pub fn snapshot(&self, tenant: &TenantId) -> CacheStatsSnapshot {
        self.by_tenant.get(tenant).map(|c| c.snapshot()).unwrap_or_default()
    }

    fn entry(&self, tenant: &TenantId) -> dashmap::mapref::one::RefMut<'_, TenantId, TenantCounters> {
        self.by_tenant.entry(tenant.clone()).or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let stats = CacheStats::new();
        let tenant: TenantId = "t1".into();
        stats.record_memory_hit(&tenant);
        stats.record_memory_hit(&tenant);
        stats.record_generated(&tenant, std::time::Duration::from_millis(50));
        let snap = stats.snapshot(&tenant);
        assert_eq!(snap.memory_hits, 2);
        assert_eq!(snap.generated, 1);
        assert_eq!(snap.generation_millis, 50);
    }

    #[test]
    fn test_unknown_tenant_snapshot_is_zero() {
        let stats = CacheStats::new();
        let snap = stats.snapshot(&"nobody".into());
        assert_eq!(snap, CacheStatsSnapshot::default());
    }
}
