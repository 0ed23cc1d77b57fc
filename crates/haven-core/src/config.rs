//! Engine-wide configuration, loaded from environment variables with
//! documented defaults for every field.

use std::path::PathBuf;
use std::time::Duration;

/// Configuration shared by the orchestrator, cache, and composer crates.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Root directory for all generated and uploaded artifacts.
    pub grid_storage: PathBuf,
    /// How often the orchestrator's ticker drains its queue and scans for
    /// due auto-regenerations.
    pub orchestrator_tick: Duration,
    /// Lower bound of the randomised startup delay before the orchestrator's
    /// first tick.
    pub orchestrator_initial_delay_min: Duration,
    /// Upper bound of the randomised startup delay before the orchestrator's
    /// first tick.
    pub orchestrator_initial_delay_max: Duration,
    /// How often the background pre-generator sweeps tenants.
    pub pregenerator_tick: Duration,
    /// Lower bound of the pre-generator's randomised startup delay.
    pub pregenerator_initial_delay_min: Duration,
    /// Upper bound of the pre-generator's randomised startup delay.
    pub pregenerator_initial_delay_max: Duration,
    /// Maximum number of entries in the large-tile LRU memory cache.
    pub large_tile_memory_capacity: u64,
    /// Maximum number of keys in the large-tile negative cache.
    pub large_tile_negative_capacity: u64,
    /// Time-to-live of a negative cache entry.
    pub large_tile_negative_ttl: Duration,
    /// Concurrency limit on zoom-0 large-tile generation (the only path that
    /// touches the source-tile catalog).
    pub catalog_semaphore_permits: usize,
    /// Worker count for `GenerateMissingTiles` batch pre-generation.
    pub batch_parallelism: usize,
    /// WebP encode quality, 0.0..=100.0.
    pub webp_quality: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            grid_storage: PathBuf::from("map"),
            orchestrator_tick: Duration::from_secs(30),
            orchestrator_initial_delay_min: Duration::from_secs(5),
            orchestrator_initial_delay_max: Duration::from_secs(30),
            pregenerator_tick: Duration::from_secs(30),
            pregenerator_initial_delay_min: Duration::from_secs(30),
            pregenerator_initial_delay_max: Duration::from_secs(90),
            large_tile_memory_capacity: 500,
            large_tile_negative_capacity: 10_000,
            large_tile_negative_ttl: Duration::from_secs(300),
            catalog_semaphore_permits: 8,
            batch_parallelism: 4,
            webp_quality: 85.0,
        }
    }
}

impl EngineConfig {
    /// Load configuration from `HAVEN_*` environment variables, falling back
    /// to [`EngineConfig::default`] for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            grid_storage: std::env::var("HAVEN_GRID_STORAGE")
                .map(PathBuf::from)
                .unwrap_or(defaults.grid_storage),
            orchestrator_tick: env_secs("HAVEN_ORCHESTRATOR_TICK_SECS", defaults.orchestrator_tick),
            large_tile_memory_capacity: env_u64(
                "HAVEN_LARGE_TILE_MEMORY_CAPACITY",
                defaults.large_tile_memory_capacity,
            ),
            large_tile_negative_capacity: env_u64(
                "HAVEN_LARGE_TILE_NEGATIVE_CAPACITY",
                defaults.large_tile_negative_capacity,
            ),
            large_tile_negative_ttl: env_secs(
                "HAVEN_LARGE_TILE_NEGATIVE_TTL_SECS",
                defaults.large_tile_negative_ttl,
            ),
            catalog_semaphore_permits: env_usize(
                "HAVEN_CATALOG_SEMAPHORE_PERMITS",
                defaults.catalog_semaphore_permits,
            ),
            batch_parallelism: env_usize("HAVEN_BATCH_PARALLELISM", defaults.batch_parallelism),
            webp_quality: std::env::var("HAVEN_WEBP_QUALITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.webp_quality),
            ..defaults
        }
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = EngineConfig::default();
        assert_eq!(c.large_tile_memory_capacity, 500);
        assert_eq!(c.catalog_semaphore_permits, 8);
        assert_eq!(c.webp_quality, 85.0);
    }

    #[test]
    fn test_from_env_falls_back_to_defaults() {
        std::env::remove_var("HAVEN_WEBP_QUALITY");
        let c = EngineConfig::from_env();
        assert_eq!(c.webp_quality, 85.0);
    }
}
