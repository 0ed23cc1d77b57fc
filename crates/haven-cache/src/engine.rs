//! The per-tenant large-tile cache (C10): `GetOrGenerate`, `MarkDirty`, and
//! `GenerateMissingTiles`, layered memory -> negative -> disk -> single-flight
//! generation exactly as specified.

use crate::key::CacheKey;
use crate::memory::{MemoryTier, NegativeTier};
use crate::stats::CacheStats;
use dashmap::DashMap;
use futures::FutureExt;
use haven_catalog::Catalog;
use haven_core::coord::{BlockCoord, TileCoord};
use haven_core::{EngineConfig, MapId, Result, TenantId};
use haven_tiles::source::{CellImage, UnifiedCell, UnifiedMap};
use haven_tiles::{compose_tile, insert_ranked};
use image::{imageops, Rgba, RgbaImage};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Notify, Semaphore};

const ANCESTOR_LEVELS: u32 = 6;

enum Slot {
    Pending(Arc<Notify>),
    Ready(Option<Arc<Vec<u8>>>),
}

/// The per-tenant large-tile cache engine. One instance is shared
/// process-wide via `Arc`.
pub struct CacheEngine {
    catalog: Arc<dyn Catalog>,
    grid_storage: PathBuf,
    config: EngineConfig,
    memory: MemoryTier,
    negative: NegativeTier,
    inflight: DashMap<CacheKey, Slot>,
    catalog_semaphore: Semaphore,
    stats: CacheStats,
}

impl CacheEngine {
    /// Build a cache engine over `catalog`, rooted at `grid_storage`.
    pub fn new(catalog: Arc<dyn Catalog>, grid_storage: impl Into<PathBuf>, config: EngineConfig) -> Self {
        let memory = MemoryTier::new(config.large_tile_memory_capacity);
        let negative = NegativeTier::new(config.large_tile_negative_capacity, config.large_tile_negative_ttl);
        let catalog_semaphore = Semaphore::new(config.catalog_semaphore_permits);
        Self {
            catalog,
            grid_storage: grid_storage.into(),
            config,
            memory,
            negative,
            inflight: DashMap::new(),
            catalog_semaphore,
            stats: CacheStats::new(),
        }
    }

    /// Snapshot this tenant's operator counters.
    pub fn stats(&self, tenant: &TenantId) -> crate::stats::CacheStatsSnapshot {
        self.stats.snapshot(tenant)
    }

    /// All known tenant ids, used by the background pre-generator.
    pub async fn list_active_tenants(&self) -> Result<Vec<TenantId>> {
        self.catalog.list_tenants().await
    }

    /// Resolve `(tenant, map, zoom, x, y)`, generating on demand.
    ///
    /// Returns an explicitly boxed future (rather than being declared
    /// `async fn`) because this function recurses indirectly through
    /// `generate_upper`; an opaque recursive future type defeats rustc's
    /// auto-trait (`Send`) inference, so the recursion boundary is boxed
    /// with an explicit `Send` bound here instead.
    pub fn get_or_generate<'a>(
        &'a self,
        tenant: &'a TenantId,
        map: &'a MapId,
        zoom: u32,
        x: i64,
        y: i64,
    ) -> futures::future::BoxFuture<'a, Result<Option<Arc<Vec<u8>>>>> {
        use tracing::Instrument;
        let span = tracing::info_span!("get_or_generate", %tenant, %map, zoom, x, y);
        async move {
            let key = CacheKey::new(tenant.clone(), map.clone(), zoom, x, y);

            if let Some(bytes) = self.memory.get(&key) {
                self.stats.record_memory_hit(tenant);
                return Ok(Some(bytes));
            }

            if self.negative.contains_fresh(&key) {
                self.stats.record_negative_hit(tenant);
                return Ok(None);
            }

            let disk_path = self.grid_storage.join(key.relative_path());
            if let Some(bytes) = read_disk(&disk_path).await {
                self.stats.record_disk_hit(tenant);
                let bytes = Arc::new(bytes);
                self.memory.put(key, bytes.clone());
                return Ok(Some(bytes));
            }

            self.coalesced_generate(key, disk_path).await
        }
        .instrument(span)
        .boxed()
    }

    async fn coalesced_generate(&self, key: CacheKey, disk_path: PathBuf) -> Result<Option<Arc<Vec<u8>>>> {
        loop {
            // Hold the shard guard until the `Notified` future is created so a
            // concurrent `insert(Ready)` + `notify_waiters()` on the generator
            // side can't land in the gap between reading `Pending` and
            // registering to wait for it.
            let entry = self.inflight.get(&key);
            match entry.as_deref() {
                Some(Slot::Ready(bytes)) => return Ok(bytes.clone()),
                Some(Slot::Pending(n)) => {
                    let owned = n.clone();
                    let notified = owned.notified();
                    drop(entry);
                    self.stats.record_coalesced(&key.tenant_id);
                    notified.await;
                    continue;
                }
                None => drop(entry),
            }

            let notify = Arc::new(Notify::new());
            match self.inflight.entry(key.clone()) {
                dashmap::mapref::entry::Entry::Vacant(v) => {
                    v.insert(Slot::Pending(notify.clone()));
                }
                dashmap::mapref::entry::Entry::Occupied(_) => continue,
            }

            let started = Instant::now();
            let result = self.generate(&key).await;
            let bytes = match &result {
                Ok(Some(bytes)) => {
                    self.stats.record_generated(&key.tenant_id, started.elapsed());
                    self.write_disk(&disk_path, bytes).await;
                    self.memory.put(key.clone(), bytes.clone());
                    Some(bytes.clone())
                }
                Ok(None) => {
                    self.negative.mark_absent(key.clone());
                    None
                }
                Err(_) => {
                    self.stats.record_failed(&key.tenant_id);
                    None
                }
            };

            self.inflight.insert(key.clone(), Slot::Ready(bytes.clone()));
            notify.notify_waiters();
            self.inflight.remove(&key);
            return result.map(|_| bytes);
        }
    }

    async fn generate(&self, key: &CacheKey) -> Result<Option<Arc<Vec<u8>>>> {
        let img = if key.zoom == 0 {
            self.generate_zoom0(key).await?
        } else {
            self.generate_upper(key).await?
        };
        let Some(img) = img else { return Ok(None) };
        Ok(Some(Arc::new(encode_webp(&img)?)))
    }

    async fn generate_zoom0(&self, key: &CacheKey) -> Result<Option<RgbaImage>> {
        let _permit = self
            .catalog_semaphore
            .acquire()
            .await
            .map_err(|e| haven_core::Error::internal(e.to_string()))?;

        let tiles = self.catalog.source_tiles(&key.tenant_id, &key.map_id).await?;
        let block = BlockCoord::new(key.x, key.y);
        let mut unified = UnifiedMap::new();
        for tile in &tiles {
            let coord = TileCoord::new(tile.coord_x, tile.coord_y);
            if coord.block() != block {
                continue;
            }
            insert_ranked(
                &mut unified,
                coord,
                UnifiedCell {
                    image: CellImage::Path(self.grid_storage.join(&tile.file)),
                    rank: tile.cache_timestamp,
                },
            );
        }
        Ok(compose_tile(&unified, block))
    }

    async fn generate_upper(&self, key: &CacheKey) -> Result<Option<RgbaImage>> {
        const TILE_SIZE: u32 = haven_tiles::CELL_SIZE * 4;
        const HALF: u32 = TILE_SIZE / 2;

        let mut canvas = RgbaImage::from_pixel(TILE_SIZE, TILE_SIZE, Rgba([0, 0, 0, 0]));
        let mut wrote_any = false;

        for (dqx, dqy) in [(0u32, 0u32), (1, 0), (0, 1), (1, 1)] {
            let child_x = key.x * 2 + dqx as i64;
            let child_y = key.y * 2 + dqy as i64;
            let Some(bytes) = self
                .get_or_generate(&key.tenant_id, &key.map_id, key.zoom - 1, child_x, child_y)
                .await?
            else {
                continue;
            };
            let Ok(img) = image::load_from_memory(&bytes) else {
                tracing::warn!(tenant = %key.tenant_id, "corrupt cached child tile during pyramid generation");
                continue;
            };
            let resized = imageops::resize(&img.to_rgba8(), HALF, HALF, imageops::FilterType::Nearest);
            imageops::overlay(&mut canvas, &resized, (dqx * HALF) as i64, (dqy * HALF) as i64);
            wrote_any = true;
        }

        Ok(wrote_any.then_some(canvas))
    }

    /// Invalidate the zoom-0 large tile covering `(base_x, base_y)` and its
    /// six ancestor levels, across memory, negative, and disk.
    pub async fn mark_dirty(&self, tenant: &TenantId, map: &MapId, base_x: i64, base_y: i64) {
        for key in CacheKey::dirty_chain(tenant, map, base_x, base_y, ANCESTOR_LEVELS) {
            self.memory.remove(&key);
            self.negative.remove(&key);
            let path = self.grid_storage.join(key.relative_path());
            let _ = tokio::fs::remove_file(&path).await;
            self.stats.record_dirty(tenant);
        }
    }

    /// Bulk pre-generate all missing large tiles for every map owned by
    /// `tenant`, zoom 0 from the catalog then zoom 1..6 from disk only.
    /// Returns the number of tiles generated per zoom level, in zoom order.
    pub async fn generate_missing_tiles(&self, tenant: &TenantId) -> Result<Vec<(u32, usize)>> {
        let mut counts = Vec::new();
        for map in self.catalog.list_tenant_maps(tenant).await? {
            let tiles = self.catalog.source_tiles(tenant, &map).await?;
            let required: HashSet<BlockCoord> = tiles
                .iter()
                .map(|t| TileCoord::new(t.coord_x, t.coord_y).block())
                .collect();

            let mut written = HashSet::new();
            let mut remaining: Vec<_> = required.into_iter().collect();
            while !remaining.is_empty() {
                let batch: Vec<_> = remaining.drain(..remaining.len().min(self.config.batch_parallelism)).collect();
                let results = futures::future::join_all(batch.iter().map(|b| self.get_or_generate(tenant, &map, 0, b.x, b.y))).await;
                for (block, result) in batch.into_iter().zip(results) {
                    if matches!(result, Ok(Some(_))) {
                        written.insert(block);
                    }
                }
            }
            counts.push((0u32, written.len()));

            let mut children = written;
            for zoom in 1..=haven_tiles::MAX_ZOOM {
                let parents: HashSet<BlockCoord> = children.iter().map(|c| c.parent()).collect();
                let mut level_written = HashSet::new();
                for parent in &parents {
                    if matches!(self.get_or_generate(tenant, &map, zoom, parent.x, parent.y).await, Ok(Some(_))) {
                        level_written.insert(*parent);
                    }
                }
                counts.push((zoom, level_written.len()));
                if level_written.is_empty() {
                    break;
                }
                children = level_written;
            }
        }
        Ok(counts)
    }

    async fn write_disk(&self, path: &PathBuf, bytes: &[u8]) {
        if let Some(parent) = path.parent() {
            if tokio::fs::create_dir_all(parent).await.is_err() {
                return;
            }
        }
        if let Err(e) = tokio::fs::write(path, bytes).await {
            tracing::warn!(path = %path.display(), error = %e, "failed to write large tile to disk");
        }
    }
}

async fn read_disk(path: &PathBuf) -> Option<Vec<u8>> {
    tokio::fs::read(path).await.ok()
}

fn encode_webp(img: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    image::codecs::webp::WebPEncoder::new_lossless(&mut bytes)
        .encode(img.as_raw(), img.width(), img.height(), image::ColorType::Rgba8)
        .map_err(|e| haven_core::Error::internal(format!("webp encode failed: {e}")))?;
    Ok(bytes)
}
