//! The orchestrator (C9): single-flight per-public-map generation, tying
//! together the aligner, composer, pyramid builder, and marker extractor.

use crate::invalidate::Invalidator;
use crate::queue::RunQueue;
use crate::stats::{OrchestratorStats, OrchestratorStatsSnapshot};
use chrono::Utc;
use haven_catalog::{Catalog, GenerationStatus, PublicMap, PublicMapHmapSource, PublicMapTenantSource};
use haven_core::coord::{BlockCoord, Bounds, TileCoord};
use haven_core::{Error, PublicMapId, Result};
use haven_render::{render_grid, ResourceSource, TileResourceFetcher};
use haven_tiles::{
    align_tenant_sources, build_pyramid, build_unified_from_hmap_grids, build_unified_from_tenant_tiles, compose_tile,
    save_tile, tile_filename, AlignedSource, HmapGridBatch, MarkerCollector, TenantSourceGrids, TenantTileBatch, UnifiedMap,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Single-flight, multi-map generation engine for public maps.
pub struct Orchestrator {
    catalog: Arc<dyn Catalog>,
    fetcher: Arc<TileResourceFetcher>,
    grid_storage: PathBuf,
    running: Mutex<HashSet<String>>,
    queue: RunQueue,
    invalidator: Invalidator,
    stats: OrchestratorStats,
}

impl Orchestrator {
    /// Build an orchestrator over `catalog`, rooted at `grid_storage`, with
    /// `resource_source` resolving HMap texture references and an optional
    /// `invalidate_base_url` for the downstream viewer front-end.
    pub fn new(
        catalog: Arc<dyn Catalog>,
        resource_source: Arc<dyn ResourceSource>,
        grid_storage: impl Into<PathBuf>,
        invalidate_base_url: Option<String>,
    ) -> Self {
        let grid_storage = grid_storage.into();
        let fetcher = Arc::new(TileResourceFetcher::new(resource_source, grid_storage.join("hmap-tile-cache")));
        Self {
            catalog,
            fetcher,
            grid_storage,
            running: Mutex::new(HashSet::new()),
            queue: RunQueue::new(),
            invalidator: Invalidator::new(invalidate_base_url),
            stats: OrchestratorStats::new(),
        }
    }

    /// Operator counters.
    pub fn stats(&self) -> OrchestratorStatsSnapshot {
        self.stats.snapshot()
    }

    /// Enqueue `id` for the background ticker to drain, deduplicating.
    pub fn enqueue(&self, id: &PublicMapId) {
        self.queue.enqueue(id.as_str());
    }

    /// Drain one queued id, if any, running it to completion.
    pub async fn drain_one(&self) -> Option<Result<()>> {
        let id = self.queue.pop()?;
        Some(self.start(&PublicMapId::from(id)).await)
    }

    /// Every public map, used by the ticker's auto-regeneration scan.
    pub async fn list_public_maps(&self) -> Result<Vec<PublicMap>> {
        self.catalog.list_public_maps().await
    }

    /// Start generation for `id`. Rejects with a `Conflict` error if a run
    /// for this id is already in progress.
    #[tracing::instrument(skip(self), fields(id = %id))]
    pub async fn start(&self, id: &PublicMapId) -> Result<()> {
        {
            let mut running = self.running.lock();
            if running.contains(id.as_str()) {
                self.stats.record_rejected();
                return Err(Error::conflict(format!("public map '{id}' is already generating")));
            }
            running.insert(id.as_str().to_string());
        }
        self.stats.record_started();

        let result = self.run(id).await;

        self.running.lock().remove(id.as_str());
        match &result {
            Ok(()) => self.stats.record_completed(),
            Err(_) => self.stats.record_failed(),
        }
        result
    }

    async fn run(&self, id: &PublicMapId) -> Result<()> {
        let started = std::time::Instant::now();
        let mut map = self
            .catalog
            .get_public_map(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("public map '{id}'")))?;

        map.generation_status = GenerationStatus::Running;
        map.generation_progress = 0;
        map.generation_error = None;
        self.catalog.update_public_map(map.clone()).await?;

        let tenant_sources = self.catalog.list_tenant_sources(id).await?;
        let hmap_sources = self.catalog.list_hmap_sources(id).await?;

        if tenant_sources.is_empty() && hmap_sources.is_empty() {
            map.generation_status = GenerationStatus::Completed;
            map.tile_count = 0;
            map.generation_progress = 100;
            map.last_generated_at = Some(Utc::now());
            map.last_generation_duration_seconds = Some(started.elapsed().as_secs() as i64);
            self.catalog.update_public_map(map).await?;
            return Ok(());
        }

        let output_dir = self.grid_storage.join("public").join(id.as_str());
        let _ = tokio::fs::remove_dir_all(&output_dir).await;
        tokio::fs::create_dir_all(&output_dir).await?;

        let outcome = if !tenant_sources.is_empty() {
            self.run_tenant_path(&mut map, &tenant_sources, &output_dir).await
        } else {
            self.run_hmap_path(&mut map, &hmap_sources, &output_dir).await
        };

        match outcome {
            Ok((tile_count, bounds)) => {
                map.generation_status = GenerationStatus::Completed;
                map.tile_count = tile_count;
                if let Some(b) = bounds {
                    map.min_x = Some(b.min_x);
                    map.max_x = Some(b.max_x);
                    map.min_y = Some(b.min_y);
                    map.max_y = Some(b.max_y);
                }
                map.last_generated_at = Some(Utc::now());
                map.last_generation_duration_seconds = Some(started.elapsed().as_secs() as i64);
                map.generation_progress = 100;
                self.catalog.update_public_map(map).await?;
                self.invalidator.invalidate(id.as_str()).await;
                Ok(())
            }
            Err(e) => {
                map.generation_status = GenerationStatus::Failed;
                map.generation_error = Some(e.to_string());
                let _ = self.catalog.update_public_map(map).await;
                Err(e)
            }
        }
    }

    async fn persist_progress(&self, map: &mut PublicMap, pct: i32) -> Result<()> {
        let capped = pct.min(99).max(map.generation_progress);
        if capped == map.generation_progress {
            return Ok(());
        }
        map.generation_progress = capped;
        self.catalog.update_public_map(map.clone()).await
    }

    async fn run_tenant_path(
        &self,
        map: &mut PublicMap,
        sources: &[PublicMapTenantSource],
        output_dir: &Path,
    ) -> Result<(i64, Option<Bounds>)> {
        let mut ordered = sources.to_vec();
        ordered.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.added_at.cmp(&b.added_at)));

        let mut grid_batches = Vec::with_capacity(ordered.len());
        for s in &ordered {
            let grids = self.catalog.source_grids(&s.tenant_id, &s.map_id).await?;
            grid_batches.push(TenantSourceGrids {
                tenant_id: s.tenant_id.clone(),
                map_id: s.map_id.clone(),
                grids,
            });
        }
        let aligned: Vec<AlignedSource> = align_tenant_sources(&grid_batches);
        self.persist_progress(map, 10).await?;

        let mut tile_batches = Vec::with_capacity(ordered.len());
        for s in &ordered {
            let tiles = self.catalog.source_tiles(&s.tenant_id, &s.map_id).await?;
            let with_paths = tiles
                .into_iter()
                .map(|t| {
                    let path = self.grid_storage.join(&t.file);
                    (t, path)
                })
                .collect::<Vec<_>>();
            tile_batches.push(with_paths);
        }
        let batches: Vec<TenantTileBatch<'_>> = aligned
            .iter()
            .zip(tile_batches.iter())
            .map(|(aligned, tiles)| TenantTileBatch { aligned, tiles })
            .collect();
        let unified = build_unified_from_tenant_tiles(&batches);
        self.persist_progress(map, 25).await?;

        let bounds = Bounds::from_coords(unified.keys().copied());
        let (tile_count_0, written0) = self.compose_all(unified, output_dir.to_path_buf()).await?;
        self.persist_progress(map, 50).await?;

        let levels = self.build_pyramid_progressed(map, output_dir, written0).await?;
        let mut total = tile_count_0;
        for (_, set) in &levels {
            total += set.len() as i64;
        }

        let mut collector = MarkerCollector::new();
        for (al, s) in aligned.iter().zip(&ordered) {
            let markers = self.catalog.thingwall_markers(&s.tenant_id).await?;
            let grids = self.catalog.source_grids(&s.tenant_id, &s.map_id).await?;
            let coords: HashMap<String, (i64, i64)> = grids.into_iter().map(|g| (g.grid_id, (g.coord_x, g.coord_y))).collect();
            for marker in &markers {
                if let Some(&coord) = coords.get(&marker.grid_id) {
                    collector.add_tenant_marker(marker, coord, al.offset);
                }
            }
        }
        self.write_markers(output_dir, collector).await?;

        Ok((total, bounds))
    }

    async fn run_hmap_path(
        &self,
        map: &mut PublicMap,
        sources: &[PublicMapHmapSource],
        output_dir: &Path,
    ) -> Result<(i64, Option<Bounds>)> {
        let mut ordered = sources.to_vec();
        ordered.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.added_at.cmp(&b.added_at)));

        let mut decoded = Vec::with_capacity(ordered.len());
        for s in &ordered {
            let meta = self
                .catalog
                .get_hmap_source(&s.hmap_source_id)
                .await?
                .ok_or_else(|| Error::not_found(format!("HMap source '{}'", s.hmap_source_id)))?;
            let bytes = tokio::fs::read(self.grid_storage.join(&meta.file_path)).await?;
            let data = tokio::task::spawn_blocking(move || haven_hmap::decode_hmap(&bytes))
                .await
                .map_err(|e| Error::internal(e.to_string()))??;
            decoded.push((s.priority, data));
        }
        self.persist_progress(map, 15).await?;

        let mut texture_names = HashSet::new();
        for (_, data) in &decoded {
            for grid in &data.grids {
                for ts in &grid.tilesets {
                    texture_names.insert(ts.resource_name.clone());
                }
            }
        }
        self.fetcher.prefetch(texture_names).await;

        let mut rendered_batches = Vec::with_capacity(decoded.len());
        for (priority, data) in &decoded {
            let mut rendered = Vec::with_capacity(data.grids.len());
            for grid in &data.grids {
                let mut textures = HashMap::new();
                for ts in &grid.tilesets {
                    if let Some(img) = self.fetcher.get(&ts.resource_name).await {
                        textures.insert(ts.resource_name.clone(), img);
                    }
                }
                match render_grid(grid, &textures) {
                    Ok(img) => rendered.push((grid.clone(), Arc::new(img))),
                    Err(e) => tracing::warn!(error = %e, tile_x = grid.tile_x, tile_y = grid.tile_y, "skipping unrenderable grid"),
                }
            }
            rendered_batches.push((*priority, rendered));
        }
        let batches: Vec<HmapGridBatch<'_>> = rendered_batches
            .iter()
            .map(|(priority, grids)| HmapGridBatch {
                priority: *priority,
                offset: (0, 0),
                grids,
            })
            .collect();
        let unified = build_unified_from_hmap_grids(batches);
        self.persist_progress(map, 30).await?;

        let bounds = Bounds::from_coords(unified.keys().copied());
        let (tile_count_0, written0) = self.compose_all(unified, output_dir.to_path_buf()).await?;
        self.persist_progress(map, 50).await?;

        let levels = self.build_pyramid_progressed(map, output_dir, written0).await?;
        let mut total = tile_count_0;
        for (_, set) in &levels {
            total += set.len() as i64;
        }

        let mut collector = MarkerCollector::new();
        for (_, data) in &decoded {
            for marker in &data.markers {
                collector.add_hmap_marker(marker, (0, 0));
            }
        }
        self.write_markers(output_dir, collector).await?;

        Ok((total, bounds))
    }

    async fn compose_all(&self, unified: UnifiedMap, output_dir: PathBuf) -> Result<(i64, HashSet<BlockCoord>)> {
        let blocks: HashSet<BlockCoord> = unified.keys().map(|c: &TileCoord| c.block()).collect();
        let unified = Arc::new(unified);
        let mut tasks = Vec::with_capacity(blocks.len());
        for block in blocks {
            let unified = unified.clone();
            let output_dir = output_dir.clone();
            tasks.push(tokio::task::spawn_blocking(move || -> Result<Option<BlockCoord>> {
                match compose_tile(&unified, block) {
                    Some(img) => {
                        let path = output_dir.join("0").join(tile_filename(block.x, block.y));
                        save_tile(&img, &path)?;
                        Ok(Some(block))
                    }
                    None => Ok(None),
                }
            }));
        }

        let mut written = HashSet::new();
        for task in tasks {
            if let Some(block) = task.await.map_err(|e| Error::internal(e.to_string()))?? {
                written.insert(block);
            }
        }
        Ok((written.len() as i64, written))
    }

    async fn build_pyramid_progressed(
        &self,
        map: &mut PublicMap,
        output_dir: &Path,
        written0: HashSet<BlockCoord>,
    ) -> Result<Vec<(u32, HashSet<BlockCoord>)>> {
        let output_dir = output_dir.to_path_buf();
        let levels = tokio::task::spawn_blocking(move || build_pyramid(&output_dir, &written0))
            .await
            .map_err(|e| Error::internal(e.to_string()))??;
        for (zoom, _) in &levels {
            self.persist_progress(map, 50 + (*zoom as i32) * 50 / 6).await?;
        }
        Ok(levels)
    }

    async fn write_markers(&self, output_dir: &Path, collector: MarkerCollector) -> Result<()> {
        let markers = collector.into_markers();
        let json = haven_tiles::markers_to_json(&markers)?;
        tokio::fs::write(output_dir.join("markers.json"), json).await?;
        Ok(())
    }
}
