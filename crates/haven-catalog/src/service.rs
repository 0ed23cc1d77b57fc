//! Public-map catalog service: CRUD, slug generation, and contribution analysis.

use crate::catalog_trait::Catalog;
use crate::models::{HmapSource, PublicMap, PublicMapHmapSource, PublicMapTenantSource};
use crate::slug::{disambiguate, slugify};
use chrono::Utc;
use haven_core::{Error, HmapSourceId, MapId, PublicMapId, Result, TenantId};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Bounds plus a cache-busting version, returned by [`CatalogService::get_bounds`].
#[derive(Debug, Clone, Copy)]
pub struct MapBounds {
    /// Minimum X (inclusive), `None` if the map has never generated any tiles.
    pub min_x: Option<i64>,
    /// See [`MapBounds::min_x`].
    pub max_x: Option<i64>,
    /// See [`MapBounds::min_x`].
    pub min_y: Option<i64>,
    /// See [`MapBounds::min_x`].
    pub max_y: Option<i64>,
    /// Unix-seconds timestamp of the most recent successful generation, or
    /// `None` if the map has never generated.
    pub tile_version: Option<i64>,
}

/// A tenant map available to be added as a public-map source.
#[derive(Debug, Clone)]
pub struct AvailableTenantMap {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Map identifier.
    pub map_id: MapId,
    /// Number of zoom-0 tiles this map currently has.
    pub tile_count: i64,
}

/// Per-source contribution counts from a contribution analysis run.
#[derive(Debug, Clone)]
pub struct SourceContribution {
    /// The HMap source analysed.
    pub hmap_source_id: HmapSourceId,
    /// Grid coordinates first claimed by this source (not held by a
    /// higher-priority source already processed).
    pub new_grids: i64,
    /// Grid coordinates already claimed by a higher-priority source.
    pub overlapping_grids: i64,
}

/// Result of analysing all HMap sources of a public map.
#[derive(Debug, Clone)]
pub struct ContributionAnalysis {
    /// Per-source breakdown, in the priority order analysed.
    pub sources: Vec<SourceContribution>,
    /// Total distinct grid coordinates across every source.
    pub total_grids: i64,
}

/// High-level operations over the public-map catalog (component C11).
pub struct CatalogService {
    catalog: Arc<dyn Catalog>,
    grid_storage: std::path::PathBuf,
}

impl CatalogService {
    /// Build a service over `catalog`, resolving HMap source file paths
    /// relative to `grid_storage`.
    pub fn new(catalog: Arc<dyn Catalog>, grid_storage: impl Into<std::path::PathBuf>) -> Self {
        Self {
            catalog,
            grid_storage: grid_storage.into(),
        }
    }

    /// Create a new public map, generating a unique slug from `slug_hint`
    /// (falling back to `name` if `slug_hint` is `None`).
    pub async fn create_public_map(
        &self,
        name: &str,
        slug_hint: Option<&str>,
        created_by: &str,
    ) -> Result<PublicMap> {
        let base = slugify(slug_hint.unwrap_or(name));

        let existing = self.catalog.list_public_maps().await?;
        let taken: std::collections::HashSet<String> =
            existing.into_iter().map(|m| m.id.0).collect();
        let id = disambiguate(&base, |c| taken.contains(c));

        let map = PublicMap::new(id.into(), name.to_string(), created_by.to_string(), Utc::now());
        self.catalog.insert_public_map(map.clone()).await?;
        Ok(map)
    }

    /// Update mutable display/scheduling fields of a public map.
    pub async fn update_public_map(
        &self,
        id: &PublicMapId,
        name: Option<String>,
        is_active: Option<bool>,
        auto_regenerate: Option<bool>,
        regenerate_interval_minutes: Option<Option<i64>>,
    ) -> Result<PublicMap> {
        let mut map = self
            .catalog
            .get_public_map(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("public map '{id}'")))?;

        if let Some(name) = name {
            map.name = name;
        }
        if let Some(active) = is_active {
            map.is_active = active;
        }
        if let Some(auto) = auto_regenerate {
            map.auto_regenerate = auto;
        }
        if let Some(interval) = regenerate_interval_minutes {
            map.regenerate_interval_minutes = interval;
        }

        self.catalog.update_public_map(map.clone()).await?;
        Ok(map)
    }

    /// Delete a public map's catalog row and cascading source links, and
    /// recursively remove its generated tile directory.
    pub async fn delete_public_map(&self, id: &PublicMapId) -> Result<()> {
        self.catalog.delete_public_map(id).await?;
        let _ = tokio::fs::remove_dir_all(self.grid_storage.join("public").join(id.as_str())).await;
        Ok(())
    }

    /// Link a tenant map as a source, rejecting duplicates.
    pub async fn add_tenant_source(
        &self,
        public_map_id: &PublicMapId,
        tenant_id: TenantId,
        map_id: MapId,
        priority: i32,
        added_by: &str,
    ) -> Result<()> {
        self.catalog
            .get_public_map(public_map_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("public map '{public_map_id}'")))?;

        self.catalog
            .add_tenant_source(PublicMapTenantSource {
                public_map_id: public_map_id.clone(),
                tenant_id,
                map_id,
                priority,
                added_at: Utc::now(),
                added_by: added_by.to_string(),
            })
            .await
    }

    /// Link an HMap source, rejecting duplicates and unknown HMap source ids.
    pub async fn add_hmap_source(
        &self,
        public_map_id: &PublicMapId,
        hmap_source_id: HmapSourceId,
        priority: i32,
    ) -> Result<()> {
        self.catalog
            .get_public_map(public_map_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("public map '{public_map_id}'")))?;
        self.catalog
            .get_hmap_source(&hmap_source_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("HMap source '{hmap_source_id}'")))?;

        self.catalog
            .add_hmap_source(PublicMapHmapSource {
                public_map_id: public_map_id.clone(),
                hmap_source_id,
                priority,
                added_at: Utc::now(),
                new_grids: None,
                overlapping_grids: None,
            })
            .await
    }

    /// Register an uploaded HMap file's catalog metadata.
    pub async fn register_hmap_source(
        &self,
        id: HmapSourceId,
        name: String,
        file_name: String,
        file_path: String,
        file_size_bytes: i64,
    ) -> Result<HmapSource> {
        let source = HmapSource {
            id,
            name,
            file_name,
            file_path,
            file_size_bytes,
            total_grids: None,
            segment_count: None,
            analyzed_at: None,
        };
        self.catalog.insert_hmap_source(source.clone()).await?;
        Ok(source)
    }

    /// Current bounds and tile version of a public map.
    pub async fn get_bounds(&self, id: &PublicMapId) -> Result<MapBounds> {
        let map = self
            .catalog
            .get_public_map(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("public map '{id}'")))?;
        Ok(MapBounds {
            min_x: map.min_x,
            max_x: map.max_x,
            min_y: map.min_y,
            max_y: map.max_y,
            tile_version: map.last_generated_at.map(|t| t.timestamp()),
        })
    }

    /// Every active tenant's maps, with their current zoom-0 tile counts.
    pub async fn list_available_tenant_maps(&self) -> Result<Vec<AvailableTenantMap>> {
        let mut out = Vec::new();
        for tenant_id in self.catalog.list_tenants().await? {
            for map_id in self.catalog.list_tenant_maps(&tenant_id).await? {
                let tile_count = self.catalog.tile_count(&tenant_id, &map_id).await?;
                out.push(AvailableTenantMap {
                    tenant_id: tenant_id.clone(),
                    map_id,
                    tile_count,
                });
            }
        }
        Ok(out)
    }

    /// Analyse a public map's HMap sources, in priority order (desc
    /// priority, asc added-at), counting grid coordinates first claimed by
    /// each source versus already claimed by a higher-priority one.
    /// Persists the resulting per-source counters as a side effect.
    pub async fn analyze_contributions(&self, id: &PublicMapId) -> Result<ContributionAnalysis> {
        let mut links = self.catalog.list_hmap_sources(id).await?;
        links.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.added_at.cmp(&b.added_at)));

        let mut claimed: HashMap<(i32, i32), ()> = HashMap::new();
        let mut sources = Vec::with_capacity(links.len());

        for link in &links {
            let source = self
                .catalog
                .get_hmap_source(&link.hmap_source_id)
                .await?
                .ok_or_else(|| Error::not_found(format!("HMap source '{}'", link.hmap_source_id)))?;

            let path = self.grid_storage.join(&source.file_path);
            let (new_grids, overlapping_grids) = self.count_contribution(&path, &mut claimed)?;

            self.catalog
                .update_hmap_source_contribution(id, &link.hmap_source_id, new_grids, overlapping_grids)
                .await?;

            sources.push(SourceContribution {
                hmap_source_id: link.hmap_source_id.clone(),
                new_grids,
                overlapping_grids,
            });
        }

        Ok(ContributionAnalysis {
            total_grids: claimed.len() as i64,
            sources,
        })
    }

    fn count_contribution(
        &self,
        path: &Path,
        claimed: &mut HashMap<(i32, i32), ()>,
    ) -> Result<(i64, i64)> {
        let bytes = std::fs::read(path)?;
        let data = haven_hmap::decode_hmap(&bytes)?;

        let mut new_grids = 0i64;
        let mut overlapping = 0i64;
        for grid in &data.grids {
            let key = (grid.tile_x, grid.tile_y);
            if claimed.contains_key(&key) {
                overlapping += 1;
            } else {
                claimed.insert(key, ());
                new_grids += 1;
            }
        }
        Ok((new_grids, overlapping))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryCatalog;

    fn write_string(buf: &mut Vec<u8>, s: &str) {
        buf.extend_from_slice(&(s.len() as u32).to_le_bytes());
        buf.extend_from_slice(s.as_bytes());
    }

    fn hmap_bytes(grids: &[(i32, i32)]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(haven_hmap::MAGIC);
        buf.extend_from_slice(&1i32.to_le_bytes()); // segment count
        buf.extend_from_slice(&1i64.to_le_bytes()); // segment id
        buf.extend_from_slice(&(grids.len() as i32).to_le_bytes());
        for &(x, y) in grids {
            buf.extend_from_slice(&x.to_le_bytes());
            buf.extend_from_slice(&y.to_le_bytes());
            buf.extend_from_slice(&0u32.to_le_bytes()); // no tilesets
            buf.extend(std::iter::repeat(0u8).take(haven_hmap::GRID_CELLS));
            for _ in 0..haven_hmap::GRID_CELLS {
                buf.extend_from_slice(&0f32.to_le_bytes());
            }
        }
        buf.extend_from_slice(&0u32.to_le_bytes()); // no markers
        buf
    }

    #[tokio::test]
    async fn test_create_public_map_slug_collision() {
        let dir = tempfile::tempdir().unwrap();
        let cat = Arc::new(InMemoryCatalog::new());
        let svc = CatalogService::new(cat, dir.path());

        let m1 = svc.create_public_map("My Map", None, "u").await.unwrap();
        let m2 = svc.create_public_map("My Map", None, "u").await.unwrap();
        assert_eq!(m1.id.as_str(), "my-map");
        assert_eq!(m2.id.as_str(), "my-map-1");
    }

    #[tokio::test]
    async fn test_contribution_analysis_overlap() {
        let dir = tempfile::tempdir().unwrap();
        let cat = Arc::new(InMemoryCatalog::new());
        let svc = CatalogService::new(cat.clone(), dir.path());

        std::fs::write(dir.path().join("a.hmap"), hmap_bytes(&[(0, 0), (1, 0)])).unwrap();
        std::fs::write(dir.path().join("b.hmap"), hmap_bytes(&[(1, 0), (2, 0)])).unwrap();

        let map = svc.create_public_map("Test", None, "u").await.unwrap();

        let src_a = svc
            .register_hmap_source("a".into(), "a".into(), "a.hmap".into(), "a.hmap".into(), 10)
            .await
            .unwrap();
        let src_b = svc
            .register_hmap_source("b".into(), "b".into(), "b.hmap".into(), "b.hmap".into(), 10)
            .await
            .unwrap();

        svc.add_hmap_source(&map.id, src_a.id.clone(), 10).await.unwrap();
        svc.add_hmap_source(&map.id, src_b.id.clone(), 5).await.unwrap();

        let analysis = svc.analyze_contributions(&map.id).await.unwrap();
        assert_eq!(analysis.total_grids, 3);

        let a_result = analysis.sources.iter().find(|s| s.hmap_source_id == src_a.id).unwrap();
        assert_eq!(a_result.new_grids, 2);
        assert_eq!(a_result.overlapping_grids, 0);

        let b_result = analysis.sources.iter().find(|s| s.hmap_source_id == src_b.id).unwrap();
        assert_eq!(b_result.new_grids, 1);
        assert_eq!(b_result.overlapping_grids, 1);
    }
}
