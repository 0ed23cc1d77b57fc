//! In-memory [`Catalog`] implementation for tests and local development.

use crate::catalog_trait::Catalog;
use crate::models::{
    HmapSource, Marker, PublicMap, PublicMapHmapSource, PublicMapTenantSource, SourceGrid,
    SourceTile,
};
use async_trait::async_trait;
use haven_core::{Error, HmapSourceId, MapId, PublicMapId, Result, TenantId};
use parking_lot::RwLock;
use std::collections::HashMap;

type TenantMapKey = (TenantId, MapId);

/// A process-local [`Catalog`] backed by in-memory maps. Intended for tests
/// and single-process deployments; not durable across restarts.
#[derive(Default)]
pub struct InMemoryCatalog {
    public_maps: RwLock<HashMap<PublicMapId, PublicMap>>,
    tenant_sources: RwLock<HashMap<PublicMapId, Vec<PublicMapTenantSource>>>,
    hmap_sources: RwLock<HashMap<PublicMapId, Vec<PublicMapHmapSource>>>,
    hmap_source_files: RwLock<HashMap<HmapSourceId, HmapSource>>,
    tiles: RwLock<HashMap<TenantMapKey, Vec<SourceTile>>>,
    grids: RwLock<HashMap<TenantMapKey, Vec<SourceGrid>>>,
    markers: RwLock<HashMap<TenantId, Vec<Marker>>>,
    tenant_maps: RwLock<HashMap<TenantId, Vec<MapId>>>,
}

impl InMemoryCatalog {
    /// Build an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a tenant map's zoom-0 tiles, for test setup.
    pub fn seed_tiles(&self, tenant: &TenantId, map: &MapId, tiles: Vec<SourceTile>) {
        self.tiles.write().insert((tenant.clone(), map.clone()), tiles);
        self.tenant_maps
            .write()
            .entry(tenant.clone())
            .or_default()
            .push(map.clone());
    }

    /// Seed a tenant map's grids, for test setup.
    pub fn seed_grids(&self, tenant: &TenantId, map: &MapId, grids: Vec<SourceGrid>) {
        self.grids.write().insert((tenant.clone(), map.clone()), grids);
    }

    /// Seed a tenant's public markers, for test setup.
    pub fn seed_markers(&self, tenant: &TenantId, markers: Vec<Marker>) {
        self.markers.write().insert(tenant.clone(), markers);
    }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
    async fn get_public_map(&self, id: &PublicMapId) -> Result<Option<PublicMap>> {
        Ok(self.public_maps.read().get(id).cloned())
    }

    async fn list_public_maps(&self) -> Result<Vec<PublicMap>> {
        Ok(self.public_maps.read().values().cloned().collect())
    }

    async fn insert_public_map(&self, map: PublicMap) -> Result<()> {
        let mut maps = self.public_maps.write();
        if maps.contains_key(&map.id) {
            return Err(Error::conflict(format!("public map '{}' already exists", map.id)));
        }
        maps.insert(map.id.clone(), map);
        Ok(())
    }

    async fn update_public_map(&self, map: PublicMap) -> Result<()> {
        let mut maps = self.public_maps.write();
        if !maps.contains_key(&map.id) {
            return Err(Error::not_found(format!("public map '{}'", map.id)));
        }
        maps.insert(map.id.clone(), map);
        Ok(())
    }

    async fn delete_public_map(&self, id: &PublicMapId) -> Result<()> {
        self.public_maps
            .write()
            .remove(id)
            .ok_or_else(|| Error::not_found(format!("public map '{id}'")))?;
        self.tenant_sources.write().remove(id);
        self.hmap_sources.write().remove(id);
        Ok(())
    }

    async fn list_tenant_sources(&self, id: &PublicMapId) -> Result<Vec<PublicMapTenantSource>> {
        Ok(self.tenant_sources.read().get(id).cloned().unwrap_or_default())
    }

    async fn add_tenant_source(&self, source: PublicMapTenantSource) -> Result<()> {
        let mut sources = self.tenant_sources.write();
        let list = sources.entry(source.public_map_id.clone()).or_default();
        if list
            .iter()
            .any(|s| s.tenant_id == source.tenant_id && s.map_id == source.map_id)
        {
            return Err(Error::conflict("tenant source already linked"));
        }
        list.push(source);
        Ok(())
    }

    async fn remove_tenant_source(&self, id: &PublicMapId, tenant: &TenantId, map: &MapId) -> Result<()> {
        let mut sources = self.tenant_sources.write();
        let list = sources
            .get_mut(id)
            .ok_or_else(|| Error::not_found(format!("public map '{id}'")))?;
        let before = list.len();
        list.retain(|s| !(&s.tenant_id == tenant && &s.map_id == map));
        if list.len() == before {
            return Err(Error::not_found("tenant source not linked"));
        }
        Ok(())
    }

    async fn list_hmap_sources(&self, id: &PublicMapId) -> Result<Vec<PublicMapHmapSource>> {
        Ok(self.hmap_sources.read().get(id).cloned().unwrap_or_default())
    }

    async fn add_hmap_source(&self, source: PublicMapHmapSource) -> Result<()> {
        let mut sources = self.hmap_sources.write();
        let list = sources.entry(source.public_map_id.clone()).or_default();
        if list.iter().any(|s| s.hmap_source_id == source.hmap_source_id) {
            return Err(Error::conflict("HMap source already linked"));
        }
        list.push(source);
        Ok(())
    }

    async fn remove_hmap_source(&self, id: &PublicMapId, hmap: &HmapSourceId) -> Result<()> {
        let mut sources = self.hmap_sources.write();
        let list = sources
            .get_mut(id)
            .ok_or_else(|| Error::not_found(format!("public map '{id}'")))?;
        let before = list.len();
        list.retain(|s| &s.hmap_source_id != hmap);
        if list.len() == before {
            return Err(Error::not_found("HMap source not linked"));
        }
        Ok(())
    }

    async fn update_hmap_source_contribution(
        &self,
        id: &PublicMapId,
        hmap: &HmapSourceId,
        new_grids: i64,
        overlapping_grids: i64,
    ) -> Result<()> {
        let mut sources = self.hmap_sources.write();
        let list = sources
            .get_mut(id)
            .ok_or_else(|| Error::not_found(format!("public map '{id}'")))?;
        let entry = list
            .iter_mut()
            .find(|s| &s.hmap_source_id == hmap)
            .ok_or_else(|| Error::not_found("HMap source not linked"))?;
        entry.new_grids = Some(new_grids);
        entry.overlapping_grids = Some(overlapping_grids);
        Ok(())
    }

    async fn get_hmap_source(&self, id: &HmapSourceId) -> Result<Option<HmapSource>> {
        Ok(self.hmap_source_files.read().get(id).cloned())
    }

    async fn insert_hmap_source(&self, source: HmapSource) -> Result<()> {
        self.hmap_source_files.write().insert(source.id.clone(), source);
        Ok(())
    }

    async fn delete_hmap_source(&self, id: &HmapSourceId) -> Result<()> {
        let referenced = self
            .hmap_sources
            .read()
            .values()
            .any(|links| links.iter().any(|l| &l.hmap_source_id == id));
        if referenced {
            return Err(Error::invalid("HMap source is referenced by a public map"));
        }
        self.hmap_source_files
            .write()
            .remove(id)
            .ok_or_else(|| Error::not_found(format!("HMap source '{id}'")))?;
        Ok(())
    }

    async fn source_tiles(&self, tenant: &TenantId, map: &MapId) -> Result<Vec<SourceTile>> {
        Ok(self
            .tiles
            .read()
            .get(&(tenant.clone(), map.clone()))
            .cloned()
            .unwrap_or_default())
    }

    async fn source_grids(&self, tenant: &TenantId, map: &MapId) -> Result<Vec<SourceGrid>> {
        Ok(self
            .grids
            .read()
            .get(&(tenant.clone(), map.clone()))
            .cloned()
            .unwrap_or_default())
    }

    async fn thingwall_markers(&self, tenant: &TenantId) -> Result<Vec<Marker>> {
        Ok(self
            .markers
            .read()
            .get(tenant)
            .map(|ms| ms.iter().filter(|m| !m.hidden && m.image.contains("thingwall")).cloned().collect())
            .unwrap_or_default())
    }

    async fn list_tenants(&self) -> Result<Vec<TenantId>> {
        Ok(self.tenant_maps.read().keys().cloned().collect())
    }

    async fn list_tenant_maps(&self, tenant: &TenantId) -> Result<Vec<MapId>> {
        Ok(self.tenant_maps.read().get(tenant).cloned().unwrap_or_default())
    }

    async fn tile_count(&self, tenant: &TenantId, map: &MapId) -> Result<i64> {
        Ok(self
            .tiles
            .read()
            .get(&(tenant.clone(), map.clone()))
            .map(|t| t.len() as i64)
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_insert_and_get() {
        let cat = InMemoryCatalog::new();
        let map = PublicMap::new("slug".into(), "Name".into(), "user".into(), Utc::now());
        cat.insert_public_map(map.clone()).await.unwrap();
        let fetched = cat.get_public_map(&"slug".into()).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Name");
    }

    #[tokio::test]
    async fn test_duplicate_insert_conflicts() {
        let cat = InMemoryCatalog::new();
        let map = PublicMap::new("slug".into(), "Name".into(), "user".into(), Utc::now());
        cat.insert_public_map(map.clone()).await.unwrap();
        assert!(cat.insert_public_map(map).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_cascades_sources() {
        let cat = InMemoryCatalog::new();
        let id: PublicMapId = "slug".into();
        let map = PublicMap::new(id.clone(), "Name".into(), "user".into(), Utc::now());
        cat.insert_public_map(map).await.unwrap();
        cat.add_tenant_source(PublicMapTenantSource {
            public_map_id: id.clone(),
            tenant_id: "t1".into(),
            map_id: "m1".into(),
            priority: 0,
            added_at: Utc::now(),
            added_by: "u".into(),
        })
        .await
        .unwrap();
        cat.delete_public_map(&id).await.unwrap();
        assert!(cat.list_tenant_sources(&id).await.unwrap().is_empty());
    }
}
